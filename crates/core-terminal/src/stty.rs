//! `stty` subprocess provider.
//!
//! Fallback for platforms where the termios FFI path is unavailable but a
//! POSIX `stty` binary exists. Attribute snapshots are `stty -g` settings
//! strings; raw mode is `stty raw -echo -isig -ixon`. I/O happens on
//! duplicates of the std descriptors with the same poll-gated reads as the
//! native provider.

use crate::termios::{dup_fd, fd_is_tty, ioctl_size, poll_read, raise_signal};
use crate::{
    caps::Capabilities, size_from_env, AttrRepr, Attributes, ProviderKind, ReadOutcome, Signal,
    TerminalError, TerminalProvider,
};
use nix::libc;
use std::fs::File;
use std::io::Write;
use std::os::fd::AsRawFd;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::trace;

pub struct SttyProvider {
    input: File,
    output: File,
    caps: Capabilities,
    saved: Option<String>,
}

impl SttyProvider {
    pub fn open(term: Option<&str>) -> Result<Self, TerminalError> {
        if !fd_is_tty(libc::STDIN_FILENO) {
            return Err(TerminalError::Unavailable("stdin is not a tty".into()));
        }
        // Probe for a usable stty before committing to this provider.
        let probe = run_stty(&["-g"])?;
        if probe.trim().is_empty() {
            return Err(TerminalError::Unavailable("stty -g produced no output".into()));
        }
        Ok(Self {
            input: dup_fd(libc::STDIN_FILENO)?,
            output: dup_fd(libc::STDOUT_FILENO)?,
            caps: Capabilities::for_term(term),
            saved: None,
        })
    }
}

fn run_stty(args: &[&str]) -> Result<String, TerminalError> {
    let out = Command::new("stty")
        .args(args)
        .stdin(Stdio::inherit())
        .output()
        .map_err(|e| TerminalError::Unavailable(format!("stty spawn failed: {e}")))?;
    if !out.status.success() {
        return Err(TerminalError::Unavailable(format!(
            "stty {} exited with {}",
            args.join(" "),
            out.status
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

impl TerminalProvider for SttyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stty
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn attributes(&self) -> Result<Attributes, TerminalError> {
        Ok(Attributes(AttrRepr::Stty(run_stty(&["-g"])?.trim().to_string())))
    }

    fn set_attributes(&mut self, attrs: &Attributes) -> Result<(), TerminalError> {
        match &attrs.0 {
            AttrRepr::Stty(s) => {
                run_stty(&[s])?;
                Ok(())
            }
            _ => Err(TerminalError::Unsupported("stty")),
        }
    }

    fn enter_raw(&mut self) -> Result<(), TerminalError> {
        if self.saved.is_some() {
            return Ok(());
        }
        let saved = run_stty(&["-g"])?.trim().to_string();
        run_stty(&["raw", "-echo", "-isig", "-ixon", "min", "1", "time", "0"])?;
        self.saved = Some(saved);
        trace!(target: "term.raw", provider = "stty", "entered raw mode");
        Ok(())
    }

    fn restore(&mut self) -> Result<(), TerminalError> {
        if let Some(saved) = self.saved.take() {
            run_stty(&[&saved])?;
            trace!(target: "term.raw", provider = "stty", "restored terminal attributes");
        }
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        ioctl_size(self.output.as_raw_fd()).unwrap_or_else(size_from_env)
    }

    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, TerminalError> {
        poll_read(&mut self.input, buf, timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TerminalError> {
        self.output.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        self.output.flush()?;
        Ok(())
    }

    fn raise(&mut self, signal: Signal) -> Result<(), TerminalError> {
        raise_signal(signal)
    }

    fn take_resize(&mut self) -> bool {
        crate::termios::take_resize_flag()
    }

    fn take_interrupt(&mut self) -> bool {
        crate::termios::take_interrupt_flag()
    }

    fn take_continue(&mut self) -> bool {
        crate::termios::take_continue_flag()
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl Drop for SttyProvider {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
