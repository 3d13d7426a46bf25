//! Dumb provider: no raw mode, no capabilities.
//!
//! Used for `TERM=dumb`, pipes, and as the last rung of the priority list.
//! The line reader detects the missing capabilities and degrades to simple
//! line-at-a-time echo-less I/O.

use crate::termios::{dup_fd, fd_is_tty, poll_read, raise_signal};
use crate::{
    caps::Capabilities, size_from_env, AttrRepr, Attributes, ProviderKind, ReadOutcome, Signal,
    TerminalError, TerminalProvider,
};
use nix::libc;
use std::fs::File;
use std::io::Write;
use std::time::Duration;

pub struct DumbProvider {
    input: Option<File>,
    output: Option<File>,
    caps: Capabilities,
    interactive: bool,
}

impl DumbProvider {
    pub fn new(_term: Option<&str>) -> Self {
        let interactive = fd_is_tty(libc::STDIN_FILENO);
        Self {
            input: dup_fd(libc::STDIN_FILENO).ok(),
            output: dup_fd(libc::STDOUT_FILENO).ok(),
            caps: Capabilities::dumb(),
            interactive,
        }
    }
}

impl TerminalProvider for DumbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dumb
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn attributes(&self) -> Result<Attributes, TerminalError> {
        Ok(Attributes(AttrRepr::None))
    }

    fn set_attributes(&mut self, _attrs: &Attributes) -> Result<(), TerminalError> {
        Ok(())
    }

    fn enter_raw(&mut self) -> Result<(), TerminalError> {
        Ok(())
    }

    fn restore(&mut self) -> Result<(), TerminalError> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        size_from_env()
    }

    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, TerminalError> {
        match self.input.as_mut() {
            Some(input) => poll_read(input, buf, timeout),
            None => Ok(ReadOutcome::Eof),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TerminalError> {
        if let Some(out) = self.output.as_mut() {
            out.write_all(bytes)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        if let Some(out) = self.output.as_mut() {
            out.flush()?;
        }
        Ok(())
    }

    fn raise(&mut self, signal: Signal) -> Result<(), TerminalError> {
        raise_signal(signal)
    }

    fn take_resize(&mut self) -> bool {
        false
    }

    fn take_interrupt(&mut self) -> bool {
        crate::termios::take_interrupt_flag()
    }

    fn take_continue(&mut self) -> bool {
        false
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
