//! Native termios provider.
//!
//! Talks to the controlling terminal through `/dev/tty` (falling back to the
//! std descriptors when that fails but stdin is a tty). Raw mode is entered
//! with `cfmakeraw` semantics: echo, canonical processing, signal generation
//! and flow control all off, `VMIN=1`/`VTIME=0`, with `poll(2)` supplying
//! read deadlines.
//!
//! Attribute restoration is guaranteed on all exit paths: `restore()`, drop,
//! and a process-wide teardown registry consulted by a chained panic hook.
//! The registry holds at most one saved state behind a single lock — the
//! terminal's attribute state is process-wide, so attribute changes must
//! serialize through it.

use crate::{
    caps::Capabilities, size_from_env, AttrRepr, Attributes, ProviderKind, ReadOutcome, Signal,
    TerminalError, TerminalProvider,
};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, SigAction, SigHandler, SigSet, SaFlags};
use nix::sys::termios::{
    cfmakeraw, tcgetattr, tcsetattr, SetArg, SpecialCharacterIndices, Termios,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once, OnceLock};
use std::time::Duration;
use tracing::{debug, trace, warn};

static RESIZED: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static CONTINUED: AtomicBool = AtomicBool::new(false);

/// Saved attributes for crash-path restoration: (fd, termios).
static RESTORE_REGISTRY: Mutex<Option<(RawFd, Termios)>> = Mutex::new(None);
static HOOKS: Once = Once::new();
static PREV_SIGINT: OnceLock<Mutex<Option<SigAction>>> = OnceLock::new();

extern "C" fn on_sigwinch(_: libc::c_int) {
    RESIZED.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigint(_: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

extern "C" fn on_sigcont(_: libc::c_int) {
    CONTINUED.store(true, Ordering::SeqCst);
}

/// Reapply the registered attributes, if any. Safe to call repeatedly.
pub fn emergency_restore() {
    if let Ok(guard) = RESTORE_REGISTRY.lock()
        && let Some((fd, ref attrs)) = *guard
    {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let _ = tcsetattr(borrowed, SetArg::TCSANOW, attrs);
    }
}

fn install_global_hooks() {
    HOOKS.call_once(|| {
        let prev = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            prev(info);
        }));
        let winch = SigAction::new(
            SigHandler::Handler(on_sigwinch),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let cont = SigAction::new(
            SigHandler::Handler(on_sigcont),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe {
            let _ = signal::sigaction(signal::Signal::SIGWINCH, &winch);
            let _ = signal::sigaction(signal::Signal::SIGCONT, &cont);
        }
        debug!(target: "term.raw", "global terminal hooks installed");
    });
}

pub struct TermiosProvider {
    input: File,
    output: File,
    caps: Capabilities,
    orig: Option<Termios>,
    raw: bool,
}

impl TermiosProvider {
    /// Open the controlling terminal; errors when neither `/dev/tty` nor a
    /// tty stdin is available.
    pub fn open(term: Option<&str>) -> Result<Self, TerminalError> {
        let (input, output) = match OpenOptions::new().read(true).write(true).open("/dev/tty") {
            Ok(tty) => {
                let out = tty.try_clone()?;
                (tty, out)
            }
            Err(e) => {
                if !fd_is_tty(libc::STDIN_FILENO) {
                    return Err(TerminalError::Unavailable(format!(
                        "/dev/tty failed ({e}) and stdin is not a tty"
                    )));
                }
                (dup_fd(libc::STDIN_FILENO)?, dup_fd(libc::STDOUT_FILENO)?)
            }
        };
        Ok(Self {
            input,
            output,
            caps: Capabilities::for_term(term),
            orig: None,
            raw: false,
        })
    }

    fn read_attrs(&self) -> Result<Termios, TerminalError> {
        tcgetattr(self.input.as_fd()).map_err(|e| TerminalError::Io(e.into()))
    }

    fn apply_attrs(&self, attrs: &Termios) -> Result<(), TerminalError> {
        tcsetattr(self.input.as_fd(), SetArg::TCSADRAIN, attrs)
            .map_err(|e| TerminalError::Io(e.into()))
    }
}

pub(crate) fn fd_is_tty(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}

pub(crate) fn dup_fd(fd: RawFd) -> Result<File, TerminalError> {
    let dup = unsafe { libc::dup(fd) };
    if dup < 0 {
        return Err(TerminalError::Io(io::Error::last_os_error()));
    }
    Ok(File::from(unsafe { OwnedFd::from_raw_fd(dup) }))
}

impl TerminalProvider for TermiosProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Termios
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn attributes(&self) -> Result<Attributes, TerminalError> {
        Ok(Attributes(AttrRepr::Termios(self.read_attrs()?)))
    }

    fn set_attributes(&mut self, attrs: &Attributes) -> Result<(), TerminalError> {
        match &attrs.0 {
            AttrRepr::Termios(t) => self.apply_attrs(t),
            _ => Err(TerminalError::Unsupported("termios")),
        }
    }

    fn enter_raw(&mut self) -> Result<(), TerminalError> {
        if self.raw {
            return Ok(());
        }
        install_global_hooks();
        let orig = self.read_attrs()?;
        let mut raw = orig.clone();
        cfmakeraw(&mut raw);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        self.apply_attrs(&raw)?;

        if let Ok(mut reg) = RESTORE_REGISTRY.lock() {
            *reg = Some((self.input.as_raw_fd(), orig.clone()));
        }
        // While raw, route external SIGINT into a flag so the read loop can
        // restore attributes before failing with Interrupted.
        let action = SigAction::new(
            SigHandler::Handler(on_sigint),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let prev = unsafe { signal::sigaction(signal::Signal::SIGINT, &action).ok() };
        if let Ok(mut slot) = PREV_SIGINT.get_or_init(|| Mutex::new(None)).lock() {
            *slot = prev;
        }

        self.orig = Some(orig);
        self.raw = true;
        trace!(target: "term.raw", fd = self.input.as_raw_fd(), "entered raw mode");
        Ok(())
    }

    fn restore(&mut self) -> Result<(), TerminalError> {
        if let Some(orig) = self.orig.take() {
            self.apply_attrs(&orig)?;
            if let Ok(mut reg) = RESTORE_REGISTRY.lock() {
                *reg = None;
            }
            if let Some(lock) = PREV_SIGINT.get()
                && let Ok(mut slot) = lock.lock()
                && let Some(prev) = slot.take()
            {
                unsafe {
                    let _ = signal::sigaction(signal::Signal::SIGINT, &prev);
                }
            }
            self.raw = false;
            trace!(target: "term.raw", "restored terminal attributes");
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

    fn raise(&mut self, sig: Signal) -> Result<(), TerminalError> {
        raise_signal(sig)
    }

    fn take_resize(&mut self) -> bool {
        RESIZED.swap(false, Ordering::SeqCst)
    }

    fn take_interrupt(&mut self) -> bool {
        INTERRUPTED.swap(false, Ordering::SeqCst)
    }

    fn take_continue(&mut self) -> bool {
        CONTINUED.swap(false, Ordering::SeqCst)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl Drop for TermiosProvider {
    fn drop(&mut self) {
        if self.raw
            && let Err(e) = self.restore()
        {
            warn!(target: "term.raw", error = %e, "restore on drop failed");
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Shared unix helpers (also used by the stty and dumb providers)
// -------------------------------------------------------------------------------------------------

/// poll(2)-gated read honoring the deadline and the signal flags.
pub(crate) fn poll_read(
    input: &mut File,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<ReadOutcome, TerminalError> {
    loop {
        let poll_timeout = match timeout {
            None => PollTimeout::NONE,
            Some(d) => {
                let ms = i32::try_from(d.as_millis()).unwrap_or(i32::MAX);
                PollTimeout::try_from(ms).unwrap_or(PollTimeout::MAX)
            }
        };
        let mut fds = [PollFd::new(input.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, poll_timeout) {
            Ok(0) => return Ok(ReadOutcome::TimedOut),
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                if revents.contains(PollFlags::POLLIN) {
                    let n = input.read(buf)?;
                    if n == 0 {
                        return Ok(ReadOutcome::Eof);
                    }
                    return Ok(ReadOutcome::Bytes(n));
                }
                if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                    return Ok(ReadOutcome::Eof);
                }
            }
            Err(nix::errno::Errno::EINTR) => {
                if INTERRUPTED.load(Ordering::SeqCst) {
                    return Ok(ReadOutcome::Interrupted);
                }
                if RESIZED.load(Ordering::SeqCst) || CONTINUED.load(Ordering::SeqCst) {
                    // Surface as a timeout so the caller checks the flags
                    // between events.
                    return Ok(ReadOutcome::TimedOut);
                }
                // Unrelated signal: retry the wait.
            }
            Err(e) => return Err(TerminalError::Io(e.into())),
        }
    }
}

pub(crate) fn ioctl_size(fd: RawFd) -> Option<(u16, u16)> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some((ws.ws_col, ws.ws_row))
}

pub(crate) fn raise_signal(sig: Signal) -> Result<(), TerminalError> {
    let nix_sig = match sig {
        Signal::Interrupt => signal::Signal::SIGINT,
        Signal::Suspend => signal::Signal::SIGTSTP,
        Signal::Stop => signal::Signal::SIGSTOP,
        Signal::Continue => signal::Signal::SIGCONT,
        Signal::Resize => signal::Signal::SIGWINCH,
    };
    signal::raise(nix_sig).map_err(|e| TerminalError::Io(e.into()))
}

pub(crate) fn take_resize_flag() -> bool {
    RESIZED.swap(false, Ordering::SeqCst)
}

pub(crate) fn take_interrupt_flag() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

pub(crate) fn take_continue_flag() -> bool {
    CONTINUED.swap(false, Ordering::SeqCst)
}
