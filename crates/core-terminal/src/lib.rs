//! Terminal provider abstraction.
//!
//! A [`TerminalProvider`] owns the controlling terminal for the duration of a
//! read: it toggles raw mode, reads bytes with a deadline, writes escape
//! sequences, reports size, and surfaces resize/interrupt signals as flags
//! polled between events. Concrete providers are selected at runtime through
//! a priority list: native termios FFI, then `stty` subprocess fallback, then
//! a dumb provider that reports no capabilities.
//!
//! Contract: between [`TerminalProvider::enter_raw`] and
//! [`TerminalProvider::restore`] the echo, canonical, signal-generation and
//! flow-control flags are off. Restoration runs on every exit path — drop,
//! explicit restore, and the process-wide teardown hook installed by the
//! termios provider (panic included).

use std::io;
use std::time::Duration;

pub mod caps;
pub mod dumb;
pub mod memory;
pub mod params;
pub mod stty;
pub mod termios;

pub use caps::Capabilities;
pub use dumb::DumbProvider;
pub use memory::MemoryProvider;
pub use stty::SttyProvider;
pub use termios::TermiosProvider;

use tracing::{debug, warn};

/// `TERM` values that cannot be driven in raw mode at all.
pub const UNSUPPORTED_TERM: [&str; 3] = ["dumb", "cons25", "emacs"];

/// Errors surfaced by terminal providers.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("terminal I/O: {0}")]
    Io(#[from] io::Error),
    #[error("no usable terminal provider: {0}")]
    Unavailable(String),
    #[error("operation unsupported by {0} provider")]
    Unsupported(&'static str),
}

/// Outcome of a deadline read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were stored at the front of the buffer.
    Bytes(usize),
    /// The deadline elapsed with no input.
    TimedOut,
    /// End of input (terminal hangup or script exhausted).
    Eof,
    /// A signal interrupted the wait.
    Interrupted,
}

/// Signals a provider can deliver or raise on the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Suspend,
    Stop,
    Continue,
    Resize,
}

/// Which concrete provider backs the trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Termios,
    Stty,
    Dumb,
    Memory,
}

/// Saved terminal attributes, opaque to callers.
///
/// The payload depends on the provider: a full termios struct for the FFI
/// provider, an `stty -g` settings string for the subprocess one.
#[derive(Debug, Clone)]
pub struct Attributes(pub(crate) AttrRepr);

#[derive(Debug, Clone)]
pub(crate) enum AttrRepr {
    Termios(nix::sys::termios::Termios),
    Stty(String),
    None,
}

/// Byte-level terminal access plus attribute and signal management.
pub trait TerminalProvider: Send {
    fn kind(&self) -> ProviderKind;

    /// False for non-tty input; the line reader then degrades to plain I/O.
    fn is_interactive(&self) -> bool;

    fn capabilities(&self) -> &Capabilities;

    /// Snapshot of the current attributes.
    fn attributes(&self) -> Result<Attributes, TerminalError>;

    /// Reapply a previously captured snapshot.
    fn set_attributes(&mut self, attrs: &Attributes) -> Result<(), TerminalError>;

    /// Enter raw mode, saving the prior attributes for [`Self::restore`].
    fn enter_raw(&mut self) -> Result<(), TerminalError>;

    /// Restore the attributes captured by the last [`Self::enter_raw`].
    fn restore(&mut self) -> Result<(), TerminalError>;

    /// (columns, rows). Falls back to `COLUMNS`/`LINES`, then 80x24.
    fn size(&self) -> (u16, u16);

    /// Read available bytes, waiting at most `timeout` (`None` = block).
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, TerminalError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), TerminalError>;

    fn flush(&mut self) -> Result<(), TerminalError>;

    /// Raise a signal on the owning process (used by suspend handling).
    fn raise(&mut self, signal: Signal) -> Result<(), TerminalError>;

    /// True once after each terminal size change; clears the flag.
    fn take_resize(&mut self) -> bool;

    /// True once after an asynchronous SIGINT; clears the flag.
    fn take_interrupt(&mut self) -> bool;

    /// True once after the process resumed from a suspend; clears the flag.
    fn take_continue(&mut self) -> bool;

    /// Downcast hook (tests inspect the memory provider through it).
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Provider selection knobs.
#[derive(Debug, Clone, Default)]
pub struct TerminalConfig {
    /// Overrides `$TERM`.
    pub term: Option<String>,
    /// Fail with [`TerminalError::Unavailable`] instead of degrading to dumb.
    pub require_tty: bool,
    /// Pin a specific provider, skipping the priority list.
    pub provider: Option<ProviderKind>,
}

/// Open a provider following the priority list termios → stty → dumb.
pub fn open(cfg: &TerminalConfig) -> Result<Box<dyn TerminalProvider>, TerminalError> {
    let term = cfg.term.clone().or_else(|| std::env::var("TERM").ok());

    if let Some(kind) = cfg.provider {
        return open_kind(kind, term.as_deref());
    }

    let raw_capable = term
        .as_deref()
        .is_some_and(|t| !UNSUPPORTED_TERM.contains(&t));

    if raw_capable {
        match TermiosProvider::open(term.as_deref()) {
            Ok(p) => {
                debug!(target: "term.open", provider = "termios", term = ?term, "selected");
                return Ok(Box::new(p));
            }
            Err(e) => warn!(target: "term.open", error = %e, "termios provider unavailable"),
        }
        match SttyProvider::open(term.as_deref()) {
            Ok(p) => {
                debug!(target: "term.open", provider = "stty", term = ?term, "selected");
                return Ok(Box::new(p));
            }
            Err(e) => warn!(target: "term.open", error = %e, "stty provider unavailable"),
        }
    }

    if cfg.require_tty {
        return Err(TerminalError::Unavailable(
            "no raw-capable terminal and a tty was required".to_string(),
        ));
    }
    debug!(target: "term.open", provider = "dumb", term = ?term, "selected");
    Ok(Box::new(DumbProvider::new(term.as_deref())))
}

fn open_kind(
    kind: ProviderKind,
    term: Option<&str>,
) -> Result<Box<dyn TerminalProvider>, TerminalError> {
    match kind {
        ProviderKind::Termios => Ok(Box::new(TermiosProvider::open(term)?)),
        ProviderKind::Stty => Ok(Box::new(SttyProvider::open(term)?)),
        ProviderKind::Dumb => Ok(Box::new(DumbProvider::new(term))),
        ProviderKind::Memory => Ok(Box::new(MemoryProvider::new())),
    }
}

/// (columns, rows) from the environment, for providers that cannot query.
pub(crate) fn size_from_env() -> (u16, u16) {
    let cols = std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(80);
    let rows = std::env::var("LINES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(24);
    (cols, rows)
}
