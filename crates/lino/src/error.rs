//! The error taxonomy `read_line` surfaces.

use core_history::{ExpansionError, HistoryError};
use core_keymap::KeymapParseError;
use core_terminal::TerminalError;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// No bytes available and the buffer was empty at the EOF key.
    #[error("end of input")]
    Eof,
    /// SIGINT (or the interrupt key) during the read.
    #[error("interrupted")]
    Interrupted,
    /// Device read/write failure; not recoverable within the read.
    #[error("terminal I/O: {0}")]
    TerminalIO(TerminalError),
    /// No suitable provider at construction time.
    #[error("no terminal provider available: {0}")]
    ProviderUnavailable(String),
    /// A `!`/`^` event matched nothing (non-interactive expansion only;
    /// interactive reads recover with a bell).
    #[error(transparent)]
    EventExpansion(#[from] ExpansionError),
    /// Malformed history content on load.
    #[error(transparent)]
    HistoryFormat(#[from] HistoryError),
    /// INPUTRC directives that could not be parsed.
    #[error("inputrc: {0} directives failed; first: {1}")]
    KeymapParse(usize, KeymapParseError),
}

impl From<TerminalError> for ReadError {
    fn from(e: TerminalError) -> Self {
        match e {
            TerminalError::Unavailable(msg) => ReadError::ProviderUnavailable(msg),
            other => ReadError::TerminalIO(other),
        }
    }
}
