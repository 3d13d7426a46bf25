//! lino — an interactive line editing engine.
//!
//! Reads one logical line (possibly multi-line) from a character terminal:
//! prompt rendering with minimal repaints, emacs and vi key maps resolved
//! over raw byte sequences, history with incremental search and `!`-event
//! expansion, pluggable completion, kill ring, and undo.
//!
//! ```no_run
//! use lino::{LineReader, ReaderOptions};
//!
//! let mut reader = LineReader::new(ReaderOptions::default())?;
//! reader.history_mut().add("make test");
//! let line = reader.read_line("> ")?;
//! # Ok::<(), lino::ReadError>(())
//! ```
//!
//! The layering mirrors the crates in this workspace: `core-terminal`
//! provides raw-mode byte I/O and capabilities, `core-keymap` +
//! `core-input` turn bytes into operations, `core-buffer` owns the editable
//! text, `core-render` paints frames, `core-history` and `core-complete`
//! supply recall and candidates. This crate composes them.

mod error;
mod options;
mod printer;
mod reader;
mod search;
mod widgets;

pub use error::ReadError;
pub use options::ReaderOptions;
pub use printer::ExternalPrinter;
pub use reader::LineReader;
pub use widgets::{WidgetCtx, WidgetOutcome, WidgetRegistry};

// Re-exports embedders commonly need.
pub use core_complete::{Candidate, CandidateProvider, CompletionError, ParsedLine};
pub use core_history::{History, HistoryEntry, SearchMode};
pub use core_keymap::{EditingMode, Operation};
pub use core_terminal::{MemoryProvider, ProviderKind, TerminalConfig, TerminalProvider};
