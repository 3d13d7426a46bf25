//! Ordered history store with a navigation cursor and directional search.
//!
//! Entries carry a monotonic id and an optional timestamp. The cursor walks
//! `[0, len]`; the past-the-end slot stands for the in-progress new line, so
//! navigation code never special-cases "not browsing history". A size bound
//! evicts the oldest entry on overflow; optional duplicate suppression drops
//! an add equal to the last entry.
//!
//! Incremental search state lives in the line reader — this crate only
//! exposes the directional primitives it is built from.

pub mod expand;
pub mod file;

pub use expand::{expand_event, Expansion, ExpansionError};
pub use file::{HistoryError, HistoryFormatIssue, LoadOutcome};

use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::trace;

pub const DEFAULT_HISTORY_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub text: String,
    pub timestamp: Option<SystemTime>,
}

/// How search patterns match entry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Contains,
    StartsWith,
    Regex,
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
    max_size: usize,
    ignore_dups: bool,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            max_size: max_size.max(1),
            ignore_dups: false,
            cursor: 0,
        }
    }

    pub fn set_ignore_dups(&mut self, on: bool) {
        self.ignore_dups = on;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Append an entry; false when duplicate suppression dropped it.
    pub fn add(&mut self, text: &str) -> bool {
        self.add_with_timestamp(text, None)
    }

    pub fn add_with_timestamp(&mut self, text: &str, timestamp: Option<SystemTime>) -> bool {
        if self.ignore_dups
            && self.entries.back().is_some_and(|e| e.text == text)
        {
            trace!(target: "history.store", "duplicate add suppressed");
            self.cursor = self.entries.len();
            return false;
        }
        self.entries.push_back(HistoryEntry {
            id: self.next_id,
            text: text.to_string(),
            timestamp,
        });
        self.next_id += 1;
        if self.entries.len() > self.max_size {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len();
        trace!(target: "history.store", len = self.entries.len(), "entry added");
        true
    }

    // --- cursor navigation ---------------------------------------------

    /// Current index; `len()` is the in-progress slot.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.entries.len());
    }

    pub fn at_end(&self) -> bool {
        self.cursor == self.entries.len()
    }

    /// Entry under the cursor (`None` on the in-progress slot).
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn move_first(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.cursor = 0;
        true
    }

    pub fn move_last(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn move_prev(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_next(&mut self) -> bool {
        if self.cursor >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Reset the cursor to the in-progress slot (after an accept).
    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
    }

    // --- search ---------------------------------------------------------

    fn matches(mode: SearchMode, pattern: &str, text: &str) -> bool {
        match mode {
            SearchMode::Contains => text.contains(pattern),
            SearchMode::StartsWith => text.starts_with(pattern),
            SearchMode::Regex => match regex::Regex::new(pattern) {
                Ok(re) => re.is_match(text),
                Err(_) => false,
            },
        }
    }

    /// Newest match at or before `from` (inclusive), walking toward 0.
    pub fn search_backward(&self, pattern: &str, from: usize, mode: SearchMode) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let start = from.min(self.entries.len() - 1);
        (0..=start)
            .rev()
            .find(|&i| Self::matches(mode, pattern, &self.entries[i].text))
    }

    /// Oldest match at or after `from` (inclusive), walking toward the end.
    pub fn search_forward(&self, pattern: &str, from: usize, mode: SearchMode) -> Option<usize> {
        (from..self.entries.len())
            .find(|&i| Self::matches(mode, pattern, &self.entries[i].text))
    }
}
