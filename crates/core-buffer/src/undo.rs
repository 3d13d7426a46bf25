//! Bounded undo stack with self-insert coalescing.
//!
//! Snapshots capture (text, cursor) *before* a mutating operation. A run of
//! consecutive self-inserts forms one undo group: the run closes on any
//! other operation or after a 500 ms idle gap, so typing a burst undoes in
//! one step while slow deliberate edits undo separately.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::EditBuffer;

/// Maximum number of snapshots retained.
pub const UNDO_HISTORY_MAX: usize = 200;

/// Idle gap that closes an insert coalescing run.
pub const INSERT_COALESCE_IDLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub chars: Vec<char>,
    pub cursor: usize,
}

#[derive(Debug, Clone, Copy)]
enum InsertRun {
    Inactive,
    Active { last_edit: Instant },
}

#[derive(Debug)]
pub struct UndoEngine {
    stack: Vec<Snapshot>,
    insert_run: InsertRun,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            insert_run: InsertRun::Inactive,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.insert_run = InsertRun::Inactive;
    }

    fn push(&mut self, buffer: &EditBuffer) {
        let snap = Snapshot {
            chars: buffer.chars().to_vec(),
            cursor: buffer.cursor(),
        };
        // Identical successive states would make undo a no-op press; skip.
        if self.stack.last() == Some(&snap) {
            trace!(target: "buffer.undo", depth = self.stack.len(), "snapshot dedupe skip");
            return;
        }
        self.stack.push(snap);
        if self.stack.len() > UNDO_HISTORY_MAX {
            self.stack.remove(0);
        }
        trace!(target: "buffer.undo", depth = self.stack.len(), "snapshot pushed");
    }

    /// Record state before a discrete (non-self-insert) mutation.
    pub fn record_edit(&mut self, buffer: &EditBuffer) {
        self.insert_run = InsertRun::Inactive;
        self.push(buffer);
    }

    /// Record state before a self-insert, coalescing runs.
    pub fn record_self_insert(&mut self, buffer: &EditBuffer) {
        let now = Instant::now();
        match self.insert_run {
            InsertRun::Active { last_edit } if now.duration_since(last_edit) < INSERT_COALESCE_IDLE => {
                // Within the run: the existing snapshot already covers it.
            }
            _ => self.push(buffer),
        }
        self.insert_run = InsertRun::Active { last_edit: now };
    }

    /// Any non-mutating boundary (navigation, accept) closes the run.
    pub fn close_run(&mut self) {
        self.insert_run = InsertRun::Inactive;
    }

    /// Pop one snapshot back into the buffer.
    pub fn undo(&mut self, buffer: &mut EditBuffer) -> bool {
        self.insert_run = InsertRun::Inactive;
        if let Some(snap) = self.stack.pop() {
            trace!(target: "buffer.undo", depth = self.stack.len(), "undo pop");
            buffer.restore(snap.chars, snap.cursor);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_restores_previous_state() {
        let mut buf = EditBuffer::from_str("ab");
        let mut undo = UndoEngine::new();
        undo.record_edit(&buf);
        buf.kill_to_start();
        assert_eq!(buf.text(), "");
        assert!(undo.undo(&mut buf));
        assert_eq!(buf.text(), "ab");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn self_insert_run_coalesces() {
        let mut buf = EditBuffer::new();
        let mut undo = UndoEngine::new();
        for ch in "abc".chars() {
            undo.record_self_insert(&buf);
            buf.insert_char(ch);
        }
        assert_eq!(undo.depth(), 1);
        assert!(undo.undo(&mut buf));
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn discrete_edit_closes_run() {
        let mut buf = EditBuffer::new();
        let mut undo = UndoEngine::new();
        undo.record_self_insert(&buf);
        buf.insert_char('a');
        undo.record_edit(&buf);
        buf.delete_backward();
        undo.record_self_insert(&buf);
        buf.insert_char('b');
        assert_eq!(undo.depth(), 3);
    }

    #[test]
    fn n_undos_restore_empty_buffer() {
        let mut buf = EditBuffer::new();
        let mut undo = UndoEngine::new();
        undo.record_self_insert(&buf);
        buf.insert_char('x');
        undo.record_edit(&buf);
        buf.kill_to_start();
        undo.record_edit(&buf);
        buf.insert_str("yz");
        while undo.undo(&mut buf) {}
        assert_eq!(buf.text(), "");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn dedupe_skips_identical_state() {
        let buf = EditBuffer::from_str("a");
        let mut undo = UndoEngine::new();
        undo.record_edit(&buf);
        undo.record_edit(&buf);
        assert_eq!(undo.depth(), 1);
    }

    #[test]
    fn bounded_depth() {
        let mut buf = EditBuffer::new();
        let mut undo = UndoEngine::new();
        for i in 0..(UNDO_HISTORY_MAX + 20) {
            undo.record_edit(&buf);
            buf.insert_str(&i.to_string());
        }
        assert!(undo.depth() <= UNDO_HISTORY_MAX);
    }
}
