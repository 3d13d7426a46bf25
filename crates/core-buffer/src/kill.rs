//! Bounded rotating kill ring.
//!
//! Consecutive kills merge into the head entry so `C-w C-w C-y` yanks both
//! words back; the merge direction matches the kill direction. Rotation is
//! driven by yank-pop and resets whenever a new kill arrives.

use std::collections::VecDeque;
use tracing::trace;

pub const KILL_RING_MAX: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillDirection {
    /// Killed text was in front of the cursor (C-k, M-d).
    Forward,
    /// Killed text was behind the cursor (C-u, M-DEL).
    Backward,
}

#[derive(Debug, Default)]
pub struct KillRing {
    entries: VecDeque<String>,
    index: usize,
    last_was_kill: bool,
}

impl KillRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a killed region; consecutive kills extend the head entry.
    pub fn push(&mut self, text: String, direction: KillDirection) {
        if text.is_empty() {
            return;
        }
        if self.last_was_kill
            && let Some(head) = self.entries.front_mut()
        {
            match direction {
                KillDirection::Forward => head.push_str(&text),
                KillDirection::Backward => head.insert_str(0, &text),
            }
        } else {
            self.entries.push_front(text);
            self.entries.truncate(KILL_RING_MAX);
        }
        self.index = 0;
        self.last_was_kill = true;
        trace!(target: "buffer.kill", entries = self.entries.len(), "kill recorded");
    }

    /// Any non-kill operation breaks the merge chain.
    pub fn note_other_op(&mut self) {
        self.last_was_kill = false;
    }

    /// The entry yank inserts (head unless rotated).
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.index).map(String::as_str)
    }

    /// Advance to the next older entry, wrapping (yank-pop).
    pub fn rotate(&mut self) {
        if !self.entries.is_empty() {
            self.index = (self.index + 1) % self.entries.len();
        }
    }

    pub fn reset_rotation(&mut self) {
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
