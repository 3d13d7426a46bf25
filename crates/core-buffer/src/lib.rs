//! Editable line buffer.
//!
//! A mutable sequence of Unicode scalar values plus a cursor in `[0, len]`.
//! The cursor only ever rests on grapheme-cluster boundaries: motion and
//! deletion operate on whole clusters so a combining sequence is never
//! split. All operations are O(len), which is the right trade for a line
//! editor — buffers are one logical line.

pub mod kill;
pub mod undo;
pub mod word;

pub use kill::{KillDirection, KillRing, KILL_RING_MAX};
pub use undo::{Snapshot, UndoEngine, INSERT_COALESCE_IDLE, UNDO_HISTORY_MAX};

use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    chars: Vec<char>,
    cursor: usize,
    overtype: bool,
    /// (start, len) of the last yank, while yank-pop is still legal.
    last_yank: Option<(usize, usize)>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        let cursor = chars.len();
        Self {
            chars,
            cursor,
            overtype: false,
            last_yank: None,
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn overtype(&self) -> bool {
        self.overtype
    }

    pub fn toggle_overtype(&mut self) {
        self.overtype = !self.overtype;
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.last_yank = None;
    }

    /// Replace the whole contents (history recall, undo restore).
    pub fn restore(&mut self, chars: Vec<char>, cursor: usize) {
        self.cursor = cursor.min(chars.len());
        self.chars = chars;
        self.last_yank = None;
    }

    pub fn set_text(&mut self, s: &str) {
        self.chars = s.chars().collect();
        self.cursor = self.chars.len();
        self.last_yank = None;
    }

    /// Clamp to the nearest grapheme boundary at or before `pos`.
    pub fn set_cursor(&mut self, pos: usize) {
        let pos = pos.min(self.chars.len());
        let bs = self.boundaries();
        self.cursor = bs
            .iter()
            .copied()
            .take_while(|&b| b <= pos)
            .last()
            .unwrap_or(0);
    }

    /// Grapheme boundaries as char indices, always including 0 and len.
    fn boundaries(&self) -> Vec<usize> {
        let s: String = self.chars.iter().collect();
        let mut out = Vec::with_capacity(self.chars.len() + 1);
        let mut char_idx = 0;
        for (_, g) in s.grapheme_indices(true) {
            out.push(char_idx);
            char_idx += g.chars().count();
        }
        out.push(self.chars.len());
        out.dedup();
        out
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.boundaries()
            .into_iter()
            .take_while(|&b| b < self.cursor)
            .last()
    }

    fn next_boundary(&self) -> Option<usize> {
        self.boundaries().into_iter().find(|&b| b > self.cursor)
    }

    // --- motion ---------------------------------------------------------

    pub fn move_left(&mut self) -> bool {
        match self.prev_boundary() {
            Some(b) => {
                self.cursor = b;
                true
            }
            None => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        match self.next_boundary() {
            Some(b) => {
                self.cursor = b;
                true
            }
            None => false,
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn move_first_non_blank(&mut self) {
        self.cursor = self
            .chars
            .iter()
            .position(|c| !c.is_whitespace())
            .unwrap_or(0);
    }

    pub fn move_word_left(&mut self) -> bool {
        let target = word::prev_word_start(&self.chars, self.cursor);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    pub fn move_word_right(&mut self) -> bool {
        let target = word::next_word_end(&self.chars, self.cursor);
        let moved = target != self.cursor;
        self.cursor = target;
        moved
    }

    /// Vi `e`: land on the last character of the current or next word.
    pub fn move_word_end(&mut self) -> bool {
        let from = (self.cursor + 1).min(self.chars.len());
        let end = word::next_word_end(&self.chars, from);
        if end == 0 || end.saturating_sub(1) == self.cursor {
            return false;
        }
        self.cursor = end - 1;
        true
    }

    // --- insertion ------------------------------------------------------

    /// Insert (or replace, in overtype) one codepoint at the cursor.
    pub fn insert_char(&mut self, ch: char) {
        if self.overtype && self.cursor < self.chars.len() {
            self.delete_forward();
        }
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
        self.last_yank = None;
    }

    /// Insert text verbatim at the cursor (paste, yank, macro playback).
    pub fn insert_str(&mut self, s: &str) {
        for (i, ch) in s.chars().enumerate() {
            self.chars.insert(self.cursor + i, ch);
        }
        self.cursor += s.chars().count();
        self.last_yank = None;
    }

    // --- deletion -------------------------------------------------------

    /// Delete the grapheme before the cursor.
    pub fn delete_backward(&mut self) -> Option<String> {
        let start = self.prev_boundary()?;
        let removed: String = self.chars.drain(start..self.cursor).collect();
        self.cursor = start;
        self.last_yank = None;
        Some(removed)
    }

    /// Delete the grapheme under the cursor.
    pub fn delete_forward(&mut self) -> Option<String> {
        let end = self.next_boundary()?;
        let removed: String = self.chars.drain(self.cursor..end).collect();
        self.last_yank = None;
        Some(removed)
    }

    pub fn kill_to_end(&mut self) -> Option<String> {
        if self.cursor == self.chars.len() {
            return None;
        }
        let removed: String = self.chars.drain(self.cursor..).collect();
        self.last_yank = None;
        Some(removed)
    }

    pub fn kill_to_start(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        let removed: String = self.chars.drain(..self.cursor).collect();
        self.cursor = 0;
        self.last_yank = None;
        Some(removed)
    }

    pub fn kill_whole_line(&mut self) -> Option<String> {
        if self.chars.is_empty() {
            return None;
        }
        let removed: String = self.chars.drain(..).collect();
        self.cursor = 0;
        self.last_yank = None;
        Some(removed)
    }

    pub fn kill_word_forward(&mut self) -> Option<String> {
        let end = word::next_word_end(&self.chars, self.cursor);
        if end == self.cursor {
            return None;
        }
        let removed: String = self.chars.drain(self.cursor..end).collect();
        self.last_yank = None;
        Some(removed)
    }

    pub fn kill_word_backward(&mut self) -> Option<String> {
        let start = word::prev_word_start(&self.chars, self.cursor);
        if start == self.cursor {
            return None;
        }
        let removed: String = self.chars.drain(start..self.cursor).collect();
        self.cursor = start;
        self.last_yank = None;
        Some(removed)
    }

    // --- transforms -----------------------------------------------------

    /// Swap the graphemes around the cursor and advance (readline `C-t`:
    /// at end of line the last two swap in place).
    pub fn transpose_chars(&mut self) -> bool {
        let bs = self.boundaries();
        let Some(i) = bs.iter().position(|&b| b == self.cursor) else {
            return false;
        };
        let (a, b) = if self.cursor == self.chars.len() {
            if bs.len() < 3 {
                return false;
            }
            (bs.len() - 3, bs.len() - 2)
        } else {
            if i == 0 {
                return false;
            }
            (i - 1, i)
        };
        let first: Vec<char> = self.chars[bs[a]..bs[b]].to_vec();
        let second: Vec<char> = self.chars[bs[b]..bs[b + 1]].to_vec();
        let mut rebuilt = Vec::with_capacity(self.chars.len());
        rebuilt.extend_from_slice(&self.chars[..bs[a]]);
        rebuilt.extend_from_slice(&second);
        rebuilt.extend_from_slice(&first);
        rebuilt.extend_from_slice(&self.chars[bs[b + 1]..]);
        self.chars = rebuilt;
        self.cursor = bs[b + 1].max(self.cursor);
        self.last_yank = None;
        true
    }

    /// Drag the word before the cursor past the word after it.
    pub fn transpose_words(&mut self) -> bool {
        let Some((s2, e2)) = word::word_at(&self.chars, self.cursor).or_else(|| {
            let end = word::next_word_end(&self.chars, self.cursor);
            word::word_at(&self.chars, end)
        }) else {
            return false;
        };
        let Some((s1, e1)) = word::word_at(&self.chars, word::prev_word_start(&self.chars, s2))
        else {
            return false;
        };
        if (s1, e1) == (s2, e2) {
            return false;
        }
        let w1: Vec<char> = self.chars[s1..e1].to_vec();
        let w2: Vec<char> = self.chars[s2..e2].to_vec();
        let mut rebuilt = Vec::with_capacity(self.chars.len());
        rebuilt.extend_from_slice(&self.chars[..s1]);
        rebuilt.extend_from_slice(&w2);
        rebuilt.extend_from_slice(&self.chars[e1..s2]);
        rebuilt.extend_from_slice(&w1);
        rebuilt.extend_from_slice(&self.chars[e2..]);
        self.chars = rebuilt;
        self.cursor = e2;
        self.last_yank = None;
        true
    }

    fn map_word<F: FnMut(char) -> String>(&mut self, mut f: F) -> bool {
        let end = word::next_word_end(&self.chars, self.cursor);
        if end == self.cursor {
            return false;
        }
        let transformed: String = self.chars[self.cursor..end]
            .iter()
            .map(|&c| f(c))
            .collect();
        let tail: Vec<char> = self.chars.split_off(end);
        self.chars.truncate(self.cursor);
        self.chars.extend(transformed.chars());
        self.cursor = self.chars.len();
        self.chars.extend(tail);
        self.last_yank = None;
        true
    }

    pub fn upcase_word(&mut self) -> bool {
        self.map_word(|c| c.to_uppercase().collect())
    }

    pub fn downcase_word(&mut self) -> bool {
        self.map_word(|c| c.to_lowercase().collect())
    }

    pub fn capitalize_word(&mut self) -> bool {
        let mut seen_word_char = false;
        self.map_word(|c| {
            if word::is_word_char(c) && !seen_word_char {
                seen_word_char = true;
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            }
        })
    }

    /// Vi `~`: toggle the case of the character under the cursor, advance.
    pub fn toggle_case(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        let c = self.chars[self.cursor];
        let flipped: String = if c.is_uppercase() {
            c.to_lowercase().collect()
        } else {
            c.to_uppercase().collect()
        };
        self.chars.splice(
            self.cursor..self.cursor + 1,
            flipped.chars().collect::<Vec<_>>(),
        );
        self.cursor = (self.cursor + flipped.chars().count()).min(self.chars.len());
        self.last_yank = None;
        true
    }

    // --- yank -----------------------------------------------------------

    /// Insert killed text and remember the region for yank-pop.
    pub fn yank(&mut self, text: &str) {
        let start = self.cursor;
        self.insert_str(text);
        self.last_yank = Some((start, text.chars().count()));
    }

    /// Replace the last yank with a rotated entry; false when no yank is
    /// pending (yank-pop is only legal right after yank / yank-pop).
    pub fn yank_pop(&mut self, text: &str) -> bool {
        let Some((start, len)) = self.last_yank else {
            return false;
        };
        self.chars.drain(start..start + len);
        self.cursor = start;
        self.insert_str(text);
        self.last_yank = Some((start, text.chars().count()));
        true
    }

    pub fn yank_pending(&self) -> bool {
        self.last_yank.is_some()
    }

    /// Any non-yank operation invalidates yank-pop.
    pub fn clear_yank_state(&mut self) {
        self.last_yank = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn insert_and_motion() {
        let mut b = EditBuffer::new();
        b.insert_str("hello");
        assert_eq!(b.cursor(), 5);
        assert!(b.move_left());
        assert!(b.move_left());
        b.insert_char('X');
        assert_eq!(b.text(), "helXlo");
        assert_eq!(b.cursor(), 4);
    }

    #[test]
    fn motion_respects_grapheme_clusters() {
        let mut b = EditBuffer::from_str("ae\u{0301}z"); // a, e+combining acute, z
        assert_eq!(b.cursor(), 4);
        assert!(b.move_left()); // before z
        assert_eq!(b.cursor(), 3);
        assert!(b.move_left()); // before e+́ as one unit
        assert_eq!(b.cursor(), 1);
        assert!(b.move_left());
        assert_eq!(b.cursor(), 0);
        assert!(!b.move_left());
    }

    #[test]
    fn backspace_removes_whole_cluster() {
        let mut b = EditBuffer::from_str("xe\u{0301}");
        assert_eq!(b.delete_backward().as_deref(), Some("e\u{0301}"));
        assert_eq!(b.text(), "x");
    }

    #[test]
    fn overtype_replaces() {
        let mut b = EditBuffer::from_str("abc");
        b.set_cursor(1);
        b.toggle_overtype();
        b.insert_char('X');
        assert_eq!(b.text(), "aXc");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn kill_ops_return_killed_text() {
        let mut b = EditBuffer::from_str("one two three");
        b.set_cursor(4);
        assert_eq!(b.kill_to_end().as_deref(), Some("two three"));
        assert_eq!(b.text(), "one ");
        assert_eq!(b.kill_to_start().as_deref(), Some("one "));
        assert_eq!(b.text(), "");
    }

    #[test]
    fn word_kills() {
        let mut b = EditBuffer::from_str("alpha beta");
        b.set_cursor(5);
        assert_eq!(b.kill_word_backward().as_deref(), Some("alpha"));
        assert_eq!(b.text(), " beta");
        assert_eq!(b.kill_word_forward().as_deref(), Some(" beta"));
        assert_eq!(b.text(), "");
    }

    #[test]
    fn transpose_middle_and_end() {
        let mut b = EditBuffer::from_str("abcd");
        b.set_cursor(2);
        assert!(b.transpose_chars());
        assert_eq!(b.text(), "acbd");
        assert_eq!(b.cursor(), 3);

        let mut e = EditBuffer::from_str("ab");
        assert!(e.transpose_chars());
        assert_eq!(e.text(), "ba");
        assert_eq!(e.cursor(), 2);
    }

    #[test]
    fn transpose_words_swaps_neighbors() {
        let mut b = EditBuffer::from_str("one two");
        b.set_cursor(4);
        assert!(b.transpose_words());
        assert_eq!(b.text(), "two one");
        assert_eq!(b.cursor(), 7);
    }

    #[test]
    fn case_ops() {
        let mut b = EditBuffer::from_str("heLLo world");
        b.set_cursor(0);
        assert!(b.capitalize_word());
        assert_eq!(b.text(), "Hello world");
        assert_eq!(b.cursor(), 5);
        assert!(b.upcase_word());
        assert_eq!(b.text(), "Hello WORLD");
    }

    #[test]
    fn vi_toggle_case_advances() {
        let mut b = EditBuffer::from_str("aB");
        b.set_cursor(0);
        assert!(b.toggle_case());
        assert!(b.toggle_case());
        assert_eq!(b.text(), "Ab");
        assert!(!b.toggle_case());
    }

    #[test]
    fn yank_then_pop_replaces_region() {
        let mut b = EditBuffer::from_str("x ");
        b.yank("AAA");
        assert_eq!(b.text(), "x AAA");
        assert!(b.yank_pop("BB"));
        assert_eq!(b.text(), "x BB");
        assert_eq!(b.cursor(), 4);
        b.clear_yank_state();
        assert!(!b.yank_pop("C"));
    }

    #[test]
    fn first_non_blank() {
        let mut b = EditBuffer::from_str("   hi");
        b.move_first_non_blank();
        assert_eq!(b.cursor(), 3);
    }

    #[test]
    fn word_end_motion() {
        let mut b = EditBuffer::from_str("ab cd");
        b.set_cursor(0);
        assert!(b.move_word_end());
        assert_eq!(b.cursor(), 1);
        assert!(b.move_word_end());
        assert_eq!(b.cursor(), 4);
        assert!(!b.move_word_end());
    }

    proptest! {
        /// Inserts plus backspaces applied through the buffer equal the
        /// same operations applied to a plain model, regardless of motion.
        #[test]
        fn matches_plain_model(ops in proptest::collection::vec(0u8..5, 0..60)) {
            let mut buf = EditBuffer::new();
            let mut model: Vec<char> = Vec::new();
            let mut model_cursor = 0usize;
            for op in ops {
                match op {
                    0..=1 => {
                        let ch = (b'a' + op) as char;
                        buf.insert_char(ch);
                        model.insert(model_cursor, ch);
                        model_cursor += 1;
                    }
                    2 => {
                        buf.delete_backward();
                        if model_cursor > 0 {
                            model.remove(model_cursor - 1);
                            model_cursor -= 1;
                        }
                    }
                    3 => {
                        buf.move_left();
                        model_cursor = model_cursor.saturating_sub(1);
                    }
                    _ => {
                        buf.move_right();
                        model_cursor = (model_cursor + 1).min(model.len());
                    }
                }
                prop_assert_eq!(buf.text(), model.iter().collect::<String>());
                prop_assert_eq!(buf.cursor(), model_cursor);
            }
        }
    }
}
