//! Word boundary helpers.
//!
//! A word is a maximal run of alphanumeric codepoints; boundaries are the
//! transitions between alphanumeric and everything else.

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Start index of the word ending at or before `from` (emacs `M-b`).
pub fn prev_word_start(chars: &[char], from: usize) -> usize {
    let mut i = from.min(chars.len());
    while i > 0 && !is_word_char(chars[i - 1]) {
        i -= 1;
    }
    while i > 0 && is_word_char(chars[i - 1]) {
        i -= 1;
    }
    i
}

/// Index just past the word starting at or after `from` (emacs `M-f`).
pub fn next_word_end(chars: &[char], from: usize) -> usize {
    let mut i = from.min(chars.len());
    while i < chars.len() && !is_word_char(chars[i]) {
        i += 1;
    }
    while i < chars.len() && is_word_char(chars[i]) {
        i += 1;
    }
    i
}

/// Range of the word that `at` falls in, if any.
pub fn word_at(chars: &[char], at: usize) -> Option<(usize, usize)> {
    let at = at.min(chars.len());
    let probe = if at < chars.len() && is_word_char(chars[at]) {
        at
    } else if at > 0 && is_word_char(chars[at - 1]) {
        at - 1
    } else {
        return None;
    };
    let mut start = probe;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = probe + 1;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    Some((start, end))
}
