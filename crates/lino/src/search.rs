//! Incremental history search state.
//!
//! Owned by the read loop; the history store only supplies the directional
//! primitives. The buffer snapshot taken on entry is restored when the
//! search aborts, and kept when it exits by accept or another editing key.

use core_history::{History, SearchMode};

#[derive(Debug, Clone)]
pub struct SearchState {
    pub backward: bool,
    pub pattern: String,
    /// Index of the current match, when the pattern has matched.
    pub matched: Option<usize>,
    /// True after a search step found nothing.
    pub failed: bool,
    /// (text, cursor) to restore on abort.
    pub saved: (String, usize),
}

impl SearchState {
    pub fn new(backward: bool, saved_text: String, saved_cursor: usize) -> Self {
        Self {
            backward,
            pattern: String::new(),
            matched: None,
            failed: false,
            saved: (saved_text, saved_cursor),
        }
    }

    /// The status line rendered as the prompt while searching.
    pub fn prompt(&self) -> String {
        let dir = if self.backward {
            "reverse-i-search"
        } else {
            "i-search"
        };
        if self.failed {
            format!("(failed {dir})`{}': ", self.pattern)
        } else {
            format!("({dir})`{}': ", self.pattern)
        }
    }

    /// Re-run the search after the pattern grew. Starts from the current
    /// match so the highlighted entry is kept when it still matches.
    pub fn extend(&mut self, history: &History) -> bool {
        let from = self
            .matched
            .unwrap_or_else(|| history.len().saturating_sub(1));
        self.run(history, from)
    }

    /// Re-run from scratch (pattern shrank).
    pub fn rescan(&mut self, history: &History) -> bool {
        let from = if self.backward {
            history.len().saturating_sub(1)
        } else {
            0
        };
        self.run(history, from)
    }

    /// Step to the next match in `backward` direction (repeat key).
    pub fn step(&mut self, backward: bool, history: &History) -> bool {
        self.backward = backward;
        let Some(current) = self.matched else {
            return self.rescan(history);
        };
        let found = if backward {
            match current.checked_sub(1) {
                Some(from) => history.search_backward(&self.pattern, from, SearchMode::Contains),
                None => None,
            }
        } else {
            history.search_forward(&self.pattern, current + 1, SearchMode::Contains)
        };
        self.apply(found)
    }

    fn run(&mut self, history: &History, from: usize) -> bool {
        if self.pattern.is_empty() {
            self.failed = false;
            return true;
        }
        let found = if self.backward {
            history.search_backward(&self.pattern, from, SearchMode::Contains)
        } else {
            history.search_forward(&self.pattern, from, SearchMode::Contains)
        };
        self.apply(found)
    }

    fn apply(&mut self, found: Option<usize>) -> bool {
        match found {
            Some(idx) => {
                self.matched = Some(idx);
                self.failed = false;
                true
            }
            None => {
                self.failed = true;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> History {
        let mut h = History::new();
        for t in ["alpha", "beta", "gamma"] {
            h.add(t);
        }
        h
    }

    #[test]
    fn backward_search_finds_newest_containing() {
        let h = seeded();
        let mut s = SearchState::new(true, String::new(), 0);
        s.pattern.push('a');
        assert!(s.extend(&h));
        assert_eq!(s.matched, Some(2)); // gamma
    }

    #[test]
    fn extend_narrows_from_current_match() {
        let h = seeded();
        let mut s = SearchState::new(true, String::new(), 0);
        s.pattern.push('a');
        s.extend(&h);
        s.pattern.push('l');
        assert!(s.extend(&h));
        assert_eq!(s.matched, Some(0)); // alpha (contains "al")
    }

    #[test]
    fn step_walks_older_matches() {
        let h = seeded();
        let mut s = SearchState::new(true, String::new(), 0);
        s.pattern.push('a');
        s.extend(&h);
        assert!(s.step(true, &h));
        assert_eq!(s.matched, Some(1)); // beta
        assert!(s.step(true, &h));
        assert_eq!(s.matched, Some(0)); // alpha
        assert!(!s.step(true, &h));
        assert!(s.failed);
    }

    #[test]
    fn prompt_reflects_state() {
        let mut s = SearchState::new(true, String::new(), 0);
        s.pattern.push_str("ab");
        assert_eq!(s.prompt(), "(reverse-i-search)`ab': ");
        s.failed = true;
        assert!(s.prompt().starts_with("(failed reverse-i-search)"));
    }
}
