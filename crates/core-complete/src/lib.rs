//! Completion candidates and strategies.
//!
//! The line reader hands this crate a parsed line (tokens plus the word
//! under the cursor) and a set of candidate providers. Providers are
//! failure-isolated: one erroring provider logs and is skipped, the key
//! press still completes from the rest. Candidate order is deterministic —
//! provider order first, then a stable sort by (group, value) — so the same
//! buffer state always lists the same way.

pub mod layout;
pub mod menu;
pub mod quote;

pub use layout::{candidate_rows, ListingLayout};
pub use menu::MenuState;
pub use quote::{replacement_for, requote};

use tracing::warn;

#[derive(Debug, thiserror::Error)]
#[error("completion provider {provider}: {message}")]
pub struct CompletionError {
    pub provider: String,
    pub message: String,
}

impl CompletionError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text inserted into the buffer.
    pub value: String,
    /// Text shown in listings (defaults to `value`).
    pub display: Option<String>,
    /// Listing group; groups render under headers when enabled.
    pub group: Option<String>,
    /// Short annotation shown next to the display text.
    pub description: Option<String>,
    /// True when the candidate is complete — a trailing space is appended.
    /// Directory-style values ending in `/` never get the space.
    pub complete: bool,
}

impl Candidate {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display: None,
            group: None,
            description: None,
            complete: true,
        }
    }

    pub fn display(mut self, d: impl Into<String>) -> Self {
        self.display = Some(d.into());
        self
    }

    pub fn group(mut self, g: impl Into<String>) -> Self {
        self.group = Some(g.into());
        self
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn partial(mut self) -> Self {
        self.complete = false;
        self
    }

    pub fn display_text(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.value)
    }

    pub fn is_directory(&self) -> bool {
        self.value.ends_with('/')
    }
}

/// The word being completed, with its quoting context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordUnderCursor {
    /// Char index where the word starts in the line.
    pub start: usize,
    /// Raw text from `start` to the cursor, quotes and escapes included.
    pub raw: String,
    /// Unquoted value to match candidates against.
    pub value: String,
    /// Opening quote, when the word began with one.
    pub quote: Option<char>,
}

/// A line split into words with the word under the cursor identified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub line: String,
    /// Cursor as a char index.
    pub cursor: usize,
    /// Unquoted words.
    pub words: Vec<String>,
    /// Index into `words` of the word under the cursor.
    pub word_index: usize,
    pub word: WordUnderCursor,
}

/// Split `line` at `cursor` (char index) into words, honoring single and
/// double quotes and backslash escapes.
pub fn parse_line(line: &str, cursor: usize) -> ParsedLine {
    let chars: Vec<char> = line.chars().collect();
    let cursor = cursor.min(chars.len());

    struct Word {
        start: usize,
        raw: String,
        value: String,
        quote: Option<char>,
    }
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<Word> = None;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        let in_word = current.is_some();
        if escaped {
            if let Some(w) = current.as_mut() {
                w.raw.push(c);
                w.value.push(c);
            }
            escaped = false;
            continue;
        }
        match c {
            '\\' if quote != Some('\'') => {
                if !in_word {
                    current = Some(Word {
                        start: i,
                        raw: String::new(),
                        value: String::new(),
                        quote: None,
                    });
                }
                if let Some(w) = current.as_mut() {
                    w.raw.push(c);
                }
                escaped = true;
            }
            '\'' | '"' if quote == Some(c) => {
                quote = None;
                if let Some(w) = current.as_mut() {
                    w.raw.push(c);
                }
            }
            '\'' | '"' if quote.is_none() => {
                if !in_word {
                    current = Some(Word {
                        start: i,
                        raw: String::new(),
                        value: String::new(),
                        quote: Some(c),
                    });
                }
                if let Some(w) = current.as_mut() {
                    w.raw.push(c);
                    if w.raw.len() > 1 && w.quote.is_none() {
                        // Quote opened mid-word; remember it for requoting.
                        w.quote = Some(c);
                    }
                }
                quote = Some(c);
            }
            c if c.is_whitespace() && quote.is_none() => {
                if let Some(w) = current.take() {
                    words.push(w);
                }
            }
            c => {
                if !in_word {
                    current = Some(Word {
                        start: i,
                        raw: String::new(),
                        value: String::new(),
                        quote: None,
                    });
                }
                if let Some(w) = current.as_mut() {
                    w.raw.push(c);
                    w.value.push(c);
                }
            }
        }
    }
    if let Some(w) = current.take() {
        words.push(w);
    }

    // The word under the cursor: the word whose span contains the cursor,
    // else an empty word starting at the cursor.
    let mut word_index = words.len();
    let mut under = WordUnderCursor {
        start: cursor,
        ..Default::default()
    };
    for (wi, w) in words.iter().enumerate() {
        let end = w.start + w.raw.chars().count();
        if cursor >= w.start && cursor <= end {
            let keep: String = w.raw.chars().take(cursor - w.start).collect();
            let (value, quote) = unquote_prefix(&keep);
            under = WordUnderCursor {
                start: w.start,
                raw: keep,
                value,
                quote,
            };
            word_index = wi;
            break;
        }
    }

    ParsedLine {
        line: line.to_string(),
        cursor,
        words: words.into_iter().map(|w| w.value).collect(),
        word_index,
        word: under,
    }
}

/// Strip quoting from a raw word prefix; returns (value, opening quote).
fn unquote_prefix(raw: &str) -> (String, Option<char>) {
    let mut value = String::new();
    let mut quote: Option<char> = None;
    let mut opening: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            value.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if quote != Some('\'') => escaped = true,
            '\'' | '"' if quote == Some(c) => quote = None,
            '\'' | '"' if quote.is_none() => {
                quote = Some(c);
                opening.get_or_insert(c);
            }
            c => value.push(c),
        }
    }
    (value, opening)
}

/// A source of completion candidates.
pub trait CandidateProvider: Send {
    fn name(&self) -> &str {
        "provider"
    }

    fn complete(&self, line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError>;
}

/// Collect, filter, and order candidates from all providers.
///
/// Filtering keeps candidates whose value starts with the word under the
/// cursor (case per `case_insensitive`). A failing provider is logged and
/// skipped.
pub fn gather(
    providers: &[Box<dyn CandidateProvider>],
    parsed: &ParsedLine,
    case_insensitive: bool,
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    for provider in providers {
        match provider.complete(parsed) {
            Ok(candidates) => out.extend(candidates),
            Err(e) => {
                warn!(target: "complete.provider", provider = provider.name(), error = %e, "provider failed; skipped");
            }
        }
    }
    let word = &parsed.word.value;
    out.retain(|c| prefix_matches(&c.value, word, case_insensitive));
    out.sort_by(|a, b| (&a.group, &a.value).cmp(&(&b.group, &b.value)));
    out.dedup_by(|a, b| a.value == b.value);
    out
}

fn prefix_matches(value: &str, prefix: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        value.to_lowercase().starts_with(&prefix.to_lowercase())
    } else {
        value.starts_with(prefix)
    }
}

/// Longest prefix shared by every candidate value.
pub fn common_prefix(candidates: &[Candidate], case_insensitive: bool) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.value.chars().collect();
    for c in &candidates[1..] {
        let value: Vec<char> = c.value.chars().collect();
        let mut keep = 0;
        for (a, b) in prefix.iter().zip(value.iter()) {
            let eq = if case_insensitive {
                a.to_lowercase().eq(b.to_lowercase())
            } else {
                a == b
            };
            if !eq {
                break;
            }
            keep += 1;
        }
        prefix.truncate(keep);
        if prefix.is_empty() {
            break;
        }
    }
    prefix.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<&'static str>);
    impl CandidateProvider for Fixed {
        fn complete(&self, _line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError> {
            Ok(self.0.iter().map(|s| Candidate::new(*s)).collect())
        }
    }

    struct Failing;
    impl CandidateProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn complete(&self, _line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError> {
            Err(CompletionError::new("failing", "boom"))
        }
    }

    #[test]
    fn parse_simple_words() {
        let p = parse_line("git commit -m", 13);
        assert_eq!(p.words, vec!["git", "commit", "-m"]);
        assert_eq!(p.word_index, 2);
        assert_eq!(p.word.value, "-m");
        assert_eq!(p.word.start, 11);
    }

    #[test]
    fn cursor_mid_word_takes_prefix() {
        let p = parse_line("checkout", 3);
        assert_eq!(p.word.value, "che");
        assert_eq!(p.word.raw, "che");
    }

    #[test]
    fn cursor_in_gap_is_empty_word() {
        let p = parse_line("a  b", 2);
        assert_eq!(p.word.value, "");
        assert_eq!(p.word.start, 2);
        assert_eq!(p.word_index, 2);
    }

    #[test]
    fn quoted_word_tracks_opening_quote() {
        let p = parse_line("open \"my fi", 11);
        assert_eq!(p.words, vec!["open", "my fi"]);
        assert_eq!(p.word.value, "my fi");
        assert_eq!(p.word.quote, Some('"'));
        assert_eq!(p.word.start, 5);
    }

    #[test]
    fn backslash_escapes_join_words() {
        let p = parse_line("cat my\\ file", 12);
        assert_eq!(p.words, vec!["cat", "my file"]);
        assert_eq!(p.word.value, "my file");
        assert_eq!(p.word.quote, None);
    }

    #[test]
    fn gather_filters_and_sorts() {
        let providers: Vec<Box<dyn CandidateProvider>> = vec![
            Box::new(Fixed(vec!["commit", "checkout"])),
            Box::new(Fixed(vec!["cherry-pick", "clone", "commit"])),
        ];
        let p = parse_line("c", 1);
        let got = gather(&providers, &p, false);
        let values: Vec<&str> = got.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["checkout", "cherry-pick", "clone", "commit"]);
    }

    #[test]
    fn failing_provider_is_skipped() {
        let providers: Vec<Box<dyn CandidateProvider>> =
            vec![Box::new(Failing), Box::new(Fixed(vec!["ok"]))];
        let p = parse_line("o", 1);
        let got = gather(&providers, &p, false);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, "ok");
    }

    #[test]
    fn case_insensitive_filtering() {
        let providers: Vec<Box<dyn CandidateProvider>> = vec![Box::new(Fixed(vec!["Commit"]))];
        let p = parse_line("co", 2);
        assert!(gather(&providers, &p, false).is_empty());
        assert_eq!(gather(&providers, &p, true).len(), 1);
    }

    #[test]
    fn common_prefix_cases() {
        let cands = [Candidate::new("commit"), Candidate::new("commute")];
        assert_eq!(common_prefix(&cands, false), "comm");
        let mixed = [Candidate::new("COmmit"), Candidate::new("commute")];
        assert_eq!(common_prefix(&mixed, false), "");
        assert_eq!(common_prefix(&mixed, true), "COmm");
        assert_eq!(common_prefix(&[], false), "");
    }

    #[test]
    fn determinism_same_inputs_same_order() {
        let providers: Vec<Box<dyn CandidateProvider>> =
            vec![Box::new(Fixed(vec!["b", "a", "c"]))];
        let p = parse_line("", 0);
        let first = gather(&providers, &p, false);
        let second = gather(&providers, &p, false);
        assert_eq!(first, second);
    }
}
