//! Candidate re-quoting.
//!
//! When the word being completed opened with a quote or used backslash
//! escapes, the inserted candidate must re-parse to the same word. The
//! replacement therefore re-applies the word's quoting style, and complete
//! candidates close their quote before the trailing space.

use crate::{Candidate, WordUnderCursor};

/// Quote `value` in the style signalled by `quote`.
///
/// * `None` — backslash-escape whitespace, quotes, and backslashes.
/// * `Some('"')` — double-quoted body: escape `"` and `\`.
/// * `Some('\'')` — single-quoted body: embedded `'` closes, escapes, reopens.
pub fn requote(value: &str, quote: Option<char>) -> String {
    match quote {
        None => {
            let mut out = String::with_capacity(value.len());
            for c in value.chars() {
                if c.is_whitespace() || c == '\'' || c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
        Some('"') => {
            let mut out = String::from("\"");
            for c in value.chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        }
        Some('\'') => {
            let mut out = String::from("'");
            for c in value.chars() {
                if c == '\'' {
                    out.push_str("'\\''");
                } else {
                    out.push(c);
                }
            }
            out
        }
        Some(other) => {
            let mut out = String::new();
            out.push(other);
            out.push_str(value);
            out
        }
    }
}

/// Full replacement text for the word span plus whether to append a space.
///
/// Directories keep the path separator and never take the space; partial
/// candidates (`complete == false`) also suppress it and leave quotes open.
pub fn replacement_for(word: &WordUnderCursor, candidate: &Candidate) -> (String, bool) {
    let mut text = requote(&candidate.value, word.quote);
    let append_space = candidate.complete && !candidate.is_directory();
    if append_space
        && let Some(q) = word.quote
    {
        text.push(q);
    }
    (text, append_space)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_line;

    #[test]
    fn unquoted_escapes_spaces() {
        assert_eq!(requote("my file", None), "my\\ file");
        assert_eq!(requote("plain", None), "plain");
        assert_eq!(requote("a\"b", None), "a\\\"b");
    }

    #[test]
    fn double_quoted_body() {
        assert_eq!(requote("my file", Some('"')), "\"my file");
        assert_eq!(requote("say \"hi\"", Some('"')), "\"say \\\"hi\\\"");
    }

    #[test]
    fn single_quoted_body() {
        assert_eq!(requote("don't", Some('\'')), "'don'\\''t");
    }

    #[test]
    fn complete_candidate_closes_quote_and_spaces() {
        let p = parse_line("open \"my", 8);
        let (text, space) = replacement_for(&p.word, &Candidate::new("my file.txt"));
        assert_eq!(text, "\"my file.txt\"");
        assert!(space);
    }

    #[test]
    fn directory_keeps_quote_open() {
        let p = parse_line("ls \"src", 7);
        let (text, space) = replacement_for(&p.word, &Candidate::new("src dir/"));
        assert_eq!(text, "\"src dir/");
        assert!(!space);
    }

    #[test]
    fn reparse_yields_same_word() {
        // The round-trip contract: inserting the replacement and re-parsing
        // gives back the candidate value as the word.
        let p = parse_line("cat my", 6);
        let cand = Candidate::new("my notes.txt");
        let (text, _) = replacement_for(&p.word, &cand);
        let line = format!("cat {text}");
        let reparsed = parse_line(&line, line.chars().count());
        assert_eq!(reparsed.words[1], "my notes.txt");
    }
}
