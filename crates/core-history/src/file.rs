//! History persistence.
//!
//! One entry per logical line. Embedded newlines are encoded `\n`, literal
//! backslashes `\\`. A line `#<epoch-seconds>` timestamps the entry that
//! follows it; other `#` lines are skipped with a warning. Malformed entries
//! are skipped and surfaced in the load outcome without dropping the rest of
//! the file. Saves are never partial: contents go to a temp file in the same
//! directory, are fsynced, and renamed into place.

use crate::{History, HistoryEntry};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O: {0}")]
    Io(#[from] io::Error),
    #[error("history format at line {line}: {message}")]
    Format { line: usize, message: String },
}

/// One skipped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFormatIssue {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub loaded: usize,
    pub skipped: Vec<HistoryFormatIssue>,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(line: &str) -> Result<String, String> {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some(other) => return Err(format!("invalid escape \\{other}")),
            None => return Err("dangling backslash".to_string()),
        }
    }
    Ok(out)
}

/// Write the whole history to `path` atomically.
pub fn save(history: &History, path: &Path, timestamped: bool) -> Result<(), HistoryError> {
    let mut body = String::new();
    for entry in history.iter() {
        if timestamped
            && let Some(ts) = entry.timestamp
            && let Ok(epoch) = ts.duration_since(UNIX_EPOCH)
        {
            body.push('#');
            body.push_str(&epoch.as_secs().to_string());
            body.push('\n');
        }
        body.push_str(&escape(&entry.text));
        body.push('\n');
    }

    let tmp = path.with_file_name(format!(
        "{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history".to_string()),
        std::process::id()
    ));
    {
        let mut f = File::create(&tmp)?;
        f.write_all(body.as_bytes())?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    debug!(target: "history.file", entries = history.len(), path = %path.display(), "history saved");
    Ok(())
}

/// Load entries from `path`, appending to `history`.
///
/// Malformed lines are skipped and reported in the outcome; only I/O
/// failures abort the load.
pub fn load(history: &mut History, path: &Path) -> Result<LoadOutcome, HistoryError> {
    let content = fs::read_to_string(path)?;
    Ok(load_str(history, &content))
}

pub fn load_str(history: &mut History, content: &str) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    let mut pending_timestamp: Option<SystemTime> = None;
    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        if let Some(rest) = line.strip_prefix('#') {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                let secs: u64 = rest.parse().unwrap_or(0);
                pending_timestamp = Some(UNIX_EPOCH + Duration::from_secs(secs));
            } else {
                warn!(target: "history.file", line = lineno, "unknown directive skipped");
                outcome.skipped.push(HistoryFormatIssue {
                    line: lineno,
                    message: format!("unknown directive {line:?}"),
                });
                pending_timestamp = None;
            }
            continue;
        }
        match unescape(line) {
            Ok(text) => {
                history.add_with_timestamp(&text, pending_timestamp.take());
                outcome.loaded += 1;
            }
            Err(message) => {
                warn!(target: "history.file", line = lineno, message, "entry skipped");
                outcome.skipped.push(HistoryFormatIssue {
                    line: lineno,
                    message,
                });
                pending_timestamp = None;
            }
        }
    }
    debug!(
        target: "history.file",
        loaded = outcome.loaded,
        skipped = outcome.skipped.len(),
        "history loaded"
    );
    outcome
}

/// Render the history in file format (what `save` would write).
pub fn render(history: &History, timestamped: bool) -> String {
    let mut body = String::new();
    for entry in history.iter() {
        render_entry(&mut body, entry, timestamped);
    }
    body
}

fn render_entry(body: &mut String, entry: &HistoryEntry, timestamped: bool) {
    if timestamped
        && let Some(ts) = entry.timestamp
        && let Ok(epoch) = ts.duration_since(UNIX_EPOCH)
    {
        body.push('#');
        body.push_str(&epoch.as_secs().to_string());
        body.push('\n');
    }
    body.push_str(&escape(&entry.text));
    body.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::History;

    #[test]
    fn escape_round_trip() {
        for text in ["plain", "two\nlines", "back\\slash", "\\n literal", ""] {
            assert_eq!(unescape(&escape(text)).unwrap(), text);
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new();
        h.add("echo one");
        h.add("printf 'a\nb'");
        save(&h, &path, false).unwrap();

        let mut loaded = History::new();
        let outcome = load(&mut loaded, &path).unwrap();
        assert_eq!(outcome.loaded, 2);
        assert!(outcome.skipped.is_empty());
        assert_eq!(loaded.get(1).unwrap().text, "printf 'a\nb'");
    }

    #[test]
    fn timestamps_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut h = History::new();
        h.add_with_timestamp("dated", Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000)));
        h.add("undated");
        save(&h, &path, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "#1700000000\ndated\nundated\n");

        let mut loaded = History::new();
        load(&mut loaded, &path).unwrap();
        assert_eq!(render(&loaded, true), content);
    }

    #[test]
    fn file_round_trips_through_load_save() {
        let src = "#1700000000\nfirst\nsecond \\n escaped\nthird\n";
        let mut h = History::new();
        let outcome = load_str(&mut h, src);
        assert!(outcome.skipped.is_empty());
        assert_eq!(render(&h, true), src);
    }

    #[test]
    fn unknown_directive_and_bad_escape_are_skipped() {
        let src = "#not-a-timestamp\nok\nbad\\q\nalso ok\n";
        let mut h = History::new();
        let outcome = load_str(&mut h, src);
        assert_eq!(outcome.loaded, 2);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].line, 1);
        assert_eq!(outcome.skipped[1].line, 3);
        assert_eq!(h.get(0).unwrap().text, "ok");
        assert_eq!(h.get(1).unwrap().text, "also ok");
    }

    #[test]
    fn save_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, "old contents\n").unwrap();
        let mut h = History::new();
        h.add("new");
        save(&h, &path, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        // No temp file left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
