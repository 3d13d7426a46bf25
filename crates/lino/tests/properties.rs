//! Loop-level properties and persistence round-trips.

use lino::{LineReader, MemoryProvider, ReaderOptions};
use proptest::prelude::*;

fn read_back(script: String) -> String {
    let mut provider = MemoryProvider::new();
    provider.feed_str(&script);
    provider.feed(b"\r");
    provider.close_input();
    let mut reader = LineReader::with_provider(Box::new(provider), ReaderOptions::default());
    reader.read_line("> ").unwrap()
}

proptest! {
    /// Whatever printable text is typed comes back verbatim, independent of
    /// how rendering wrapped it.
    #[test]
    fn typed_text_round_trips(text in "[a-zA-Z0-9 .,;_/-]{0,120}") {
        prop_assert_eq!(read_back(text.clone()), text);
    }

    /// Backspaces applied at the end behave like truncation.
    #[test]
    fn trailing_backspaces_truncate(text in "[a-z]{0,20}", n in 0usize..25) {
        let mut script = text.clone();
        for _ in 0..n {
            script.push('\x7f');
        }
        let expected: String = {
            let keep = text.chars().count().saturating_sub(n);
            text.chars().take(keep).collect()
        };
        prop_assert_eq!(read_back(script), expected);
    }
}

#[test]
fn history_persists_across_readers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");

    let mut provider = MemoryProvider::new();
    provider.feed_str("first line\r");
    provider.close_input();
    let mut writer = LineReader::with_provider(Box::new(provider), ReaderOptions::default());
    writer.read_line("> ").unwrap();
    writer.save_history(&path).unwrap();

    let mut opts = ReaderOptions::default();
    opts.history_timestamped = false;
    let mut reader =
        LineReader::with_provider(Box::new(MemoryProvider::new()), opts);
    let outcome = reader.load_history(&path).unwrap();
    assert_eq!(outcome.loaded, 1);
    assert!(outcome.skipped.is_empty());
    assert_eq!(reader.history().get(0).unwrap().text, "first line");
}

#[test]
fn non_interactive_expansion_surfaces_typed_error() {
    let mut reader =
        LineReader::with_provider(Box::new(MemoryProvider::new()), ReaderOptions::default());
    reader.history_mut().add("make check");
    assert_eq!(reader.expand("sudo !!").unwrap(), "sudo make check");
    assert!(matches!(
        reader.expand("!nope"),
        Err(lino::ReadError::EventExpansion(_))
    ));
}
