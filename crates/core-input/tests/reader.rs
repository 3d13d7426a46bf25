//! Binding-reader integration: scripted bytes through the standard maps.

use core_input::{BindingReader, InputEvent, ReaderConfig};
use core_keymap::{defaults, Operation};
use core_terminal::MemoryProvider;
use std::time::Duration;

fn reader() -> BindingReader {
    BindingReader::new(ReaderConfig::default())
}

fn drain(
    r: &mut BindingReader,
    p: &mut MemoryProvider,
    map: &core_keymap::KeyMap,
) -> Vec<InputEvent> {
    let mut out = Vec::new();
    loop {
        match r.next_event(p, map, None).unwrap() {
            InputEvent::Eof => break,
            ev => out.push(ev),
        }
    }
    out
}

#[test]
fn plain_typing_resolves_to_inserts_and_accept() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_str("hi\r");
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Insert('h'),
            InputEvent::Insert('i'),
            InputEvent::Op(Operation::AcceptLine, b"\r".to_vec()),
        ]
    );
}

#[test]
fn csi_sequence_resolves_in_order() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_str("\x1b[A\x1b[D");
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Op(Operation::PreviousHistory, b"\x1b[A".to_vec()),
            InputEvent::Op(Operation::BackwardChar, b"\x1b[D".to_vec()),
        ]
    );
}

#[test]
fn escape_timeout_falls_back_in_vi_insert() {
    let map = defaults::vi_insert();
    let mut p = MemoryProvider::new();
    p.feed_str("\x1b");
    p.feed_gap(); // the user stopped typing: escape timeout fires
    p.feed_str("x");
    let mut r = reader();
    assert_eq!(
        r.next_event(&mut p, &map, None).unwrap(),
        InputEvent::Op(Operation::ViCommandMode, b"\x1b".to_vec())
    );
    // The byte after the pause resolves in vi-command: 'x' deletes.
    let cmd = defaults::vi_command();
    assert_eq!(
        r.next_event(&mut p, &cmd, None).unwrap(),
        InputEvent::Op(Operation::DeleteChar, b"x".to_vec())
    );
}

#[test]
fn missing_sequence_requeues_tail() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    // ESC q: no binding, ESC-node fallback is noop, then 'q' self-inserts.
    p.feed_str("\x1bq");
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Op(Operation::Noop, b"\x1b".to_vec()),
            InputEvent::Insert('q'),
        ]
    );
}

#[test]
fn utf8_scalar_is_assembled() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed("é日".as_bytes());
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![InputEvent::Insert('é'), InputEvent::Insert('日')]
    );
}

#[test]
fn invalid_utf8_becomes_replacement_char() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed(&[0xff, b'a', 0xc3, b'x']); // bad lead; then truncated two-byte scalar
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Insert('\u{FFFD}'),
            InputEvent::Insert('a'),
            InputEvent::Insert('\u{FFFD}'),
            InputEvent::Insert('x'),
        ]
    );
}

#[test]
fn macro_playback_precedes_terminal_bytes() {
    let mut map = defaults::emacs();
    map.bind_macro(&[0x07], b"ok"); // C-g plays back "ok"
    let mut p = MemoryProvider::new();
    p.feed_str("\x07z");
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Insert('o'),
            InputEvent::Insert('k'),
            InputEvent::Insert('z'),
        ]
    );
}

#[test]
fn bracketed_paste_is_one_atomic_event() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_str("\x1b[200~line one\rline two\x1b[201~x");
    let mut r = reader();
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![
            InputEvent::Paste("line one\nline two".to_string()),
            InputEvent::Insert('x'),
        ]
    );
}

#[test]
fn burst_paste_detection_keeps_newlines_literal() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_str("cat file\rgrep x");
    let mut r = BindingReader::new(ReaderConfig {
        paste_timeout: Some(Duration::from_millis(30)),
        ..ReaderConfig::default()
    });
    let events = drain(&mut r, &mut p, &map);
    assert_eq!(
        events,
        vec![InputEvent::Paste("cat file\ngrep x".to_string())]
    );
}

#[test]
fn burst_detection_never_breaks_escape_sequences() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_str("\x1b[A");
    let mut r = BindingReader::new(ReaderConfig {
        paste_timeout: Some(Duration::from_millis(30)),
        ..ReaderConfig::default()
    });
    assert_eq!(
        r.next_event(&mut p, &map, None).unwrap(),
        InputEvent::Op(Operation::PreviousHistory, b"\x1b[A".to_vec())
    );
}

#[test]
fn unbound_byte_in_vi_command_is_reported() {
    let map = defaults::vi_command();
    let mut p = MemoryProvider::new();
    p.feed_str("Q");
    let mut r = reader();
    assert_eq!(
        r.next_event(&mut p, &map, None).unwrap(),
        InputEvent::Unbound(b"Q".to_vec())
    );
}

#[test]
fn idle_timeout_reports_idle() {
    let map = defaults::emacs();
    let mut p = MemoryProvider::new();
    p.feed_gap();
    let mut r = reader();
    assert_eq!(
        r.next_event(&mut p, &map, Some(Duration::from_millis(50)))
            .unwrap(),
        InputEvent::Idle
    );
}
