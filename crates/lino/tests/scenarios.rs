//! End-to-end scenarios driving the full read loop over the memory provider.

use lino::{
    Candidate, CandidateProvider, CompletionError, EditingMode, LineReader, MemoryProvider,
    ParsedLine, ReadError, ReaderOptions,
};

fn reader_with(script: &[u8]) -> LineReader {
    reader_with_opts(script, ReaderOptions::default())
}

fn reader_with_opts(script: &[u8], options: ReaderOptions) -> LineReader {
    let mut provider = MemoryProvider::new();
    provider.feed(script);
    provider.close_input();
    LineReader::with_provider(Box::new(provider), options)
}

fn output_of(reader: &mut LineReader) -> String {
    reader
        .provider_mut::<MemoryProvider>()
        .expect("memory provider")
        .output_str()
}

struct Words(&'static [&'static str]);

impl CandidateProvider for Words {
    fn complete(&self, _line: &ParsedLine) -> Result<Vec<Candidate>, CompletionError> {
        Ok(self.0.iter().map(|s| Candidate::new(*s)).collect())
    }
}

#[test]
fn basic_edit() {
    let mut r = reader_with(b"hi world\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "hi world");
    assert!(output_of(&mut r).contains("> hi world"));
}

#[test]
fn history_recall_and_edit() {
    let mut r = reader_with(b"\x1b[A\x1b[A\x1b[A\x7f\x7far\r");
    for t in ["alpha", "beta", "gamma"] {
        r.history_mut().add(t);
    }
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "alpar");
    let texts: Vec<String> = r.history().iter().map(|e| e.text.clone()).collect();
    assert_eq!(texts, vec!["alpha", "beta", "gamma", "alpar"]);
}

#[test]
fn history_recall_preserves_in_progress_line() {
    // Type, go up into history, come back down: the typed line is intact.
    let mut r = reader_with(b"draft\x1b[A\x1b[B\r");
    r.history_mut().add("older");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "draft");
}

#[test]
fn incremental_reverse_search() {
    let mut r = reader_with(b"\x12a\r");
    for t in ["alpha", "beta", "gamma"] {
        r.history_mut().add(t);
    }
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "gamma");
    assert!(output_of(&mut r).contains("reverse-i-search"));
}

#[test]
fn reverse_search_steps_to_older_matches() {
    let mut r = reader_with(b"\x12a\x12\x12\r");
    for t in ["alpha", "beta", "gamma"] {
        r.history_mut().add(t);
    }
    // a -> gamma, C-r -> beta, C-r -> alpha.
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "alpha");
}

#[test]
fn tab_completion_unique() {
    let mut r = reader_with(b"ch\t\r");
    r.add_completer(Box::new(Words(&["commit", "checkout"])));
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "checkout ");
}

#[test]
fn tab_completion_common_prefix_then_listing() {
    let mut r = reader_with(b"c\t\t\r");
    r.add_completer(Box::new(Words(&["commit", "commute"])));
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "comm");
    let out = output_of(&mut r);
    assert!(out.contains("commit"), "listing missing: {out:?}");
    assert!(out.contains("commute"), "listing missing: {out:?}");
}

#[test]
fn completion_listing_respects_threshold() {
    let mut opts = ReaderOptions::default();
    opts.auto_print_threshold = 2;
    // Three candidates: listing must ask first; 'y' shows it.
    let mut r = reader_with_opts(b"\t\ty\r", opts);
    r.add_completer(Box::new(Words(&["aaa", "aab", "aac"])));
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "aa"); // common prefix was inserted by the first TAB
    let out = output_of(&mut r);
    assert!(out.contains("Display all 3 possibilities?"), "{out:?}");
    assert!(out.contains("aac"), "{out:?}");
}

#[test]
fn event_expansion_requires_second_accept() {
    let mut r = reader_with(b"!!\r\r");
    r.history_mut().add("echo hello");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "echo hello");
    // Re-echoed before submission.
    assert!(output_of(&mut r).contains("echo hello"));
    assert_eq!(r.history().len(), 2);
}

#[test]
fn event_expansion_failure_beeps_and_keeps_line() {
    // "!zz" matches nothing; C-u discards, "ok" commits.
    let mut r = reader_with(b"!zz\r\x15ok\r");
    r.history_mut().add("echo hello");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "ok");
    assert!(output_of(&mut r).contains('\x07'), "expansion failure must beep");
}

#[test]
fn resize_reflows_with_continuation_prompt() {
    let long: String = "a".repeat(60);
    let mut provider = MemoryProvider::new().with_size(80, 24);
    provider.resize(40, 24); // mid-line shrink, flag pending
    provider.feed(b"\r");
    provider.close_input();
    let mut r = LineReader::with_provider(Box::new(provider), ReaderOptions::default());
    let line = r.read_line_with("> ", None, Some(&long)).unwrap();
    assert_eq!(line, long);
    let out = output_of(&mut r);
    // 2 + 60 columns over width 40 wrap into two rows, each opening with a
    // prompt, and no character is painted twice.
    assert!(out.matches("> ").count() >= 2, "{out:?}");
    let total_a = out.chars().filter(|&c| c == 'a').count();
    assert_eq!(total_a, 60, "no duplicated characters on reflow");
}

#[test]
fn masked_input_hides_text_and_history() {
    let mut r = reader_with(b"secret\r");
    let line = r.read_line_masked("pw: ", '*').unwrap();
    assert_eq!(line, "secret");
    let out = output_of(&mut r);
    assert!(out.contains("******"), "{out:?}");
    assert!(!out.contains("secret"), "mask leaked: {out:?}");
    assert_eq!(r.history().len(), 0);
}

#[test]
fn kill_and_yank_round_trip() {
    // C-a C-k re-yank twice: "abab".
    let mut r = reader_with(b"ab\x01\x0b\x19\x19\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "abab");
}

#[test]
fn undo_restores_empty_buffer() {
    // Coalesced self-inserts undo as one group (C-_).
    let mut r = reader_with(b"abc\x1f\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "");
}

#[test]
fn undo_inverts_discrete_operations() {
    // Type, kill to start, undo kill, undo typing: empty again.
    let mut r = reader_with(b"abc\x15\x1f\x1f\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "");
}

#[test]
fn vi_mode_basic_editing() {
    let mut opts = ReaderOptions::default();
    opts.editing_mode = EditingMode::Vi;
    let mut provider = MemoryProvider::new();
    provider.feed_str("abc\x1b");
    provider.feed_gap(); // escape timeout -> command mode
    provider.feed_str("0xAz\r");
    provider.close_input();
    let mut r = LineReader::with_provider(Box::new(provider), opts);
    let line = r.read_line("> ").unwrap();
    // 0 -> line start, x deletes 'a', A appends at eol, z inserts.
    assert_eq!(line, "bcz");
}

#[test]
fn history_ignore_space_suppresses_add() {
    let mut opts = ReaderOptions::default();
    opts.history_ignore_space = true;
    let mut r = reader_with_opts(b" quiet\r", opts);
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, " quiet");
    assert_eq!(r.history().len(), 0);
}

#[test]
fn history_ignore_dups_suppresses_consecutive() {
    let mut opts = ReaderOptions::default();
    opts.history_ignore_dups = true;
    let mut r = reader_with_opts(b"same\r", opts);
    r.history_mut().add("same");
    r.read_line("> ").unwrap();
    assert_eq!(r.history().len(), 1);
}

#[test]
fn erase_on_finish_clears_frame() {
    let mut opts = ReaderOptions::default();
    opts.erase_on_finish = true;
    let mut r = reader_with_opts(b"bye\r", opts);
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "bye");
    let out = output_of(&mut r);
    let erase_at = out.rfind("\x1b[J").expect("frame erased");
    let text_at = out.rfind("bye").expect("frame painted");
    assert!(erase_at > text_at, "erase must follow the paint: {out:?}");
}

#[test]
fn ctrl_d_on_empty_buffer_is_eof() {
    let mut r = reader_with(b"\x04");
    assert!(matches!(r.read_line("> "), Err(ReadError::Eof)));
}

#[test]
fn ctrl_d_with_content_deletes() {
    let mut r = reader_with(b"ab\x01\x04\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "b");
}

#[test]
fn ctrl_c_interrupts() {
    let mut r = reader_with(b"partial\x03");
    assert!(matches!(r.read_line("> "), Err(ReadError::Interrupted)));
    // Raw mode released on the way out.
    let mem = r.provider_mut::<MemoryProvider>().unwrap();
    assert!(!mem.in_raw_mode());
}

#[test]
fn bracketed_paste_inserts_atomically() {
    let mut r = reader_with(b"\x1b[200~one\rtwo~three\x1b[201~\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "one\ntwo~three");
}

#[test]
fn multiline_buffer_renders_secondary_prompt() {
    let mut r = reader_with(b"\x1b[200~one\rtwo\x1b[201~\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "one\ntwo");
    let out = output_of(&mut r);
    assert!(out.contains("> one"), "{out:?}");
    assert!(out.contains("> two"), "{out:?}"); // default secondary prompt
}

#[test]
fn external_printer_messages_appear_before_frame() {
    let mut r = reader_with(b"hi\r");
    r.printer().print("status: ready");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "hi");
    let out = output_of(&mut r);
    let msg_at = out.find("status: ready").expect("message printed");
    let frame_at = out.rfind("> hi").expect("frame painted");
    assert!(msg_at < frame_at, "message must precede the frame: {out:?}");
}

#[test]
fn custom_widget_runs_from_binding() {
    let mut r = reader_with(b"ab\x07\r");
    r.register_widget("upcase-all", |ctx: &mut lino::WidgetCtx<'_>| {
        let upper = ctx.buffer.text().to_uppercase();
        ctx.buffer.set_text(&upper);
        lino::WidgetOutcome::Continue
    });
    assert!(r.bind_widget(&[0x07], "upcase-all"));
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "AB");
}

#[test]
fn inputrc_macro_binding_plays_back() {
    let mut r = reader_with(b"\x0f\r");
    r.apply_inputrc("\"\\C-o\": \"expanded\"\n");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "expanded");
}

#[test]
fn inputrc_set_variables_reach_options() {
    let mut r = reader_with(b"x\r");
    r.apply_inputrc("set history_ignore_space true\nset secondary_prompt .. \n");
    assert!(r.options().history_ignore_space);
    assert_eq!(r.options().secondary_prompt, "..");
    r.read_line("> ").unwrap();
}

#[test]
fn menu_complete_cycles_candidates() {
    // M-? is not bound to menu; drive it via an inputrc binding.
    let mut r = reader_with(b"\x0e\x0e\r");
    r.apply_inputrc("\"\\C-n\": menu-complete\n");
    r.add_completer(Box::new(Words(&["alpha", "beta"])));
    let line = r.read_line("> ").unwrap();
    // First C-n inserts "alpha", second cycles to "beta"; CR closes the
    // menu keeping the highlighted value, end of input commits it.
    assert_eq!(line, "beta");
}

#[test]
fn transpose_and_word_ops_through_the_loop() {
    // "ok ls" M-t -> "ls ok"
    let mut r = reader_with(b"ok ls\x1bt\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "ls ok");
}

#[test]
fn quoted_insert_takes_next_byte_literally() {
    // C-v C-k inserts a literal 0x0b instead of killing.
    let mut r = reader_with(b"a\x16\x0bb\r");
    let line = r.read_line("> ").unwrap();
    assert_eq!(line, "a\u{b}b");
}
