//! Standard binding tables.
//!
//! Mirrors readline's stock maps: `emacs` (with `emacs-meta` and
//! `emacs-ctlx` grafted under ESC and C-x), `vi-insert`, and `vi-command`.
//! All maps pre-bind the arrow/function-key set: CSI `ESC [ A..D/H/F`,
//! VT100 SS3 `ESC O x` variants, `ESC [ n ~` keypad codes, and the Windows
//! console `0xE0` scan-code pairs.

use crate::ops::Operation::*;
use crate::registry::KeymapRegistry;
use crate::{KeyMap, Target};

/// Initial editing mode; selects the map a read starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditingMode {
    #[default]
    Emacs,
    Vi,
}

impl EditingMode {
    pub fn initial_map(&self) -> &'static str {
        match self {
            EditingMode::Emacs => "emacs",
            EditingMode::Vi => "vi-insert",
        }
    }
}

const ESC: u8 = 0x1b;

fn ctrl(c: u8) -> u8 {
    c & 0x1f
}

/// Arrow/function keys shared by every map.
fn bind_special_keys(map: &mut KeyMap) {
    // CSI
    map.bind_op(b"\x1b[A", PreviousHistory);
    map.bind_op(b"\x1b[B", NextHistory);
    map.bind_op(b"\x1b[C", ForwardChar);
    map.bind_op(b"\x1b[D", BackwardChar);
    map.bind_op(b"\x1b[H", BeginningOfLine);
    map.bind_op(b"\x1b[F", EndOfLine);
    // Keypad ~-codes
    map.bind_op(b"\x1b[1~", BeginningOfLine);
    map.bind_op(b"\x1b[2~", ToggleOvertype);
    map.bind_op(b"\x1b[3~", DeleteChar);
    map.bind_op(b"\x1b[4~", EndOfLine);
    map.bind_op(b"\x1b[5~", Noop);
    map.bind_op(b"\x1b[6~", Noop);
    // VT100 application mode (SS3)
    map.bind_op(b"\x1bOA", PreviousHistory);
    map.bind_op(b"\x1bOB", NextHistory);
    map.bind_op(b"\x1bOC", ForwardChar);
    map.bind_op(b"\x1bOD", BackwardChar);
    map.bind_op(b"\x1bOH", BeginningOfLine);
    map.bind_op(b"\x1bOF", EndOfLine);
    // Windows console scan codes
    map.bind_op(&[0xE0, 0x48], PreviousHistory);
    map.bind_op(&[0xE0, 0x50], NextHistory);
    map.bind_op(&[0xE0, 0x4D], ForwardChar);
    map.bind_op(&[0xE0, 0x4B], BackwardChar);
    map.bind_op(&[0xE0, 0x47], BeginningOfLine);
    map.bind_op(&[0xE0, 0x4F], EndOfLine);
    map.bind_op(&[0xE0, 0x53], DeleteChar);
    map.bind_op(&[0xE0, 0x52], ToggleOvertype);
    // Bracketed paste open marker; the close marker is consumed by the
    // binding reader while draining the paste body.
    map.bind_op(b"\x1b[200~", BracketedPasteBegin);
}

/// Bind the printable ASCII range and the UTF-8 lead/continuation bytes.
fn bind_self_insert(map: &mut KeyMap) {
    for b in 0x20..0x7fu8 {
        map.bind_op(&[b], SelfInsert);
    }
    // Anything unbound (including high bytes starting a UTF-8 scalar)
    // self-inserts; the binding reader assembles the full codepoint.
    map.bind_fallback(&[], Target::Op(SelfInsert));
}

fn bind_common_controls(map: &mut KeyMap) {
    map.bind_op(&[b'\r'], AcceptLine);
    map.bind_op(&[ctrl(b'J')], AcceptLine);
    map.bind_op(&[ctrl(b'C')], Interrupt);
    map.bind_op(&[ctrl(b'Z')], Suspend);
    map.bind_op(&[ctrl(b'L')], ClearScreen);
    map.bind_op(&[ctrl(b'D')], DeleteCharOrEof);
    map.bind_op(&[0x7f], BackwardDeleteChar);
    map.bind_op(&[ctrl(b'H')], BackwardDeleteChar);
}

pub fn emacs_meta() -> KeyMap {
    let mut m = KeyMap::new("emacs-meta");
    m.bind_op(b"b", BackwardWord);
    m.bind_op(b"f", ForwardWord);
    m.bind_op(b"d", KillWord);
    m.bind_op(&[0x7f], BackwardKillWord);
    m.bind_op(&[ctrl(b'H')], BackwardKillWord);
    m.bind_op(b"u", UpcaseWord);
    m.bind_op(b"l", DowncaseWord);
    m.bind_op(b"c", CapitalizeWord);
    m.bind_op(b"t", TransposeWords);
    m.bind_op(b"y", YankPop);
    m.bind_op(b"<", BeginningOfHistory);
    m.bind_op(b">", EndOfHistory);
    m.bind_op(b"?", PossibleCompletions);
    m
}

pub fn emacs_ctlx() -> KeyMap {
    let mut m = KeyMap::new("emacs-ctlx");
    m.bind_op(&[ctrl(b'U')], Undo);
    m.bind_op(&[ctrl(b'V')], ViEditingMode);
    m.bind_op(b"r", ReverseSearchHistory);
    m
}

pub fn emacs() -> KeyMap {
    let mut m = KeyMap::new("emacs");
    bind_self_insert(&mut m);
    bind_common_controls(&mut m);
    bind_special_keys(&mut m);
    m.bind_op(&[ctrl(b'A')], BeginningOfLine);
    m.bind_op(&[ctrl(b'B')], BackwardChar);
    m.bind_op(&[ctrl(b'E')], EndOfLine);
    m.bind_op(&[ctrl(b'F')], ForwardChar);
    m.bind_op(&[ctrl(b'G')], Abort);
    m.bind_op(&[b'\t'], Complete);
    m.bind_op(&[ctrl(b'K')], KillLine);
    m.bind_op(&[ctrl(b'N')], NextHistory);
    m.bind_op(&[ctrl(b'P')], PreviousHistory);
    m.bind_op(&[ctrl(b'R')], ReverseSearchHistory);
    m.bind_op(&[ctrl(b'S')], ForwardSearchHistory);
    m.bind_op(&[ctrl(b'T')], TransposeChars);
    m.bind_op(&[ctrl(b'U')], BackwardKillLine);
    m.bind_op(&[ctrl(b'V')], QuotedInsert);
    m.bind_op(&[ctrl(b'W')], BackwardKillWord);
    m.bind_op(&[ctrl(b'Y')], Yank);
    m.bind_op(&[0x1f], Undo); // C-_
    // Graft the named sub-maps under their prefixes.
    graft(&mut m, &[ESC], &emacs_meta());
    graft(&mut m, &[ctrl(b'X')], &emacs_ctlx());
    // A lone ESC that times out does nothing rather than self-inserting.
    m.bind_fallback(&[ESC], Target::Op(Noop));
    m
}

pub fn vi_insert() -> KeyMap {
    let mut m = KeyMap::new("vi-insert");
    bind_self_insert(&mut m);
    bind_common_controls(&mut m);
    bind_special_keys(&mut m);
    m.bind_op(&[b'\t'], Complete);
    m.bind_op(&[ctrl(b'R')], ReverseSearchHistory);
    m.bind_op(&[ctrl(b'U')], BackwardKillLine);
    m.bind_op(&[ctrl(b'V')], QuotedInsert);
    m.bind_op(&[ctrl(b'W')], BackwardKillWord);
    m.bind_op(&[ctrl(b'Y')], Yank);
    // ESC is both a prefix (arrows) and, on timeout, the mode switch.
    m.bind_fallback(&[ESC], Target::Op(ViCommandMode));
    m
}

pub fn vi_command() -> KeyMap {
    let mut m = KeyMap::new("vi-command");
    bind_common_controls(&mut m);
    bind_special_keys(&mut m);
    m.bind_op(b"h", BackwardChar);
    m.bind_op(b"l", ForwardChar);
    m.bind_op(b" ", ForwardChar);
    m.bind_op(b"0", BeginningOfLine);
    m.bind_op(b"^", ViFirstNonBlank);
    m.bind_op(b"$", EndOfLine);
    m.bind_op(b"w", ForwardWord);
    m.bind_op(b"b", BackwardWord);
    m.bind_op(b"e", ViEndWord);
    m.bind_op(b"i", ViInsertMode);
    m.bind_op(b"I", ViInsertBol);
    m.bind_op(b"a", ViAppend);
    m.bind_op(b"A", ViAppendEol);
    m.bind_op(b"x", DeleteChar);
    m.bind_op(b"X", BackwardDeleteChar);
    m.bind_op(b"D", KillLine);
    m.bind_op(b"C", ViChangeToEol);
    m.bind_op(b"s", ViSubstChar);
    m.bind_op(b"S", ViChangeLine);
    m.bind_op(b"r", ViReplaceChar);
    m.bind_op(b"~", ViChangeCase);
    m.bind_op(b"p", ViPutAfter);
    m.bind_op(b"P", ViPutBefore);
    m.bind_op(b"u", Undo);
    m.bind_op(b"k", PreviousHistory);
    m.bind_op(b"-", PreviousHistory);
    m.bind_op(b"j", NextHistory);
    m.bind_op(b"+", NextHistory);
    m.bind_op(b"G", EndOfHistory);
    // Operator pairs
    m.bind_op(b"dd", KillWholeLine);
    m.bind_op(b"dw", KillWord);
    m.bind_op(b"db", BackwardKillWord);
    m.bind_op(b"d$", KillLine);
    m.bind_op(b"d0", BackwardKillLine);
    m.bind_op(b"cc", ViChangeLine);
    m.bind_op(b"cw", ViChangeWord);
    m.bind_op(b"cb", ViChangeWordBack);
    m.bind_op(b"c$", ViChangeToEol);
    m.bind_op(b"yy", ViYankLine);
    m.bind_op(b"yw", ViYankWord);
    m.bind_op(b"y$", ViYankToEol);
    m.bind_fallback(&[ESC], Target::Op(Noop));
    m
}

/// Copy every binding of `sub` into `map` under `prefix`.
pub fn graft(map: &mut KeyMap, prefix: &[u8], sub: &KeyMap) {
    sub.for_each_binding(|seq, target| {
        let mut full = prefix.to_vec();
        full.extend_from_slice(seq);
        map.bind(&full, target.clone());
    });
}

/// The standard named registry: `emacs`, `emacs-meta`, `emacs-ctlx`,
/// `vi-insert`, `vi-command`.
pub fn standard_registry() -> KeymapRegistry {
    let mut reg = KeymapRegistry::new();
    reg.insert(emacs());
    reg.insert(emacs_meta());
    reg.insert(emacs_ctlx());
    reg.insert(vi_insert());
    reg.insert(vi_command());
    reg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lookup;

    #[test]
    fn emacs_binds_basic_controls() {
        let m = emacs();
        assert_eq!(
            m.lookup(&[0x01]),
            Lookup::Final(&Target::Op(BeginningOfLine))
        );
        assert_eq!(m.lookup(b"\r"), Lookup::Final(&Target::Op(AcceptLine)));
        assert_eq!(m.lookup(b"\t"), Lookup::Final(&Target::Op(Complete)));
    }

    #[test]
    fn meta_bindings_reachable_via_esc() {
        let m = emacs();
        assert_eq!(m.lookup(b"\x1bb"), Lookup::Final(&Target::Op(BackwardWord)));
        assert_eq!(m.lookup(b"\x1bf"), Lookup::Final(&Target::Op(ForwardWord)));
        assert_eq!(m.lookup(b"\x1b"), Lookup::Partial);
    }

    #[test]
    fn ctlx_prefix_works() {
        let m = emacs();
        assert_eq!(
            m.lookup(&[0x18, 0x15]),
            Lookup::Final(&Target::Op(Undo))
        );
    }

    #[test]
    fn arrows_bound_in_all_maps() {
        for m in [emacs(), vi_insert(), vi_command()] {
            assert_eq!(
                m.lookup(b"\x1b[A"),
                Lookup::Final(&Target::Op(PreviousHistory)),
                "map {}",
                m.name()
            );
            assert_eq!(
                m.lookup(b"\x1bOC"),
                Lookup::Final(&Target::Op(ForwardChar)),
                "map {}",
                m.name()
            );
            assert_eq!(
                m.lookup(&[0xE0, 0x4B]),
                Lookup::Final(&Target::Op(BackwardChar)),
                "map {}",
                m.name()
            );
        }
    }

    #[test]
    fn vi_insert_escape_times_out_to_command_mode() {
        let m = vi_insert();
        assert_eq!(m.lookup(b"\x1b"), Lookup::Partial);
        let fb = m.fallback(b"\x1b").unwrap();
        assert_eq!(fb.target, &Target::Op(ViCommandMode));
        assert_eq!(fb.consumed, 1);
    }

    #[test]
    fn vi_command_has_no_self_insert() {
        let m = vi_command();
        assert_eq!(m.lookup(b"q"), Lookup::Missing);
        assert!(m.fallback(b"q").is_none());
    }

    #[test]
    fn vi_operator_pairs_resolve() {
        let m = vi_command();
        assert_eq!(m.lookup(b"d"), Lookup::Partial);
        assert_eq!(m.lookup(b"dd"), Lookup::Final(&Target::Op(KillWholeLine)));
        assert_eq!(m.lookup(b"dw"), Lookup::Final(&Target::Op(KillWord)));
        assert_eq!(m.lookup(b"cw"), Lookup::Final(&Target::Op(ViChangeWord)));
    }

    #[test]
    fn final_has_no_final_proper_prefix() {
        // Prefix-freedom: for every binding, no strict prefix is Final.
        for m in [emacs(), vi_insert(), vi_command()] {
            m.for_each_binding(|seq, _| {
                for cut in 1..seq.len() {
                    assert!(
                        !matches!(m.lookup(&seq[..cut]), Lookup::Final(_)),
                        "map {} sequence {seq:?} cut {cut}",
                        m.name()
                    );
                }
            });
        }
    }

    #[test]
    fn printable_bytes_self_insert_in_emacs() {
        let m = emacs();
        for b in [b'a', b'Z', b'0', b' ', b'~'] {
            assert_eq!(
                m.lookup(&[b]),
                Lookup::Final(&Target::Op(SelfInsert)),
                "byte {b}"
            );
        }
        // High bytes flow through the root fallback.
        let fb = m.fallback(&[0xC3]).unwrap();
        assert_eq!(fb.target, &Target::Op(SelfInsert));
    }
}
