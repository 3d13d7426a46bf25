//! INPUTRC-dialect parser.
//!
//! Minimal readline configuration grammar:
//!
//! ```text
//! set VAR VALUE
//! "key-sequence": operation-name
//! "key-sequence": "macro text"
//! $if mode=vi      $if mode=emacs      $if <application>
//! $else
//! $endif
//! ```
//!
//! Key sequences use readline escapes: `\C-x`, `\M-x`, `\e`, `\\`, `\"`,
//! `\'`, `\a \b \d \f \n \r \t \v`, `\nnn` octal, `\xHH` hex. A directive
//! that fails to parse is skipped and recorded; the rest of the file is
//! still applied.

use crate::ops::Operation;
use crate::registry::KeymapRegistry;
use crate::{EditingMode, Target};
use tracing::warn;

/// Context the `$if` conditionals are evaluated against.
#[derive(Debug, Clone)]
pub struct InputrcContext {
    pub editing_mode: EditingMode,
    pub application: String,
}

impl Default for InputrcContext {
    fn default() -> Self {
        Self {
            editing_mode: EditingMode::Emacs,
            application: String::new(),
        }
    }
}

/// One skipped directive.
#[derive(Debug, Clone, thiserror::Error)]
#[error("inputrc line {line}: {message}")]
pub struct KeymapParseError {
    pub line: usize,
    pub message: String,
}

/// What a parse produced besides bindings: `set` variables (interpreted by
/// the caller) and the directives that were skipped.
#[derive(Debug, Default)]
pub struct InputrcOutcome {
    pub variables: Vec<(String, String)>,
    pub errors: Vec<KeymapParseError>,
}

/// Apply `src` to the map named `target_map` in `registry`.
pub fn apply_inputrc(
    src: &str,
    ctx: &InputrcContext,
    registry: &mut KeymapRegistry,
    target_map: &str,
) -> InputrcOutcome {
    let mut out = InputrcOutcome::default();
    // Conditional stack: each entry is "is this branch active".
    let mut active = vec![true];

    for (idx, raw) in src.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(cond) = line.strip_prefix("$if") {
            let enclosing = *active.last().unwrap_or(&true);
            active.push(enclosing && eval_condition(cond.trim(), ctx));
            continue;
        }
        if line == "$else" {
            if active.len() < 2 {
                skip(&mut out, lineno, "$else without $if");
                continue;
            }
            let enclosing = active[active.len() - 2];
            let last = active.last_mut().unwrap();
            *last = enclosing && !*last;
            continue;
        }
        if line == "$endif" {
            if active.len() < 2 {
                skip(&mut out, lineno, "$endif without $if");
                continue;
            }
            active.pop();
            continue;
        }
        if !active.last().copied().unwrap_or(true) {
            continue;
        }

        if let Some(rest) = line.strip_prefix("set ") {
            let mut parts = rest.trim().splitn(2, char::is_whitespace);
            match (parts.next(), parts.next()) {
                (Some(var), Some(value)) if !var.is_empty() => out
                    .variables
                    .push((var.to_string(), value.trim().to_string())),
                _ => skip(&mut out, lineno, "set requires a variable and a value"),
            }
            continue;
        }

        match parse_binding(line) {
            Ok((seq, target)) => {
                if let Some(map) = registry.get_mut(target_map) {
                    map.bind(&seq, target);
                } else {
                    skip(&mut out, lineno, &format!("unknown key map {target_map}"));
                }
            }
            Err(message) => skip(&mut out, lineno, &message),
        }
    }
    out
}

fn skip(out: &mut InputrcOutcome, line: usize, message: &str) {
    warn!(target: "keymap.inputrc", line, message, "directive skipped");
    out.errors.push(KeymapParseError {
        line,
        message: message.to_string(),
    });
}

fn eval_condition(cond: &str, ctx: &InputrcContext) -> bool {
    if let Some(mode) = cond.strip_prefix("mode=") {
        return match mode.trim() {
            "emacs" => ctx.editing_mode == EditingMode::Emacs,
            "vi" => ctx.editing_mode == EditingMode::Vi,
            _ => false,
        };
    }
    cond.eq_ignore_ascii_case(&ctx.application)
}

/// Parse `"seq": action` into bytes + target.
fn parse_binding(line: &str) -> Result<(Vec<u8>, Target), String> {
    let rest = line
        .strip_prefix('"')
        .ok_or_else(|| "binding must start with a quoted key sequence".to_string())?;
    let (seq_src, rest) = split_quoted(rest)?;
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| "missing ':' after key sequence".to_string())?;
    let action = rest.trim();
    if action.is_empty() {
        return Err("missing action".to_string());
    }
    let seq = decode_key_sequence(&seq_src)?;
    if seq.is_empty() {
        return Err("empty key sequence".to_string());
    }

    if action.starts_with('"') {
        let (macro_src, trailing) = split_quoted(&action[1..])?;
        if !trailing.trim().is_empty() {
            return Err("trailing characters after macro".to_string());
        }
        let bytes = decode_key_sequence(&macro_src)?;
        return Ok((seq, Target::Macro(bytes)));
    }

    let op = Operation::by_name(action)
        .ok_or_else(|| format!("unknown operation {action:?}"))?;
    Ok((seq, Target::Op(op)))
}

/// Split at the closing unescaped quote; returns (content, remainder).
fn split_quoted(s: &str) -> Result<(String, &str), String> {
    let mut content = String::new();
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            content.push('\\');
            content.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return Ok((content, &s[i + 1..])),
            _ => content.push(ch),
        }
    }
    Err("unterminated quote".to_string())
}

/// Decode readline key-sequence escapes into bytes.
fn decode_key_sequence(src: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err("dangling backslash".to_string());
        };
        match esc {
            'C' => {
                expect(&mut chars, '-')?;
                let key = chars.next().ok_or("\\C- needs a key")?;
                out.push(ctrl_byte(key)?);
            }
            'M' => {
                expect(&mut chars, '-')?;
                out.push(0x1b);
                let key = chars.next().ok_or("\\M- needs a key")?;
                if key == '\\' {
                    // \M-\C-x
                    let inner = chars.next().ok_or("dangling backslash after \\M-")?;
                    if inner == 'C' {
                        expect(&mut chars, '-')?;
                        let key = chars.next().ok_or("\\M-\\C- needs a key")?;
                        out.push(ctrl_byte(key)?);
                    } else {
                        return Err(format!("unsupported escape \\M-\\{inner}"));
                    }
                } else {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(key.encode_utf8(&mut buf).as_bytes());
                }
            }
            'e' => out.push(0x1b),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'd' => out.push(0x7f),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return Err("\\x needs hex digits".to_string());
                }
                out.push(value as u8);
            }
            d @ '0'..='7' => {
                let mut value = d.to_digit(8).unwrap_or(0);
                let mut digits = 1;
                while digits < 3 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(n) => {
                            value = value * 8 + n;
                            chars.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                out.push(value as u8);
            }
            other => return Err(format!("unknown escape \\{other}")),
        }
    }
    Ok(out)
}

fn expect(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, want: char) -> Result<(), String> {
    match chars.next() {
        Some(c) if c == want => Ok(()),
        _ => Err(format!("expected {want:?}")),
    }
}

fn ctrl_byte(key: char) -> Result<u8, String> {
    if key == '?' {
        return Ok(0x7f);
    }
    let upper = key.to_ascii_uppercase();
    if upper.is_ascii() {
        Ok((upper as u8) & 0x1f)
    } else {
        Err(format!("cannot control-shift {key:?}"))
    }
}
