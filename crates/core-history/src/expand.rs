//! History event expansion.
//!
//! Expands `!`-events and the leading `^old^new^` substitution in a command
//! line before it is committed:
//!
//! * `!!` — last entry
//! * `!N` — entry N (1-based from the start; negative counts from the end)
//! * `!?str?` — last entry containing `str`
//! * `!str` — last entry starting with `str`
//! * `^a^b^` — last entry with the first `a` replaced by `b` (line start only)
//!
//! A `!` followed by whitespace, end of line, or `=` is literal. Forms that
//! match nothing fail with [`ExpansionError`]; a line containing no events
//! is returned unchanged (`changed == false`).

use crate::History;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("event not found: {0}")]
pub struct ExpansionError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub line: String,
    pub changed: bool,
}

pub fn expand_event(line: &str, history: &History) -> Result<Expansion, ExpansionError> {
    if let Some(rest) = line.strip_prefix('^') {
        return expand_quick_substitution(rest, history);
    }
    let mut out = String::with_capacity(line.len());
    let mut changed = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c != '!' {
            out.push(c);
            i += 1;
            continue;
        }
        let next = chars.get(i + 1).copied();
        match next {
            None | Some(' ') | Some('\t') | Some('=') => {
                out.push('!');
                i += 1;
            }
            Some('!') => {
                let entry = history
                    .last()
                    .ok_or_else(|| ExpansionError("!!".to_string()))?;
                out.push_str(&entry.text);
                changed = true;
                i += 2;
            }
            Some('?') => {
                let close = chars[i + 2..]
                    .iter()
                    .position(|&c| c == '?')
                    .ok_or_else(|| ExpansionError("!?".to_string()))?;
                let needle: String = chars[i + 2..i + 2 + close].iter().collect();
                let idx = history
                    .search_backward(
                        &needle,
                        history.len().saturating_sub(1),
                        crate::SearchMode::Contains,
                    )
                    .ok_or_else(|| ExpansionError(format!("!?{needle}?")))?;
                out.push_str(&history.get(idx).map(|e| e.text.clone()).unwrap_or_default());
                changed = true;
                i += 2 + close + 1;
            }
            Some(d) if d.is_ascii_digit() || d == '-' => {
                let mut j = i + 1;
                if chars.get(j) == Some(&'-') {
                    j += 1;
                }
                while j < chars.len() && chars[j].is_ascii_digit() {
                    j += 1;
                }
                let num_src: String = chars[i + 1..j].iter().collect();
                let n: i64 = num_src
                    .parse()
                    .map_err(|_| ExpansionError(format!("!{num_src}")))?;
                let idx = event_index(n, history.len())
                    .ok_or_else(|| ExpansionError(format!("!{num_src}")))?;
                out.push_str(&history.get(idx).map(|e| e.text.clone()).unwrap_or_default());
                changed = true;
                i = j;
            }
            Some(_) => {
                let mut j = i + 1;
                while j < chars.len() && !chars[j].is_whitespace() {
                    j += 1;
                }
                let prefix: String = chars[i + 1..j].iter().collect();
                let idx = history
                    .search_backward(
                        &prefix,
                        history.len().saturating_sub(1),
                        crate::SearchMode::StartsWith,
                    )
                    .ok_or_else(|| ExpansionError(format!("!{prefix}")))?;
                out.push_str(&history.get(idx).map(|e| e.text.clone()).unwrap_or_default());
                changed = true;
                i = j;
            }
        }
    }
    Ok(Expansion { line: out, changed })
}

/// 1-based positive / negative-from-end event number to index.
fn event_index(n: i64, len: usize) -> Option<usize> {
    if n > 0 {
        let idx = (n - 1) as usize;
        (idx < len).then_some(idx)
    } else if n < 0 {
        let back = (-n) as usize;
        len.checked_sub(back)
    } else {
        None
    }
}

fn expand_quick_substitution(rest: &str, history: &History) -> Result<Expansion, ExpansionError> {
    // rest is "a^b^" or "a^b"; split on unescaped '^'.
    let parts: Vec<&str> = rest.splitn(3, '^').collect();
    if parts.len() < 2 {
        return Err(ExpansionError(format!("^{rest}")));
    }
    let (old, new) = (parts[0], parts[1]);
    if old.is_empty() {
        return Err(ExpansionError(format!("^{rest}")));
    }
    let entry = history
        .last()
        .ok_or_else(|| ExpansionError(format!("^{old}^{new}^")))?;
    if !entry.text.contains(old) {
        return Err(ExpansionError(format!("^{old}^{new}^")));
    }
    Ok(Expansion {
        line: entry.text.replacen(old, new, 1),
        changed: true,
    })
}
