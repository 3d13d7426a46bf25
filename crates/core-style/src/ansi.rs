//! SGR emission with style-delta tracking.
//!
//! The renderer asks for a line's bytes once per changed region; SGR codes
//! are only emitted when the style actually changes between adjacent cells,
//! and a single reset closes the line if it ended non-default.

use crate::line::StyledLine;
use crate::{AttrFlags, Color, Style};

/// Whether color/attribute sequences may be emitted at all.
///
/// `Plain` is selected for dumb terminals and when `NO_COLOR` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Ansi,
    Plain,
}

/// Full SGR sequence that switches from the default style to `style`.
///
/// Callers emit `\x1b[0m` themselves when transitioning away; composing a
/// minimal attribute-by-attribute delta is not worth the state tracking for
/// line-editor sized payloads.
pub fn sgr_sequence(style: &Style) -> String {
    if style.is_default() {
        return "\x1b[0m".to_string();
    }
    let mut params: Vec<String> = Vec::new();
    params.push("0".to_string());
    if style.attrs.contains(AttrFlags::BOLD) {
        params.push("1".to_string());
    }
    if style.attrs.contains(AttrFlags::ITALIC) {
        params.push("3".to_string());
    }
    if style.attrs.contains(AttrFlags::UNDERLINE) {
        params.push("4".to_string());
    }
    if style.attrs.contains(AttrFlags::INVERSE) {
        params.push("7".to_string());
    }
    if style.attrs.contains(AttrFlags::CONCEAL) {
        params.push("8".to_string());
    }
    push_color(&mut params, style.fg, 38, 30);
    push_color(&mut params, style.bg, 48, 40);
    format!("\x1b[{}m", params.join(";"))
}

fn push_color(params: &mut Vec<String>, color: Color, extended_base: u16, classic_base: u16) {
    match color {
        Color::Default => {}
        Color::Indexed(n) if n < 8 => params.push((classic_base + u16::from(n)).to_string()),
        Color::Indexed(n) => {
            params.push(extended_base.to_string());
            params.push("5".to_string());
            params.push(n.to_string());
        }
        Color::Rgb(r, g, b) => {
            params.push(extended_base.to_string());
            params.push("2".to_string());
            params.push(r.to_string());
            params.push(g.to_string());
            params.push(b.to_string());
        }
    }
}

/// Render a line into `out`, emitting SGR codes only on style changes.
pub fn render_line(line: &StyledLine, mode: ColorMode, out: &mut String) {
    let mut current = Style::default();
    for cell in line.cells() {
        if mode == ColorMode::Ansi && cell.style != current {
            out.push_str(&sgr_sequence(&cell.style));
            current = cell.style;
        }
        out.push(cell.ch);
    }
    if mode == ColorMode::Ansi && !current.is_default() {
        out.push_str("\x1b[0m");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_emits_no_escapes() {
        let mut line = StyledLine::new();
        line.push_str("hi", Style::default().fg(Color::Indexed(1)));
        let mut out = String::new();
        render_line(&line, ColorMode::Plain, &mut out);
        assert_eq!(out, "hi");
    }

    #[test]
    fn unchanged_style_emits_single_sgr() {
        let red = Style::default().fg(Color::Indexed(1));
        let mut line = StyledLine::new();
        line.push_str("abc", red);
        let mut out = String::new();
        render_line(&line, ColorMode::Ansi, &mut out);
        assert_eq!(out.matches("\x1b[").count(), 2); // set + trailing reset
        assert!(out.ends_with("\x1b[0m"));
    }

    #[test]
    fn default_run_needs_no_reset() {
        let line = StyledLine::plain("abc");
        let mut out = String::new();
        render_line(&line, ColorMode::Ansi, &mut out);
        assert_eq!(out, "abc");
    }

    #[test]
    fn transition_between_styles() {
        let mut line = StyledLine::new();
        line.push('a', Style::default().attr(AttrFlags::BOLD));
        line.push('b', Style::default());
        let mut out = String::new();
        render_line(&line, ColorMode::Ansi, &mut out);
        assert_eq!(out, "\x1b[0;1ma\x1b[0mb");
    }

    #[test]
    fn indexed_and_rgb_params() {
        assert_eq!(
            sgr_sequence(&Style::default().fg(Color::Indexed(2))),
            "\x1b[0;32m"
        );
        assert_eq!(
            sgr_sequence(&Style::default().fg(Color::Indexed(42))),
            "\x1b[0;38;5;42m"
        );
        assert_eq!(
            sgr_sequence(&Style::default().bg(Color::Rgb(1, 2, 3))),
            "\x1b[0;48;2;1;2;3m"
        );
    }
}
