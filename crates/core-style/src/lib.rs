//! Styled-character sequences for terminal rendering.
//!
//! The display pipeline works on [`StyledLine`] values: ordered sequences of
//! `(char, Style)` cells. Everything that cares about horizontal placement
//! (slicing, wrapping, diffing) operates in *visual columns*, where a wide
//! codepoint occupies two columns and combining marks occupy zero.
//!
//! Design invariants:
//! * All width decisions flow through [`width::cell_width`]; no caller asks
//!   `unicode-width` directly.
//! * Column ranges are half-open `[start_col, end_col)`.
//! * A slice never exposes half of a wide cell; the orphaned half is padded
//!   with a blank cell carrying the same style.

pub mod ansi;
pub mod line;
pub mod width;

pub use ansi::{ColorMode, render_line, sgr_sequence};
pub use line::{Cell, StyledLine};
pub use width::{cell_width, str_width, tab_stop_after};

use bitflags::bitflags;

bitflags! {
    /// Per-cell text attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct AttrFlags: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const INVERSE   = 1 << 3;
        const CONCEAL   = 1 << 4;
    }
}

/// Foreground or background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Color {
    /// Terminal default (no SGR color emitted).
    #[default]
    Default,
    /// Palette index 0-255.
    Indexed(u8),
    /// 24-bit direct color.
    Rgb(u8, u8, u8),
}

/// Style applied to a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: AttrFlags,
}

impl Style {
    pub const fn new() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: AttrFlags::empty(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.fg == Color::Default && self.bg == Color::Default && self.attrs.is_empty()
    }

    pub fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    pub fn attr(mut self, flag: AttrFlags) -> Self {
        self.attrs |= flag;
        self
    }
}
