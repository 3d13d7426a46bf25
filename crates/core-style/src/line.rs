//! Attributed cell sequences.

use crate::width::{cell_width, tab_stop_after};
use crate::Style;

/// One codepoint plus the style it renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Cell {
    pub fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }

    pub fn width(&self) -> usize {
        cell_width(self.ch)
    }
}

/// Ordered sequence of styled cells; the unit the renderer diffs and emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    cells: Vec<Cell>,
}

impl StyledLine {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    pub fn plain(s: &str) -> Self {
        let mut line = Self::new();
        line.push_str(s, Style::default());
        line
    }

    pub fn push(&mut self, ch: char, style: Style) {
        self.cells.push(Cell::new(ch, style));
    }

    pub fn push_str(&mut self, s: &str, style: Style) {
        for ch in s.chars() {
            self.push(ch, style);
        }
    }

    pub fn append(&mut self, other: &StyledLine) {
        self.cells.extend_from_slice(&other.cells);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total display width in columns.
    pub fn width(&self) -> usize {
        self.cells.iter().map(Cell::width).sum()
    }

    /// Plain text contents, styles dropped.
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }

    /// Column-accurate slice `[start_col, end_col)`.
    ///
    /// A wide cell straddling either boundary is replaced by a blank cell of
    /// the same style so the result always occupies exactly the columns that
    /// fall inside the range (clamped to the line width).
    pub fn slice_cols(&self, start_col: usize, end_col: usize) -> StyledLine {
        let mut out = StyledLine::new();
        if end_col <= start_col {
            return out;
        }
        let mut col = 0usize;
        for cell in &self.cells {
            let w = cell.width();
            let cell_start = col;
            let cell_end = col + w;
            col = cell_end;
            if cell_end <= start_col {
                continue;
            }
            if cell_start >= end_col {
                break;
            }
            if cell_start >= start_col && cell_end <= end_col {
                out.cells.push(*cell);
            } else if w == 2 {
                // Straddles a boundary: keep one blank column inside the range.
                out.cells.push(Cell::new(' ', cell.style));
            } else {
                // Zero-width cell at the boundary stays with its base only
                // when the base was included; standalone it is dropped.
                if w == 0 && cell_start >= start_col && !out.cells.is_empty() {
                    out.cells.push(*cell);
                }
            }
        }
        out
    }

    /// Expand tabs to spaces, each advancing to the next multiple of 8
    /// counted from `start_col` (the column this line begins at on screen).
    pub fn expand_tabs(&self, start_col: usize) -> StyledLine {
        if !self.cells.iter().any(|c| c.ch == '\t') {
            return self.clone();
        }
        let mut out = StyledLine::new();
        let mut col = start_col;
        for cell in &self.cells {
            if cell.ch == '\t' {
                let stop = tab_stop_after(col);
                while col < stop {
                    out.push(' ', cell.style);
                    col += 1;
                }
            } else {
                col += cell.width();
                out.cells.push(*cell);
            }
        }
        out
    }

    /// Number of leading cells equal in both char and style.
    pub fn common_prefix(&self, other: &StyledLine) -> usize {
        self.cells
            .iter()
            .zip(other.cells.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Number of trailing cells equal in both char and style, bounded so the
    /// suffix never overlaps a prefix of length `prefix`.
    pub fn common_suffix(&self, other: &StyledLine, prefix: usize) -> usize {
        let max = self
            .cells
            .len()
            .min(other.cells.len())
            .saturating_sub(prefix);
        self.cells
            .iter()
            .rev()
            .zip(other.cells.iter().rev())
            .take(max)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Width in columns of the first `n` cells.
    pub fn width_of_prefix(&self, n: usize) -> usize {
        self.cells.iter().take(n).map(Cell::width).sum()
    }
}

impl std::fmt::Display for StyledLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for cell in &self.cells {
            write!(f, "{}", cell.ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttrFlags, Color};

    #[test]
    fn width_counts_wide_cells() {
        let line = StyledLine::plain("a世b");
        assert_eq!(line.width(), 4);
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn slice_plain_ascii() {
        let line = StyledLine::plain("hello");
        assert_eq!(line.slice_cols(1, 4).text(), "ell");
        assert_eq!(line.slice_cols(0, 99).text(), "hello");
        assert_eq!(line.slice_cols(3, 3).text(), "");
    }

    #[test]
    fn slice_pads_straddled_wide_cell() {
        // "世" spans columns 0-1; slicing from column 1 must not expose half.
        let line = StyledLine::plain("世x");
        let s = line.slice_cols(1, 3);
        assert_eq!(s.text(), " x");
        assert_eq!(s.width(), 2);
    }

    #[test]
    fn slice_keeps_combining_with_base() {
        let line = StyledLine::plain("e\u{0301}f");
        let s = line.slice_cols(0, 1);
        assert_eq!(s.text(), "e\u{0301}");
        let tail = line.slice_cols(1, 2);
        assert_eq!(tail.text(), "f");
    }

    #[test]
    fn tabs_expand_from_starting_column() {
        let line = StyledLine::plain("a\tb");
        assert_eq!(line.expand_tabs(0).text(), "a       b");
        // Starting at column 6 the 'a' lands on 6, tab jumps 7 -> 8.
        assert_eq!(line.expand_tabs(6).text(), "a b");
    }

    #[test]
    fn prefix_suffix_respect_styles() {
        let bold = Style::default().attr(AttrFlags::BOLD);
        let mut a = StyledLine::plain("abc");
        let mut b = StyledLine::plain("abc");
        assert_eq!(a.common_prefix(&b), 3);
        a.push('x', Style::default());
        b.push('x', bold);
        // Same char, different style: not common.
        assert_eq!(a.common_prefix(&b), 3);
        assert_eq!(a.common_suffix(&b, 3), 0);
    }

    #[test]
    fn suffix_never_overlaps_prefix() {
        let a = StyledLine::plain("aaaa");
        let b = StyledLine::plain("aaaa");
        let p = a.common_prefix(&b);
        assert_eq!(p, 4);
        assert_eq!(a.common_suffix(&b, p), 0);
    }

    #[test]
    fn styled_text_round_trips() {
        let mut line = StyledLine::new();
        line.push_str("ok", Style::default().fg(Color::Indexed(4)));
        assert_eq!(line.text(), "ok");
        assert_eq!(line.to_string(), "ok");
    }

    proptest::proptest! {
        /// A column slice never occupies more columns than the range spans,
        /// and concatenating the two halves of any cut covers the full width.
        #[test]
        fn slice_width_is_bounded(
            text in "[a-z 世é\u{0301}]{0,30}",
            start in 0usize..40,
            len in 0usize..40,
        ) {
            let line = StyledLine::plain(&text);
            let slice = line.slice_cols(start, start + len);
            proptest::prop_assert!(slice.width() <= len);

            let head = line.slice_cols(0, start);
            let tail = line.slice_cols(start, usize::MAX);
            proptest::prop_assert_eq!(head.width() + tail.width(), line.width());
        }
    }
}
