//! Frame assembly and minimal-repaint display engine.
//!
//! A [`Frame`] is the grid the terminal is believed to show: styled rows
//! plus the cursor cell. [`layout`] folds prompt + buffer (+ rows below)
//! into display rows for a given width — the prompt opens the first row,
//! every later row opens with the continuation prompt, and a wide cell
//! never splits across rows. [`engine::Display`] then diffs desired frames
//! against the previous one and emits the smallest rewrite it can.
//!
//! Invariants:
//! * Row width never exceeds the terminal width.
//! * The cursor always addresses a cell inside (or one past) its row.
//! * Reconciling the same frame twice writes nothing the second time.

pub mod engine;

pub use engine::Display;

use core_style::StyledLine;

/// The grid believed to be on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub rows: Vec<StyledLine>,
    /// (row, column) of the cursor within the frame.
    pub cursor: (u16, u16),
}

impl Frame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Inputs to frame layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub prompt: &'a StyledLine,
    pub secondary_prompt: &'a StyledLine,
    /// Buffer content, already masked and tab-expanded.
    pub content: &'a StyledLine,
    /// Cursor as an index into `content` cells.
    pub cursor_cell: usize,
    /// Extra rows below the edit area (search status, listings).
    pub below: &'a [StyledLine],
    pub width: u16,
}

/// Split prompt + content into wrapped display rows.
pub fn layout(input: &LayoutInput<'_>) -> Frame {
    let width = input.width.max(2) as usize;
    let mut rows: Vec<StyledLine> = Vec::new();
    let mut row = input.prompt.clone();
    let mut col = row.width();
    let mut cursor: Option<(u16, u16)> = None;

    let start_continuation = |rows: &mut Vec<StyledLine>, row: &mut StyledLine, col: &mut usize| {
        rows.push(std::mem::replace(row, input.secondary_prompt.clone()));
        *col = row.width();
    };

    for (i, cell) in input.content.cells().iter().enumerate() {
        if cell.ch == '\n' {
            if i == input.cursor_cell {
                cursor = Some((rows.len() as u16, col as u16));
            }
            start_continuation(&mut rows, &mut row, &mut col);
            continue;
        }
        let w = cell.width();
        if col + w > width {
            start_continuation(&mut rows, &mut row, &mut col);
        }
        if i == input.cursor_cell {
            cursor = Some((rows.len() as u16, col as u16));
        }
        row.push(cell.ch, cell.style);
        col += w;
    }
    if cursor.is_none() {
        // Cursor past the last cell; wrap it onto a fresh row when the
        // current one is exactly full.
        if col >= width {
            start_continuation(&mut rows, &mut row, &mut col);
        }
        cursor = Some((rows.len() as u16, col as u16));
    }
    rows.push(row);

    for extra in input.below {
        rows.push(extra.slice_cols(0, width));
    }

    Frame {
        rows,
        cursor: cursor.unwrap_or((0, 0)),
    }
}

/// Apply a mask to buffer text: NUL hides input entirely.
pub fn masked_content(text: &str, mask: char) -> StyledLine {
    let mut line = StyledLine::new();
    if mask == '\0' {
        return line;
    }
    for _ in text.chars() {
        line.push(mask, core_style::Style::default());
    }
    line
}

/// Helper for callers building content rows out of plain text.
pub fn plain_content(text: &str) -> StyledLine {
    StyledLine::plain(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_style::str_width;

    fn frame(prompt: &str, secondary: &str, content: &str, cursor: usize, width: u16) -> Frame {
        let p = StyledLine::plain(prompt);
        let s = StyledLine::plain(secondary);
        let c = StyledLine::plain(content);
        layout(&LayoutInput {
            prompt: &p,
            secondary_prompt: &s,
            content: &c,
            cursor_cell: cursor,
            below: &[],
            width,
        })
    }

    #[test]
    fn single_row_fits() {
        let f = frame("> ", "| ", "hi world", 8, 80);
        assert_eq!(f.rows.len(), 1);
        assert_eq!(f.rows[0].text(), "> hi world");
        assert_eq!(f.cursor, (0, 10));
    }

    #[test]
    fn soft_wrap_uses_continuation_prompt() {
        let f = frame("> ", "| ", "abcdefgh", 8, 6);
        assert_eq!(f.rows.len(), 3);
        assert_eq!(f.rows[0].text(), "> abcd");
        assert_eq!(f.rows[1].text(), "| efgh");
        assert_eq!(f.rows[2].text(), "| ");
        // Cursor at end of content wraps onto the fresh row.
        assert_eq!(f.cursor, (2, 2));
    }

    #[test]
    fn hard_newline_starts_continuation_row() {
        let f = frame("> ", "| ", "ab\ncd", 5, 80);
        assert_eq!(f.rows.len(), 2);
        assert_eq!(f.rows[0].text(), "> ab");
        assert_eq!(f.rows[1].text(), "| cd");
        assert_eq!(f.cursor, (1, 4));
    }

    #[test]
    fn wide_cell_never_splits() {
        // Width 5, prompt 2: "世" (2 cols) at col 4 would straddle; wraps.
        let f = frame("> ", "| ", "ab世", 3, 5);
        assert_eq!(f.rows[0].text(), "> ab");
        assert_eq!(f.rows[1].text(), "| 世");
    }

    #[test]
    fn total_width_is_preserved() {
        // Universal property: sum of row widths == prompt + content width
        // plus per-row continuation prompts.
        let prompt = "> ";
        let content = "abcdefghijklmnop";
        let f = frame(prompt, "| ", content, 0, 7);
        let total: usize = f.rows.iter().map(StyledLine::width).sum();
        let continuations = f.rows.len() - 1;
        assert_eq!(
            total,
            str_width(prompt) + str_width(content) + continuations * 2
        );
    }

    #[test]
    fn cursor_tracks_mid_content() {
        let f = frame("> ", "| ", "abcdef", 3, 80);
        assert_eq!(f.cursor, (0, 5));
    }

    #[test]
    fn below_rows_are_clipped() {
        let p = StyledLine::plain("> ");
        let s = StyledLine::plain("");
        let c = StyledLine::plain("x");
        let below = vec![StyledLine::plain("0123456789")];
        let f = layout(&LayoutInput {
            prompt: &p,
            secondary_prompt: &s,
            content: &c,
            cursor_cell: 1,
            below: &below,
            width: 6,
        });
        assert_eq!(f.rows.len(), 2);
        assert_eq!(f.rows[1].text(), "012345");
    }

    #[test]
    fn masked_content_substitutes() {
        let m = masked_content("secret", '*');
        assert_eq!(m.text(), "******");
        let hidden = masked_content("secret", '\0');
        assert!(hidden.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn rows_stay_inside_width(
            content in "[a-z0-9 世é]{0,60}",
            width in 4u16..50,
            cursor in 0usize..70,
        ) {
            let f = frame("> ", "| ", &content, cursor, width);
            for row in &f.rows {
                proptest::prop_assert!(row.width() <= width as usize);
            }
            let (cr, cc) = f.cursor;
            proptest::prop_assert!((cr as usize) < f.rows.len());
            proptest::prop_assert!((cc as usize) <= width as usize);
        }
    }
}
