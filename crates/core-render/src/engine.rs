//! Frame reconciliation.
//!
//! [`Display`] owns the previously rendered frame and the physical cursor
//! position (relative to the frame origin) and emits the minimal byte
//! stream that turns the old frame into the new one:
//!
//! * unchanged rows are skipped entirely;
//! * changed rows rewrite only the span between their common prefix and
//!   suffix (suffix reuse only when the middle widths agree);
//! * rows the new frame no longer occupies are cleared explicitly;
//! * cursor motion prefers parameterized relative moves, degrading to
//!   CR + rewrites when the capability set has none.
//!
//! Writing into the last column follows the capability flags: with `am`
//! and `xenl` a space + CR forces the pending wrap; otherwise the next row
//! is entered explicitly. All output is batched into one write per
//! reconcile so a frame is never half-flushed.

use crate::Frame;
use core_style::{render_line, Cell, ColorMode, StyledLine};
use core_terminal::{Capabilities, TerminalError, TerminalProvider};
use tracing::trace;

pub struct Display {
    caps: Capabilities,
    color_mode: ColorMode,
    prev: Option<Frame>,
    /// Physical cursor, relative to the frame origin.
    cur: (u16, u16),
    /// Rows known to exist on screen below the origin (drives \n vs cud).
    known_rows: u16,
    /// Set by invalidate: wipe everything below the origin before painting.
    need_clear: bool,
}

impl Display {
    pub fn new(caps: Capabilities, color_mode: ColorMode) -> Self {
        Self {
            caps,
            color_mode,
            prev: None,
            cur: (0, 0),
            known_rows: 0,
            need_clear: false,
        }
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Forget the previous frame (resize, external output): the next
    /// reconcile repaints from scratch.
    pub fn invalidate(&mut self) {
        self.prev = None;
        self.need_clear = true;
    }

    /// The physical cursor is known to be at the frame origin (after a
    /// clear-screen); start fresh without emitting a clear.
    pub fn reset_origin(&mut self) {
        self.prev = None;
        self.cur = (0, 0);
        self.known_rows = 0;
        self.need_clear = false;
    }

    pub fn previous(&self) -> Option<&Frame> {
        self.prev.as_ref()
    }

    /// Ring the bell (silently ignored without the capability).
    pub fn bell(&mut self, provider: &mut dyn TerminalProvider) -> Result<(), TerminalError> {
        provider.write(self.caps.bell.as_bytes())?;
        provider.flush()
    }

    /// Bring the terminal in line with `desired`.
    pub fn reconcile(
        &mut self,
        desired: &Frame,
        width: u16,
        provider: &mut dyn TerminalProvider,
    ) -> Result<(), TerminalError> {
        let prev = self.prev.take().unwrap_or_default();
        let mut out = String::new();

        if self.need_clear {
            self.move_to(&mut out, 0, 0);
            self.clear_below(&mut out);
            self.need_clear = false;
            // Everything below the origin is blank now.
            self.known_rows = 0;
        }

        let rows = prev.rows.len().max(desired.rows.len());
        for r in 0..rows {
            let old = prev.rows.get(r);
            let new = desired.rows.get(r);
            match (old, new) {
                (Some(o), Some(n)) if o == n => {}
                (_, Some(n)) => {
                    let empty = StyledLine::new();
                    let o = old.unwrap_or(&empty);
                    self.rewrite_row(&mut out, r as u16, o, n, width);
                }
                (Some(_), None) => {
                    // The frame shrank: clear the leftover row.
                    self.move_to(&mut out, r as u16, 0);
                    self.clear_to_eol(&mut out, width as usize);
                }
                (None, None) => unreachable!(),
            }
        }

        self.move_to(&mut out, desired.cursor.0, desired.cursor.1);
        self.known_rows = self.known_rows.max(desired.rows.len() as u16);
        if !out.is_empty() {
            trace!(target: "render.diff", bytes = out.len(), rows = desired.rows.len(), "reconcile emit");
            provider.write(out.as_bytes())?;
            provider.flush()?;
        }
        self.prev = Some(desired.clone());
        Ok(())
    }

    /// Erase the rendered frame (erase_on_finish).
    pub fn clear_frame(
        &mut self,
        provider: &mut dyn TerminalProvider,
    ) -> Result<(), TerminalError> {
        let mut out = String::new();
        self.move_to(&mut out, 0, 0);
        self.clear_below(&mut out);
        if !out.is_empty() {
            provider.write(out.as_bytes())?;
            provider.flush()?;
        }
        self.prev = Some(Frame::empty());
        self.known_rows = 0;
        Ok(())
    }

    /// Leave the frame on screen and park the cursor on a fresh line below
    /// it (end of a read). Resets diff state for the next read.
    pub fn finish(&mut self, provider: &mut dyn TerminalProvider) -> Result<(), TerminalError> {
        let mut out = String::new();
        if let Some(prev) = self.prev.take() {
            let last = prev.rows.len().saturating_sub(1) as u16;
            let col = prev.rows.last().map(|r| r.width() as u16).unwrap_or(0);
            self.move_to(&mut out, last, col);
        }
        out.push_str("\r\n");
        provider.write(out.as_bytes())?;
        provider.flush()?;
        self.cur = (0, 0);
        self.known_rows = 0;
        self.prev = None;
        Ok(())
    }

    /// Print text above the frame (external printer): the caller is
    /// expected to invalidate + reconcile right after.
    pub fn print_above(
        &mut self,
        text: &str,
        provider: &mut dyn TerminalProvider,
    ) -> Result<(), TerminalError> {
        let mut out = String::new();
        self.move_to(&mut out, 0, 0);
        self.clear_below(&mut out);
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push_str("\r\n");
        }
        provider.write(out.as_bytes())?;
        provider.flush()?;
        // The frame origin moved below the printed text.
        self.cur = (0, 0);
        self.known_rows = 0;
        self.prev = None;
        self.need_clear = false;
        Ok(())
    }

    // --- row rewrite ----------------------------------------------------

    fn rewrite_row(
        &mut self,
        out: &mut String,
        row: u16,
        old: &StyledLine,
        new: &StyledLine,
        width: u16,
    ) {
        let p = old.common_prefix(new);
        let s = old.common_suffix(new, p);
        let old_mid: &[Cell] = &old.cells()[p..old.len() - s];
        let new_mid: &[Cell] = &new.cells()[p..new.len() - s];
        let old_mid_w: usize = old_mid.iter().map(Cell::width).sum();
        let new_mid_w: usize = new_mid.iter().map(Cell::width).sum();

        let prefix_col = new.width_of_prefix(p);
        if s > 0 && old_mid_w == new_mid_w {
            // Suffix stays put: rewrite only the middle.
            self.move_to(out, row, prefix_col as u16);
            self.write_cells(out, new_mid, width);
        } else {
            self.move_to(out, row, prefix_col as u16);
            self.write_cells(out, &new.cells()[p..], width);
            if new.width() < old.width() {
                self.clear_to_eol(out, old.width() - new.width());
            }
        }
    }

    fn write_cells(&mut self, out: &mut String, cells: &[Cell], width: u16) {
        if cells.is_empty() {
            return;
        }
        let mut line = StyledLine::new();
        for c in cells {
            line.push(c.ch, c.style);
        }
        render_line(&line, self.color_mode, out);
        self.cur.1 += line.width() as u16;
        if self.cur.1 >= width {
            self.normalize_wrap(out);
        }
    }

    /// Leave a deterministic cursor position after writing into the last
    /// column.
    fn normalize_wrap(&mut self, out: &mut String) {
        if self.caps.auto_right_margin && self.caps.eat_newline_glitch {
            // The wrap is pending; a space forces it, CR homes the new row.
            out.push_str(" \r");
        } else if self.caps.auto_right_margin {
            // Already wrapped; just home the column.
            out.push('\r');
        } else {
            out.push_str("\r\n");
        }
        self.cur = (self.cur.0 + 1, 0);
        self.known_rows = self.known_rows.max(self.cur.0 + 1);
    }

    // --- cursor motion --------------------------------------------------

    fn move_to(&mut self, out: &mut String, row: u16, col: u16) {
        if row < self.cur.0 {
            match self.caps.move_up(self.cur.0 - row) {
                Some(seq) => out.push_str(&seq),
                None => {
                    // No way up: repaint in place is the caller's fallback;
                    // clamp to the reachable row.
                    self.cur.0 = row;
                }
            }
        } else if row > self.cur.0 {
            let delta = row - self.cur.0;
            if row >= self.known_rows {
                // Rows that may not exist yet: line feeds allocate them
                // (and scroll at the bottom of the screen, unlike cud).
                out.push('\r');
                for _ in 0..delta {
                    out.push('\n');
                }
                self.cur.1 = 0;
                self.known_rows = self.known_rows.max(row + 1);
            } else if let Some(seq) = self.caps.move_down(delta) {
                out.push_str(&seq);
            } else {
                out.push('\r');
                for _ in 0..delta {
                    out.push('\n');
                }
                self.cur.1 = 0;
            }
        }
        self.cur.0 = row;

        if col != self.cur.1 {
            out.push('\r');
            if col > 0 {
                match self.caps.move_right(col) {
                    Some(seq) => out.push_str(&seq),
                    // Without cuf the caller rewrites rows from column 0,
                    // so landing there is consistent.
                    None => {}
                }
            }
            self.cur.1 = col;
        }
    }

    fn clear_to_eol(&mut self, out: &mut String, cols_to_cover: usize) {
        match self.caps.clr_eol {
            Some(el) => out.push_str(el),
            None => {
                // Overwrite with blanks and return.
                let start = self.cur.1;
                for _ in 0..cols_to_cover {
                    out.push(' ');
                }
                out.push('\r');
                if start > 0
                    && let Some(seq) = self.caps.move_right(start)
                {
                    out.push_str(&seq);
                }
            }
        }
    }

    fn clear_below(&mut self, out: &mut String) {
        match self.caps.clr_eos {
            Some(ed) => out.push_str(ed),
            None => {
                if let Some(el) = self.caps.clr_eol {
                    out.push_str(el);
                }
            }
        }
    }
}
