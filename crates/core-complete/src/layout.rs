//! Columnar candidate listings.
//!
//! Candidates render in columns sized to the widest display text, fitted to
//! the terminal width. With grouping enabled, candidates cluster under bold
//! group headers in the order the groups first appear after sorting;
//! ungrouped candidates list first.

use crate::Candidate;
use core_style::{str_width, AttrFlags, Style, StyledLine};

#[derive(Debug, Clone, Copy)]
pub struct ListingLayout {
    /// Terminal width in columns.
    pub width: usize,
    /// Render group headers.
    pub group_headers: bool,
}

const COLUMN_GAP: usize = 2;

/// Lay out candidates as display rows.
pub fn candidate_rows(candidates: &[Candidate], layout: ListingLayout) -> Vec<StyledLine> {
    let mut rows = Vec::new();
    if candidates.is_empty() {
        return rows;
    }
    if layout.group_headers && candidates.iter().any(|c| c.group.is_some()) {
        let mut remaining: Vec<&Candidate> = candidates.iter().collect();
        // Ungrouped first, then groups in first-appearance order.
        let ungrouped: Vec<&Candidate> = remaining
            .iter()
            .copied()
            .filter(|c| c.group.is_none())
            .collect();
        columns_into(&ungrouped, layout.width, &mut rows);
        remaining.retain(|c| c.group.is_some());
        let mut seen: Vec<&str> = Vec::new();
        for c in &remaining {
            let group = c.group.as_deref().unwrap_or_default();
            if seen.contains(&group) {
                continue;
            }
            seen.push(group);
            let mut header = StyledLine::new();
            header.push_str(group, Style::default().attr(AttrFlags::BOLD));
            rows.push(header);
            let members: Vec<&Candidate> = remaining
                .iter()
                .copied()
                .filter(|c| c.group.as_deref() == Some(group))
                .collect();
            columns_into(&members, layout.width, &mut rows);
        }
    } else {
        let all: Vec<&Candidate> = candidates.iter().collect();
        columns_into(&all, layout.width, &mut rows);
    }
    rows
}

fn cell_text(c: &Candidate) -> String {
    match &c.description {
        Some(d) => format!("{}  ({d})", c.display_text()),
        None => c.display_text().to_string(),
    }
}

fn columns_into(candidates: &[&Candidate], width: usize, rows: &mut Vec<StyledLine>) {
    if candidates.is_empty() {
        return;
    }
    let cells: Vec<String> = candidates.iter().map(|c| cell_text(c)).collect();
    let cell_width = cells.iter().map(|s| str_width(s)).max().unwrap_or(1) + COLUMN_GAP;
    let columns = (width.max(1) / cell_width).max(1);
    for chunk in cells.chunks(columns) {
        let mut row = StyledLine::new();
        for (i, cell) in chunk.iter().enumerate() {
            row.push_str(cell, Style::default());
            if i + 1 < chunk.len() {
                let pad = cell_width - str_width(cell);
                for _ in 0..pad {
                    row.push(' ', Style::default());
                }
            }
        }
        rows.push(row);
    }
}
