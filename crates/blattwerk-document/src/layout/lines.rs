// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grouping text runs into baseline-aligned lines and gap-separated cells.

use super::text_runs::TextRun;

/// Baseline tolerance as a fraction of the font size.
const BASELINE_TOLERANCE: f32 = 0.3;

/// Horizontal gap, in ems, that starts a new cell.
const CELL_GAP: f32 = 1.0;

/// Gap, in ems, above which two runs of one cell are joined with a space.
const WORD_GAP: f32 = 0.1;

/// A horizontally contiguous stretch of text within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub x: f32,
    pub end_x: f32,
    pub text: String,
}

/// Runs sharing a baseline, split into cells, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub y: f32,
    /// Largest font size on the line.
    pub font_size: f32,
    pub cells: Vec<Cell>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|cell| cell.text.as_str())
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Group runs into lines, top of the page first.
pub fn group_lines(runs: &[TextRun]) -> Vec<TextLine> {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut grouped: Vec<(f32, Vec<&TextRun>)> = Vec::new();
    for run in sorted {
        let tolerance = (run.font_size * BASELINE_TOLERANCE).max(1.0);
        match grouped.last_mut() {
            Some((y, members)) if (*y - run.y).abs() <= tolerance => members.push(run),
            _ => grouped.push((run.y, vec![run])),
        }
    }

    grouped
        .into_iter()
        .map(|(y, mut members)| {
            members.sort_by(|a, b| a.x.total_cmp(&b.x));
            let font_size = members.iter().map(|r| r.font_size).fold(0.0, f32::max);
            TextLine {
                y,
                font_size,
                cells: split_cells(&members),
            }
        })
        .collect()
}

fn split_cells(runs: &[&TextRun]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for run in runs {
        let em = run.font_size.max(1.0);
        match cells.last_mut() {
            Some(cell) if run.x - cell.end_x <= em * CELL_GAP => {
                if run.x - cell.end_x > em * WORD_GAP && !cell.text.ends_with(' ') {
                    cell.text.push(' ');
                }
                cell.text.push_str(&run.text);
                cell.end_x = cell.end_x.max(run.end_x());
            }
            _ => cells.push(Cell {
                x: run.x,
                end_x: run.end_x(),
                text: run.text.clone(),
            }),
        }
    }
    for cell in &mut cells {
        cell.text = cell.text.trim().to_string();
    }
    cells.retain(|cell| !cell.text.is_empty());
    cells
}

/// Plain text of a page: one line per baseline.
pub fn page_text(runs: &[TextRun]) -> String {
    group_lines(runs)
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}
