// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table detection over baseline-grouped lines.

use blattwerk_core::config::TableSettings;
use blattwerk_core::error::Result;
use lopdf::{Document, ObjectId};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::lines::{TextLine, group_lines};
use super::text_runs::page_text_runs;

/// Vertical distance, in line heights, that still continues a table.
const MAX_ROW_GAP: f32 = 2.5;

/// Cell start positions closer than this many ems fall in one column.
const COLUMN_TOLERANCE: f32 = 1.0;

/// A detected table: rows of equal length, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// `RxC cells` label used when grouping tables by shape.
    pub fn dimensions(&self) -> String {
        format!("{}x{} cells", self.row_count(), self.column_count())
    }
}

/// Find tables among a page's lines.
pub fn detect_tables(lines: &[TextLine], settings: &TableSettings) -> Vec<Vec<Vec<String>>> {
    let mut tables = Vec::new();
    let mut block: Vec<&TextLine> = Vec::new();

    let mut flush = |block: &mut Vec<&TextLine>| {
        if block.len() >= settings.min_rows
            && let Some(rows) = anchor_columns(block, settings.min_columns)
        {
            tables.push(rows);
        }
        block.clear();
    };

    for line in lines {
        let wide_enough = line.cells.len() >= settings.min_columns;
        let adjacent = block.last().is_none_or(|previous| {
            let height = previous.font_size.max(line.font_size).max(1.0);
            previous.y - line.y <= height * MAX_ROW_GAP
        });
        if !(wide_enough && adjacent) {
            flush(&mut block);
        }
        if wide_enough {
            block.push(line);
        }
    }
    flush(&mut block);
    tables
}

/// Cluster cell start positions into columns and lay every line out on them.
fn anchor_columns(block: &[&TextLine], min_columns: usize) -> Option<Vec<Vec<String>>> {
    let em = block
        .iter()
        .map(|line| line.font_size)
        .fold(0.0f32, f32::max)
        .max(1.0);
    let tolerance = em * COLUMN_TOLERANCE;

    let mut starts: Vec<f32> = block
        .iter()
        .flat_map(|line| line.cells.iter().map(|cell| cell.x))
        .collect();
    starts.sort_by(f32::total_cmp);

    let mut anchors: Vec<f32> = Vec::new();
    let mut last = f32::NEG_INFINITY;
    for x in starts {
        if x - last > tolerance {
            anchors.push(x);
        }
        last = x;
    }
    if anchors.len() < min_columns {
        return None;
    }

    let rows = block
        .iter()
        .map(|line| {
            let mut row = vec![String::new(); anchors.len()];
            for cell in &line.cells {
                let column = anchors
                    .partition_point(|anchor| *anchor <= cell.x + tolerance)
                    .saturating_sub(1);
                let slot = &mut row[column];
                if !slot.is_empty() {
                    slot.push(' ');
                }
                slot.push_str(&cell.text);
            }
            row
        })
        .collect();
    Some(rows)
}

/// Tables of one page.
pub fn page_tables(
    doc: &Document,
    page_number: u32,
    page_id: ObjectId,
    settings: &TableSettings,
) -> Result<Vec<ExtractedTable>> {
    let runs = page_text_runs(doc, page_id)?;
    let lines = group_lines(&runs);
    Ok(detect_tables(&lines, settings)
        .into_iter()
        .map(|rows| ExtractedTable {
            page: page_number,
            rows,
        })
        .collect())
}

/// Tables across a document plus the pages that could not be analysed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableScan {
    pub tables: Vec<ExtractedTable>,
    pub pages_scanned: u32,
    pub errors: Vec<(u32, String)>,
}

/// Detect tables on every page. A page that fails is recorded and skipped.
#[instrument(skip_all)]
pub fn extract_tables(doc: &Document, settings: &TableSettings) -> TableScan {
    let mut scan = TableScan::default();
    for (page_number, page_id) in doc.get_pages() {
        scan.pages_scanned += 1;
        match page_tables(doc, page_number, page_id, settings) {
            Ok(tables) => {
                if !tables.is_empty() {
                    debug!(page = page_number, tables = tables.len(), "Tables found");
                }
                scan.tables.extend(tables);
            }
            Err(err) => {
                warn!(page = page_number, %err, "Table detection failed");
                scan.errors.push((page_number, err.to_string()));
            }
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lines::Cell;
    use crate::testing::PdfBuilder;

    fn line(y: f32, cells: &[(f32, &str)]) -> TextLine {
        TextLine {
            y,
            font_size: 10.0,
            cells: cells
                .iter()
                .map(|(x, text)| Cell {
                    x: *x,
                    end_x: x + 20.0,
                    text: (*text).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn aligned_lines_form_a_table() {
        let lines = vec![
            line(720.0, &[(72.0, "Heading paragraph")]),
            line(700.0, &[(72.0, "Item"), (200.0, "Qty"), (300.0, "Price")]),
            line(686.0, &[(72.0, "Apple"), (202.0, "3"), (300.0, "1.20")]),
            line(672.0, &[(72.0, "Pear"), (300.0, "0.80")]),
            line(600.0, &[(72.0, "Closing text")]),
        ];
        let tables = detect_tables(&lines, &TableSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec!["Item", "Qty", "Price"],
                vec!["Apple", "3", "1.20"],
                vec!["Pear", "", "0.80"],
            ]
        );
    }

    #[test]
    fn a_single_line_is_not_a_table() {
        let lines = vec![line(700.0, &[(72.0, "a"), (200.0, "b")])];
        assert!(detect_tables(&lines, &TableSettings::default()).is_empty());
    }

    #[test]
    fn large_vertical_gap_splits_tables() {
        let lines = vec![
            line(700.0, &[(72.0, "a"), (200.0, "b")]),
            line(688.0, &[(72.0, "c"), (200.0, "d")]),
            line(400.0, &[(72.0, "e"), (200.0, "f")]),
            line(388.0, &[(72.0, "g"), (200.0, "h")]),
        ];
        assert_eq!(detect_tables(&lines, &TableSettings::default()).len(), 2);
    }

    #[test]
    fn min_columns_is_honoured() {
        let settings = TableSettings {
            min_rows: 2,
            min_columns: 3,
        };
        let lines = vec![
            line(700.0, &[(72.0, "a"), (200.0, "b")]),
            line(688.0, &[(72.0, "c"), (200.0, "d")]),
        ];
        assert!(detect_tables(&lines, &settings).is_empty());
    }

    #[test]
    fn tables_from_a_real_page() {
        let mut builder = PdfBuilder::new();
        builder.add_page(
            "BT /F1 10 Tf 72 700 Td (Name) Tj 150 0 Td (Score) Tj ET \
             BT /F1 10 Tf 72 686 Td (Ada) Tj 150 0 Td (98) Tj ET \
             BT /F1 10 Tf 72 672 Td (Linus) Tj 150 0 Td (91) Tj ET",
        );
        builder.add_text_page("plain");
        let doc = builder.build();

        let scan = extract_tables(&doc, &TableSettings::default());
        assert_eq!(scan.pages_scanned, 2);
        assert!(scan.errors.is_empty());
        assert_eq!(scan.tables.len(), 1);
        let table = &scan.tables[0];
        assert_eq!(table.page, 1);
        assert_eq!(table.dimensions(), "3x2 cells");
        assert_eq!(table.rows[2], vec!["Linus", "91"]);
    }
}
