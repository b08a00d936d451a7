// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout analysis: positioned text runs, lines, cells and tables, plus the
// text and table reports built from them.

pub mod cmap;
pub mod lines;
pub mod report;
pub mod tables;
pub mod text_runs;

pub use lines::{Cell, TextLine, group_lines, page_text};
pub use report::{PageText, extract_page_texts, render_tables, tables_to_html, tables_to_txt, text_report};
pub use tables::{ExtractedTable, TableScan, detect_tables, extract_tables, page_tables};
pub use text_runs::{TextRun, page_text_runs};
