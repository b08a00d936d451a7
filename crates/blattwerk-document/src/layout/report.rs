// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text and HTML renderings of extracted tables and page text.

use blattwerk_core::config::TableSettings;
use blattwerk_core::types::TableFormat;
use lopdf::Document;
use tracing::{debug, instrument, warn};

use super::lines::{group_lines, TextLine};
use super::tables::{ExtractedTable, detect_tables};
use super::text_runs::page_text_runs;

/// Longest error excerpt written into a text report.
const ERROR_EXCERPT: usize = 50;

/// Column widths: widest cell per column, at least `minimum`.
fn column_widths(rows: &[Vec<String>], minimum: usize) -> Vec<usize> {
    let columns = rows.first().map_or(0, Vec::len);
    (0..columns)
        .map(|column| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .max(minimum)
        })
        .collect()
}

fn push_rows(out: &mut Vec<String>, rows: &[Vec<String>], minimum_width: usize) {
    let widths = column_widths(rows, minimum_width);
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        out.push(cells.join(" | "));
    }
}

/// Tables as banner-separated, column-aligned text.
pub fn tables_to_txt(tables: &[ExtractedTable]) -> String {
    let rule = "=".repeat(80);
    let mut out = Vec::new();
    for (index, table) in tables.iter().enumerate() {
        out.push(rule.clone());
        out.push(format!("Table {} (Page {})", index + 1, table.page));
        out.push(rule.clone());
        out.push(String::new());
        push_rows(&mut out, &table.rows, 0);
        out.push(String::new());
    }
    out.join("\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const HTML_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h2 { color: #333; }
table { border-collapse: collapse; margin: 20px 0; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #4CAF50; color: white; }
tr:nth-child(even) { background-color: #f2f2f2; }";

/// Tables as a standalone HTML document; the first row of each is its header.
pub fn tables_to_html(tables: &[ExtractedTable]) -> String {
    let mut out = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".into(),
        "<head>".into(),
        "<meta charset='UTF-8'>".into(),
        "<title>Extracted Tables</title>".into(),
        "<style>".into(),
        HTML_STYLE.into(),
        "</style>".into(),
        "</head>".into(),
        "<body>".into(),
        "<h1>Extracted Tables</h1>".into(),
    ];

    for (index, table) in tables.iter().enumerate() {
        out.push(format!("<h2>Table {} (Page {})</h2>", index + 1, table.page));
        out.push("<table>".into());
        if let Some((header, body)) = table.rows.split_first() {
            out.push("<thead><tr>".into());
            out.extend(header.iter().map(|cell| format!("<th>{}</th>", escape_html(cell))));
            out.push("</tr></thead>".into());
            if !body.is_empty() {
                out.push("<tbody>".into());
                for row in body {
                    out.push("<tr>".into());
                    out.extend(row.iter().map(|cell| format!("<td>{}</td>", escape_html(cell))));
                    out.push("</tr>".into());
                }
                out.push("</tbody>".into());
            }
        }
        out.push("</table>".into());
    }

    out.push("</body>".into());
    out.push("</html>".into());
    out.join("\n")
}

pub fn render_tables(tables: &[ExtractedTable], format: TableFormat) -> String {
    match format {
        TableFormat::Txt => tables_to_txt(tables),
        TableFormat::Html => tables_to_html(tables),
    }
}

/// What was extracted from one page for the text report.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub page: u32,
    /// Page text, or the reason it could not be read.
    pub text: std::result::Result<String, String>,
    pub tables: Vec<ExtractedTable>,
}

/// Text and tables of every page. Per-page failures are kept in the result.
#[instrument(skip_all)]
pub fn extract_page_texts(doc: &Document, settings: &TableSettings) -> Vec<PageText> {
    doc.get_pages()
        .into_iter()
        .map(|(page, page_id)| match page_text_runs(doc, page_id) {
            Ok(runs) => {
                let lines = group_lines(&runs);
                let text = lines.iter().map(TextLine::text).collect::<Vec<_>>().join("\n");
                let tables = detect_tables(&lines, settings)
                    .into_iter()
                    .map(|rows| ExtractedTable { page, rows })
                    .collect::<Vec<_>>();
                debug!(page, lines = lines.len(), tables = tables.len(), "Page extracted");
                PageText {
                    page,
                    text: Ok(text),
                    tables,
                }
            }
            Err(err) => {
                warn!(page, %err, "Text extraction failed");
                PageText {
                    page,
                    text: Err(err.to_string()),
                    tables: Vec::new(),
                }
            }
        })
        .collect()
}

/// The `<stem>.txt` report: a banner per page, its text, then its tables.
pub fn text_report(pages: &[PageText]) -> String {
    let page_rule = "=".repeat(70);
    let table_rule = "-".repeat(70);
    let mut out = Vec::new();

    for page in pages {
        out.push(page_rule.clone());
        out.push(format!("PAGE {}", page.page));
        out.push(page_rule.clone());
        out.push(String::new());

        match &page.text {
            Ok(text) if !text.trim().is_empty() => {
                out.push(text.clone());
                out.push(String::new());
            }
            Ok(_) => {}
            Err(err) => {
                let excerpt: String = err.chars().take(ERROR_EXCERPT).collect();
                out.push(format!("[Error extracting text: {excerpt}]"));
                out.push(String::new());
            }
        }

        for (index, table) in page.tables.iter().enumerate() {
            out.push(table_rule.clone());
            out.push(format!("TABLE {} (Page {})", index + 1, page.page));
            out.push(table_rule.clone());
            push_rows(&mut out, &table.rows, 5);
            out.push(String::new());
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(page: u32, rows: &[&[&str]]) -> ExtractedTable {
        ExtractedTable {
            page,
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn txt_pads_columns_to_widest_cell() {
        let rendered = tables_to_txt(&[table(3, &[&["Item", "Qty"], &["Banana", "12"]])]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "=".repeat(80));
        assert_eq!(lines[1], "Table 1 (Page 3)");
        assert_eq!(lines[4], "Item   | Qty");
        assert_eq!(lines[5], "Banana | 12 ");
    }

    #[test]
    fn html_escapes_and_splits_header() {
        let rendered = tables_to_html(&[table(1, &[&["A&B", "<c>"], &["1", "2"]])]);
        assert!(rendered.starts_with("<!DOCTYPE html>"));
        assert!(rendered.contains("<h2>Table 1 (Page 1)</h2>"));
        assert!(rendered.contains("<th>A&amp;B</th>"));
        assert!(rendered.contains("<th>&lt;c&gt;</th>"));
        assert!(rendered.contains("<tbody>\n<tr>\n<td>1</td>"));
        assert!(rendered.ends_with("</body>\n</html>"));
    }

    #[test]
    fn header_only_table_has_no_body() {
        let rendered = tables_to_html(&[table(1, &[&["x", "y"]])]);
        assert!(!rendered.contains("<tbody>"));
    }

    #[test]
    fn text_report_layout() {
        let pages = vec![
            PageText {
                page: 1,
                text: Ok("Hello".into()),
                tables: vec![table(1, &[&["a", "bb"], &["c", "d"]])],
            },
            PageText {
                page: 2,
                text: Err("x".repeat(80)),
                tables: Vec::new(),
            },
        ];
        let report = text_report(&pages);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "PAGE 1");
        assert_eq!(lines[4], "Hello");
        assert_eq!(lines[7], "TABLE 1 (Page 1)");
        assert_eq!(lines[9], "a     | bb   ");
        assert!(report.contains(&format!("[Error extracting text: {}]", "x".repeat(50))));
    }

    #[test]
    fn extracts_text_per_page() {
        let doc = crate::testing::text_document(2, "Doc");
        let pages = extract_page_texts(&doc, &TableSettings::default());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].text.as_deref(), Ok("Doc-Page-2"));
        assert!(pages[0].tables.is_empty());
    }
}
