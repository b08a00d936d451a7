// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;
use blattwerk_core::paths::OutputNamer;
use blattwerk_document::PdfReader;
use blattwerk_document::layout::{extract_page_texts, text_report};
use tracing::warn;

pub fn run(pdf: &Path, config: &ToolConfig, out: &mut dyn Write) -> Result<()> {
    let reader = PdfReader::open(pdf)?;
    reader.require_pages()?;
    let pages = extract_page_texts(reader.document(), &config.table);

    let report = text_report(&pages);
    let target = OutputNamer::new(pdf, None).text();
    std::fs::write(&target, &report)?;

    let failed = pages.iter().filter(|page| page.text.is_err()).count();
    let tables: usize = pages.iter().map(|page| page.tables.len()).sum();
    let has_text = pages
        .iter()
        .any(|page| page.text.as_ref().is_ok_and(|text| !text.trim().is_empty()));
    if !has_text && tables == 0 {
        warn!(path = %pdf.display(), "No text extracted; the PDF may be scanned images");
    }

    writeln!(
        out,
        "Wrote {} page(s), {} table(s) to {}",
        pages.len(),
        tables,
        target.display()
    )?;
    if failed > 0 {
        writeln!(out, "{failed} page(s) could not be read; see the report for details.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{text_page, write_pdf};

    #[test]
    fn writes_page_banners_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path(), "notes.pdf", &[&text_page("First"), &text_page("Second")]);
        let mut out = Vec::new();
        run(&pdf, &ToolConfig::default(), &mut out).unwrap();

        let report = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
        assert!(report.contains("PAGE 1"));
        assert!(report.contains("First"));
        assert!(report.contains("PAGE 2"));
        assert!(report.contains("Second"));
        assert!(String::from_utf8(out).unwrap().starts_with("Wrote 2 page(s), 0 table(s)"));
    }

    #[test]
    fn empty_pages_still_write_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path(), "blank.pdf", &[""]);
        run(&pdf, &ToolConfig::default(), &mut Vec::new()).unwrap();
        assert!(dir.path().join("blank.txt").is_file());
    }
}
