// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;
use blattwerk_core::paths::OutputNamer;
use blattwerk_core::types::TableFormat;
use blattwerk_document::PdfReader;
use blattwerk_document::layout::{extract_tables, render_tables};
use tracing::info;

pub fn run(pdf: &Path, format: TableFormat, config: &ToolConfig, out: &mut dyn Write) -> Result<()> {
    let reader = PdfReader::open(pdf)?;
    reader.require_pages()?;
    let scan = extract_tables(reader.document(), &config.table);

    for (page, err) in &scan.errors {
        writeln!(out, "Page {page}: could not analyse ({err})")?;
    }
    if scan.tables.is_empty() {
        writeln!(out, "No tables found in {} page(s).", scan.pages_scanned)?;
        return Ok(());
    }

    let target = OutputNamer::new(pdf, None).tables(format);
    std::fs::write(&target, render_tables(&scan.tables, format))?;
    info!(path = %target.display(), tables = scan.tables.len(), "Tables written");

    for table in &scan.tables {
        writeln!(out, "Page {}: {}", table.page, table.dimensions())?;
    }
    writeln!(out, "Wrote {} table(s) to {}", scan.tables.len(), target.display())?;
    Ok(())
}
