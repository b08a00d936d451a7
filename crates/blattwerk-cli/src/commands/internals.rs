// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;
use blattwerk_document::{InternalsReport, PdfReader};

pub fn run(pdf: &Path, json: bool, config: &ToolConfig, out: &mut dyn Write) -> Result<()> {
    let reader = PdfReader::open(pdf)?;
    let report = InternalsReport::analyze(&reader, &config.table);
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", report.render(&config.report))?;
    }
    Ok(())
}
