// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::error::Result;
use blattwerk_core::paths::OutputNamer;
use blattwerk_document::PdfReader;
use blattwerk_document::pdf::{parse_split_points, split_to_files};

pub fn run(pdf: &Path, at: Option<&str>, out: &mut dyn Write) -> Result<()> {
    let points = match at {
        Some(raw) => parse_split_points(raw)?,
        None => Vec::new(),
    };
    let reader = PdfReader::open(pdf)?;
    let parts = split_to_files(&reader, &points, &OutputNamer::new(pdf, None))?;

    for part in &parts {
        writeln!(out, "Pages {}: {}", part.range, part.path.display())?;
    }
    writeln!(out, "Wrote {} file(s) from {} page(s).", parts.len(), reader.page_count())?;
    Ok(())
}
