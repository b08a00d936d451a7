// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::error::Result;
use blattwerk_document::pdf::metadata::thousands;
use blattwerk_document::{DocumentMetadata, PdfReader};

pub fn run(pdf: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let reader = PdfReader::open(pdf)?;
    let meta = DocumentMetadata::read(&reader);
    if json {
        serde_json::to_writer_pretty(&mut *out, &meta)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "File: {}", pdf.display())?;
    writeln!(out, "File size: {} bytes", thousands(meta.file_size))?;
    writeln!(out, "Pages: {}", meta.page_count)?;
    writeln!(out, "PDF version: {}", meta.version)?;
    writeln!(out, "Encrypted: {}", if meta.encrypted { "yes" } else { "no" })?;
    writeln!(out)?;

    if !meta.has_fields() {
        writeln!(out, "No document information fields.")?;
        return Ok(());
    }
    for field in &meta.standard {
        writeln!(out, "{}: {}", field.label, field.value)?;
    }
    if !meta.custom.is_empty() {
        writeln!(out)?;
        writeln!(out, "Custom fields:")?;
        for field in &meta.custom {
            writeln!(out, "  {}: {}", field.label, field.value)?;
        }
    }
    Ok(())
}
