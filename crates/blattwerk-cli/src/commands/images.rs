// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::Path;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;
use blattwerk_core::paths::OutputNamer;
use blattwerk_core::types::OutputImageFormat;
use blattwerk_document::{ImageExtractor, PdfReader};

pub fn run(
    pdf: &Path,
    format: OutputImageFormat,
    output_dir: Option<&Path>,
    config: &ToolConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let reader = PdfReader::open(pdf)?;
    reader.require_pages()?;
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let summary = ImageExtractor::new(format)
        .with_jpeg_quality(config.jpeg_quality)
        .extract_to_files(&reader, &OutputNamer::new(pdf, output_dir))?;

    for emitted in &summary.written {
        let pages: Vec<String> = emitted
            .record
            .occurrence_pages
            .iter()
            .map(u32::to_string)
            .collect();
        writeln!(out, "{} (pages {})", emitted.path.display(), pages.join(", "))?;
    }
    writeln!(out)?;
    writeln!(out, "Pages scanned:      {}", summary.pages_scanned)?;
    writeln!(out, "Images seen:        {}", summary.images_seen)?;
    writeln!(out, "Unique written:     {}", summary.unique_written)?;
    writeln!(out, "Duplicates skipped: {}", summary.duplicates_skipped)?;
    writeln!(out, "Failed:             {}", summary.failed)?;
    Ok(())
}
