// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::PathBuf;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;
use blattwerk_document::OcrSource;
use blattwerk_document::scan::{load_recognizer, run_batch};

pub fn run(
    files: Vec<PathBuf>,
    dir: Option<PathBuf>,
    png: bool,
    jpg: bool,
    enhance: bool,
    config: &ToolConfig,
    out: &mut dyn Write,
) -> Result<()> {
    let inputs = OcrSource::from_args(files, dir, png, jpg)?.resolve()?;
    if inputs.is_empty() {
        writeln!(out, "No image files found.")?;
        return Ok(());
    }

    // Loaded once: a missing feature or model is reported a single time.
    let recognizer = load_recognizer(config.ocr_model_dir.as_deref())?;
    let summary = run_batch(recognizer.as_ref(), &inputs, enhance);

    for output in &summary.written {
        writeln!(
            out,
            "{} -> {} ({} lines)",
            output.source.display(),
            output.output.display(),
            output.lines
        )?;
    }
    for (source, err) in &summary.failed {
        writeln!(out, "{}: failed ({err})", source.display())?;
    }
    writeln!(
        out,
        "Processed {} of {} image(s).",
        summary.written.len(),
        inputs.len()
    )?;
    Ok(())
}
