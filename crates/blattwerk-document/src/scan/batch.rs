// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch OCR: recognise each image and write `<image stem>.txt` beside it.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::OutputNamer;
use image::DynamicImage;
use tracing::{info, instrument, warn};

use super::prepare::enhance_for_ocr;
use crate::image::ImageProcessor;

/// Something that turns an image into text.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// Drop lines that are empty or whitespace only.
pub fn strip_empty_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOutput {
    pub source: PathBuf,
    pub output: PathBuf,
    pub lines: usize,
}

#[derive(Debug, Default)]
pub struct OcrBatchSummary {
    pub written: Vec<OcrOutput>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Recognise one image and write its text file.
pub fn recognize_file(recognizer: &dyn TextRecognizer, source: &Path, enhance: bool) -> Result<OcrOutput> {
    if !source.is_file() {
        return Err(BlattwerkError::FileNotFound(source.to_path_buf()));
    }
    let mut image = ImageProcessor::open(source)?.into_dynamic();
    if enhance {
        image = enhance_for_ocr(image);
    }
    let text = strip_empty_lines(&recognizer.recognize(&image)?);
    let output = OutputNamer::new(source, None).text();
    std::fs::write(&output, &text)?;
    Ok(OcrOutput {
        source: source.to_path_buf(),
        output,
        lines: text.lines().count(),
    })
}

/// Process every input; a failing image is logged and skipped.
#[instrument(skip_all, fields(inputs = inputs.len(), enhance))]
pub fn run_batch(recognizer: &dyn TextRecognizer, inputs: &[PathBuf], enhance: bool) -> OcrBatchSummary {
    let mut summary = OcrBatchSummary::default();
    for source in inputs {
        match recognize_file(recognizer, source, enhance) {
            Ok(output) => {
                info!(source = %source.display(), output = %output.output.display(), "Text written");
                summary.written.push(output);
            }
            Err(err) => {
                warn!(source = %source.display(), %err, "OCR failed");
                summary.failed.push((source.clone(), err.to_string()));
            }
        }
    }
    summary
}
