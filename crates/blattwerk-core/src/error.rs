// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Input errors --
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not a PDF file: {}", .0.display())]
    NotAPdf(PathBuf),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("document has no pages")]
    NoPages,

    #[error("split point {point} is out of range (1-{max})")]
    SplitPointOutOfRange { point: u32, max: u32 },

    #[error("invalid split point list '{0}': use comma-separated page numbers, e.g. 7 or 7,11")]
    InvalidSplitPoints(String),

    #[error("no inputs: {0}")]
    NoInputs(String),

    // -- Per-unit errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("font extraction failed: {0}")]
    FontError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Environment errors --
    #[error("feature '{feature}' is not available in this build")]
    FeatureUnavailable { feature: &'static str },

    #[error("OCR model not found at {}", .0.display())]
    OcrModelMissing(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
