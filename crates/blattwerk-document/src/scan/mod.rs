// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR pipeline: input resolution, optional enhancement, and recognition.

pub mod batch;
pub mod inputs;
pub mod prepare;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use batch::{OcrBatchSummary, OcrOutput, TextRecognizer, run_batch, strip_empty_lines};
pub use inputs::OcrSource;
pub use prepare::enhance_for_ocr;

#[cfg(feature = "ocr")]
pub use ocr::{OcrEngine, OcrModels, load_recognizer};

/// Built without the `ocr` feature there is no engine to load.
#[cfg(not(feature = "ocr"))]
pub fn load_recognizer(
    _model_dir: Option<&std::path::Path>,
) -> blattwerk_core::error::Result<Box<dyn TextRecognizer>> {
    Err(blattwerk_core::error::BlattwerkError::FeatureUnavailable { feature: "ocr" })
}
