// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: XObject decoding, pixel conversion, and duplicate-aware
// extraction.

pub mod decode;
pub mod extract;
pub mod processor;

pub use extract::{DuplicateIndex, ExtractionSummary, ImageExtractor, ImageRecord, PageImage, page_images};
pub use processor::ImageProcessor;
