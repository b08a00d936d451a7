// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: PDF and image operations behind the Blattwerk tools.
//
// PDF structure (read, split, merge, metadata), duplicate-aware image
// extraction, the font fallback chain, layout analysis for tables and text,
// whole-document internals reports, and batch OCR.

pub mod analysis;
pub mod fonts;
pub mod image;
pub mod layout;
pub mod pdf;
pub mod scan;

#[cfg(test)]
mod testing;

pub use analysis::InternalsReport;
pub use fonts::{FontFallbackChain, FontReport};
pub use image::{ImageExtractor, ImageProcessor};
pub use layout::{ExtractedTable, PageText};
pub use pdf::metadata::DocumentMetadata;
pub use pdf::reader::PdfReader;
pub use scan::OcrSource;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrEngine;
