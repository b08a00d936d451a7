// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optional clean-up of scanned images before recognition.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use tracing::{debug, instrument};

use crate::image::ImageProcessor;

/// Contrast factor applied before binarisation.
const CONTRAST_BOOST: f32 = 1.4;

/// Grayscale, boost contrast, then binarise at the Otsu threshold.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn enhance_for_ocr(image: DynamicImage) -> DynamicImage {
    let gray = ImageProcessor::from_dynamic(image)
        .grayscale()
        .adjust_contrast(CONTRAST_BOOST)
        .into_dynamic()
        .to_luma8();
    let level = otsu_level(&gray);
    debug!(level, "Otsu threshold");
    DynamicImage::ImageLuma8(binarize(&gray, level))
}

/// Pixels at or below `level` become black, the rest white.
fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let Luma([value]) = *gray.get_pixel(x, y);
        Luma([if value <= level { 0 } else { 255 }])
    })
}
