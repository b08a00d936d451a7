// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: pixel-layout conversion, grayscale/contrast adjustment and
// PNG/JPEG encoding. Operates on in-memory images using the `image` crate.

use std::path::Path;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{ContentDigest, OutputImageFormat};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining:
///
/// ```ignore
/// let bytes = ImageProcessor::from_dynamic(img)
///     .prepare_for(OutputImageFormat::Jpeg)
///     .encode(OutputImageFormat::Jpeg, 90)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            BlattwerkError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        debug!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Composite onto an opaque white background, dropping the alpha channel.
    pub fn flatten_alpha(self) -> Self {
        if !self.image.color().has_alpha() {
            return self;
        }
        let rgba = self.image.to_rgba8();
        let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
            let over_white = |channel: u8| -> u8 {
                let alpha = a as u32;
                ((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8
            };
            image::Rgb([over_white(r), over_white(g), over_white(b)])
        });
        Self {
            image: DynamicImage::ImageRgb8(flattened),
        }
    }

    /// Convert to the pixel layout `format` stores: JPEG gets 8-bit RGB or
    /// gray with alpha flattened, PNG keeps gray/RGB and alpha at 8 bits.
    pub fn prepare_for(self, format: OutputImageFormat) -> Self {
        let image = match format {
            OutputImageFormat::Jpeg => match self.flatten_alpha().image {
                DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gray),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            },
            OutputImageFormat::Png => match self.image {
                image @ (DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLumaA8(_)
                | DynamicImage::ImageRgb8(_)
                | DynamicImage::ImageRgba8(_)) => image,
                other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        };
        Self { image }
    }

    /// Convert the image to grayscale (luma).
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Adjust contrast by a factor around mid-gray. Values > 1.0 increase
    /// contrast; 1.0 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let mut gray = self.image.to_luma8();
        for pixel in gray.pixels_mut() {
            let val = factor * (pixel.0[0] as f32 - 128.0) + 128.0;
            pixel.0[0] = val.clamp(0.0, 255.0) as u8;
        }
        Self {
            image: DynamicImage::ImageLuma8(gray),
        }
    }

    // -- Identity -------------------------------------------------------------

    /// Digest over dimensions, pixel layout and raw pixel bytes.
    pub fn digest(&self) -> ContentDigest {
        let layout = format!("{:?}", self.image.color());
        ContentDigest::of_parts(&[
            self.image.width().to_be_bytes().as_slice(),
            self.image.height().to_be_bytes().as_slice(),
            layout.as_bytes(),
            self.image.as_bytes(),
        ])
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| BlattwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        let flattened = match &self.image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => self.image.clone(),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        flattened
            .write_with_encoder(encoder)
            .map_err(|err| BlattwerkError::ImageError(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    pub fn encode(&self, format: OutputImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        match format {
            OutputImageFormat::Png => self.to_png_bytes(),
            OutputImageFormat::Jpeg => self.to_jpeg_bytes(jpeg_quality),
        }
    }

    /// Encode and write to `path`.
    pub fn save(&self, path: &Path, format: OutputImageFormat, jpeg_quality: u8) -> Result<()> {
        let bytes = self.encode(format, jpeg_quality)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbaImage};

    fn translucent_red() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 0])))
    }

    #[test]
    fn flattening_transparent_pixels_gives_white() {
        let flat = ImageProcessor::from_dynamic(translucent_red()).flatten_alpha();
        let rgb = flat.as_dynamic().as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn flattening_half_alpha_blends() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 128]));
        let flat = ImageProcessor::from_dynamic(DynamicImage::ImageRgba8(img)).flatten_alpha();
        let value = flat.as_dynamic().as_rgb8().unwrap().get_pixel(0, 0).0[0];
        assert_eq!(value, 127);
    }

    #[test]
    fn jpeg_preparation_drops_alpha_png_keeps_it() {
        let jpeg = ImageProcessor::from_dynamic(translucent_red()).prepare_for(OutputImageFormat::Jpeg);
        assert!(!jpeg.as_dynamic().color().has_alpha());

        let png = ImageProcessor::from_dynamic(translucent_red()).prepare_for(OutputImageFormat::Png);
        assert!(png.as_dynamic().color().has_alpha());
    }

    #[test]
    fn digest_depends_on_pixels_and_shape() {
        let a = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_raw(2, 1, vec![1, 2]).unwrap()));
        let b = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_raw(1, 2, vec![1, 2]).unwrap()));
        let c = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_raw(2, 1, vec![1, 2]).unwrap()));
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), c.digest());
    }

    #[test]
    fn encodes_both_formats() {
        let processor = ImageProcessor::from_dynamic(translucent_red());
        let png = processor.to_png_bytes().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let jpeg = processor.to_jpeg_bytes(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn contrast_stretches_around_mid_gray() {
        let img = GrayImage::from_raw(2, 1, vec![100, 200]).unwrap();
        let out = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(img)).adjust_contrast(2.0);
        let gray = out.as_dynamic().as_luma8().unwrap();
        assert_eq!(gray.get_pixel(0, 0).0, [72]);
        assert_eq!(gray.get_pixel(1, 0).0, [255]);
    }
}
