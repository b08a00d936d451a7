// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image decoding: turns a PDF image stream (XObject or expanded inline
// image) into a `DynamicImage`.
//
// Supported: unfiltered, Flate/LZW/ASCII (through lopdf) and DCT (through the
// `image` crate) data; Gray, RGB, CMYK, Cal*, ICCBased and Indexed colour
// spaces; 1/2/4/8/16 bits per component; stencil masks and soft masks.

use blattwerk_core::error::{BlattwerkError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::debug;

use crate::pdf::objects::{dict_entry, dict_integer, filter_names, resolve, stream_data};

/// Filters whose output is not raw samples and which we cannot decode.
const UNSUPPORTED_FILTERS: [&str; 3] = ["JPXDecode", "JBIG2Decode", "CCITTFaxDecode"];

/// How raw samples map to colour.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette of `base` colours, `lookup` holds `base.components()` bytes per entry.
    Indexed { base: Box<ColorSpace>, lookup: Vec<u8> },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    fn parse(doc: &Document, object: &Object) -> Result<Self> {
        match resolve(doc, object)? {
            Object::Name(name) => Self::from_name(name),
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|item| resolve(doc, item).ok())
                    .and_then(|item| item.as_name().ok())
                    .ok_or_else(|| unsupported("colour space array without a family name"))?;
                match family {
                    b"ICCBased" => {
                        let profile = items
                            .get(1)
                            .map(|item| resolve(doc, item))
                            .transpose()?
                            .and_then(|item| item.as_stream().ok())
                            .ok_or_else(|| unsupported("ICCBased without a profile stream"))?;
                        match profile.dict.get(b"N").and_then(Object::as_i64) {
                            Ok(1) => Ok(Self::Gray),
                            Ok(3) => Ok(Self::Rgb),
                            Ok(4) => Ok(Self::Cmyk),
                            other => Err(unsupported(format!("ICCBased with N = {other:?}"))),
                        }
                    }
                    b"CalGray" => Ok(Self::Gray),
                    b"CalRGB" => Ok(Self::Rgb),
                    b"Indexed" | b"I" => {
                        let base = items
                            .get(1)
                            .ok_or_else(|| unsupported("Indexed without a base"))
                            .and_then(|base| Self::parse(doc, base))?;
                        if matches!(base, Self::Indexed { .. }) {
                            return Err(unsupported("nested Indexed colour space"));
                        }
                        let lookup = match items.get(3).map(|item| resolve(doc, item)).transpose()? {
                            Some(Object::String(bytes, _)) => bytes.clone(),
                            Some(Object::Stream(stream)) => stream_data(stream)?,
                            _ => return Err(unsupported("Indexed without a lookup table")),
                        };
                        Ok(Self::Indexed {
                            base: Box::new(base),
                            lookup,
                        })
                    }
                    other => Err(unsupported(format!(
                        "colour space {}",
                        String::from_utf8_lossy(other)
                    ))),
                }
            }
            _ => Err(unsupported("malformed /ColorSpace")),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(Self::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(Self::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(Self::Cmyk),
            other => Err(unsupported(format!(
                "colour space {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

fn unsupported(detail: impl Into<String>) -> BlattwerkError {
    BlattwerkError::UnsupportedImage(detail.into())
}

fn flag(doc: &Document, dict: &Dictionary, key: &[u8]) -> bool {
    dict.get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_bool().ok())
        .unwrap_or(false)
}

/// Whether `stream` is an image XObject.
pub fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

/// Abbreviated inline image keys and their full names.
const INLINE_KEYS: [(&[u8], &str); 9] = [
    (b"W", "Width"),
    (b"H", "Height"),
    (b"CS", "ColorSpace"),
    (b"BPC", "BitsPerComponent"),
    (b"IM", "ImageMask"),
    (b"D", "Decode"),
    (b"F", "Filter"),
    (b"DP", "DecodeParms"),
    (b"I", "Interpolate"),
];

const INLINE_FILTERS: [(&[u8], &str); 7] = [
    (b"AHx", "ASCIIHexDecode"),
    (b"A85", "ASCII85Decode"),
    (b"LZW", "LZWDecode"),
    (b"Fl", "FlateDecode"),
    (b"RL", "RunLengthDecode"),
    (b"CCF", "CCITTFaxDecode"),
    (b"DCT", "DCTDecode"),
];

const INLINE_COLOUR_SPACES: [(&[u8], &str); 4] = [
    (b"G", "DeviceGray"),
    (b"RGB", "DeviceRGB"),
    (b"CMYK", "DeviceCMYK"),
    (b"I", "Indexed"),
];

fn expand_name(name: &[u8], table: &[(&[u8], &str)]) -> Vec<u8> {
    table
        .iter()
        .find(|(short, _)| *short == name)
        .map_or_else(|| name.to_vec(), |(_, full)| full.as_bytes().to_vec())
}

fn expand_filters(value: &Object) -> Object {
    match value {
        Object::Name(name) => Object::Name(expand_name(name, &INLINE_FILTERS)),
        Object::Array(items) => Object::Array(items.iter().map(expand_filters).collect()),
        other => other.clone(),
    }
}

/// Inline colour spaces use short device names, or name an entry of the
/// page's /ColorSpace resources.
fn expand_colour_space(doc: &Document, value: &Object, resources: Option<&Dictionary>) -> Object {
    match value {
        Object::Name(name) if INLINE_COLOUR_SPACES.iter().any(|(short, _)| *short == name.as_slice()) => {
            Object::Name(expand_name(name, &INLINE_COLOUR_SPACES))
        }
        Object::Name(name) => resources
            .and_then(|res| dict_entry(doc, res, b"ColorSpace"))
            .and_then(|spaces| spaces.get(name).ok())
            .and_then(|entry| resolve(doc, entry).ok())
            .cloned()
            .unwrap_or_else(|| value.clone()),
        Object::Array(items) => Object::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| match (index, item) {
                    (0, Object::Name(name)) => Object::Name(expand_name(name, &INLINE_COLOUR_SPACES)),
                    (1, base) => expand_colour_space(doc, base, resources),
                    (_, other) => other.clone(),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Turn a `BI ... ID ... EI` image into an equivalent image XObject stream:
/// abbreviated keys, filter names and colour spaces are spelled out.
pub fn expand_inline_image(doc: &Document, inline: &Stream, resources: Option<&Dictionary>) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    for (key, value) in inline.dict.iter() {
        let key = expand_name(key, &INLINE_KEYS);
        let value = match key.as_slice() {
            b"ColorSpace" => expand_colour_space(doc, value, resources),
            b"Filter" => expand_filters(value),
            _ => value.clone(),
        };
        dict.set(key, value);
    }
    Stream::new(dict, inline.content.clone())
}

/// Decode an image XObject, applying its soft mask (if any) as alpha.
pub fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let image = decode_samples(doc, stream)?;

    let smask = stream
        .dict
        .get(b"SMask")
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_stream().ok());
    match smask {
        Some(mask_stream) => {
            let mask = decode_samples(doc, mask_stream)?.to_luma8();
            Ok(apply_alpha(image, mask))
        }
        None => Ok(image),
    }
}

fn decode_samples(doc: &Document, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let width = dict_integer(doc, dict, b"Width")
        .filter(|w| *w > 0)
        .ok_or_else(|| BlattwerkError::ImageError("missing or invalid /Width".into()))? as u32;
    let height = dict_integer(doc, dict, b"Height")
        .filter(|h| *h > 0)
        .ok_or_else(|| BlattwerkError::ImageError("missing or invalid /Height".into()))? as u32;

    let filters = filter_names(dict);
    if let Some(bad) = filters
        .iter()
        .find(|f| UNSUPPORTED_FILTERS.contains(&f.as_str()))
    {
        return Err(unsupported(bad.clone()));
    }

    if filters.iter().any(|f| f == "DCTDecode" || f == "DCT") {
        if filters.len() != 1 {
            return Err(unsupported(format!("filter chain {}", filters.join(", "))));
        }
        debug!(width, height, "Decoding DCT image");
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| BlattwerkError::ImageError(format!("JPEG decode failed: {err}")));
    }

    let data = stream_data(stream)?;

    if flag(doc, dict, b"ImageMask") {
        let inverted = matches!(
            dict.get(b"Decode"),
            Ok(Object::Array(values)) if values.first().and_then(|v| v.as_float().ok()) == Some(1.0)
        );
        return stencil_mask(&data, width, height, inverted);
    }

    let bits = dict_integer(doc, dict, b"BitsPerComponent").unwrap_or(8) as u32;
    if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
        return Err(unsupported(format!("{bits} bits per component")));
    }
    let color_space = match dict.get(b"ColorSpace") {
        Ok(object) => ColorSpace::parse(doc, object)?,
        Err(_) => return Err(unsupported("image without /ColorSpace")),
    };

    let samples = unpack_samples(&data, width, height, color_space.components(), bits)?;
    build_image(samples, width, height, &color_space, bits)
}

/// Unpack `bits`-wide samples row by row (rows are byte aligned).
fn unpack_samples(data: &[u8], width: u32, height: u32, components: usize, bits: u32) -> Result<Vec<u16>> {
    let per_row = width as usize * components;
    let stride = (per_row * bits as usize).div_ceil(8);
    let needed = stride * height as usize;
    if data.len() < needed {
        return Err(BlattwerkError::ImageError(format!(
            "truncated image data: {} of {needed} bytes",
            data.len()
        )));
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data[..needed].chunks_exact(stride) {
        match bits {
            8 => samples.extend(row[..per_row].iter().map(|&b| b as u16)),
            16 => samples.extend(
                row.chunks_exact(2)
                    .take(per_row)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let mask = (1u16 << bits) - 1;
                for index in 0..per_row {
                    let bit_offset = index * bits as usize;
                    let byte = row[bit_offset / 8] as u16;
                    let shift = 8 - bits as usize - (bit_offset % 8);
                    samples.push((byte >> shift) & mask);
                }
            }
        }
    }
    Ok(samples)
}

/// Scale a `bits`-wide sample to 0..=255.
fn scale(sample: u16, bits: u32) -> u8 {
    match bits {
        8 => sample as u8,
        16 => (sample >> 8) as u8,
        _ => ((sample as u32 * 255) / ((1u32 << bits) - 1)) as u8,
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let white = 255 - k as u32;
    [
        ((255 - c as u32) * white / 255) as u8,
        ((255 - m as u32) * white / 255) as u8,
        ((255 - y as u32) * white / 255) as u8,
    ]
}

fn build_image(samples: Vec<u16>, width: u32, height: u32, space: &ColorSpace, bits: u32) -> Result<DynamicImage> {
    let raw_error = || BlattwerkError::ImageError("sample count does not match dimensions".into());
    match space {
        ColorSpace::Gray => {
            let pixels = samples.iter().map(|&s| scale(s, bits)).collect();
            GrayImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(raw_error)
        }
        ColorSpace::Rgb => {
            let pixels = samples.iter().map(|&s| scale(s, bits)).collect();
            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(raw_error)
        }
        ColorSpace::Cmyk => {
            let pixels = samples
                .chunks_exact(4)
                .flat_map(|px| {
                    cmyk_to_rgb(scale(px[0], bits), scale(px[1], bits), scale(px[2], bits), scale(px[3], bits))
                })
                .collect();
            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(raw_error)
        }
        ColorSpace::Indexed { base, lookup } => {
            let entry = base.components();
            let mut pixels = Vec::with_capacity(samples.len() * 3);
            for &index in &samples {
                let start = index as usize * entry;
                let colour = lookup
                    .get(start..start + entry)
                    .ok_or_else(|| BlattwerkError::ImageError(format!("palette index {index} out of range")))?;
                match base.as_ref() {
                    ColorSpace::Gray => pixels.extend([colour[0]; 3]),
                    ColorSpace::Rgb => pixels.extend_from_slice(colour),
                    ColorSpace::Cmyk => pixels.extend(cmyk_to_rgb(colour[0], colour[1], colour[2], colour[3])),
                    ColorSpace::Indexed { .. } => return Err(unsupported("nested Indexed colour space")),
                }
            }
            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(raw_error)
        }
    }
}

/// A 1-bit stencil: painted samples become black, the rest white.
fn stencil_mask(data: &[u8], width: u32, height: u32, inverted: bool) -> Result<DynamicImage> {
    let samples = unpack_samples(data, width, height, 1, 1)?;
    let pixels = samples
        .into_iter()
        .map(|bit| if (bit == 0) != inverted { 0 } else { 255 })
        .collect();
    GrayImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageLuma8)
        .ok_or_else(|| BlattwerkError::ImageError("stencil mask size mismatch".into()))
}

/// Attach `mask` as the alpha channel, resampling it when sizes differ.
fn apply_alpha(image: DynamicImage, mask: GrayImage) -> DynamicImage {
    let mut rgba: RgbaImage = image.to_rgba8();
    let mask = if mask.dimensions() == rgba.dimensions() {
        mask
    } else {
        image::imageops::resize(
            &mask,
            rgba.width(),
            rgba.height(),
            image::imageops::FilterType::Triangle,
        )
    };
    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = alpha.0[0];
    }
    DynamicImage::ImageRgba8(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::image_stream;

    fn doc() -> Document {
        Document::with_version("1.5")
    }

    #[test]
    fn decodes_rgb_samples() {
        let stream = image_stream(2, 1, b"DeviceRGB", 8, vec![255, 0, 0, 0, 0, 255]);
        let image = decode_image(&doc(), &stream).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn unpacks_one_bit_gray_with_row_padding() {
        // 3 px wide: each row uses one byte, top bits only.
        let stream = image_stream(3, 2, b"DeviceGray", 1, vec![0b1010_0000, 0b0100_0000]);
        let image = decode_image(&doc(), &stream).unwrap().to_luma8();
        let pixels: Vec<u8> = image.pixels().map(|p| p.0[0]).collect();
        assert_eq!(pixels, vec![255, 0, 255, 0, 255, 0]);
    }

    #[test]
    fn converts_cmyk_to_rgb() {
        let stream = image_stream(1, 1, b"DeviceCMYK", 8, vec![0, 255, 255, 0]);
        let image = decode_image(&doc(), &stream).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn resolves_indexed_palette() {
        let mut stream = image_stream(2, 1, b"DeviceRGB", 8, vec![1, 0]);
        stream.dict.set(
            "ColorSpace",
            Object::Array(vec![
                Object::Name(b"Indexed".to_vec()),
                Object::Name(b"DeviceRGB".to_vec()),
                Object::Integer(1),
                Object::String(vec![10, 20, 30, 40, 50, 60], lopdf::StringFormat::Hexadecimal),
            ]),
        );
        let image = decode_image(&doc(), &stream).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [40, 50, 60]);
        assert_eq!(image.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn soft_mask_becomes_alpha() {
        let mut document = doc();
        let mask_id = document.add_object(image_stream(2, 1, b"DeviceGray", 8, vec![0, 128]));
        let mut stream = image_stream(2, 1, b"DeviceRGB", 8, vec![1, 2, 3, 4, 5, 6]);
        stream.dict.set("SMask", Object::Reference(mask_id));

        let image = decode_image(&document, &stream).unwrap();
        assert!(image.color().has_alpha());
        let rgba = image.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [1, 2, 3, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [4, 5, 6, 128]);
    }

    #[test]
    fn stencil_mask_paints_zero_bits_black() {
        let mut stream = image_stream(2, 1, b"DeviceGray", 1, vec![0b0100_0000]);
        stream.dict.remove(b"ColorSpace");
        stream.dict.set("ImageMask", Object::Boolean(true));
        let image = decode_image(&doc(), &stream).unwrap().to_luma8();
        assert_eq!(image.get_pixel(0, 0).0, [0]);
        assert_eq!(image.get_pixel(1, 0).0, [255]);
    }

    #[test]
    fn truncated_data_is_an_image_error() {
        let stream = image_stream(4, 4, b"DeviceRGB", 8, vec![0; 10]);
        assert!(matches!(
            decode_image(&doc(), &stream),
            Err(BlattwerkError::ImageError(_))
        ));
    }

    #[test]
    fn jbig2_is_unsupported() {
        let mut stream = image_stream(1, 1, b"DeviceGray", 1, vec![0]);
        stream.dict.set("Filter", Object::Name(b"JBIG2Decode".to_vec()));
        assert!(matches!(
            decode_image(&doc(), &stream),
            Err(BlattwerkError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn lab_colour_space_is_unsupported() {
        let mut stream = image_stream(1, 1, b"DeviceRGB", 8, vec![50, 0, 0]);
        stream.dict.set(
            "ColorSpace",
            Object::Array(vec![Object::Name(b"Lab".to_vec()), Object::Dictionary(Dictionary::new())]),
        );
        assert!(matches!(
            decode_image(&doc(), &stream),
            Err(BlattwerkError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn real_decode_array_inverts_stencil() {
        let mut stream = image_stream(2, 1, b"DeviceGray", 1, vec![0b0100_0000]);
        stream.dict.remove(b"ColorSpace");
        stream.dict.set("ImageMask", Object::Boolean(true));
        stream
            .dict
            .set("Decode", Object::Array(vec![Object::Real(1.0), Object::Real(0.0)]));
        let image = decode_image(&doc(), &stream).unwrap().to_luma8();
        assert_eq!(image.get_pixel(0, 0).0, [255]);
        assert_eq!(image.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn indirect_dimensions_are_followed() {
        let mut document = doc();
        let width = document.add_object(Object::Integer(2));
        let mut stream = image_stream(2, 1, b"DeviceGray", 8, vec![0, 255]);
        stream.dict.set("Width", Object::Reference(width));
        let image = decode_image(&document, &stream).unwrap();
        assert_eq!(image.width(), 2);
    }

    #[test]
    fn expands_abbreviated_inline_dictionary() {
        let inline = Stream::new(
            Dictionary::from_iter(vec![
                ("W", Object::Integer(1)),
                ("H", Object::Integer(1)),
                ("CS", Object::Name(b"G".to_vec())),
                ("BPC", Object::Integer(8)),
                ("F", Object::Array(vec![Object::Name(b"A85".to_vec()), Object::Name(b"Fl".to_vec())])),
            ]),
            vec![0],
        );
        let expanded = expand_inline_image(&doc(), &inline, None);
        assert!(is_image(&expanded));
        let dict = &expanded.dict;
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 1);
        assert_eq!(dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 8);
        assert_eq!(dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(filter_names(dict), vec!["ASCII85Decode", "FlateDecode"]);
        assert!(dict.get(b"W").is_err());
    }

    #[test]
    fn inline_colour_space_resolves_through_resources() {
        let indexed = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(0),
            Object::String(vec![1, 2, 3], lopdf::StringFormat::Hexadecimal),
        ]);
        let spaces = Dictionary::from_iter(vec![("CS0", indexed.clone())]);
        let resources = Dictionary::from_iter(vec![("ColorSpace", Object::Dictionary(spaces))]);
        let inline = Stream::new(
            Dictionary::from_iter(vec![
                ("W", Object::Integer(1)),
                ("H", Object::Integer(1)),
                ("CS", Object::Name(b"CS0".to_vec())),
                ("BPC", Object::Integer(8)),
            ]),
            vec![0],
        );
        let expanded = expand_inline_image(&doc(), &inline, Some(&resources));
        let image = decode_image(&doc(), &expanded).unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn separation_colour_space_is_unsupported() {
        let mut stream = image_stream(1, 1, b"DeviceGray", 8, vec![0]);
        stream.dict.set("ColorSpace", Object::Name(b"Pattern".to_vec()));
        assert!(matches!(
            decode_image(&doc(), &stream),
            Err(BlattwerkError::UnsupportedImage(_))
        ));
    }
}
