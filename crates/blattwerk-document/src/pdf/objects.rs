// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Object-graph helpers over `lopdf`: reference resolution, inherited page
// attributes, content stream bytes, and PDF text string decoding.

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Maximum depth followed through /Parent chains and nested references.
const MAX_DEPTH: usize = 32;

/// Wrap a `lopdf` error with context.
pub fn pdf_error(context: impl std::fmt::Display, err: lopdf::Error) -> BlattwerkError {
    BlattwerkError::PdfError(format!("{context}: {err}"))
}

/// Follow indirect references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match current {
            Object::Reference(id) => {
                current = doc
                    .get_object(*id)
                    .map_err(|err| pdf_error(format!("object {} {} R", id.0, id.1), err))?
            }
            other => return Ok(other),
        }
    }
    Err(BlattwerkError::PdfError(format!(
        "reference chain longer than {MAX_DEPTH}"
    )))
}

/// Resolve `object` to a dictionary. Streams yield their dictionary.
pub fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, object).ok()? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Look up `key` in `dict` and resolve it to a dictionary.
pub fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key).ok().and_then(|obj| resolve_dict(doc, obj))
}

/// Integer entry of `dict`, following references.
pub fn dict_integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_i64().ok())
}

/// Look up `key` on a page, walking up the page tree for inheritable attributes
/// (Resources, MediaBox, CropBox, Rotate).
pub fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(doc, parent)?;
    }
    None
}

/// The effective resource dictionary of a page (own or inherited).
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(doc, page_id, b"Resources").and_then(|obj| resolve_dict(doc, obj))
}

/// Names of the filters applied to a stream, in application order.
pub fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Decoded bytes of a stream. Unfiltered streams are returned as stored.
pub fn stream_data(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().map_err(|err| {
            pdf_error(
                format!("cannot decode stream ({})", filter_names(&stream.dict).join(", ")),
                err,
            )
        })
    } else {
        Ok(stream.content.clone())
    }
}

/// Concatenated, decoded content of a page's /Contents (single stream or array).
pub fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| pdf_error("page object", err))?;
    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    let mut data = Vec::new();
    match resolve(doc, contents)? {
        Object::Stream(stream) => data.extend(stream_data(stream)?),
        Object::Array(parts) => {
            for part in parts {
                match resolve(doc, part)? {
                    Object::Stream(stream) => data.extend(stream_data(stream)?),
                    _ => {
                        return Err(BlattwerkError::PdfError(
                            "/Contents array entry is not a stream".into(),
                        ));
                    }
                }
                data.push(b'\n');
            }
        }
        _ => {
            return Err(BlattwerkError::PdfError(
                "/Contents is neither a stream nor an array".into(),
            ));
        }
    }
    Ok(data)
}

/// A name object as an owned string, without the leading slash.
pub fn name_string(object: &Object) -> Option<String> {
    object
        .as_name()
        .ok()
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

/// Render a PDF object as display text: names without slash, strings decoded,
/// numbers as written.
pub fn display_value(doc: &Document, object: &Object) -> String {
    match resolve(doc, object) {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        Ok(Object::String(bytes, _)) => decode_text_string(bytes),
        Ok(Object::Integer(value)) => value.to_string(),
        Ok(Object::Real(value)) => value.to_string(),
        Ok(Object::Boolean(value)) => value.to_string(),
        Ok(Object::Null) => String::new(),
        Ok(Object::Array(items)) => items
            .iter()
            .map(|item| display_value(doc, item))
            .collect::<Vec<_>>()
            .join(" "),
        Ok(other) => format!("{other:?}"),
        Err(err) => format!("<unresolved: {err}>"),
    }
}

/// PDFDocEncoding code points for bytes 0x80..=0xA0 that differ from Latin-1.
const PDF_DOC_HIGH: [u16; 33] = [
    0x2022, 0x2020, 0x2021, 0x2026, 0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203a, 0x2212,
    0x2030, 0x201e, 0x201c, 0x201d, 0x2018, 0x2019, 0x201a, 0x2122, 0xfb01, 0xfb02, 0x0141,
    0x0152, 0x0160, 0x0178, 0x017d, 0x0131, 0x0142, 0x0153, 0x0161, 0x017e, 0xfffd, 0x20ac,
];

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, otherwise
/// PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(body) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(body).into_owned();
    }
    bytes
        .iter()
        .map(|&byte| match byte {
            0x80..=0xA0 => {
                char::from_u32(PDF_DOC_HIGH[(byte - 0x80) as usize] as u32).unwrap_or('\u{fffd}')
            }
            other => other as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PdfBuilder;

    #[test]
    fn decodes_utf16_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69, 0x20, 0xAC];
        assert_eq!(decode_text_string(&bytes), "Hi€");
    }

    #[test]
    fn decodes_pdfdoc_specials() {
        assert_eq!(decode_text_string(b"caf\xe9 \x84"), "café —");
    }

    #[test]
    fn filter_names_handles_name_and_array() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        assert_eq!(filter_names(&dict), vec!["FlateDecode"]);

        dict.set(
            "Filter",
            Object::Array(vec![
                Object::Name(b"ASCII85Decode".to_vec()),
                Object::Name(b"DCTDecode".to_vec()),
            ]),
        );
        assert_eq!(filter_names(&dict), vec!["ASCII85Decode", "DCTDecode"]);
    }

    #[test]
    fn resources_are_inherited_from_page_tree() {
        let mut builder = PdfBuilder::new();
        builder.inherit_resources();
        let page = builder.add_page("BT /F1 12 Tf (x) Tj ET");
        let doc = builder.build();

        let resources = page_resources(&doc, page).expect("inherited resources");
        assert!(resources.has(b"Font"));
        assert!(inherited_attribute(&doc, page, b"MediaBox").is_some());
    }

    #[test]
    fn page_content_joins_stream_arrays() {
        let mut builder = PdfBuilder::new();
        let page = builder.add_page_with_streams(&["BT (a) Tj ET", "BT (b) Tj ET"]);
        let doc = builder.build();

        let content = String::from_utf8(page_content(&doc, page).unwrap()).unwrap();
        assert!(content.contains("(a) Tj"));
        assert!(content.contains("(b) Tj"));
    }
}
