// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The three font detection strategies, from strictest to most forgiving.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use regex::bytes::Regex;

use super::chain::{FontDescriptor, FontStrategy, StrategyOutput};
use crate::pdf::objects::{dict_entry, name_string, page_content, page_resources, resolve, stream_data};

/// Nesting limit for Form XObjects.
const MAX_FORM_DEPTH: usize = 12;

const FONT_FILES: [&[u8]; 3] = [b"FontFile", b"FontFile2", b"FontFile3"];

fn font_error(detail: impl Into<String>) -> BlattwerkError {
    BlattwerkError::FontError(detail.into())
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Resolve `object` to a dictionary or fail.
fn strict_dict<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Dictionary> {
    match resolve(doc, object).map_err(|err| font_error(err.to_string()))? {
        Object::Dictionary(dict) => Ok(dict),
        Object::Stream(stream) => Ok(&stream.dict),
        _ => Err(font_error("expected a font dictionary")),
    }
}

/// Build a descriptor from a font dictionary, following Type0 descendants to
/// the font descriptor.
pub fn describe_font(doc: &Document, font: &Dictionary) -> Result<FontDescriptor> {
    let name = font
        .get(b"BaseFont")
        .ok()
        .and_then(name_string)
        .unwrap_or_else(|| "Unknown".to_string());
    let subtype = font
        .get(b"Subtype")
        .ok()
        .and_then(name_string)
        .unwrap_or_else(|| "Unknown".to_string());

    let encoding = match font.get(b"Encoding") {
        Ok(object) => match resolve(doc, object).map_err(|err| font_error(err.to_string()))? {
            Object::Name(encoding) => Some(lossy(encoding)),
            Object::Dictionary(dict) => Some(
                dict.get(b"BaseEncoding")
                    .ok()
                    .and_then(name_string)
                    .unwrap_or_else(|| "Custom".to_string()),
            ),
            Object::Stream(stream) => Some(
                stream
                    .dict
                    .get(b"CMapName")
                    .ok()
                    .and_then(name_string)
                    .unwrap_or_else(|| "Embedded CMap".to_string()),
            ),
            _ => None,
        },
        Err(_) => None,
    };

    let descriptor_owner = if subtype == "Type0" {
        let descendants = font
            .get(b"DescendantFonts")
            .map_err(|_| font_error(format!("Type0 font {name} without /DescendantFonts")))?;
        match resolve(doc, descendants).map_err(|err| font_error(err.to_string()))? {
            Object::Array(items) => match items.first() {
                Some(first) => strict_dict(doc, first)?,
                None => return Err(font_error(format!("Type0 font {name} has no descendant"))),
            },
            _ => return Err(font_error(format!("Type0 font {name}: /DescendantFonts is not an array"))),
        }
    } else {
        font
    };

    let descriptor = match descriptor_owner.get(b"FontDescriptor") {
        Ok(object) => Some(strict_dict(doc, object)?),
        Err(_) => None,
    };
    let embedded = descriptor
        .map(|d| FONT_FILES.iter().any(|key| d.has(key)))
        .unwrap_or(false);
    let descriptor_name = descriptor
        .and_then(|d| d.get(b"FontName").ok())
        .and_then(name_string)
        .filter(|font_name| *font_name != name);

    Ok(FontDescriptor {
        name,
        subtype,
        encoding,
        embedded,
        descriptor_name,
    })
}

// -- A: structural ------------------------------------------------------------

/// Interprets the content stream and resolves every font a `Tf` selects,
/// including inside painted Form XObjects. Any unresolvable reference fails the
/// whole page.
pub struct StructuralFonts;

impl FontStrategy for StructuralFonts {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn detect(&self, doc: &Document, page_id: ObjectId) -> Result<StrategyOutput> {
        let bytes = page_content(doc, page_id)?;
        let content = Content::decode(&bytes).map_err(|err| font_error(format!("content stream: {err}")))?;
        let mut output = StrategyOutput::default();
        walk_fonts(doc, &content, page_resources(doc, page_id), 0, &mut output)?;
        Ok(output)
    }
}

fn walk_fonts(
    doc: &Document,
    content: &Content,
    resources: Option<&Dictionary>,
    depth: usize,
    output: &mut StrategyOutput,
) -> Result<()> {
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                let name = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .ok_or_else(|| font_error("Tf without a font name"))?;
                let fonts = resources
                    .and_then(|res| dict_entry(doc, res, b"Font"))
                    .ok_or_else(|| font_error("Tf used without /Font resources"))?;
                let entry = fonts
                    .get(name)
                    .map_err(|_| font_error(format!("font /{} not in resources", lossy(name))))?;
                output.push(describe_font(doc, strict_dict(doc, entry)?)?);
            }
            "Do" if depth < MAX_FORM_DEPTH => {
                let Some(name) = operation.operands.first().and_then(|o| o.as_name().ok()) else {
                    continue;
                };
                let xobject = resources
                    .and_then(|res| dict_entry(doc, res, b"XObject"))
                    .and_then(|xobjects| xobjects.get(name).ok())
                    .ok_or_else(|| font_error(format!("XObject /{} not in resources", lossy(name))))?;
                let Object::Stream(stream) = resolve(doc, xobject).map_err(|err| font_error(err.to_string()))? else {
                    continue;
                };
                if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(subtype)) if subtype == b"Form") {
                    continue;
                }
                let form_content = Content::decode(&stream_data(stream)?)
                    .map_err(|err| font_error(format!("form content stream: {err}")))?;
                let form_resources = dict_entry(doc, &stream.dict, b"Resources").or(resources);
                walk_fonts(doc, &form_content, form_resources, depth + 1, output)?;
            }
            _ => {}
        }
    }
    Ok(())
}

// -- B: dictionary ------------------------------------------------------------

/// Lists the page's /Resources /Font entries directly. Broken entries are
/// recorded and skipped.
pub struct DictionaryFonts;

impl FontStrategy for DictionaryFonts {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    fn detect(&self, doc: &Document, page_id: ObjectId) -> Result<StrategyOutput> {
        let mut output = StrategyOutput::default();
        let Some(fonts) = page_resources(doc, page_id).and_then(|res| dict_entry(doc, res, b"Font")) else {
            return Ok(output);
        };
        for (key, value) in fonts.iter() {
            match strict_dict(doc, value).and_then(|font| describe_font(doc, font)) {
                Ok(descriptor) => output.push(descriptor),
                Err(err) => output.errors.push(format!("font '/{}': {err}", lossy(key))),
            }
        }
        Ok(output)
    }
}

// -- C: content scan ----------------------------------------------------------

static TF_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn tf_pattern() -> Option<&'static Regex> {
    TF_PATTERN
        .get_or_init(|| Regex::new(r"/([^\s/\[\]()<>{}%]+)\s+[-+]?(?:\d+\.?\d*|\.\d+)\s+Tf\b").ok())
        .as_ref()
}

/// Scans the raw content bytes for `/<name> <size> Tf`. Names the font
/// dictionary cannot resolve are still reported by resource name.
pub struct ContentStreamFonts;

impl FontStrategy for ContentStreamFonts {
    fn name(&self) -> &'static str {
        "content-scan"
    }

    fn detect(&self, doc: &Document, page_id: ObjectId) -> Result<StrategyOutput> {
        let bytes = page_content(doc, page_id)?;
        let pattern = tf_pattern().ok_or_else(|| font_error("Tf pattern failed to compile"))?;
        let fonts = page_resources(doc, page_id).and_then(|res| dict_entry(doc, res, b"Font"));

        let mut output = StrategyOutput::default();
        let mut names = BTreeSet::new();
        for captures in pattern.captures_iter(&bytes) {
            let name = &captures[1];
            if !names.insert(name.to_vec()) {
                continue;
            }
            let resolved = fonts
                .ok_or_else(|| font_error("no /Font resources"))
                .and_then(|fonts| {
                    fonts
                        .get(name)
                        .map_err(|_| font_error(format!("font /{} not in resources", lossy(name))))
                })
                .and_then(|entry| strict_dict(doc, entry))
                .and_then(|font| describe_font(doc, font));
            match resolved {
                Ok(descriptor) => output.push(descriptor),
                Err(err) => {
                    output.errors.push(format!("font '/{}': {err}", lossy(name)));
                    output.push(FontDescriptor {
                        name: lossy(name),
                        subtype: "Unknown".to_string(),
                        encoding: None,
                        embedded: false,
                        descriptor_name: None,
                    });
                }
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::chain::FontFallbackChain;
    use crate::testing::PdfBuilder;

    fn font_dict(entries: Vec<(&str, Object)>) -> Dictionary {
        Dictionary::from_iter(entries)
    }

    #[test]
    fn structural_resolves_simple_font() {
        let mut builder = PdfBuilder::new();
        let page = builder.add_text_page("hello");
        let doc = builder.build();

        let output = StructuralFonts.detect(&doc, page).unwrap();
        assert_eq!(output.fonts.len(), 1);
        let font = &output.fonts[0];
        assert_eq!(font.to_string(), "Helvetica (Type1) - WinAnsiEncoding");
        assert!(!font.embedded);
    }

    #[test]
    fn type0_descendant_carries_embedding() {
        let mut builder = PdfBuilder::new();
        let doc = builder.doc_mut();
        let file_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), vec![0; 4]));
        let descriptor_id = doc.add_object(font_dict(vec![
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(b"ABCDEF+NotoSans".to_vec())),
            ("FontFile2", Object::Reference(file_id)),
        ]));
        let descendant_id = doc.add_object(font_dict(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(b"ABCDEF+NotoSans".to_vec())),
            ("FontDescriptor", Object::Reference(descriptor_id)),
        ]));
        let type0_id = doc.add_object(font_dict(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(b"ABCDEF+NotoSans".to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(descendant_id)])),
        ]));
        let mut fonts = Dictionary::new();
        fonts.set("F2", Object::Reference(type0_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let page = builder.add_page_with_resources(&["BT /F2 9 Tf <0001> Tj ET"], Some(resources));
        let doc = builder.build();

        let output = StructuralFonts.detect(&doc, page).unwrap();
        assert_eq!(
            output.fonts[0].to_string(),
            "ABCDEF+NotoSans (Type0) - Identity-H [Embedded]"
        );
    }

    #[test]
    fn structural_fails_on_unknown_font_and_dictionary_takes_over() {
        let mut builder = PdfBuilder::new();
        let page = builder.add_page("BT /F9 12 Tf (x) Tj ET");
        let doc = builder.build();

        assert!(matches!(
            StructuralFonts.detect(&doc, page),
            Err(BlattwerkError::FontError(_))
        ));
        let report = FontFallbackChain::default().scan(&doc);
        assert_eq!(report.detection_method(), "dictionary");
        assert_eq!(report.fonts[0].descriptor.name, "Helvetica");
        assert_eq!(report.errors[0].method, "structural");
    }

    #[test]
    fn dictionary_records_broken_entries() {
        let mut builder = PdfBuilder::new();
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(builder.font_id()));
        fonts.set("F2", Object::Reference((999, 0)));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let page = builder.add_page_with_resources(&["BT /F1 12 Tf (x) Tj ET"], Some(resources));
        let doc = builder.build();

        let output = DictionaryFonts.detect(&doc, page).unwrap();
        assert_eq!(output.fonts.len(), 1);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("/F2"));
    }

    #[test]
    fn content_scan_reports_unresolvable_names() {
        let mut builder = PdfBuilder::new();
        let page = builder.add_page_with_resources(&["BT /F3 10.5 Tf (x) Tj ET"], None);
        let doc = builder.build();

        let report = FontFallbackChain::default().scan(&doc);
        assert_eq!(report.detection_method(), "content-scan");
        assert_eq!(report.fonts[0].descriptor.name, "F3");
        assert_eq!(report.fonts[0].descriptor.subtype, "Unknown");

        let output = ContentStreamFonts.detect(&doc, page).unwrap();
        assert_eq!(output.errors.len(), 1);
    }

    #[test]
    fn structural_follows_form_xobjects() {
        let mut builder = PdfBuilder::new();
        let mut fonts = Dictionary::new();
        fonts.set("FX", Object::Reference(builder.font_id()));
        let mut form_resources = Dictionary::new();
        form_resources.set("Font", Object::Dictionary(fonts));
        let form = lopdf::Stream::new(
            font_dict(vec![
                ("Type", Object::Name(b"XObject".to_vec())),
                ("Subtype", Object::Name(b"Form".to_vec())),
                ("Resources", Object::Dictionary(form_resources)),
            ]),
            b"BT /FX 8 Tf (in form) Tj ET".to_vec(),
        );
        builder.add_image_object("Fm0", form);
        let page = builder.add_page("/Fm0 Do");
        let doc = builder.build();

        let output = StructuralFonts.detect(&doc, page).unwrap();
        assert_eq!(output.fonts.len(), 1);
        assert_eq!(output.fonts[0].name, "Helvetica");
    }
}
