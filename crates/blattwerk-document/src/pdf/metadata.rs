// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document information dictionary and basic file facts.

use chrono::NaiveDateTime;
use lopdf::Object;
use serde::Serialize;
use tracing::instrument;

use super::objects::{display_value, resolve_dict};
use super::reader::PdfReader;

/// Standard /Info keys with their display labels, in report order.
pub const STANDARD_FIELDS: [(&str, &str); 9] = [
    ("Title", "Title"),
    ("Author", "Author"),
    ("Subject", "Subject"),
    ("Creator", "Creator"),
    ("Producer", "Producer"),
    ("CreationDate", "Creation Date"),
    ("ModDate", "Modification Date"),
    ("Keywords", "Keywords"),
    ("Trapped", "Trapped"),
];

/// One populated /Info entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataField {
    pub key: String,
    pub label: String,
    pub value: String,
}

/// Everything the `metadata` tool prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub file_size: u64,
    pub page_count: u32,
    pub version: String,
    pub encrypted: bool,
    /// Populated standard fields, in [`STANDARD_FIELDS`] order.
    pub standard: Vec<MetadataField>,
    /// Any other /Info keys, in dictionary order.
    pub custom: Vec<MetadataField>,
}

impl DocumentMetadata {
    /// Read metadata from an open document.
    #[instrument(skip_all)]
    pub fn read(reader: &PdfReader) -> Self {
        let doc = reader.document();
        let info = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| resolve_dict(doc, obj));

        let mut standard = Vec::new();
        let mut custom = Vec::new();
        if let Some(info) = info {
            for (key, label) in STANDARD_FIELDS {
                let Ok(value) = info.get(key.as_bytes()) else {
                    continue;
                };
                let mut text = display_value(doc, value);
                if key.ends_with("Date") {
                    text = format_pdf_date(&text);
                }
                if !text.is_empty() {
                    standard.push(MetadataField {
                        key: key.to_string(),
                        label: label.to_string(),
                        value: text,
                    });
                }
            }

            for (key, value) in info.iter() {
                let key = String::from_utf8_lossy(key).into_owned();
                if STANDARD_FIELDS.iter().any(|(std_key, _)| *std_key == key) {
                    continue;
                }
                if matches!(value, Object::Null) {
                    continue;
                }
                custom.push(MetadataField {
                    label: format!("/{key}"),
                    value: display_value(doc, value),
                    key,
                });
            }
        }

        Self {
            file_size: reader.file_size(),
            page_count: reader.page_count(),
            version: reader.version().to_string(),
            encrypted: reader.is_encrypted(),
            standard,
            custom,
        }
    }

    /// Whether the document carries any /Info entries at all.
    pub fn has_fields(&self) -> bool {
        !self.standard.is_empty() || !self.custom.is_empty()
    }
}

/// Render a PDF date (`D:YYYYMMDDHHmmSS...`) as `YYYY-MM-DD HH:MM:SS`.
///
/// Anything that does not parse is returned unchanged.
pub fn format_pdf_date(raw: &str) -> String {
    let body = raw.strip_prefix("D:").unwrap_or(raw);
    body.get(..14)
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok())
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Group digits in threes: `1234567` becomes `1,234,567`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PdfBuilder, literal};

    #[test]
    fn formats_pdf_dates() {
        assert_eq!(format_pdf_date("D:20240131093005+01'00'"), "2024-01-31 09:30:05");
        assert_eq!(format_pdf_date("20240131093005"), "2024-01-31 09:30:05");
        assert_eq!(format_pdf_date("yesterday"), "yesterday");
        assert_eq!(format_pdf_date("D:2024"), "D:2024");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn reads_standard_and_custom_fields_in_order() {
        let mut builder = PdfBuilder::new();
        builder.add_text_page("one");
        builder.info(vec![
            ("Producer", literal("Writer 3")),
            ("Title", literal("Quarterly")),
            ("CreationDate", literal("D:20230704120000Z")),
            ("Department", literal("Finance")),
            ("Trapped", Object::Name(b"False".to_vec())),
        ]);
        let reader = PdfReader::from_document(builder.build());

        let meta = DocumentMetadata::read(&reader);
        assert_eq!(meta.page_count, 1);
        assert!(!meta.encrypted);

        let labels: Vec<&str> = meta.standard.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Title", "Producer", "Creation Date", "Trapped"]);
        assert_eq!(meta.standard[2].value, "2023-07-04 12:00:00");
        assert_eq!(meta.standard[3].value, "False");

        assert_eq!(meta.custom.len(), 1);
        assert_eq!(meta.custom[0].label, "/Department");
        assert_eq!(meta.custom[0].value, "Finance");
    }

    #[test]
    fn missing_info_yields_no_fields() {
        let mut builder = PdfBuilder::new();
        builder.add_text_page("one");
        let meta = DocumentMetadata::read(&PdfReader::from_document(builder.build()));
        assert!(!meta.has_fields());
    }
}
