// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ToUnicode CMap parsing and per-font string decoding.

use std::collections::HashMap;
use std::sync::OnceLock;

use lopdf::{Dictionary, Document, Object};
use regex::bytes::Regex;
use tracing::debug;

use crate::pdf::objects::{decode_text_string, name_string, resolve, stream_data};

/// Upper bound on codes expanded from a single bfrange entry.
const MAX_RANGE: u32 = 0xFFFF;

static CODESPACE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static BFCHAR_SECTION_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static BFRANGE_SECTION_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static BFCHAR_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static BFRANGE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static HEX_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn hex_bytes(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => hi << 4 | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| acc << 8 | b as u32)
}

/// Destination bytes are UTF-16BE, possibly several code units (ligatures,
/// surrogate pairs).
fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [lo] => *lo as u16,
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Shift the last UTF-16 unit of `base` by `offset`, as bfrange requires.
fn offset_text(base: &[u8], offset: u32) -> String {
    let mut units: Vec<u16> = base
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [lo] => *lo as u16,
            _ => 0,
        })
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

/// Code-to-text mapping read from a /ToUnicode stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    code_bytes: usize,
    entries: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parse the (decoded) body of a ToUnicode CMap. Malformed entries are
    /// skipped.
    pub fn parse(data: &[u8]) -> Self {
        let mut map = Self {
            code_bytes: 1,
            entries: HashMap::new(),
        };

        if let Some(codespace) = regex(&CODESPACE_REGEX, r"(?s)begincodespacerange\s*<([0-9A-Fa-f]+)>")
            && let Some(caps) = codespace.captures(data)
        {
            map.code_bytes = hex_bytes(&caps[1]).len().clamp(1, 4);
        }

        let (Some(char_sections), Some(range_sections), Some(bfchar), Some(bfrange), Some(hex)) = (
            regex(&BFCHAR_SECTION_REGEX, r"(?s)beginbfchar(.*?)endbfchar"),
            regex(&BFRANGE_SECTION_REGEX, r"(?s)beginbfrange(.*?)endbfrange"),
            regex(&BFCHAR_REGEX, r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]*)>"),
            regex(
                &BFRANGE_REGEX,
                r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(<[0-9A-Fa-f]*>|\[[^\]]*\])",
            ),
            regex(&HEX_REGEX, r"<([0-9A-Fa-f]*)>"),
        ) else {
            return map;
        };

        for section in char_sections.captures_iter(data) {
            for entry in bfchar.captures_iter(&section[1]) {
                let code = code_value(&hex_bytes(&entry[1]));
                map.entries.insert(code, utf16_text(&hex_bytes(&entry[2])));
            }
        }

        for section in range_sections.captures_iter(data) {
            for entry in bfrange.captures_iter(&section[1]) {
                let low = code_value(&hex_bytes(&entry[1]));
                let high = code_value(&hex_bytes(&entry[2]));
                if high < low || high - low > MAX_RANGE {
                    continue;
                }
                let target = &entry[3];
                if target.first() == Some(&b'[') {
                    for (code, item) in (low..=high).zip(hex.captures_iter(target)) {
                        map.entries.insert(code, utf16_text(&hex_bytes(&item[1])));
                    }
                } else {
                    let base = hex_bytes(target);
                    for code in low..=high {
                        map.entries.insert(code, offset_text(&base, code - low));
                    }
                }
            }
        }
        map
    }

    /// Width of one character code in bytes, from the codespace range.
    pub fn code_bytes(&self) -> usize {
        self.code_bytes
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.entries.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns shown string bytes into text for one font resource.
#[derive(Debug, Clone, Default)]
pub struct FontDecoder {
    /// Composite (Type0) fonts use two-byte codes.
    composite: bool,
    to_unicode: Option<ToUnicodeMap>,
}

impl FontDecoder {
    /// Build a decoder from a font dictionary. Unreadable ToUnicode streams
    /// fall back to the simple encoding.
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let composite = font
            .get(b"Subtype")
            .ok()
            .and_then(name_string)
            .is_some_and(|subtype| subtype == "Type0");

        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|object| resolve(doc, object).ok())
            .and_then(|object| match object {
                Object::Stream(stream) => stream_data(stream).ok(),
                _ => None,
            })
            .map(|data| ToUnicodeMap::parse(&data))
            .filter(|map| !map.is_empty());

        if to_unicode.is_none() && composite {
            debug!("Composite font without a usable /ToUnicode");
        }
        Self { composite, to_unicode }
    }

    pub fn code_bytes(&self) -> usize {
        match &self.to_unicode {
            Some(map) => map.code_bytes(),
            None if self.composite => 2,
            None => 1,
        }
    }

    /// Number of character codes in `bytes`.
    pub fn code_count(&self, bytes: &[u8]) -> usize {
        bytes.len().div_ceil(self.code_bytes())
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match &self.to_unicode {
            Some(map) => bytes
                .chunks(map.code_bytes())
                .map(|code| match map.lookup(code_value(code)) {
                    Some(text) => text.to_string(),
                    None if code.len() == 1 => decode_text_string(code),
                    None => String::from('\u{fffd}'),
                })
                .collect(),
            None if self.composite => utf16_text(bytes),
            None => decode_text_string(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <0041>
endbfchar
2 beginbfrange
<0024> <0026> <0061>
<0030> <0031> [<00660069> <D835DF0C>]
endbfrange
endcmap";

    #[test]
    fn parses_chars_and_ranges() {
        let map = ToUnicodeMap::parse(CMAP);
        assert_eq!(map.code_bytes(), 2);
        assert_eq!(map.lookup(0x0011), Some("A"));
        assert_eq!(map.lookup(0x0003), Some(" "));
        assert_eq!(map.lookup(0x0025), Some("b"));
        assert_eq!(map.lookup(0x0026), Some("c"));
        assert_eq!(map.lookup(0x0030), Some("fi"));
        assert_eq!(map.lookup(0x0031), Some("\u{1D70C}"));
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn garbage_yields_empty_map() {
        let map = ToUnicodeMap::parse(b"not a cmap at all");
        assert!(map.is_empty());
        assert_eq!(map.code_bytes(), 1);
    }

    #[test]
    fn decoder_uses_two_byte_codes() {
        let decoder = FontDecoder {
            composite: true,
            to_unicode: Some(ToUnicodeMap::parse(CMAP)),
        };
        assert_eq!(decoder.decode(&[0x00, 0x11, 0x00, 0x03, 0x00, 0x24]), "A a");
        assert_eq!(decoder.code_count(&[0x00, 0x11, 0x00, 0x03]), 2);
    }

    #[test]
    fn simple_font_decodes_pdfdoc() {
        let decoder = FontDecoder::default();
        assert_eq!(decoder.decode(b"Total"), "Total");
        assert_eq!(decoder.code_count(b"Total"), 5);
    }
}
