// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared by the document library and the CLI.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Raster format used when writing extracted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputImageFormat {
    /// Lossless, keeps the alpha channel.
    Png,
    /// Lossy, opaque RGB only.
    Jpeg,
}

impl OutputImageFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_alpha(self) -> bool {
        matches!(self, Self::Png)
    }
}

impl std::fmt::Display for OutputImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Output flavour for extracted tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Txt,
    Html,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Html => "html",
        }
    }
}

/// Inclusive, 1-indexed page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start >= 1 && start <= end);
        Self { start, end }
    }

    /// A range covering exactly one page.
    pub fn single(page: u32) -> Self {
        Self::new(page, page)
    }

    /// Number of pages covered.
    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// SHA-256 content digest used as an identity key for extracted content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest a single byte slice.
    pub fn of(data: &[u8]) -> Self {
        Self::of_parts(&[data])
    }

    /// Digest several slices as one stream, in order.
    pub fn of_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({})", &self.to_hex()[..12])
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serialised as its hex string.
impl Serialize for ContentDigest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
