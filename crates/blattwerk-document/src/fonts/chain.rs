// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font fallback chain: an ordered list of detection strategies tried page by
// page. The first strategy that finds fonts on a page decides that page;
// results from different strategies are never merged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use blattwerk_core::error::Result;
use lopdf::{Document, ObjectId};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::strategies::{ContentStreamFonts, DictionaryFonts, StructuralFonts};

/// What a font dictionary says about itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FontDescriptor {
    /// /BaseFont without the slash (`Unknown` when absent).
    pub name: String,
    /// /Subtype, e.g. `Type1`, `TrueType`, `Type0`.
    pub subtype: String,
    /// Encoding name, or the base encoding of an encoding dictionary.
    pub encoding: Option<String>,
    /// A FontFile, FontFile2 or FontFile3 stream is present.
    pub embedded: bool,
    /// /FontName from the font descriptor when it differs from `name`.
    pub descriptor_name: Option<String>,
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.subtype)?;
        if let Some(encoding) = &self.encoding {
            write!(f, " - {encoding}")?;
        }
        if let Some(descriptor_name) = &self.descriptor_name {
            write!(f, " [{descriptor_name}]")?;
        }
        if self.embedded {
            f.write_str(" [Embedded]")?;
        }
        Ok(())
    }
}

/// Fonts found by one strategy on one page, plus entry-level problems it
/// stepped over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub fonts: Vec<FontDescriptor>,
    pub errors: Vec<String>,
}

impl StrategyOutput {
    /// Add `font` unless it is already listed.
    pub fn push(&mut self, font: FontDescriptor) {
        if !self.fonts.contains(&font) {
            self.fonts.push(font);
        }
    }
}

/// One way of finding the fonts a page uses.
pub trait FontStrategy {
    /// Short name shown in reports.
    fn name(&self) -> &'static str;

    /// Detect fonts on a single page. An `Err` means the strategy could not
    /// handle the page at all; the chain moves on to the next one.
    fn detect(&self, doc: &Document, page_id: ObjectId) -> Result<StrategyOutput>;
}

/// A problem recorded while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontScanError {
    pub page: u32,
    pub method: &'static str,
    pub message: String,
}

impl fmt::Display for FontScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page {}, {}: {}", self.page, self.method, self.message)
    }
}

/// A font and the ascending pages it was seen on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontUsage {
    pub descriptor: FontDescriptor,
    pub pages: BTreeSet<u32>,
}

/// Result of running the chain over a whole document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FontReport {
    /// Distinct fonts, ordered by their display text.
    pub fonts: Vec<FontUsage>,
    /// The strategy that decided each page that had fonts.
    pub page_methods: BTreeMap<u32, &'static str>,
    pub errors: Vec<FontScanError>,
}

impl FontReport {
    /// The single strategy every page agreed on, or a per-strategy page count
    /// such as `structural (3 pages), dictionary (1 page)`.
    pub fn detection_method(&self) -> String {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for method in self.page_methods.values() {
            match counts.iter_mut().find(|(name, _)| name == method) {
                Some((_, count)) => *count += 1,
                None => counts.push((*method, 1)),
            }
        }
        match counts.as_slice() {
            [] => "none (no fonts found)".to_string(),
            [(only, _)] => (*only).to_string(),
            many => many
                .iter()
                .map(|(name, count)| {
                    format!("{name} ({count} page{})", if *count == 1 { "" } else { "s" })
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Strategies in priority order.
pub struct FontFallbackChain {
    strategies: Vec<Box<dyn FontStrategy>>,
}

impl Default for FontFallbackChain {
    /// structural, then dictionary, then content-scan.
    fn default() -> Self {
        Self::new(vec![
            Box::new(StructuralFonts),
            Box::new(DictionaryFonts),
            Box::new(ContentStreamFonts),
        ])
    }
}

impl FontFallbackChain {
    pub fn new(strategies: Vec<Box<dyn FontStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain over every page in ascending order.
    #[instrument(skip_all, fields(strategies = self.strategies.len()))]
    pub fn scan(&self, doc: &Document) -> FontReport {
        let mut report = FontReport::default();
        let mut usages: BTreeMap<FontDescriptor, BTreeSet<u32>> = BTreeMap::new();

        for (page_number, page_id) in doc.get_pages() {
            for strategy in &self.strategies {
                let method = strategy.name();
                match strategy.detect(doc, page_id) {
                    Ok(output) => {
                        report.errors.extend(output.errors.into_iter().map(|message| FontScanError {
                            page: page_number,
                            method,
                            message,
                        }));
                        if output.fonts.is_empty() {
                            continue;
                        }
                        debug!(page = page_number, method, fonts = output.fonts.len(), "Fonts found");
                        report.page_methods.insert(page_number, method);
                        for font in output.fonts {
                            usages.entry(font).or_default().insert(page_number);
                        }
                        break;
                    }
                    Err(err) => {
                        warn!(page = page_number, method, %err, "Font strategy failed");
                        report.errors.push(FontScanError {
                            page: page_number,
                            method,
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        report.fonts = usages
            .into_iter()
            .map(|(descriptor, pages)| FontUsage { descriptor, pages })
            .collect();
        report
            .fonts
            .sort_by_cached_key(|usage| usage.descriptor.to_string());
        report
    }
}
