// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-document structural analysis: fonts, images, tables, text,
// annotations, form fields and stream compression.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use blattwerk_core::config::{ReportSettings, TableSettings};
use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::fonts::FontFallbackChain;
use crate::image::page_images;
use crate::layout::{TextLine, detect_tables, group_lines, page_text_runs};
use crate::pdf::metadata::thousands;
use crate::pdf::objects::{dict_integer, display_value, filter_names, name_string, resolve, resolve_dict};
use crate::pdf::reader::PdfReader;

/// Pages-with-text lists longer than this are summarised by count only.
const TEXT_PAGE_LIST_LIMIT: usize = 20;

/// Nesting limit for form field /Kids.
const MAX_FIELD_DEPTH: usize = 16;

/// One grouped finding, e.g. an image size or an annotation subtype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrences {
    pub label: String,
    pub count: usize,
    /// Distinct pages, ascending.
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Section {
    pub entries: Vec<Occurrences>,
    pub errors: Vec<String>,
}

impl Section {
    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

/// Accumulates occurrences keyed by label.
#[derive(Default)]
struct Tally(BTreeMap<String, (usize, BTreeSet<u32>)>);

impl Tally {
    fn add(&mut self, label: impl Into<String>, page: Option<u32>) {
        let (count, pages) = self.0.entry(label.into()).or_default();
        *count += 1;
        pages.extend(page);
    }

    fn into_section(self, errors: Vec<String>) -> Section {
        Section {
            entries: self
                .0
                .into_iter()
                .map(|(label, (count, pages))| Occurrences {
                    label,
                    count,
                    pages: pages.into_iter().collect(),
                })
                .collect(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: u32,
    pub version: String,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontSection {
    pub detection_method: String,
    pub fonts: Vec<Occurrences>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TextSection {
    pub total_characters: usize,
    pub pages_with_text: Vec<u32>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompressionSection {
    /// Filter name and number of objects using it, most used first.
    pub filters: Vec<(String, usize)>,
    pub errors: Vec<String>,
}

/// Everything `internals` reports about a document.
#[derive(Debug, Clone, Serialize)]
pub struct InternalsReport {
    pub source: String,
    pub info: DocumentInfo,
    pub fonts: FontSection,
    pub images: Section,
    pub tables: Section,
    pub text: TextSection,
    pub annotations: Section,
    pub form_fields: Section,
    pub compression: CompressionSection,
}

impl InternalsReport {
    /// Analyse every page. Problems are collected per section; nothing here
    /// aborts the analysis.
    #[instrument(skip_all, fields(pages = reader.page_count()))]
    pub fn analyze(reader: &PdfReader, tables: &TableSettings) -> Self {
        let doc = reader.document();
        let source = reader
            .source_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string());

        let (table_section, text_section) = analyze_layout(doc, tables);
        let report = Self {
            source,
            info: document_info(reader),
            fonts: analyze_fonts(doc),
            images: analyze_images(doc),
            tables: table_section,
            text: text_section,
            annotations: analyze_annotations(doc),
            form_fields: analyze_forms(doc),
            compression: analyze_compression(doc),
        };
        info!(errors = report.total_errors(), "Analysis complete");
        report
    }

    pub fn total_errors(&self) -> usize {
        self.fonts.errors.len()
            + self.images.errors.len()
            + self.tables.errors.len()
            + self.text.errors.len()
            + self.annotations.errors.len()
            + self.form_fields.errors.len()
            + self.compression.errors.len()
    }

    /// Human-readable report.
    pub fn render(&self, limits: &ReportSettings) -> String {
        let rule = "=".repeat(70);
        let mut out = String::new();

        let _ = writeln!(out, "\n{rule}\nPDF INTERNALS ANALYSIS: {}\n{rule}\n", self.source);
        let _ = writeln!(out, "Document Information:");
        let _ = writeln!(out, "  Total Pages: {}", self.info.page_count);
        let _ = writeln!(out, "  PDF Version: {}", self.info.version);
        let _ = writeln!(out, "  Encrypted: {}", if self.info.encrypted { "Yes" } else { "No" });
        if let Some(title) = &self.info.title {
            let _ = writeln!(out, "  Title: {title}");
        }
        if let Some(author) = &self.info.author {
            let _ = writeln!(out, "  Author: {author}");
        }
        let _ = writeln!(out, "\n{}", "-".repeat(70));

        let _ = writeln!(out, "\n1. FONTS\n{rule}");
        let _ = writeln!(out, "  Detection method: {}", self.fonts.detection_method);
        if self.fonts.fonts.is_empty() {
            let _ = writeln!(out, "  No fonts found or font information unavailable.");
        }
        for font in &self.fonts.fonts {
            let _ = writeln!(out, "  • {}", font.label);
            let _ = writeln!(out, "    Pages: {}", page_list(&font.pages, limits.page_list_limit));
        }
        write_errors(&mut out, &self.fonts.errors, limits.error_preview);
        let _ = writeln!(out, "  Total unique fonts: {}", self.fonts.fonts.len());

        write_section(&mut out, "2. IMAGES", "Size", "images", &self.images, limits);
        write_section(&mut out, "3. TABLES", "Dimensions", "tables", &self.tables, limits);

        let _ = writeln!(out, "\n4. TEXT CONTENT\n{rule}");
        if self.text.pages_with_text.is_empty() {
            let _ = writeln!(out, "  No text content found.");
        } else {
            let _ = writeln!(
                out,
                "  Total characters: {}",
                thousands(self.text.total_characters as u64)
            );
            let _ = writeln!(
                out,
                "  Pages with text: {} of {}",
                self.text.pages_with_text.len(),
                self.info.page_count
            );
            if self.text.pages_with_text.len() <= TEXT_PAGE_LIST_LIMIT {
                let _ = writeln!(
                    out,
                    "  Page numbers: {}",
                    page_list(&self.text.pages_with_text, TEXT_PAGE_LIST_LIMIT)
                );
            }
        }
        write_errors(&mut out, &self.text.errors, limits.error_preview);

        write_section(&mut out, "5. ANNOTATIONS", "Type", "annotations", &self.annotations, limits);
        write_section(&mut out, "6. FORM FIELDS", "Type", "form fields", &self.form_fields, limits);

        let _ = writeln!(out, "\n7. COMPRESSION METHODS\n{rule}");
        if self.compression.filters.is_empty() {
            let _ = writeln!(out, "  No compression information available.");
        }
        for (filter, count) in &self.compression.filters {
            let _ = writeln!(out, "  • {filter}: {count} objects");
        }
        write_errors(&mut out, &self.compression.errors, limits.error_preview);

        let _ = writeln!(out, "\n{rule}\nSUMMARY\n{rule}");
        let _ = writeln!(out, "  Pages: {}", self.info.page_count);
        let _ = writeln!(out, "  Fonts: {}", self.fonts.fonts.len());
        let _ = writeln!(out, "  Images: {}", self.images.total());
        let _ = writeln!(out, "  Tables: {}", self.tables.total());
        let _ = writeln!(out, "  Text Pages: {}", self.text.pages_with_text.len());
        let _ = writeln!(out, "  Annotations: {}", self.annotations.total());
        let _ = writeln!(out, "  Form Fields: {}", self.form_fields.total());
        let _ = writeln!(out, "  Compression Methods: {}", self.compression.filters.len());
        let total_errors = self.total_errors();
        if total_errors > 0 {
            let _ = writeln!(out, "  ⚠ Total Errors: {total_errors}");
        }
        out
    }
}

/// `1, 2, 3 ... (N pages total)` when the list is longer than `limit`.
fn page_list(pages: &[u32], limit: usize) -> String {
    let mut shown = pages
        .iter()
        .take(limit)
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if pages.len() > limit {
        let _ = write!(shown, " ... ({} pages total)", pages.len());
    }
    shown
}

fn write_errors(out: &mut String, errors: &[String], preview: usize) {
    if errors.is_empty() {
        return;
    }
    let _ = writeln!(out, "  ⚠ Errors encountered: {}", errors.len());
    for err in errors.iter().take(preview) {
        let _ = writeln!(out, "    - {err}");
    }
    if errors.len() > preview {
        let _ = writeln!(out, "    ... and {} more", errors.len() - preview);
    }
}

fn write_section(
    out: &mut String,
    title: &str,
    label: &str,
    noun: &str,
    section: &Section,
    limits: &ReportSettings,
) {
    let _ = writeln!(out, "\n{title}\n{}", "=".repeat(70));
    if section.entries.is_empty() {
        let _ = writeln!(out, "  No {noun} found.");
    }
    for entry in &section.entries {
        let _ = writeln!(out, "  • {label}: {} - Count: {}", entry.label, entry.count);
        let _ = writeln!(out, "    Pages: {}", page_list(&entry.pages, limits.page_list_limit));
    }
    let _ = writeln!(out, "  Total {noun}: {}", section.total());
    write_errors(out, &section.errors, limits.error_preview);
}

fn document_info(reader: &PdfReader) -> DocumentInfo {
    let doc = reader.document();
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj));
    let field = |key: &[u8]| {
        info.and_then(|info| info.get(key).ok())
            .map(|value| display_value(doc, value))
            .filter(|text| !text.is_empty())
    };
    DocumentInfo {
        page_count: reader.page_count(),
        version: reader.version().to_string(),
        encrypted: reader.is_encrypted(),
        title: field(b"Title"),
        author: field(b"Author"),
    }
}

fn analyze_fonts(doc: &Document) -> FontSection {
    let report = FontFallbackChain::default().scan(doc);
    FontSection {
        detection_method: report.detection_method(),
        fonts: report
            .fonts
            .iter()
            .map(|usage| Occurrences {
                label: usage.descriptor.to_string(),
                count: usage.pages.len(),
                pages: usage.pages.iter().copied().collect(),
            })
            .collect(),
        errors: report.errors.iter().map(ToString::to_string).collect(),
    }
}

fn analyze_images(doc: &Document) -> Section {
    let mut tally = Tally::default();
    let mut errors = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        for image in page_images(doc, page_id) {
            let size = image.stream(doc).ok().and_then(|stream| {
                let width = dict_integer(doc, &stream.dict, b"Width")?;
                let height = dict_integer(doc, &stream.dict, b"Height")?;
                Some((width, height))
            });
            match size {
                Some((width, height)) => tally.add(format!("{width}x{height}px"), Some(page_number)),
                None => errors.push(format!(
                    "Page {page_number}, {}: missing /Width or /Height",
                    image.describe()
                )),
            }
        }
    }
    debug!(sizes = tally.0.len(), "Images grouped");
    tally.into_section(errors)
}

/// Tables and text share one interpretation of each page.
fn analyze_layout(doc: &Document, settings: &TableSettings) -> (Section, TextSection) {
    let mut tables = Tally::default();
    let mut table_errors = Vec::new();
    let mut text = TextSection::default();

    for (page_number, page_id) in doc.get_pages() {
        let runs = match page_text_runs(doc, page_id) {
            Ok(runs) => runs,
            Err(err) => {
                warn!(page = page_number, %err, "Layout analysis failed");
                table_errors.push(format!("Page {page_number}: {err}"));
                text.errors.push(format!("Page {page_number}: {err}"));
                continue;
            }
        };
        let lines = group_lines(&runs);
        for rows in detect_tables(&lines, settings) {
            let columns = rows.first().map_or(0, Vec::len);
            tables.add(format!("{}x{} cells", rows.len(), columns), Some(page_number));
        }
        let page_text = lines.iter().map(TextLine::text).collect::<Vec<_>>().join("\n");
        if !page_text.trim().is_empty() {
            text.total_characters += page_text.chars().count();
            text.pages_with_text.push(page_number);
        }
    }
    (tables.into_section(table_errors), text)
}

fn analyze_annotations(doc: &Document) -> Section {
    let mut tally = Tally::default();
    let mut errors = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let Some(annots) = doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|page| page.get(b"Annots").ok())
        else {
            continue;
        };
        let items = match resolve(doc, annots) {
            Ok(Object::Array(items)) => items,
            Ok(_) => {
                errors.push(format!("Page {page_number}: /Annots is not an array"));
                continue;
            }
            Err(err) => {
                errors.push(format!("Page {page_number}: {err}"));
                continue;
            }
        };
        for item in items {
            match resolve_dict(doc, item) {
                Some(annot) => {
                    let subtype = annot
                        .get(b"Subtype")
                        .ok()
                        .and_then(name_string)
                        .unwrap_or_else(|| "Unknown".to_string());
                    tally.add(subtype, Some(page_number));
                }
                None => errors.push(format!("Page {page_number}, annotation: not a dictionary")),
            }
        }
    }
    tally.into_section(errors)
}

fn analyze_forms(doc: &Document) -> Section {
    let mut tally = Tally::default();
    let mut errors = Vec::new();

    let Some(fields) = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|acro_form| resolve_dict(doc, acro_form))
        .and_then(|acro_form| acro_form.get(b"Fields").ok())
    else {
        return tally.into_section(errors);
    };

    let page_numbers: HashMap<ObjectId, u32> =
        doc.get_pages().into_iter().map(|(number, id)| (id, number)).collect();

    match resolve(doc, fields) {
        Ok(Object::Array(items)) => {
            for item in items {
                visit_field(doc, item, None, &page_numbers, 0, &mut tally, &mut errors);
            }
        }
        Ok(_) => errors.push("AcroForm: /Fields is not an array".to_string()),
        Err(err) => errors.push(format!("AcroForm: {err}")),
    }
    tally.into_section(errors)
}

/// Count terminal fields. /FT is inherited from ancestors; the page comes from
/// the field's /P or that of its first widget.
fn visit_field(
    doc: &Document,
    field: &Object,
    inherited_type: Option<&str>,
    page_numbers: &HashMap<ObjectId, u32>,
    depth: usize,
    tally: &mut Tally,
    errors: &mut Vec<String>,
) {
    if depth > MAX_FIELD_DEPTH {
        errors.push("Form field: /Kids nested too deeply".to_string());
        return;
    }
    let Some(dict) = resolve_dict(doc, field) else {
        errors.push("Form field: not a dictionary".to_string());
        return;
    };
    let own_type = dict.get(b"FT").ok().and_then(name_string);
    let field_type = own_type.as_deref().or(inherited_type);

    let kids: Vec<&Object> = match dict.get(b"Kids").ok().map(|kids| resolve(doc, kids)) {
        Some(Ok(Object::Array(kids))) => kids.iter().collect(),
        _ => Vec::new(),
    };
    let child_fields: Vec<&Object> = kids
        .iter()
        .copied()
        .filter(|kid| resolve_dict(doc, kid).is_some_and(|kid| kid.has(b"T")))
        .collect();

    if !child_fields.is_empty() {
        for kid in child_fields {
            visit_field(doc, kid, field_type, page_numbers, depth + 1, tally, errors);
        }
        return;
    }

    let page_of = |dict: &lopdf::Dictionary| {
        dict.get(b"P")
            .ok()
            .and_then(|page| page.as_reference().ok())
            .and_then(|id| page_numbers.get(&id).copied())
    };
    let page = page_of(dict).or_else(|| {
        kids.iter()
            .filter_map(|kid| resolve_dict(doc, kid))
            .find_map(page_of)
    });
    tally.add(field_type.unwrap_or("Unknown"), page);
}

fn analyze_compression(doc: &Document) -> CompressionSection {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut errors = Vec::new();
    for (id, object) in &doc.objects {
        let dict = match object {
            Object::Stream(stream) => &stream.dict,
            Object::Dictionary(dict) => dict,
            _ => continue,
        };
        match dict.get(b"Filter") {
            Err(_) | Ok(Object::Name(_)) => {}
            Ok(Object::Array(items)) if items.iter().all(|item| item.as_name().is_ok()) => {}
            Ok(other) => errors.push(format!(
                "Object {} {} R: /Filter is a {}, not a name or array of names",
                id.0,
                id.1,
                other.enum_variant()
            )),
        }
        for filter in filter_names(dict) {
            *counts.entry(filter).or_default() += 1;
        }
    }
    if !errors.is_empty() {
        warn!(count = errors.len(), "Malformed /Filter entries");
    }
    let mut filters: Vec<(String, usize)> = counts.into_iter().collect();
    filters.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    CompressionSection { filters, errors }
}
