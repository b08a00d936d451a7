// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Duplicate-aware image extraction.
//
// Pages are scanned in ascending order. Every painted image, XObject or
// inline, is decoded,
// converted to the target pixel layout and digested; the first sighting of a
// digest creates a record, later sightings only add their page. Once the whole
// document has been scanned each record is written exactly once.

use std::collections::{BTreeSet, HashMap, HashSet};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::OutputNamer;
use blattwerk_core::types::{ContentDigest, OutputImageFormat};
use indexmap::IndexMap;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::decode::{decode_image, expand_inline_image, is_image};
use super::processor::ImageProcessor;
use crate::pdf::objects::{dict_entry, page_content, page_resources, resolve, stream_data};
use crate::pdf::reader::PdfReader;

/// Nesting limit for Form XObjects painting Form XObjects.
const MAX_FORM_DEPTH: usize = 12;

// -- Enumeration --------------------------------------------------------------

/// An image painted on a page.
#[derive(Debug, Clone)]
pub enum PageImage {
    /// An image XObject; one object may be painted on many pages.
    XObject(ObjectId),
    /// A `BI ... ID ... EI` image, expanded to XObject form.
    Inline(Box<Stream>),
}

impl PageImage {
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::XObject(id) => Some(*id),
            Self::Inline(_) => None,
        }
    }

    /// The image stream to decode.
    pub fn stream<'a>(&'a self, doc: &'a Document) -> Result<&'a Stream> {
        match self {
            Self::XObject(id) => {
                let object = doc
                    .get_object(*id)
                    .map_err(|err| BlattwerkError::ImageError(format!("object {} {} R: {err}", id.0, id.1)))?;
                match resolve(doc, object)? {
                    Object::Stream(stream) => Ok(stream),
                    _ => Err(BlattwerkError::ImageError("image XObject is not a stream".into())),
                }
            }
            Self::Inline(stream) => Ok(stream),
        }
    }

    /// Short label for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            Self::XObject(id) => format!("image {} {} R", id.0, id.1),
            Self::Inline(_) => "inline image".to_string(),
        }
    }
}

/// Images painted on a page, in painting order.
///
/// The content stream is followed through `Do` operators, including inside
/// Form XObjects, and inline images are taken where they occur. An XObject
/// painted twice on a page is listed once. If the content stream cannot be
/// read the page's /XObject resources are listed instead.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<PageImage> {
    let resources = page_resources(doc, page_id);
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    let painted = page_content(doc, page_id)
        .and_then(|bytes| {
            Content::decode(&bytes)
                .map_err(|err| BlattwerkError::PdfError(format!("content stream: {err}")))
        })
        .map(|content| {
            walk_operations(doc, &content, resources, 0, &mut seen, &mut found);
        });

    if let Err(err) = painted {
        debug!(?page_id, %err, "Falling back to /XObject resources");
        seen.clear();
        found.clear();
        if let Some(resources) = resources {
            collect_resource_images(doc, resources, 0, &mut seen, &mut found);
        }
    }
    found
}

fn walk_operations(
    doc: &Document,
    content: &Content,
    resources: Option<&Dictionary>,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    found: &mut Vec<PageImage>,
) {
    let xobjects = resources.and_then(|res| dict_entry(doc, res, b"XObject"));
    for operation in &content.operations {
        match operation.operator.as_str() {
            "BI" => {
                if let Some(Object::Stream(inline)) = operation.operands.first() {
                    let stream = expand_inline_image(doc, inline, resources);
                    found.push(PageImage::Inline(Box::new(stream)));
                }
            }
            "Do" => {
                let Some(xobjects) = xobjects else {
                    continue;
                };
                let Some(Ok(name)) = operation.operands.first().map(Object::as_name) else {
                    continue;
                };
                let Ok(Object::Reference(id)) = xobjects.get(name) else {
                    continue;
                };
                visit_xobject(doc, *id, depth, seen, found);
            }
            _ => {}
        }
    }
}

fn visit_xobject(
    doc: &Document,
    id: ObjectId,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    found: &mut Vec<PageImage>,
) {
    let Ok(Object::Stream(stream)) = doc.get_object(id) else {
        return;
    };
    if is_image(stream) {
        if seen.insert(id) {
            found.push(PageImage::XObject(id));
        }
        return;
    }
    let is_form = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Form");
    if !is_form || depth >= MAX_FORM_DEPTH {
        return;
    }
    let Ok(bytes) = stream_data(stream) else {
        return;
    };
    let Ok(content) = Content::decode(&bytes) else {
        return;
    };
    let form_resources = dict_entry(doc, &stream.dict, b"Resources");
    walk_operations(doc, &content, form_resources, depth + 1, seen, found);
}

fn collect_resource_images(
    doc: &Document,
    resources: &Dictionary,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    found: &mut Vec<PageImage>,
) {
    let Some(xobjects) = dict_entry(doc, resources, b"XObject") else {
        return;
    };
    for (_, value) in xobjects.iter() {
        let Object::Reference(id) = value else {
            continue;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        if is_image(stream) {
            if seen.insert(*id) {
                found.push(PageImage::XObject(*id));
            }
        } else if depth < MAX_FORM_DEPTH
            && let Some(nested) = dict_entry(doc, &stream.dict, b"Resources")
        {
            collect_resource_images(doc, nested, depth + 1, seen, found);
        }
    }
}

// -- Duplicate index ----------------------------------------------------------

/// First sighting of an image content plus every page it recurs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub digest: ContentDigest,
    pub first_page: u32,
    /// Ascending; the first element is always `first_page`.
    pub occurrence_pages: BTreeSet<u32>,
    /// 1-based position among unique images, in order of first sighting.
    pub sequence_index: u32,
}

impl ImageRecord {
    /// Whether the image occurs on more than one page.
    pub fn is_multi(&self) -> bool {
        self.occurrence_pages.len() > 1
    }
}

/// What [`DuplicateIndex::observe`] did with a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// A new digest; holds its sequence index.
    New(u32),
    /// A digest seen before; holds the existing sequence index.
    Repeat(u32),
}

/// Digest-keyed records in order of first sighting.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    records: IndexMap<ContentDigest, ImageRecord>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `digest` appears on `page`. Pages must be observed in
    /// ascending order.
    pub fn observe(&mut self, digest: ContentDigest, page: u32) -> Sighting {
        if let Some(record) = self.records.get_mut(&digest) {
            record.occurrence_pages.insert(page);
            return Sighting::Repeat(record.sequence_index);
        }
        let sequence_index = self.records.len() as u32 + 1;
        self.records.insert(
            digest,
            ImageRecord {
                digest,
                first_page: page,
                occurrence_pages: BTreeSet::from([page]),
                sequence_index,
            },
        );
        Sighting::New(sequence_index)
    }

    pub fn get(&self, digest: &ContentDigest) -> Option<&ImageRecord> {
        self.records.get(digest)
    }

    /// Records in sequence order.
    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// -- Extraction ---------------------------------------------------------------

/// Outcome of scanning a document, before anything is written.
#[derive(Debug, Default)]
pub struct ImageScan {
    pub index: DuplicateIndex,
    /// The image first seen for each digest, decoded again at emission.
    sources: HashMap<ContentDigest, PageImage>,
    pub pages_scanned: u32,
    /// Image placements seen (one per image per page).
    pub images_seen: usize,
    /// Placements skipped because the image could not be decoded.
    pub failed: usize,
    pub errors: Vec<String>,
}

/// One written image.
#[derive(Debug, Clone, Serialize)]
pub struct EmittedImage {
    pub path: std::path::PathBuf,
    pub record: ImageRecord,
}

/// Run summary of [`ImageExtractor::extract_to_files`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub pages_scanned: u32,
    pub images_seen: usize,
    pub unique_written: usize,
    pub duplicates_skipped: usize,
    pub failed: usize,
    pub written: Vec<EmittedImage>,
    pub errors: Vec<String>,
}

/// Extracts unique images in a target format.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    format: OutputImageFormat,
    jpeg_quality: u8,
}

impl ImageExtractor {
    pub fn new(format: OutputImageFormat) -> Self {
        Self {
            format,
            jpeg_quality: 90,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    fn prepared(&self, doc: &Document, image: &PageImage) -> Result<ImageProcessor> {
        let decoded = decode_image(doc, image.stream(doc)?)?;
        Ok(ImageProcessor::from_dynamic(decoded).prepare_for(self.format))
    }

    /// Scan all pages and build the duplicate index. Nothing is written.
    #[instrument(skip_all, fields(format = %self.format))]
    pub fn scan(&self, doc: &Document) -> ImageScan {
        let mut scan = ImageScan::default();
        // Digest per XObject id; `None` marks an object that failed to decode.
        // Inline images have no identity beyond their bytes and are always decoded.
        let mut cache: HashMap<ObjectId, Option<ContentDigest>> = HashMap::new();

        for (page_number, page_id) in doc.get_pages() {
            scan.pages_scanned += 1;
            for image in page_images(doc, page_id) {
                scan.images_seen += 1;
                let cached = image.object_id().and_then(|id| cache.get(&id).copied());
                let digest = match cached {
                    Some(digest) => digest,
                    None => {
                        let digest = match self.prepared(doc, &image) {
                            Ok(processor) => Some(processor.digest()),
                            Err(err) => {
                                warn!(page = page_number, image = %image.describe(), %err, "Skipping image");
                                scan.errors.push(format!("page {page_number}: {err}"));
                                None
                            }
                        };
                        if let Some(id) = image.object_id() {
                            cache.insert(id, digest);
                        }
                        digest
                    }
                };
                let Some(digest) = digest else {
                    scan.failed += 1;
                    continue;
                };
                if let Sighting::New(sequence) = scan.index.observe(digest, page_number) {
                    debug!(page = page_number, sequence, "New image");
                    scan.sources.insert(digest, image);
                }
            }
        }

        info!(
            pages = scan.pages_scanned,
            seen = scan.images_seen,
            unique = scan.index.len(),
            failed = scan.failed,
            "Image scan complete"
        );
        scan
    }

    /// Scan `reader` and write every unique image once.
    #[instrument(skip_all)]
    pub fn extract_to_files(&self, reader: &PdfReader, namer: &OutputNamer) -> Result<ExtractionSummary> {
        reader.require_pages()?;
        let doc = reader.document();
        let scan = self.scan(doc);

        let mut summary = ExtractionSummary {
            pages_scanned: scan.pages_scanned,
            images_seen: scan.images_seen,
            failed: scan.failed,
            errors: scan.errors.clone(),
            ..ExtractionSummary::default()
        };

        for record in scan.index.records() {
            let Some(source) = scan.sources.get(&record.digest) else {
                continue;
            };
            let path = namer.image(record.first_page, record.sequence_index, record.is_multi(), self.format);
            let written = self
                .prepared(doc, source)
                .and_then(|processor| processor.save(&path, self.format, self.jpeg_quality));
            match written {
                Ok(()) => {
                    debug!(path = %path.display(), "Image written");
                    summary.written.push(EmittedImage {
                        path,
                        record: record.clone(),
                    });
                }
                Err(BlattwerkError::Io(err)) => return Err(BlattwerkError::Io(err)),
                Err(err) => {
                    warn!(sequence = record.sequence_index, %err, "Image could not be written");
                    summary.errors.push(format!("image {}: {err}", record.sequence_index));
                    summary.failed += 1;
                }
            }
        }

        summary.unique_written = summary.written.len();
        summary.duplicates_skipped = scan.images_seen - scan.failed - scan.index.len();
        info!(
            written = summary.unique_written,
            duplicates = summary.duplicates_skipped,
            "Image extraction complete"
        );
        Ok(summary)
    }
}
