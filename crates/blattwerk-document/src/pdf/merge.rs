// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merging: concatenate the page sequences of several documents into one.
//
// Each later document's object ids are shifted past the highest id already in
// use, its pages are appended to the first document's root page node, and
// whatever became unreachable (old catalogs, intermediate page nodes) is
// pruned.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::{ensure_pdf_input, with_pdf_extension};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use super::objects::{inherited_attribute, pdf_error};
use super::reader::PdfReader;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Result of [`merge_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub path: PathBuf,
    pub page_count: u32,
    pub source_count: usize,
}

/// Merge `documents` in order: the first document's pages, then the second's,
/// and so on.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    let mut documents = documents.into_iter();
    let mut dest = documents
        .next()
        .ok_or_else(|| BlattwerkError::NoInputs("no documents to merge".into()))?;

    push_down_inherited(&mut dest);
    let mut page_refs: Vec<ObjectId> = dest.get_pages().into_values().collect();
    let mut max_id = highest_id(&dest);

    for mut source in documents {
        push_down_inherited(&mut source);
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        let source_max = highest_id(&source);
        let offset = max_id;

        for (old_id, object) in std::mem::take(&mut source.objects) {
            dest.objects
                .insert((old_id.0 + offset, old_id.1), remap_references(object, offset));
        }
        page_refs.extend(source_pages.into_iter().map(|(num, generation)| (num + offset, generation)));
        max_id = source_max + offset;
        debug!(offset, pages = page_refs.len(), "Document appended");
    }

    dest.max_id = max_id;
    rebuild_page_tree(&mut dest, &page_refs)?;
    dest.prune_objects();
    Ok(dest)
}

/// Validate every source, merge them, and write the result to `output`
/// (`.pdf` is appended when missing).
#[instrument(skip_all, fields(sources = sources.len(), output = %output.display()))]
pub fn merge_files(sources: &[PathBuf], output: &Path) -> Result<MergeOutcome> {
    if sources.is_empty() {
        return Err(BlattwerkError::NoInputs("no source PDFs given".into()));
    }
    // All inputs are checked before any work starts.
    for source in sources {
        ensure_pdf_input(source)?;
    }

    let mut documents = Vec::with_capacity(sources.len());
    for source in sources {
        info!("Adding: {}", source.display());
        documents.push(PdfReader::open(source)?.into_document());
    }

    let mut merged = merge_documents(documents)?;
    let page_count = merged.get_pages().len() as u32;
    let path = with_pdf_extension(output);

    let mut buffer = Vec::new();
    merged
        .save_to(&mut buffer)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to serialise merged PDF: {err}")))?;
    std::fs::write(&path, buffer)?;

    info!(page_count, "Merged PDF written to {}", path.display());
    Ok(MergeOutcome {
        path,
        page_count,
        source_count: sources.len(),
    })
}

fn highest_id(doc: &Document) -> u32 {
    doc.objects
        .keys()
        .map(|id| id.0)
        .max()
        .unwrap_or(0)
        .max(doc.max_id)
}

/// Copy inherited Resources, MediaBox, CropBox and Rotate onto each page so it
/// keeps its appearance under a new parent.
fn push_down_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let mut missing = Vec::new();
        if let Ok(page) = doc.get_dictionary(page_id) {
            for key in INHERITABLE {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    missing.push((key, value.clone()));
                }
            }
        }
        if missing.is_empty() {
            continue;
        }
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            for (key, value) in missing {
                page.set(key, value);
            }
        }
    }
}

/// Shift every indirect reference inside `object` by `offset`.
fn remap_references(object: Object, offset: u32) -> Object {
    match object {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| remap_references(item, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_references(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_references(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the root page node at `page_refs` and re-parent every page to it.
fn rebuild_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|err| pdf_error("root page tree", err))?;

    match doc.get_object_mut(pages_id) {
        Ok(Object::Dictionary(pages)) => {
            pages.set(
                "Kids",
                Object::Array(page_refs.iter().map(|id| Object::Reference(*id)).collect()),
            );
            pages.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(BlattwerkError::PdfError(
                "root /Pages is not a dictionary".into(),
            ));
        }
    }

    for page_id in page_refs {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(*page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }
    Ok(())
}
