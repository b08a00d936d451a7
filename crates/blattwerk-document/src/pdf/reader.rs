// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open and inspect existing PDF documents and cut page ranges
// out of them using the `lopdf` crate.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::ensure_pdf_input;
use blattwerk_core::types::PageRange;
use lopdf::{Document, ObjectId};
use tracing::{debug, info, instrument};

use super::objects::pdf_error;

/// Reads an existing PDF file.
///
/// Wraps `lopdf::Document` and exposes the page tree in ascending page order,
/// which every tool iterates.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file.
    source_path: Option<PathBuf>,
    /// Size of the source in bytes.
    file_size: u64,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem after checking it exists and is a `.pdf`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        ensure_pdf_input(path_ref)?;
        info!("Opening PDF: {}", path_ref.display());

        let file_size = std::fs::metadata(path_ref)?.len();
        let document = Document::load(path_ref)
            .map_err(|err| pdf_error(format!("failed to open {}", path_ref.display()), err))?;

        debug!(pages = document.get_pages().len(), file_size, "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.to_path_buf()),
            file_size,
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| pdf_error("failed to load PDF from memory", err))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
            file_size: data.len() as u64,
        })
    }

    /// Wrap an already-parsed document.
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            source_path: None,
            file_size: 0,
        }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Page numbers (1-indexed) paired with their page object ids, ascending.
    pub fn pages(&self) -> Vec<(u32, ObjectId)> {
        self.document.get_pages().into_iter().collect()
    }

    /// Like [`PdfReader::pages`], but a document without pages is an error.
    pub fn require_pages(&self) -> Result<Vec<(u32, ObjectId)>> {
        let pages = self.pages();
        if pages.is_empty() {
            return Err(BlattwerkError::NoPages);
        }
        Ok(pages)
    }

    /// Header version, e.g. `1.7`.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// Whether the trailer carries an /Encrypt entry.
    pub fn is_encrypted(&self) -> bool {
        self.document.trailer.has(b"Encrypt")
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    // -- Extraction -----------------------------------------------------------

    /// Copy pages `range` (1-indexed, inclusive) into a standalone PDF and
    /// return its serialised bytes.
    ///
    /// The document is cloned, every page outside the range is deleted from the
    /// page tree, and objects no longer reachable are pruned, so shared
    /// resources survive exactly once.
    #[instrument(skip(self), fields(range = %range))]
    pub fn extract_range(&self, range: PageRange) -> Result<Vec<u8>> {
        let total = self.page_count();
        if range.start == 0 || range.start > range.end || range.end > total {
            return Err(BlattwerkError::PdfError(format!(
                "page range {range} invalid for {total} page document"
            )));
        }

        let mut new_doc = self.document.clone();
        // Highest page first so the remaining numbers stay stable.
        let doomed: Vec<u32> = (1..=total).rev().filter(|p| !range.contains(*p)).collect();
        for page_number in doomed {
            new_doc.delete_pages(&[page_number]);
        }
        new_doc.prune_objects();

        let mut output = Vec::new();
        new_doc
            .save_to(&mut output)
            .map_err(|err| BlattwerkError::PdfError(format!("failed to serialise page range: {err}")))?;

        debug!(output_bytes = output.len(), "Page range extracted");
        Ok(output)
    }
}
