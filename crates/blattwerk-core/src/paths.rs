// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input validation and output file naming.
//
// Every tool writes its artifacts next to the source file (or into an explicit
// output directory) using the source stem as a prefix.

use std::path::{Path, PathBuf};

use crate::error::{BlattwerkError, Result};
use crate::types::{OutputImageFormat, PageRange, TableFormat};

/// Check that `path` exists and carries a `.pdf` extension (case-insensitive).
pub fn ensure_pdf_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(BlattwerkError::FileNotFound(path.to_path_buf()));
    }
    if !path.is_file() || !has_extension(path, &["pdf"]) {
        return Err(BlattwerkError::NotAPdf(path.to_path_buf()));
    }
    Ok(())
}

/// Case-insensitive extension check against a list of candidates.
pub fn has_extension(path: &Path, candidates: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| candidates.iter().any(|c| ext.eq_ignore_ascii_case(c)))
        .unwrap_or(false)
}

/// Append `.pdf` unless the name already ends with it.
pub fn with_pdf_extension(path: &Path) -> PathBuf {
    if has_extension(path, &["pdf"]) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".pdf");
        PathBuf::from(name)
    }
}

/// Builds output file names from a source path.
///
/// ```
/// use blattwerk_core::paths::OutputNamer;
/// use std::path::Path;
///
/// let namer = OutputNamer::new(Path::new("docs/report.pdf"), None);
/// assert_eq!(namer.single_page(3), Path::new("docs/report_page_03.pdf"));
/// ```
#[derive(Debug, Clone)]
pub struct OutputNamer {
    /// Directory plus stem, without extension.
    base: PathBuf,
}

impl OutputNamer {
    /// Derive the naming base from `source`. When `output_dir` is given the
    /// stem is placed there instead of beside the source.
    pub fn new(source: &Path, output_dir: Option<&Path>) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "output".into());
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        Self {
            base: dir.join(stem),
        }
    }

    fn suffixed(&self, suffix: &str) -> PathBuf {
        let mut name = self.base.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// `<stem>_page_NN.pdf`
    pub fn single_page(&self, page: u32) -> PathBuf {
        self.suffixed(&format!("_page_{page:02}.pdf"))
    }

    /// `<stem>_pages_SS_EE.pdf`
    pub fn page_range(&self, range: PageRange) -> PathBuf {
        self.suffixed(&format!("_pages_{:02}_{:02}.pdf", range.start, range.end))
    }

    /// `<stem>_page_NN_image_NN[_multi].<ext>`
    pub fn image(
        &self,
        first_page: u32,
        sequence_index: u32,
        multi: bool,
        format: OutputImageFormat,
    ) -> PathBuf {
        let marker = if multi { "_multi" } else { "" };
        self.suffixed(&format!(
            "_page_{first_page:02}_image_{sequence_index:02}{marker}.{}",
            format.extension()
        ))
    }

    /// `<stem>_tables.<txt|html>`
    pub fn tables(&self, format: TableFormat) -> PathBuf {
        self.suffixed(&format!("_tables.{}", format.extension()))
    }

    /// `<stem>.txt`
    pub fn text(&self) -> PathBuf {
        self.suffixed(".txt")
    }
}
