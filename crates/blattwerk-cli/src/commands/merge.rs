// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Write;
use std::path::{Path, PathBuf};

use blattwerk_core::error::Result;
use blattwerk_document::pdf::merge_files;

pub fn run(inputs: &[PathBuf], output: &Path, out: &mut dyn Write) -> Result<()> {
    let outcome = merge_files(inputs, output)?;
    writeln!(
        out,
        "Merged {} file(s), {} page(s) into {}",
        outcome.source_count,
        outcome.page_count,
        outcome.path.display()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{text_page, write_pdf};
    use blattwerk_document::PdfReader;

    #[test]
    fn merges_and_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_pdf(dir.path(), "a.pdf", &[&text_page("a1"), &text_page("a2")]);
        let b = write_pdf(dir.path(), "b.pdf", &[&text_page("b1")]);

        let mut out = Vec::new();
        run(&[a, b], &dir.path().join("joined"), &mut out).unwrap();

        let merged = dir.path().join("joined.pdf");
        assert_eq!(PdfReader::open(&merged).unwrap().page_count(), 3);
        assert!(String::from_utf8(out).unwrap().starts_with("Merged 2 file(s), 3 page(s)"));
    }
}
