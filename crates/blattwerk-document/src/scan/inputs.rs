// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resolving OCR inputs: explicit files, a list file, or a directory.

use std::path::{Path, PathBuf};

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::has_extension;
use tracing::debug;

const PNG_EXTENSIONS: [&str; 1] = ["png"];
const JPEG_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// Where the images to recognise come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrSource {
    /// Image paths as given. A single `.txt` path is read as a list file.
    Files(Vec<PathBuf>),
    /// Every matching image directly inside `path`. With neither flag set both
    /// PNG and JPEG are taken.
    Directory { path: PathBuf, png: bool, jpg: bool },
}

impl OcrSource {
    /// Build a source from command-line style arguments. Files and a
    /// directory are mutually exclusive, and one of them is required.
    pub fn from_args(files: Vec<PathBuf>, dir: Option<PathBuf>, png: bool, jpg: bool) -> Result<Self> {
        match (files.is_empty(), dir) {
            (false, Some(_)) => Err(BlattwerkError::NoInputs(
                "give either a directory or a list of files, not both".into(),
            )),
            (true, None) => Err(BlattwerkError::NoInputs(
                "give image files, a .txt file list, or a directory".into(),
            )),
            (_, Some(path)) => Ok(Self::Directory { path, png, jpg }),
            (false, None) => Ok(Self::Files(files)),
        }
    }

    /// The image paths to process, in order. Directory listings are sorted.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            Self::Files(files) => match files.as_slice() {
                [list] if has_extension(list, &["txt"]) => read_list(list),
                _ => Ok(files.clone()),
            },
            Self::Directory { path, png, jpg } => scan_directory(path, *png, *jpg),
        }
    }
}

/// One path per non-empty line.
fn read_list(list: &Path) -> Result<Vec<PathBuf>> {
    if !list.is_file() {
        return Err(BlattwerkError::FileNotFound(list.to_path_buf()));
    }
    let raw = std::fs::read_to_string(list)?;
    let files: Vec<PathBuf> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect();
    debug!(list = %list.display(), files = files.len(), "Read file list");
    Ok(files)
}

fn scan_directory(dir: &Path, png: bool, jpg: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BlattwerkError::FileNotFound(dir.to_path_buf()));
    }
    let mut extensions: Vec<&str> = Vec::new();
    if png {
        extensions.extend(PNG_EXTENSIONS);
    }
    if jpg {
        extensions.extend(JPEG_EXTENSIONS);
    }
    if extensions.is_empty() {
        extensions.extend(PNG_EXTENSIONS);
        extensions.extend(JPEG_EXTENSIONS);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, &extensions) {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn files_and_directory_are_exclusive() {
        let err = OcrSource::from_args(vec!["a.png".into()], Some("imgs".into()), false, false).unwrap_err();
        assert!(matches!(err, BlattwerkError::NoInputs(_)));
        let err = OcrSource::from_args(Vec::new(), None, true, false).unwrap_err();
        assert!(matches!(err, BlattwerkError::NoInputs(_)));
    }

    #[test]
    fn directory_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.PNG");
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "c.jpeg");
        touch(dir.path(), "notes.txt");

        let all = OcrSource::from_args(Vec::new(), Some(dir.path().into()), false, false)
            .unwrap()
            .resolve()
            .unwrap();
        let names: Vec<_> = all.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.jpeg"]);

        let png_only = OcrSource::Directory {
            path: dir.path().into(),
            png: true,
            jpg: false,
        }
        .resolve()
        .unwrap();
        assert_eq!(png_only.len(), 1);
    }

    #[test]
    fn list_file_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("files.txt");
        fs::write(&list, "one.png\n\n  two.jpg  \n").unwrap();
        let files = OcrSource::Files(vec![list]).resolve().unwrap();
        assert_eq!(files, vec![PathBuf::from("one.png"), PathBuf::from("two.jpg")]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let source = OcrSource::Directory {
            path: "/nonexistent/blattwerk-images".into(),
            png: false,
            jpg: false,
        };
        assert!(matches!(source.resolve(), Err(BlattwerkError::FileNotFound(_))));
    }

    #[test]
    fn explicit_files_pass_through() {
        let files = vec![PathBuf::from("x.png"), PathBuf::from("y.txt")];
        assert_eq!(OcrSource::Files(files.clone()).resolve().unwrap(), files);
    }
}
