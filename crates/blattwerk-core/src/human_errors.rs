// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every error is mapped to a plain English message plus a concrete next step.
// The severity drives the process exit code and how loudly the CLI reports it.

use crate::error::BlattwerkError;

/// Where an error comes from, from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input is missing, malformed, or the arguments don't fit it.
    Input,
    /// The installation is missing something (a build feature, model files).
    Environment,
    /// A single page, image, or font failed; the run carries on.
    Item,
    /// Something unexpected inside the tool itself.
    Internal,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary (printed after `Error:`).
    pub message: String,
    /// What the user should try (printed after `Hint:`).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `BlattwerkError` into a `HumanError`.
pub fn humanize_error(err: &BlattwerkError) -> HumanError {
    match err {
        // -- Input errors --
        BlattwerkError::FileNotFound(path) => HumanError {
            message: format!("File '{}' not found.", path.display()),
            suggestion: "Check the path and spelling, then try again.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::NotAPdf(path) => HumanError {
            message: format!("'{}' is not a PDF file.", path.display()),
            suggestion: "Pass a file with a .pdf extension.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::PdfError(detail) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: format!(
                "The file may be damaged or encrypted. Try opening it in a viewer first. ({detail})"
            ),
            severity: Severity::Input,
        },

        BlattwerkError::NoPages => HumanError {
            message: "The PDF file has no pages.".into(),
            suggestion: "There is nothing to process in this document.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::SplitPointOutOfRange { point, max } => HumanError {
            message: format!("Split point {point} is out of range (1-{max})."),
            suggestion: "A split point names the last page of a part, so it must be below the page count.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::InvalidSplitPoints(raw) => HumanError {
            message: format!("Invalid split point format '{raw}'."),
            suggestion: "Use comma-separated page numbers, e.g. '7' or '7,11'.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::NoInputs(detail) => HumanError {
            message: format!("Nothing to process: {detail}."),
            suggestion: "Provide input files, a .txt file list, or a directory with --dir.".into(),
            severity: Severity::Input,
        },

        BlattwerkError::Config(detail) => HumanError {
            message: format!("The configuration is invalid: {detail}."),
            suggestion: "Fix the JSON config file or remove --config / $BLATTWERK_CONFIG to use defaults.".into(),
            severity: Severity::Input,
        },

        // -- Per-item errors --
        BlattwerkError::ImageError(_) | BlattwerkError::UnsupportedImage(_) => HumanError {
            message: "An image could not be decoded.".into(),
            suggestion: "The image uses an encoding this tool can't read. Other images are unaffected.".into(),
            severity: Severity::Item,
        },

        BlattwerkError::FontError(_) => HumanError {
            message: "A font entry could not be read.".into(),
            suggestion: "The font dictionary is malformed. Other fonts are unaffected.".into(),
            severity: Severity::Item,
        },

        BlattwerkError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this image.".into(),
            suggestion: "Try a higher-resolution image, or rerun with --enhance.".into(),
            severity: Severity::Item,
        },

        // -- Environment errors --
        BlattwerkError::FeatureUnavailable { feature } => HumanError {
            message: format!("This build does not include the '{feature}' feature."),
            suggestion: format!(
                "Reinstall with the feature enabled: cargo install blattwerk-cli --features {feature}"
            ),
            severity: Severity::Environment,
        },

        BlattwerkError::OcrModelMissing(path) => HumanError {
            message: format!("OCR model file '{}' is missing.", path.display()),
            suggestion: "Run `ocrs-cli` once to download the models, or set ocr_model_dir in the config.".into(),
            severity: Severity::Environment,
        },

        // -- Plumbing --
        BlattwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path.".into(),
                    severity: Severity::Input,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied while reading or writing a file.".into(),
                    suggestion: "Check the file and directory permissions.".into(),
                    severity: Severity::Input,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: format!("Check free disk space and try again. ({io_err})"),
                    severity: Severity::Internal,
                }
            }
        }

        BlattwerkError::Serialization(detail) => HumanError {
            message: "A JSON document could not be parsed.".into(),
            suggestion: format!("Check the config file syntax. ({detail})"),
            severity: Severity::Input,
        },
    }
}
