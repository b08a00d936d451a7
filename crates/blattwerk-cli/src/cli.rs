// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use blattwerk_core::types::{OutputImageFormat, TableFormat};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "blattwerk", author, version, about, propagate_version = true)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON config file (default: $BLATTWERK_CONFIG, then built-in defaults).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show file size, page count, version, encryption and /Info fields
    Metadata {
        pdf: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Split into single pages, or into ranges ending at the given pages
    Split {
        pdf: PathBuf,
        /// Comma-separated split points, e.g. 7 or 7,11
        #[arg(long, value_name = "PAGES")]
        at: Option<String>,
    },
    /// Concatenate PDFs in the order given
    Merge {
        /// Output file (.pdf is appended when missing)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },
    /// Detect tables and write <stem>_tables.txt or .html
    Tables {
        pdf: PathBuf,
        #[arg(short, long, value_enum, default_value_t = TableFormatArg::Txt)]
        format: TableFormatArg,
    },
    /// Write page text and tables to <stem>.txt
    Text { pdf: PathBuf },
    /// Extract every distinct image once
    Images {
        pdf: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ImageFormatArg::Png)]
        format: ImageFormatArg,
        /// Directory for the images (default: beside the PDF)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Report fonts, images, tables, text, annotations, forms and compression
    Internals {
        pdf: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Recognise text in images and write <image stem>.txt
    Ocr {
        /// Image files, or a single .txt file listing them
        #[arg(conflicts_with = "dir")]
        inputs: Vec<PathBuf>,
        /// Process the images in this directory
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Only PNG files (with --dir)
        #[arg(short, long, requires = "dir")]
        png: bool,
        /// Only JPG/JPEG files (with --dir)
        #[arg(short, long, requires = "dir")]
        jpg: bool,
        /// Grayscale, boost contrast and binarise before recognition
        #[arg(long)]
        enhance: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormatArg {
    Txt,
    Html,
}

impl From<TableFormatArg> for TableFormat {
    fn from(arg: TableFormatArg) -> Self {
        match arg {
            TableFormatArg::Txt => Self::Txt,
            TableFormatArg::Html => Self::Html,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<ImageFormatArg> for OutputImageFormat {
    fn from(arg: ImageFormatArg) -> Self {
        match arg {
            ImageFormatArg::Png => Self::Png,
            ImageFormatArg::Jpeg => Self::Jpeg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn split_points_and_verbosity() {
        let cli = Cli::try_parse_from(["blattwerk", "-vv", "split", "doc.pdf", "--at", "7,11"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Split { pdf, at } => {
                assert_eq!(pdf, PathBuf::from("doc.pdf"));
                assert_eq!(at.as_deref(), Some("7,11"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn merge_needs_inputs() {
        assert!(Cli::try_parse_from(["blattwerk", "merge", "-o", "out.pdf"]).is_err());
        let cli = Cli::try_parse_from(["blattwerk", "merge", "-o", "out", "a.pdf", "b.pdf"]).unwrap();
        assert!(matches!(cli.command, Command::Merge { ref inputs, .. } if inputs.len() == 2));
    }

    #[test]
    fn ocr_dir_and_files_conflict() {
        assert!(Cli::try_parse_from(["blattwerk", "ocr", "a.png", "--dir", "imgs"]).is_err());
        assert!(Cli::try_parse_from(["blattwerk", "ocr", "a.png", "--png"]).is_err());
        assert!(Cli::try_parse_from(["blattwerk", "ocr", "--dir", "imgs", "--jpg"]).is_ok());
    }

    #[test]
    fn image_format_accepts_jpg_alias() {
        let cli = Cli::try_parse_from(["blattwerk", "images", "doc.pdf", "--format", "jpg"]).unwrap();
        assert!(matches!(cli.command, Command::Images { format: ImageFormatArg::Jpeg, .. }));
    }
}
