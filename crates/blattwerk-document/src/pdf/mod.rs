// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading, splitting, merging, and metadata.

pub mod merge;
pub mod metadata;
pub mod objects;
pub mod reader;
pub mod split;

pub use merge::{MergeOutcome, merge_documents, merge_files};
pub use metadata::DocumentMetadata;
pub use reader::PdfReader;
pub use split::{SplitPart, parse_split_points, plan_split, split_to_files};
