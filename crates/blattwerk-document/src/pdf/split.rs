// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page splitting: one file per page, or one file per range between split
// points.

use std::path::PathBuf;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::paths::OutputNamer;
use blattwerk_core::types::PageRange;
use tracing::{info, instrument};

use super::reader::PdfReader;

/// One file produced by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    pub range: PageRange,
    pub path: PathBuf,
}

/// Parse a comma-separated list of split points such as `7` or `7,11`.
///
/// The result is sorted ascending with duplicates removed. Blank input parses
/// to an empty list.
pub fn parse_split_points(raw: &str) -> Result<Vec<u32>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut points = raw
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| BlattwerkError::InvalidSplitPoints(raw.to_string()))?;
    points.sort_unstable();
    points.dedup();
    Ok(points)
}

/// Turn split points into the page ranges to write.
///
/// No points means one range per page. Otherwise every point `p` must lie in
/// `1..=page_count - 1` and closes a range ending at `p`; the final range runs
/// to the last page.
pub fn plan_split(page_count: u32, points: &[u32]) -> Result<Vec<PageRange>> {
    if page_count == 0 {
        return Err(BlattwerkError::NoPages);
    }
    if points.is_empty() {
        return Ok((1..=page_count).map(PageRange::single).collect());
    }

    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let max = page_count - 1;
    if let Some(&bad) = sorted.iter().find(|&&p| p < 1 || p > max) {
        return Err(BlattwerkError::SplitPointOutOfRange { point: bad, max });
    }

    let mut ranges = Vec::with_capacity(sorted.len() + 1);
    let mut start = 1;
    for point in sorted {
        ranges.push(PageRange::new(start, point));
        start = point + 1;
    }
    ranges.push(PageRange::new(start, page_count));
    Ok(ranges)
}

/// Split `reader` and write the parts with names from `namer`.
///
/// Per-page splits use `<stem>_page_NN.pdf`, split-point splits use
/// `<stem>_pages_SS_EE.pdf`.
#[instrument(skip_all, fields(points = ?points))]
pub fn split_to_files(reader: &PdfReader, points: &[u32], namer: &OutputNamer) -> Result<Vec<SplitPart>> {
    let ranges = plan_split(reader.page_count(), points)?;
    let per_page = points.is_empty();
    info!(pages = reader.page_count(), parts = ranges.len(), "Splitting PDF");

    let mut parts = Vec::with_capacity(ranges.len());
    for range in ranges {
        let bytes = reader.extract_range(range)?;
        let path = if per_page {
            namer.single_page(range.start)
        } else {
            namer.page_range(range)
        };
        std::fs::write(&path, bytes)?;
        parts.push(SplitPart { range, path });
    }
    Ok(parts)
}
