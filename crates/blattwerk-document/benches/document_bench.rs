// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the image identity path: pixel digests and the
// duplicate index that keys on them.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, RgbImage};

use blattwerk_core::types::OutputImageFormat;
use blattwerk_document::ImageProcessor;
use blattwerk_document::image::DuplicateIndex;

/// Digest a 256x256 RGB image after PNG preparation.
fn bench_digest(c: &mut Criterion) {
    let img = RgbImage::from_fn(256, 256, |x, y| image::Rgb([x as u8, y as u8, (x ^ y) as u8]));
    let dynamic = DynamicImage::ImageRgb8(img);

    c.bench_function("digest (256x256 rgb)", |b| {
        b.iter(|| {
            let processor = ImageProcessor::from_dynamic(black_box(dynamic.clone()))
                .prepare_for(OutputImageFormat::Png);
            black_box(processor.digest());
        });
    });
}

/// 1000 sightings of 50 distinct images spread over 200 pages.
fn bench_duplicate_index(c: &mut Criterion) {
    let digests: Vec<_> = (0u32..50)
        .map(|n| blattwerk_core::types::ContentDigest::of(&n.to_le_bytes()))
        .collect();

    c.bench_function("duplicate index (1000 sightings)", |b| {
        b.iter(|| {
            let mut index = DuplicateIndex::new();
            for sighting in 0..1000u32 {
                let digest = digests[(sighting % 50) as usize];
                black_box(index.observe(digest, sighting / 5 + 1));
            }
            black_box(index.len());
        });
    });
}

criterion_group!(benches, bench_digest, bench_duplicate_index);
criterion_main!(benches);
