// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font detection: a prioritized fallback chain of strategies.

pub mod chain;
pub mod strategies;

pub use chain::{FontDescriptor, FontFallbackChain, FontReport, FontStrategy, FontUsage, StrategyOutput};
pub use strategies::{ContentStreamFonts, DictionaryFonts, StructuralFonts};
