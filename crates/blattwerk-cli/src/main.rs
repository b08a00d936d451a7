// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk: PDF toolbox: metadata, split, merge, tables, text, images,
// internals, and OCR.

mod cli;
mod commands;

use std::process::ExitCode;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::human_errors::{Severity, humanize_error};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// `RUST_LOG` wins; otherwise the `-v` count picks the level.
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = ToolConfig::load(cli.config.as_deref())
        .and_then(|config| commands::run(cli.command, &config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("Error: {}", human.message);
            eprintln!("Hint: {}", human.suggestion);
            if human.severity == Severity::Internal {
                eprintln!("Details: {err}");
            }
            ExitCode::FAILURE
        }
    }
}
