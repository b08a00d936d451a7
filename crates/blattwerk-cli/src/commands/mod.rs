// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand handlers. Reports go to the writer passed in (stdout in
// production); logs go to stderr through tracing.

mod images;
mod internals;
mod merge;
mod metadata;
mod ocr;
mod split;
mod tables;
mod text;

use std::io::Write;

use blattwerk_core::config::ToolConfig;
use blattwerk_core::error::Result;

use crate::cli::Command;

/// Run one subcommand against stdout.
pub fn run(command: Command, config: &ToolConfig) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dispatch(command, config, &mut out)?;
    out.flush()?;
    Ok(())
}

fn dispatch(command: Command, config: &ToolConfig, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Metadata { pdf, json } => metadata::run(&pdf, json, out),
        Command::Split { pdf, at } => split::run(&pdf, at.as_deref(), out),
        Command::Merge { output, inputs } => merge::run(&inputs, &output, out),
        Command::Tables { pdf, format } => tables::run(&pdf, format.into(), config, out),
        Command::Text { pdf } => text::run(&pdf, config, out),
        Command::Images {
            pdf,
            format,
            output_dir,
        } => images::run(&pdf, format.into(), output_dir.as_deref(), config, out),
        Command::Internals { pdf, json } => internals::run(&pdf, json, config, out),
        Command::Ocr {
            inputs,
            dir,
            png,
            jpg,
            enhance,
        } => ocr::run(inputs, dir, png, jpg, enhance, config, out),
    }
}
