// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validate command - checks a metadata document file

use super::{Context, Output};
use crate::document::MetadataDocument;
use crate::error::Error;
use crate::validate::{check, ValidationReport};
use anyhow::{Context as _, Result};
use std::path::Path;

/// Run the validate command
pub fn run(ctx: &Context, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let document = MetadataDocument::from_json(&text)?;
    let report = check(document.value());

    if ctx.output.json {
        ctx.output.json(&report)?;
    } else {
        print_report(&ctx.output, &report);
    }

    if report.valid {
        Ok(())
    } else {
        Err(Error::ValidationFailed(report.problems).into())
    }
}

/// Human-readable validation outcome
pub fn print_report(output: &Output, report: &ValidationReport) {
    if report.valid {
        output.success(&format!("Valid ({} API(s))", report.api_count));
        return;
    }
    output.failure(&format!("{} problem(s)", report.problems.len()));
    for problem in &report.problems {
        println!("  - {problem}");
    }
}
