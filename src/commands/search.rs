// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Search command - finds the API records for one repository

use super::Context;
use crate::error::Error;
use crate::grouping::normalize_repo_url;
use crate::types::ApiRecord;
use anyhow::Result;

/// Run the search command
pub fn run(ctx: &Context, repository_url: &str) -> Result<()> {
    let index = ctx.load_index()?;
    let group = index.lookup(repository_url).ok_or_else(|| {
        Error::NotFound(format!(
            "no API records for {} (normalized: {})",
            repository_url.trim(),
            normalize_repo_url(repository_url)
        ))
    })?;

    if ctx.output.json {
        return ctx.output.json(&group);
    }

    ctx.output.success(&format!(
        "Found {} API(s) for {}",
        group.records.len(),
        group.key
    ));
    print_records(&group.records);
    Ok(())
}

/// Numbered listing of records, as used by search and the session
pub fn print_records(records: &[ApiRecord]) {
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. {} v{} [{}] ({})",
            i + 1,
            record.display_name(),
            record.text("version").unwrap_or_else(|| "?".into()),
            record.eim_id,
            record
                .text("lifecycle_status")
                .unwrap_or_else(|| "unknown status".into())
        );
    }
}
