// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Fetch command - reads the committed metadata document of a repository

use super::Context;
use crate::document::MetadataDocument;
use crate::fetcher;
use anyhow::Result;

/// Run the fetch command
pub fn run(ctx: &Context, repository_url: &str) -> Result<()> {
    let github = ctx.github()?;
    let fetched = fetcher::fetch(&github, repository_url, &ctx.settings.github.metadata_path)?;

    if ctx.output.json {
        return ctx.output.json(&fetched.document);
    }

    let summary = MetadataDocument::from_value(fetched.document.clone()).summary();
    ctx.output.success(&format!(
        "{} found on branch {}",
        ctx.settings.github.metadata_path, fetched.branch
    ));
    ctx.output.line(format!(
        "  {} v{} on {} ({} API(s))",
        summary.technical_name.as_deref().unwrap_or("N/A"),
        summary.version.as_deref().unwrap_or("N/A"),
        summary.platform_provider.as_deref().unwrap_or("N/A"),
        summary.api_count
    ));
    println!("{}", serde_json::to_string_pretty(&fetched.document)?);
    Ok(())
}
