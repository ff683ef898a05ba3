// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Publish command - sends a repository's committed metadata to APIX

use super::{confirm, Context, Output};
use crate::document::{DocumentSummary, MetadataDocument};
use crate::error::Result as CrateResult;
use crate::fetcher;
use crate::github::{ContentStore, RepoCoordinates};
use crate::publisher::PublishSink;
use crate::types::{PrState, PullRequestStatus, PublishSummary};
use anyhow::Result;
use chrono::Utc;
use tracing::warn;

/// Run the publish command
pub fn run(ctx: &Context, repository_url: &str, eim_id: &str, yes: bool) -> Result<()> {
    let github = ctx.github()?;
    let publisher = ctx.publisher()?;

    let fetched = fetcher::fetch(&github, repository_url, &ctx.settings.github.metadata_path)?;
    match pending_pr_notice(&github, repository_url, &ctx.settings.github.branch_prefix) {
        Ok(Some(notice)) if ctx.output.json => warn!("{}", notice),
        Ok(Some(notice)) => ctx.output.warning(&notice),
        Ok(None) => {}
        Err(e) => warn!("Could not check pull requests of {}: {}", repository_url, e),
    }
    let document = MetadataDocument::from_value(fetched.document);
    if !ctx.output.json {
        print_preview(&ctx.output, repository_url, &document.summary());
    }

    if !yes && !confirm("Publish to production?")? {
        ctx.output.line("Publish cancelled");
        return Ok(());
    }

    let tag = ctx.settings.publish.invocation_tag(eim_id);
    publisher.publish(document.value(), &tag)?;

    let summary = PublishSummary {
        repository_url: repository_url.trim().to_string(),
        eim_id: eim_id.to_string(),
        published_apis: document.api_count(),
        timestamp: Utc::now(),
    };
    if ctx.output.json {
        return ctx.output.json(&summary);
    }
    ctx.output.success(&format!(
        "Published {} API(s) from {}",
        summary.published_apis, summary.repository_url
    ));
    Ok(())
}

/// Warning text when the newest metadata pull request is not merged, so the
/// committed file may not be the reviewed one
pub fn pending_pr_notice(
    store: &dyn ContentStore,
    repository_url: &str,
    branch_prefix: &str,
) -> CrateResult<Option<String>> {
    let repo = RepoCoordinates::require(repository_url)?;
    Ok(match store.latest_pull_request(&repo, branch_prefix)? {
        PullRequestStatus::Present { pr, state: PrState::Open } => Some(format!(
            "Metadata PR #{} is still open; publishing what is committed now ({})",
            pr.number, pr.url
        )),
        PullRequestStatus::Present { pr, state: PrState::Closed } => Some(format!(
            "Newest metadata PR #{} was closed without merging ({})",
            pr.number, pr.url
        )),
        PullRequestStatus::Present { state: PrState::Merged, .. } | PullRequestStatus::Absent => None,
    })
}

/// One-line preview of a fetched document
pub fn print_preview(output: &Output, repository_url: &str, summary: &DocumentSummary) {
    output.line(format!(
        "  {}\n    API: {} v{}\n    Platform: {} {}\n    Fields: {}",
        repository_url.trim(),
        summary.technical_name.as_deref().unwrap_or("N/A"),
        summary.version.as_deref().unwrap_or("N/A"),
        summary.platform_provider.as_deref().unwrap_or("N/A"),
        summary.platform_technology.as_deref().unwrap_or(""),
        summary.field_count
    ));
}
