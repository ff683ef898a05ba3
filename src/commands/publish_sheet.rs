// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Publish-sheet command - publishes every repository listed on one sheet

use super::publish::print_preview;
use super::{confirm, Context};
use crate::document::MetadataDocument;
use crate::error::Error;
use crate::fetcher;
use crate::github::ContentStore;
use crate::grouping::RepositoryIndex;
use crate::publisher::PublishSink;
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome for one repository
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryOutcome {
    /// Normalized repository URL
    pub repository_url: String,
    /// Whether the publish succeeded
    pub success: bool,
    /// APIs published
    pub published_apis: usize,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch report written by `--report`
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// When the batch finished
    pub timestamp: DateTime<Utc>,
    /// Sheet that was published
    pub eim_id: String,
    /// Repositories attempted
    pub total_repos: usize,
    /// Repositories published
    pub successful: usize,
    /// Repositories that failed
    pub failed: usize,
    /// Per-repository outcomes
    pub details: Vec<RepositoryOutcome>,
}

impl BatchReport {
    /// Summarize outcomes
    #[must_use]
    pub fn new(eim_id: &str, details: Vec<RepositoryOutcome>) -> Self {
        let successful = details.iter().filter(|d| d.success).count();
        Self {
            timestamp: Utc::now(),
            eim_id: eim_id.to_string(),
            total_repos: details.len(),
            successful,
            failed: details.len() - successful,
            details,
        }
    }
}

/// Repository URLs on a sheet, as the sheet spells them
///
/// Each group contributes the first URL written on this sheet; the
/// normalized key is only used for grouping.
#[must_use]
pub fn sheet_repositories(index: &RepositoryIndex, eim_id: &str) -> Vec<String> {
    index
        .groups_for_sheet(eim_id)
        .into_iter()
        .map(|g| {
            g.records
                .iter()
                .find(|r| r.eim_id == eim_id)
                .map_or(g.key.as_str(), |r| r.repository_url.trim())
                .to_string()
        })
        .collect()
}

/// Fetch each repository's committed document once
pub fn fetch_all(
    store: &dyn ContentStore,
    metadata_path: &str,
    repositories: &[String],
) -> Vec<(String, crate::error::Result<Value>)> {
    repositories
        .iter()
        .map(|url| {
            let document = fetcher::fetch(store, url, metadata_path).map(|f| f.document);
            (url.clone(), document)
        })
        .collect()
}

/// Publish the documents that were fetched; a fetch failure becomes a
/// failed outcome without publishing, and one failure never stops the
/// rest of the batch
pub fn publish_all(
    sink: &dyn PublishSink,
    invocation_tag: &str,
    fetched: &[(String, crate::error::Result<Value>)],
) -> Vec<RepositoryOutcome> {
    fetched
        .iter()
        .map(|(url, document)| {
            let result = document.as_ref().map_err(ToString::to_string).and_then(|doc| {
                sink.publish(doc, invocation_tag)
                    .map(|_| MetadataDocument::from_value(doc.clone()).api_count())
                    .map_err(|e| e.to_string())
            });
            match result {
                Ok(count) => {
                    info!("Published {} ({} API(s))", url, count);
                    RepositoryOutcome {
                        repository_url: url.clone(),
                        success: true,
                        published_apis: count,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Failed to publish {}: {}", url, e);
                    RepositoryOutcome {
                        repository_url: url.clone(),
                        success: false,
                        published_apis: 0,
                        error: Some(e),
                    }
                }
            }
        })
        .collect()
}

/// Run the publish-sheet command
pub fn run(ctx: &Context, eim_id: &str, yes: bool, report: Option<PathBuf>) -> Result<()> {
    let eim_id = eim_id.trim();
    let index = ctx.load_index()?;
    let repositories = sheet_repositories(&index, eim_id);
    if repositories.is_empty() {
        return Err(Error::NotFound(format!("no repositories on sheet {eim_id}")).into());
    }

    let github = ctx.github()?;
    let publisher = ctx.publisher()?;

    ctx.output.heading(&format!(
        "{} repositor{} on sheet {}",
        repositories.len(),
        if repositories.len() == 1 { "y" } else { "ies" },
        eim_id
    ));
    let fetched = fetch_all(&github, &ctx.settings.github.metadata_path, &repositories);
    if !ctx.output.json {
        for (url, document) in &fetched {
            match document {
                Ok(doc) => print_preview(
                    &ctx.output,
                    url,
                    &MetadataDocument::from_value(doc.clone()).summary(),
                ),
                Err(e) => ctx.output.warning(&format!("{url}: {e}")),
            }
        }
    }

    if !yes && !confirm(&format!("Publish {} repositories to production?", repositories.len()))? {
        ctx.output.line("Publish cancelled");
        return Ok(());
    }

    let tag = ctx.settings.publish.invocation_tag(eim_id);
    let outcomes = publish_all(&publisher, &tag, &fetched);
    let batch = BatchReport::new(eim_id, outcomes);

    if let Some(file) = report {
        let text = serde_json::to_string_pretty(&batch)?;
        std::fs::write(&file, text)
            .with_context(|| format!("Failed to write report {}", file.display()))?;
        info!("Report written to {}", file.display());
    }

    if ctx.output.json {
        ctx.output.json(&batch)?;
    } else {
        for outcome in &batch.details {
            match &outcome.error {
                None => ctx.output.success(&outcome.repository_url),
                Some(e) => ctx.output.failure(&format!("{}: {e}", outcome.repository_url)),
            }
        }
        ctx.output.line(format!(
            "Total: {}  Successful: {}  Failed: {}",
            batch.total_repos, batch.successful, batch.failed
        ));
    }

    if batch.failed > 0 {
        anyhow::bail!("{} of {} repositories failed to publish", batch.failed, batch.total_repos);
    }
    Ok(())
}
