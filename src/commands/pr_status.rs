// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! PR status command - reports the latest metadata pull request

use super::Context;
use crate::github::{ContentStore, RepoCoordinates};
use crate::types::{PrState, PullRequestStatus};
use anyhow::Result;

/// Run the pr-status command
pub fn run(ctx: &Context, repository_url: &str) -> Result<()> {
    let repo = RepoCoordinates::require(repository_url)?;
    let status = ctx
        .github()?
        .latest_pull_request(&repo, &ctx.settings.github.branch_prefix)?;

    if ctx.output.json {
        return ctx.output.json(&status.report());
    }

    match &status {
        PullRequestStatus::Absent => ctx.output.line("No metadata pull request found"),
        PullRequestStatus::Present { pr, state } => {
            let text = format!("PR #{} is {:?}: {}", pr.number, state, pr.url);
            match state {
                PrState::Merged => ctx.output.success(&format!("{text} (ready to publish)")),
                PrState::Open => ctx.output.warning(&format!("{text} (awaiting merge)")),
                PrState::Closed => ctx.output.failure(&format!("{text} (closed without merge)")),
            }
        }
    }
    Ok(())
}
