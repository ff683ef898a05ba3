// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Generate command - builds the metadata document for a repository

use super::{parse_selection, Context};
use crate::document::MetadataDocument;
use crate::error::Error;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing::info;

/// Run the generate command
pub fn run(
    ctx: &Context,
    repository_url: &str,
    select: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let index = ctx.load_index()?;
    let group = index
        .lookup(repository_url)
        .ok_or_else(|| Error::NotFound(format!("no API records for {}", repository_url.trim())))?;

    let records = match select.as_deref() {
        None => group.records.clone(),
        Some(text) => {
            let picks = parse_selection(text)?;
            picks
                .iter()
                .map(|&i| {
                    group.records.get(i).cloned().ok_or_else(|| {
                        anyhow::anyhow!("API {} does not exist; {} found", i + 1, group.records.len())
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
    };
    if records.is_empty() {
        anyhow::bail!("No APIs selected");
    }

    let document = MetadataDocument::generate(&records);
    let text = document.to_pretty_json();

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{text}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
            ctx.output.success(&format!(
                "Wrote {} API(s) to {}",
                document.api_count(),
                path.display()
            ));
        }
        None => println!("{text}"),
    }
    Ok(())
}
