// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Sheets command - lists the EIM IDs in the workbook

use super::Context;
use crate::sheet::parse_sheet;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SheetSummary<'a> {
    eim_id: &'a str,
    records: usize,
    repositories: usize,
}

/// Run the sheets command
pub fn run(ctx: &Context) -> Result<()> {
    let workbook = ctx.load_workbook()?;

    let summaries: Vec<SheetSummary<'_>> = workbook
        .sheets()
        .map(|(name, grid)| {
            let records = parse_sheet(name, grid);
            let mut keys: Vec<String> = records
                .iter()
                .map(|r| crate::grouping::normalize_repo_url(&r.repository_url))
                .collect();
            keys.sort();
            keys.dedup();
            SheetSummary {
                eim_id: name.trim(),
                records: records.len(),
                repositories: keys.len(),
            }
        })
        .collect();

    if ctx.output.json {
        return ctx.output.json(&summaries);
    }

    ctx.output.heading(&format!("{} sheet(s)", summaries.len()));
    for s in &summaries {
        println!(
            "  {:<20} {:>3} API(s) in {} repositor{}",
            s.eim_id,
            s.records,
            s.repositories,
            if s.repositories == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}
