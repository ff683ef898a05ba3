// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod fetch;
pub mod generate;
pub mod pr_status;
pub mod publish;
pub mod publish_sheet;
pub mod search;
pub mod session;
pub mod sheets;
pub mod validate;

use crate::config::{Settings, WorkbookSource};
use crate::github::{ContentStore as _, GitHubClient, RepoCoordinates};
use crate::grouping::RepositoryIndex;
use crate::publisher::HttpPublisher;
use crate::sheet::parse_workbook;
use crate::workbook::Workbook;
use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

/// Everything a command needs from the command line and configuration
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective settings
    pub settings: Settings,
    /// `--workbook` override
    pub workbook: Option<PathBuf>,
    /// Output style
    pub output: Output,
}

impl Context {
    /// GitHub client from settings
    pub fn github(&self) -> Result<GitHubClient> {
        GitHubClient::new(&self.settings).context("Failed to build GitHub client")
    }

    /// Publisher from settings
    pub fn publisher(&self) -> Result<HttpPublisher> {
        HttpPublisher::new(&self.settings).context("Failed to build publish client")
    }

    /// Read the configured workbook, locally or through the content store
    pub fn load_workbook(&self) -> Result<Workbook> {
        match self.settings.workbook_source(self.workbook.as_deref())? {
            WorkbookSource::Local(path) => {
                info!("Reading workbook {}", path.display());
                Workbook::open(&path)
                    .with_context(|| format!("Failed to read workbook {}", path.display()))
            }
            WorkbookSource::Remote {
                repository,
                file,
                branch,
            } => {
                info!("Reading workbook {} from {} ({})", file, repository, branch);
                let repo = RepoCoordinates::require(&repository)?;
                let bytes = self
                    .github()?
                    .get_file(&repo, &file, &branch)
                    .with_context(|| format!("Failed to fetch {file} from {repository}"))?
                    .ok_or_else(|| anyhow::anyhow!("{file} not found in {repository} on {branch}"))?;
                Ok(Workbook::from_bytes(&bytes)?)
            }
        }
    }

    /// Parse the workbook and group its records by repository
    pub fn load_index(&self) -> Result<RepositoryIndex> {
        let workbook = self.load_workbook()?;
        Ok(RepositoryIndex::build(parse_workbook(&workbook)))
    }
}

/// Console output style shared by all commands
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Emit JSON instead of text
    pub json: bool,
    /// Colour status lines
    pub color: bool,
    /// Suppress informational text
    pub quiet: bool,
}

impl Output {
    /// Print a value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Informational line (suppressed by `--quiet`)
    pub fn line(&self, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", text.as_ref());
        }
    }

    /// Section heading
    pub fn heading(&self, text: &str) {
        if self.quiet {
            return;
        }
        if self.color {
            println!("{}", text.bold());
        } else {
            println!("{text}");
        }
    }

    /// Success line
    pub fn success(&self, text: &str) {
        if self.color {
            println!("{} {}", "✓".green(), text);
        } else {
            println!("OK {text}");
        }
    }

    /// Failure line, always shown
    pub fn failure(&self, text: &str) {
        if self.color {
            println!("{} {}", "✗".red(), text.red());
        } else {
            println!("FAILED {text}");
        }
    }

    /// Warning line
    pub fn warning(&self, text: &str) {
        if self.color {
            println!("{} {}", "!".yellow(), text);
        } else {
            println!("WARNING {text}");
        }
    }
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` is a no
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} (yes/no): ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Parse a selection like `1,3` (one-based) into zero-based indexes
pub fn parse_selection(text: &str) -> Result<Vec<usize>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let n: usize = s
                .parse()
                .with_context(|| format!("'{s}' is not an API number"))?;
            n.checked_sub(1)
                .ok_or_else(|| anyhow::anyhow!("API numbers start at 1"))
        })
        .collect()
}
