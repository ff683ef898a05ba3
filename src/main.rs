// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! apixflow CLI - publish API metadata from GitHub repositories to APIX

use anyhow::{Context as _, Result};
use apixflow::commands::{self, Context, Output};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apixflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "APIXFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Metadata workbook (.xlsx), overriding the configured source
    #[arg(short, long, global = true)]
    workbook: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sheets (EIM IDs) and their API counts
    Sheets,

    /// Find the API records for a repository
    Search {
        /// Repository URL
        repository: String,
    },

    /// Generate the metadata document for a repository
    Generate {
        /// Repository URL
        repository: String,

        /// APIs to include, one-based (e.g. 1,3); all when omitted
        #[arg(short, long)]
        select: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a metadata document file
    Validate {
        /// Document to check
        file: PathBuf,
    },

    /// Fetch a repository's committed metadata (main, then master)
    Fetch {
        /// Repository URL
        repository: String,
    },

    /// Show the latest metadata pull request of a repository
    PrStatus {
        /// Repository URL
        repository: String,
    },

    /// Publish a repository's committed metadata (main, then master) to production
    Publish {
        /// Repository URL
        repository: String,

        /// EIM ID identifying the invocation
        #[arg(long)]
        eim: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Publish every repository listed on one sheet
    PublishSheet {
        /// Sheet name (EIM ID)
        eim: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Write a JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Interactive workflow: search, generate, validate, PR, publish
    Session,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with tokens masked
    Show,
    /// Print the default config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, Cli::command());
    }

    let settings = apixflow::config::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let ctx = Context {
        settings,
        workbook: cli.workbook,
        output: Output {
            json: cli.json,
            color: !cli.no_color,
            quiet: cli.quiet,
        },
    };

    // Execute command
    match cli.command {
        Commands::Sheets => commands::sheets::run(&ctx),
        Commands::Search { repository } => commands::search::run(&ctx, &repository),
        Commands::Generate { repository, select, output } => {
            commands::generate::run(&ctx, &repository, select, output)
        }
        Commands::Validate { file } => commands::validate::run(&ctx, &file),
        Commands::Fetch { repository } => commands::fetch::run(&ctx, &repository),
        Commands::PrStatus { repository } => commands::pr_status::run(&ctx, &repository),
        Commands::Publish { repository, eim, yes } => {
            commands::publish::run(&ctx, &repository, &eim, yes)
        }
        Commands::PublishSheet { eim, yes, report } => {
            commands::publish_sheet::run(&ctx, &eim, yes, report)
        }
        Commands::Session => commands::session::run(&ctx),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&ctx),
            ConfigAction::Path => commands::config::path(),
        },
        Commands::Completions { .. } => Ok(()),
    }
}
