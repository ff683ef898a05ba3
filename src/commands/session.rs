// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Session command - drives the publishing workflow interactively
//!
//! Each input line is one action. Failed actions are reported and the
//! session carries on from where it was.

use super::search::print_records;
use super::validate::print_report;
use super::{parse_selection, Context, Output};
use crate::workflow::{Session, Stage};
use anyhow::Result;
use std::io::{BufRead, Write};

const HELP: &str = "\
Actions:
  search <repo-url>   look up the APIs of a repository (resets the session)
  generate [1,2,..]   build the metadata document (all APIs by default)
  validate            check the document
  create-pr           commit the document through a pull request
  check-pr            refresh the pull request state
  publish             publish the merged document
  status              show the current state
  show                print the current document
  help                this text
  quit                leave";

/// Run the interactive session on stdin
pub fn run(ctx: &Context) -> Result<()> {
    let index = ctx.load_index()?;
    let github = ctx.github()?;
    let publisher = ctx.publisher()?;
    let mut session = Session::new(&index, &github, &publisher, &ctx.settings);

    ctx.output.line(format!(
        "{} repositories loaded. Type 'help' for actions.",
        index.len()
    ));
    let stdin = std::io::stdin();
    drive(&mut session, &ctx.output, stdin.lock())
}

/// Feed actions from `input` to the session until `quit` or end of input
pub fn drive(session: &mut Session<'_>, output: &Output, input: impl BufRead) -> Result<()> {
    let prompt = !output.quiet;
    if prompt {
        print!("apixflow> ");
        std::io::stdout().flush()?;
    }
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        let (action, arg) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(a, rest)| (a, rest.trim()));

        match action {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            other => act(session, output, other, arg),
        }

        if prompt {
            print!("[{}] apixflow> ", session.kind());
            std::io::stdout().flush()?;
        }
    }
    if prompt {
        println!();
    }
    Ok(())
}

fn act(session: &mut Session<'_>, output: &Output, action: &str, arg: &str) {
    match action {
        "search" => match session.search(arg) {
            Ok(n) => {
                output.success(&format!("Found {n} API(s)"));
                if let Some(found) = session.stage().found() {
                    print_records(&found.records);
                }
            }
            Err(e) => output.failure(&e.to_string()),
        },
        "generate" => {
            let selection = if arg.is_empty() {
                None
            } else {
                match parse_selection(arg) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        output.failure(&e.to_string());
                        return;
                    }
                }
            };
            match session.generate(selection.as_deref()) {
                Ok(doc) => output.success(&format!("Generated document with {} API(s)", doc.api_count())),
                Err(e) => output.failure(&e.to_string()),
            }
        }
        "validate" => match session.validate() {
            Ok(report) => print_report(output, &report),
            Err(e) => match session.last_validation() {
                Some(report) => print_report(output, report),
                None => output.failure(&e.to_string()),
            },
        },
        "create-pr" => match session.create_pr() {
            Ok(pr) => output.success(&format!("Opened PR #{}: {}", pr.number, pr.url)),
            Err(e) => output.failure(&e.to_string()),
        },
        "check-pr" => match session.check_pr() {
            Ok(status) => {
                let report = status.report();
                if !report.pr_exists {
                    output.line("No pull request; create one with 'create-pr'");
                } else if report.can_publish {
                    output.success("Pull request merged; ready to publish");
                } else if status.permits_new_pr() {
                    output.warning("Pull request closed without merge; create a new one");
                } else {
                    output.warning("Pull request still open; merge it, then check again");
                }
            }
            Err(e) => output.failure(&e.to_string()),
        },
        "publish" => match session.publish() {
            Ok(summary) => output.success(&format!(
                "Published {} API(s) from {} at {}",
                summary.published_apis,
                summary.repository_url,
                summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            Err(e) => output.failure(&e.to_string()),
        },
        "status" => print_status(session, output),
        "show" => match session.stage().draft() {
            Some(draft) => println!("{}", draft.document.to_pretty_json()),
            None => output.warning("No document generated yet"),
        },
        other => output.warning(&format!("Unknown action '{other}'; try 'help'")),
    }
}

fn print_status(session: &Session<'_>, output: &Output) {
    println!("State: {}", session.kind());
    if let Some(found) = session.stage().found() {
        println!("Repository: {} ({} API(s))", found.repository_url, found.records.len());
    }
    if let Some(draft) = session.stage().draft() {
        println!("Document: {} API(s)", draft.document.api_count());
    }
    if let Some(pr) = session.stage().pull_request() {
        println!("Pull request: #{} {}", pr.number, pr.url);
    }
    if let Stage::Published(_, summary) = session.stage() {
        println!("Published: {} API(s) at {}", summary.published_apis, summary.timestamp);
    }
    if let Some(err) = session.last_error() {
        output.warning(&format!("Last error: {err}"));
    }
}
