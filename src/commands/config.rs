// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - shows the effective configuration

use super::Context;
use crate::config::default_config_path;
use anyhow::Result;

/// Run `config show`
pub fn show(ctx: &Context) -> Result<()> {
    let settings = ctx.settings.redacted();
    if ctx.output.json {
        return ctx.output.json(&settings);
    }

    if let Some(path) = default_config_path() {
        ctx.output.line(format!("# default config file: {}", path.display()));
    }
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

/// Run `config path`
pub fn path() -> Result<()> {
    match default_config_path() {
        Some(p) => println!("{}", p.display()),
        None => anyhow::bail!("No home directory; cannot determine config path"),
    }
    Ok(())
}
