// ClubGate
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::CommandContext;
use crate::ConfigCommands;
use anyhow::{Result, bail};
use clubgate::GuardConfig;
use std::path::Path;

pub fn handle_config_command(ctx: &CommandContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Init { path, force } => init_config(&path, force),
    }
}

fn show_config(ctx: &CommandContext) -> Result<()> {
    ctx.emit(&ctx.config, |config| {
        println!("Current Configuration");
        println!("====================");

        println!("Redirect Paths:");
        println!("  Login: {}", config.paths.login);
        println!("  Register: {}", config.paths.register);
        println!("  Home: {}", config.paths.home);
        println!();

        match config.lookup_timeout() {
            Some(timeout) => println!("Lookup Timeout: {}ms", timeout.as_millis()),
            None => println!("Lookup Timeout: none"),
        }
        println!("Audit Max Events: {}", config.audit_max_events);
        println!();

        println!("Profile Cache:");
        println!("  Enabled: {}", config.cache.enabled);
        println!("  TTL: {}s", config.cache.ttl_secs);
    })
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    GuardConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
