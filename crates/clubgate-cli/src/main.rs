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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use crate::commands::CommandContext;
use anyhow::Result;
use clubgate::GuardConfig;
use tracing_subscriber::EnvFilter;

/// CLI for inspecting ClubGate access decisions
#[derive(Parser, Debug)]
#[command(name = "clubgate", about = "ClubGate access control tooling")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for configuration inspection
#[derive(Subcommand, Debug)]
#[command(about = "Inspect or create guard configuration")]
pub enum ConfigCommands {
    /// Show current effective configuration
    Show,
    /// Write the default configuration to a file
    Init {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Top-level commands for clubgate
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the access policy for one visitor and requirement
    Decide {
        /// Visitor is not signed in
        #[arg(long, conflicts_with = "profile")]
        anonymous: bool,

        /// Lookup outcome: admin, club, student, not-found or error
        #[arg(long)]
        profile: Option<String>,

        /// Role the route requires
        #[arg(long)]
        role: Option<String>,

        /// Route is the registration form
        #[arg(long, conflicts_with = "role")]
        registration: bool,

        /// Landing page for role mismatches
        #[arg(long)]
        landing: Option<String>,
    },

    /// Print the access decision table
    Table,

    /// List the portal routes and their requirements
    Routes,

    /// Resolve a route for a user against a profile seed file
    Check {
        /// Route path, e.g. /admin-dashboard
        #[arg(long)]
        route: String,

        /// Signed-in user id; omit for an anonymous visitor
        #[arg(long)]
        user: Option<String>,

        /// JSON seed file with profile documents
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Simulate an unreachable profile store
        #[arg(long)]
        offline: bool,
    },

    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = GuardConfig::resolve(cli.config)?;

    let ctx = CommandContext::new(config, cli.json);

    // Dispatch commands
    match cli.command {
        Commands::Decide {
            anonymous,
            profile,
            role,
            registration,
            landing,
        } => {
            commands::decide::run_decide(&ctx, anonymous, profile.as_deref(), role.as_deref(), registration, landing)?;
        }
        Commands::Table => {
            commands::table::show_table(&ctx)?;
        }
        Commands::Routes => {
            commands::table::show_routes(&ctx)?;
        }
        Commands::Check { route, user, profiles, offline } => {
            commands::check::run_check(&ctx, &route, user, profiles, offline).await?;
        }
        Commands::Config { command } => {
            commands::config::handle_config_command(&ctx, command)?;
        }
    }

    Ok(())
}
