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
use anyhow::{Result, bail};
use clubgate::error::StoreError;
use clubgate::session::InMemoryAuthProvider;
use clubgate::store::InMemoryProfileStore;
use clubgate::{AccessContext, GuardView, Identity, RouteAccess, SessionProvider};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum RouteOutcome {
    Public,
    Redirect { to: String },
    Guarded { view: GuardView },
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub route: String,
    pub user: Option<String>,
    pub outcome: RouteOutcome,
}

pub async fn run_check(ctx: &CommandContext, route: &str, user: Option<String>, profiles: Option<PathBuf>, offline: bool) -> Result<()> {
    let report = check_route(ctx, route, user, profiles, offline).await?;

    ctx.emit(&report, |report| {
        println!("Route: {}", report.route);
        println!("User: {}", report.user.as_deref().unwrap_or("(anonymous)"));
        match &report.outcome {
            RouteOutcome::Public => println!("Outcome: public"),
            RouteOutcome::Redirect { to } => println!("Outcome: always redirects to {}", to),
            RouteOutcome::Guarded { view } => match view {
                GuardView::Render => println!("Outcome: render"),
                GuardView::Redirect(target) => println!("Outcome: redirect to {}", target),
                GuardView::Error(error) => {
                    println!("Outcome: error ({})", error.kind());
                    println!("Message: {}", error.user_message());
                }
                GuardView::CheckingAccess => println!("Outcome: still checking access"),
            },
        }
    })
}

pub async fn check_route(ctx: &CommandContext, route: &str, user: Option<String>, profiles: Option<PathBuf>, offline: bool) -> Result<CheckReport> {
    let store = match &profiles {
        Some(path) => InMemoryProfileStore::from_seed_file(path)?,
        None => InMemoryProfileStore::new(),
    };
    if offline {
        store.set_failure(Some(StoreError::Unavailable {
            message: "profile store is offline".to_string(),
        }));
    }
    info!(profiles = store.len(), offline, "Profile store ready");

    let auth = match &user {
        Some(id) => InMemoryAuthProvider::signed_in(Identity::new(id.clone(), format!("{}@clubgate.local", id))),
        None => InMemoryAuthProvider::new(),
    };
    let sessions = SessionProvider::mount(&auth);
    let context = AccessContext::new(&sessions, Arc::new(store), &ctx.config);

    let outcome = match context.route(route) {
        RouteAccess::Public => RouteOutcome::Public,
        RouteAccess::Redirect(to) => RouteOutcome::Redirect { to },
        RouteAccess::Guarded(guard) => RouteOutcome::Guarded { view: guard.evaluate().await },
        RouteAccess::Unknown => bail!("Unknown route: {}", route),
    };

    Ok(CheckReport {
        route: route.to_string(),
        user,
        outcome,
    })
}
