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
use anyhow::Result;
use clubgate::policy::decision_table;
use clubgate::routes::{RouteCatalog, RouteRule};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RouteRow {
    pub path: String,
    pub access: &'static str,
    pub detail: String,
}

pub fn show_table(ctx: &CommandContext) -> Result<()> {
    let rows = decision_table();

    ctx.emit(&rows, |rows| {
        println!("Access Decision Table");
        println!("{:<14} {:<14} {:<18} {:<20} {:<18}", "Authenticated", "Profile", "Registration gate", "Role check", "Decision");
        println!("{}", "-".repeat(88));

        for row in rows {
            let gate = match row.registration_gate {
                Some(true) => "true",
                Some(false) => "false",
                None => "-",
            };
            println!(
                "{:<14} {:<14} {:<18} {:<20} {:<18}",
                if row.authenticated { "yes" } else { "no" },
                row.profile,
                gate,
                row.role_check,
                row.decision.label()
            );
        }
    })
}

pub fn route_rows(catalog: &RouteCatalog) -> Vec<RouteRow> {
    catalog
        .iter()
        .map(|(path, rule)| {
            let (access, detail) = match rule {
                RouteRule::Public => ("public", String::new()),
                RouteRule::Redirect(target) => ("redirect", target.clone()),
                RouteRule::Guarded(requirement) if requirement.registration_gate => ("guarded", "registration".to_string()),
                RouteRule::Guarded(requirement) => match requirement.required_role {
                    Some(role) => ("guarded", format!("role={}", role)),
                    None => ("guarded", "any registered role".to_string()),
                },
            };
            RouteRow {
                path: path.to_string(),
                access,
                detail,
            }
        })
        .collect()
}

pub fn show_routes(ctx: &CommandContext) -> Result<()> {
    let rows = route_rows(&RouteCatalog::portal(&ctx.config.paths));

    ctx.emit(&rows, |rows| {
        println!("Portal Routes:");
        println!("{:<28} {:<10} {:<24}", "Path", "Access", "Requirement");
        println!("{}", "-".repeat(62));
        for row in rows {
            println!("{:<28} {:<10} {:<24}", row.path, row.access, row.detail);
        }
    })
}
