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

//! Route access catalog
//!
//! Declares which requirement each portal route carries. Mounting views and
//! navigating stay with the router; this is only the lookup table it
//! consults when building guards.

use crate::models::Role;
use crate::policy::{GuardRequirement, RedirectPaths};
use serde::Serialize;
use std::collections::BTreeMap;

/// Access rule for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteRule {
    /// Reachable without a guard
    Public,
    /// Always forwards to another path
    Redirect(String),
    /// Wrapped in an access guard
    Guarded(GuardRequirement),
}

/// Path to rule mapping
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteCatalog {
    rules: BTreeMap<String, RouteRule>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes of the club portal, with login, registration and home at `paths`
    pub fn portal(paths: &RedirectPaths) -> Self {
        let mut catalog = Self::new();
        catalog.insert("/", RouteRule::Redirect(paths.login.clone()));
        catalog.insert(&paths.login, RouteRule::Public);
        catalog.insert(&paths.register, RouteRule::Guarded(GuardRequirement::registration()));
        catalog.insert(&paths.home, RouteRule::Guarded(GuardRequirement::registered()));

        for path in [
            "/admin-dashboard",
            "/admin-approved-events",
            "/admin-add-club",
            "/admin-pending-events",
            "/admin-user-management",
            "/admin-profile",
        ] {
            catalog.insert(path, RouteRule::Guarded(GuardRequirement::role(Role::Admin)));
        }

        for path in ["/club-dashboard", "/club-events-management", "/club-members-management", "/club-profile"] {
            catalog.insert(path, RouteRule::Guarded(GuardRequirement::role(Role::Club)));
        }

        catalog
    }

    pub fn insert(&mut self, path: &str, rule: RouteRule) -> Option<RouteRule> {
        self.rules.insert(normalize(path), rule)
    }

    /// Rule for a path; trailing slashes and query strings are ignored
    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        self.rules.get(&normalize(path))
    }

    /// Requirement for a guarded path
    pub fn requirement(&self, path: &str) -> Option<&GuardRequirement> {
        match self.lookup(path) {
            Some(RouteRule::Guarded(requirement)) => Some(requirement),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteRule)> {
        self.rules.iter().map(|(path, rule)| (path.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
