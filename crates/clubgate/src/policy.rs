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

//! Route redirect policy
//!
//! The decision table that maps what is known about the visitor onto an
//! outcome for a guarded route:
//!
//! | authenticated | profile      | registration gate | role check        | outcome            |
//! |---------------|--------------|-------------------|-------------------|--------------------|
//! | no            | -            | -                 | -                 | redirect to login  |
//! | yes           | lookup error | -                 | -                 | error, no redirect |
//! | yes           | not found    | yes               | -                 | render             |
//! | yes           | not found    | no                | -                 | redirect to register |
//! | yes           | found        | yes               | -                 | redirect to home   |
//! | yes           | found        | no                | no required role  | render             |
//! | yes           | found        | no                | role matches      | render             |
//! | yes           | found        | no                | role differs      | redirect to home   |
//!
//! Everything here is pure; the guard feeds it facts and acts on the result.

use crate::models::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the profile lookup produced for an authenticated visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Found(Role),
    NotFound,
    LookupFailed,
}

/// Visitor facts the policy decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Anonymous,
    Authenticated(ProfileStatus),
}

/// Access requirement attached to a guarded route
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardRequirement {
    /// Role the profile must hold; `None` admits any registered role
    #[serde(default)]
    pub required_role: Option<Role>,

    /// Admit only visitors without a profile
    #[serde(default)]
    pub registration_gate: bool,

    /// Where a role mismatch is sent instead of the home page
    #[serde(default)]
    pub landing: Option<String>,
}

impl GuardRequirement {
    /// Any authenticated visitor with a profile
    pub fn registered() -> Self {
        Self::default()
    }

    /// Authenticated visitors whose profile holds `role`
    pub fn role(role: Role) -> Self {
        Self {
            required_role: Some(role),
            ..Self::default()
        }
    }

    /// Authenticated visitors that have not registered yet
    pub fn registration() -> Self {
        Self {
            registration_gate: true,
            ..Self::default()
        }
    }

    pub fn with_landing(mut self, landing: impl Into<String>) -> Self {
        self.landing = Some(landing.into());
        self
    }
}

/// Redirect targets known to the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Login,
    Register,
    Home,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Login => f.write_str("login"),
            Destination::Register => f.write_str("register"),
            Destination::Home => f.write_str("home"),
        }
    }
}

/// Outcome of one policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Render,
    RedirectTo(Destination),
    /// Hold position and show a retryable error
    LookupFailed,
}

impl AccessDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, AccessDecision::RedirectTo(_))
    }

    /// Label used for metrics and audit records
    pub fn label(&self) -> &'static str {
        match self {
            AccessDecision::Render => "render",
            AccessDecision::RedirectTo(Destination::Login) => "redirect_login",
            AccessDecision::RedirectTo(Destination::Register) => "redirect_register",
            AccessDecision::RedirectTo(Destination::Home) => "redirect_home",
            AccessDecision::LookupFailed => "lookup_failed",
        }
    }
}

/// Evaluate the decision table
pub fn decide(subject: &Subject, requirement: &GuardRequirement) -> AccessDecision {
    let status = match subject {
        Subject::Anonymous => return AccessDecision::RedirectTo(Destination::Login),
        Subject::Authenticated(status) => status,
    };

    match status {
        ProfileStatus::LookupFailed => AccessDecision::LookupFailed,
        ProfileStatus::NotFound if requirement.registration_gate => AccessDecision::Render,
        ProfileStatus::NotFound => AccessDecision::RedirectTo(Destination::Register),
        ProfileStatus::Found(_) if requirement.registration_gate => AccessDecision::RedirectTo(Destination::Home),
        ProfileStatus::Found(role) => match requirement.required_role {
            Some(required) if required != *role => AccessDecision::RedirectTo(Destination::Home),
            _ => AccessDecision::Render,
        },
    }
}

/// Concrete paths for each destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPaths {
    pub login: String,
    pub register: String,
    pub home: String,
}

impl Default for RedirectPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            register: "/register".to_string(),
            home: "/home".to_string(),
        }
    }
}

impl RedirectPaths {
    /// Path for a destination, honoring the requirement's own landing page
    pub fn resolve<'a>(&'a self, destination: Destination, requirement: &'a GuardRequirement) -> &'a str {
        match destination {
            Destination::Login => &self.login,
            Destination::Register => &self.register,
            Destination::Home if !requirement.registration_gate => requirement.landing.as_deref().unwrap_or(&self.home),
            Destination::Home => &self.home,
        }
    }
}

/// Suggested page to open right after sign-in
pub fn post_login_landing<'a>(subject: &Subject, paths: &'a RedirectPaths) -> Option<&'a str> {
    match subject {
        Subject::Anonymous => Some(&paths.login),
        Subject::Authenticated(ProfileStatus::NotFound) => Some(&paths.register),
        Subject::Authenticated(ProfileStatus::Found(Role::Student)) => Some(&paths.home),
        Subject::Authenticated(ProfileStatus::Found(role)) => Some(role.dashboard_path()),
        Subject::Authenticated(ProfileStatus::LookupFailed) => None,
    }
}

/// One row of the rendered decision table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRow {
    pub authenticated: bool,
    pub profile: &'static str,
    pub registration_gate: Option<bool>,
    pub role_check: &'static str,
    pub decision: AccessDecision,
}

/// The decision table, computed from `decide` over one representative per row
pub fn decision_table() -> Vec<DecisionRow> {
    let student = ProfileStatus::Found(Role::Student);
    let cases: [(Subject, Option<GuardRequirement>, &'static str, &'static str); 8] = [
        (Subject::Anonymous, None, "-", "-"),
        (Subject::Authenticated(ProfileStatus::LookupFailed), None, "lookup error", "-"),
        (Subject::Authenticated(ProfileStatus::NotFound), Some(GuardRequirement::registration()), "not found", "-"),
        (Subject::Authenticated(ProfileStatus::NotFound), Some(GuardRequirement::registered()), "not found", "-"),
        (Subject::Authenticated(student), Some(GuardRequirement::registration()), "found", "-"),
        (Subject::Authenticated(student), Some(GuardRequirement::registered()), "found", "required role unset"),
        (Subject::Authenticated(student), Some(GuardRequirement::role(Role::Student)), "found", "role matches"),
        (Subject::Authenticated(student), Some(GuardRequirement::role(Role::Admin)), "found", "role differs"),
    ];

    cases
        .into_iter()
        .map(|(subject, requirement, profile, role_check)| {
            let registration_gate = requirement.as_ref().map(|r| r.registration_gate);
            let requirement = requirement.unwrap_or_default();
            DecisionRow {
                authenticated: !matches!(subject, Subject::Anonymous),
                profile,
                registration_gate,
                role_check,
                decision: decide(&subject, &requirement),
            }
        })
        .collect()
}
