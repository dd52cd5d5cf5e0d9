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

//! Shared access context handed down to views
//!
//! Bundles the session, resolver, redirect paths, audit trail and route
//! catalog so every guard in the app is built from the same pieces.

use crate::audit::AccessAuditLog;
use crate::config::GuardConfig;
use crate::guard::AccessGuard;
use crate::policy::{GuardRequirement, RedirectPaths};
use crate::resolver::RoleResolver;
use crate::routes::{RouteCatalog, RouteRule};
use crate::session::{Session, SessionProvider};
use crate::store::ProfileStore;
use std::sync::Arc;
use tokio::sync::watch;

/// How a path should be served
#[derive(Debug)]
pub enum RouteAccess {
    Public,
    Redirect(String),
    Guarded(AccessGuard),
    /// Path not in the catalog
    Unknown,
}

/// Access context for one mounted app
#[derive(Clone)]
pub struct AccessContext {
    session: watch::Receiver<Session>,
    resolver: Arc<RoleResolver>,
    paths: RedirectPaths,
    audit: Arc<AccessAuditLog>,
    catalog: Arc<RouteCatalog>,
}

impl AccessContext {
    pub fn new(sessions: &SessionProvider, store: Arc<dyn ProfileStore>, config: &GuardConfig) -> Self {
        Self {
            session: sessions.watch(),
            resolver: Arc::new(RoleResolver::from_config(store, config)),
            paths: config.paths.clone(),
            audit: Arc::new(AccessAuditLog::with_max_events(config.audit_max_events)),
            catalog: Arc::new(RouteCatalog::portal(&config.paths)),
        }
    }

    pub fn with_catalog(mut self, catalog: RouteCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Guard for an explicit requirement
    pub fn guard(&self, requirement: GuardRequirement) -> AccessGuard {
        AccessGuard::new(requirement, self.session.clone(), self.resolver.clone())
            .with_paths(self.paths.clone())
            .with_audit(self.audit.clone())
    }

    /// Look up a path in the catalog and build its guard if it has one
    pub fn route(&self, path: &str) -> RouteAccess {
        match self.catalog.lookup(path) {
            Some(RouteRule::Public) => RouteAccess::Public,
            Some(RouteRule::Redirect(target)) => RouteAccess::Redirect(target.clone()),
            Some(RouteRule::Guarded(requirement)) => RouteAccess::Guarded(self.guard(requirement.clone()).for_route(path)),
            None => RouteAccess::Unknown,
        }
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn resolver(&self) -> &Arc<RoleResolver> {
        &self.resolver
    }

    pub fn audit(&self) -> &Arc<AccessAuditLog> {
        &self.audit
    }

    pub fn paths(&self) -> &RedirectPaths {
        &self.paths
    }

    pub fn catalog(&self) -> &RouteCatalog {
        &self.catalog
    }
}
