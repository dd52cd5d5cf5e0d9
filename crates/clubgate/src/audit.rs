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

//! Audit trail of guard decisions

use crate::policy::AccessDecision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Audit event result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The guarded view was rendered
    Granted,
    /// The visitor was sent elsewhere
    Redirected,
    /// The profile lookup failed and the guard held position
    Failed,
}

impl From<AccessDecision> for AuditResult {
    fn from(decision: AccessDecision) -> Self {
        match decision {
            AccessDecision::Render => AuditResult::Granted,
            AccessDecision::RedirectTo(_) => AuditResult::Redirected,
            AccessDecision::LookupFailed => AuditResult::Failed,
        }
    }
}

/// One recorded guard decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAuditEvent {
    /// Unique event ID
    pub id: String,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Identity evaluated, `None` for anonymous visitors
    pub identity_id: Option<String>,

    /// Guarded route, when the guard knows it
    pub route: Option<String>,

    /// Decision label (`render`, `redirect_login`, ...)
    pub decision: String,

    pub result: AuditResult,

    /// Redirect target, if any
    pub redirect_to: Option<String>,

    /// Additional event details
    pub details: HashMap<String, String>,
}

impl AccessAuditEvent {
    pub fn new(decision: AccessDecision, identity_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            identity_id,
            route: None,
            decision: decision.label().to_string(),
            result: decision.into(),
            redirect_to: None,
            details: HashMap::new(),
        }
    }

    pub fn with_route(mut self, route: Option<String>) -> Self {
        self.route = route;
        self
    }

    pub fn with_redirect(mut self, redirect_to: String) -> Self {
        self.redirect_to = Some(redirect_to);
        self
    }

    pub fn with_detail(mut self, key: String, value: String) -> Self {
        self.details.insert(key, value);
        self
    }
}

/// Bounded in-memory audit log
#[derive(Debug)]
pub struct AccessAuditLog {
    events: RwLock<VecDeque<AccessAuditEvent>>,
    max_events: usize,
}

impl AccessAuditLog {
    pub fn new() -> Self {
        Self::with_max_events(10_000)
    }

    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events: max_events.max(1),
        }
    }

    /// Record an event and mirror it to structured logging
    pub async fn log_event(&self, event: AccessAuditEvent) {
        match event.result {
            AuditResult::Granted | AuditResult::Redirected => {
                info!(
                    identity_id = ?event.identity_id,
                    route = ?event.route,
                    decision = %event.decision,
                    redirect_to = ?event.redirect_to,
                    "Access decision"
                );
            }
            AuditResult::Failed => {
                warn!(
                    identity_id = ?event.identity_id,
                    route = ?event.route,
                    decision = %event.decision,
                    details = ?event.details,
                    "Access decision held on lookup failure"
                );
            }
        }

        let mut events = self.events.write().await;
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    /// Record a guard decision
    pub async fn log_decision(&self, identity_id: Option<&str>, route: Option<&str>, decision: AccessDecision, redirect_to: Option<&str>) {
        let mut event = AccessAuditEvent::new(decision, identity_id.map(str::to_string)).with_route(route.map(str::to_string));
        if let Some(target) = redirect_to {
            event = event.with_redirect(target.to_string());
        }
        self.log_event(event).await;
    }

    /// Record a held decision caused by a failed lookup
    pub async fn log_lookup_failure(&self, identity_id: &str, route: Option<&str>, reason: &str) {
        let event = AccessAuditEvent::new(AccessDecision::LookupFailed, Some(identity_id.to_string()))
            .with_route(route.map(str::to_string))
            .with_detail("reason".to_string(), reason.to_string());
        self.log_event(event).await;
    }

    /// Most recent events, newest last
    pub async fn recent(&self, limit: usize) -> Vec<AccessAuditEvent> {
        let events = self.events.read().await;
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    pub async fn events_for_identity(&self, identity_id: &str) -> Vec<AccessAuditEvent> {
        let events = self.events.read().await;
        events.iter().filter(|e| e.identity_id.as_deref() == Some(identity_id)).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

impl Default for AccessAuditLog {
    fn default() -> Self {
        Self::new()
    }
}
