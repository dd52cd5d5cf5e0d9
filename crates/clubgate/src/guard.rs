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

//! Access guard for protected views
//!
//! A guard combines the live session, the role resolver and the redirect
//! policy into what a protected view should show right now. It never shows
//! the protected view or redirects before the auth provider has reported,
//! and it never lets a lookup that started for an earlier session state
//! decide the current one.

use crate::audit::AccessAuditLog;
use crate::error::AccessError;
use crate::policy::{AccessDecision, GuardRequirement, ProfileStatus, RedirectPaths, Subject, decide};
use crate::resolver::RoleResolver;
use crate::session::Session;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a guarded view displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum GuardView {
    /// Neutral placeholder while auth state or the profile is unknown
    CheckingAccess,
    /// Mount the protected view
    Render,
    /// Navigate to the given path
    Redirect(String),
    /// Retryable error; neither the view nor a redirect
    Error(AccessError),
}

impl GuardView {
    /// Whether evaluation has finished
    pub fn is_settled(&self) -> bool {
        !matches!(self, GuardView::CheckingAccess)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardView::Redirect(path) => Some(path),
            _ => None,
        }
    }
}

/// Result of evaluating one session snapshot
#[derive(Debug, Clone)]
struct Assessment {
    view: GuardView,
    decision: Option<AccessDecision>,
    identity_id: Option<String>,
}

/// Gate in front of one protected view
pub struct AccessGuard {
    requirement: GuardRequirement,
    route: Option<String>,
    session: watch::Receiver<Session>,
    resolver: Arc<RoleResolver>,
    paths: RedirectPaths,
    audit: Option<Arc<AccessAuditLog>>,
}

impl AccessGuard {
    pub fn new(requirement: GuardRequirement, session: watch::Receiver<Session>, resolver: Arc<RoleResolver>) -> Self {
        Self {
            requirement,
            route: None,
            session,
            resolver,
            paths: RedirectPaths::default(),
            audit: None,
        }
    }

    /// Name the guarded route for logs and audit records
    pub fn for_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_paths(mut self, paths: RedirectPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AccessAuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn requirement(&self) -> &GuardRequirement {
        &self.requirement
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Evaluate once against the current session
    ///
    /// If the session moves on while the profile lookup is in flight, the
    /// result is dropped and the newer session is evaluated instead.
    pub async fn evaluate(&self) -> GuardView {
        let mut session = self.session.clone();
        loop {
            let snapshot = session.borrow_and_update().clone();
            let assessment = self.assess(&snapshot).await;

            if session.has_changed().unwrap_or(false) {
                debug!(route = ?self.route, epoch = snapshot.epoch, "Discarding access result for superseded session");
                continue;
            }

            self.record(&assessment).await;
            return assessment.view;
        }
    }

    /// Follow the session in a background task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(self) -> GuardHandle {
        let (view_tx, view_rx) = watch::channel(GuardView::CheckingAccess);
        let retry = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(view_tx, retry.clone()));

        GuardHandle { view: view_rx, retry, task }
    }

    async fn run(self, view_tx: watch::Sender<GuardView>, retry: Arc<Notify>) {
        let mut session = self.session.clone();
        info!(route = ?self.route, "Access guard mounted");

        loop {
            let snapshot = session.borrow_and_update().clone();
            publish(&view_tx, GuardView::CheckingAccess);

            // A session change abandons the lookup by dropping its future
            let assessment = tokio::select! {
                assessment = self.assess(&snapshot) => Some(assessment),
                changed = session.changed() => {
                    if changed.is_err() {
                        debug!(route = ?self.route, "Session closed, stopping guard");
                        return;
                    }
                    debug!(route = ?self.route, epoch = snapshot.epoch, "Session changed during lookup, abandoning it");
                    None
                }
            };

            let Some(assessment) = assessment else {
                continue;
            };

            if session.has_changed().unwrap_or(false) {
                debug!(route = ?self.route, epoch = snapshot.epoch, "Discarding access result for superseded session");
                continue;
            }

            // Register for retries before the result is visible, dropping any
            // permit stored by a retry requested while the lookup was running
            let retried = retry.notified();
            tokio::pin!(retried);
            if retried.as_mut().enable() {
                debug!(route = ?self.route, "Ignoring retry requested during lookup");
                retried.set(retry.notified());
                retried.as_mut().enable();
            }

            self.record(&assessment).await;
            publish(&view_tx, assessment.view);

            tokio::select! {
                changed = session.changed() => {
                    if changed.is_err() {
                        debug!(route = ?self.route, "Session closed, stopping guard");
                        return;
                    }
                }
                _ = &mut retried => {
                    info!(route = ?self.route, "Re-evaluating access on request");
                }
            }
        }
    }

    async fn assess(&self, snapshot: &Session) -> Assessment {
        if snapshot.is_resolving {
            return Assessment {
                view: GuardView::CheckingAccess,
                decision: None,
                identity_id: None,
            };
        }

        let (subject, failure) = match &snapshot.identity {
            None => (Subject::Anonymous, None),
            Some(identity) => match self.resolver.resolve(identity).await {
                Ok(lookup) => (Subject::Authenticated(lookup.status()), None),
                Err(error) => (Subject::Authenticated(ProfileStatus::LookupFailed), Some(error)),
            },
        };

        let decision = decide(&subject, &self.requirement);
        let identity_id = snapshot.identity_id().map(str::to_string);

        let view = match decision {
            AccessDecision::Render => GuardView::Render,
            AccessDecision::RedirectTo(destination) => GuardView::Redirect(self.paths.resolve(destination, &self.requirement).to_string()),
            AccessDecision::LookupFailed => GuardView::Error(failure.unwrap_or_else(|| AccessError::ProfileLookupFailed {
                identity_id: identity_id.clone().unwrap_or_default(),
                reason: "lookup failed".to_string(),
            })),
        };

        Assessment {
            view,
            decision: Some(decision),
            identity_id,
        }
    }

    async fn record(&self, assessment: &Assessment) {
        let Some(decision) = assessment.decision else {
            debug!(route = ?self.route, "Waiting for auth state");
            return;
        };

        counter!("clubgate_guard_decisions_total", 1, "decision" => decision.label());

        match &assessment.view {
            GuardView::Error(error) => {
                warn!(route = ?self.route, identity_id = ?assessment.identity_id, error = %error, "Access check failed, holding position");
            }
            view => {
                debug!(route = ?self.route, identity_id = ?assessment.identity_id, view = ?view, "Access evaluated");
            }
        }

        let Some(audit) = &self.audit else {
            return;
        };

        match &assessment.view {
            GuardView::Error(AccessError::ProfileLookupFailed { identity_id, reason }) => {
                audit.log_lookup_failure(identity_id, self.route.as_deref(), reason).await;
            }
            view => {
                audit
                    .log_decision(assessment.identity_id.as_deref(), self.route.as_deref(), decision, view.redirect_target())
                    .await;
            }
        }
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").field("route", &self.route).field("requirement", &self.requirement).finish()
    }
}

fn publish(view_tx: &watch::Sender<GuardView>, view: GuardView) {
    view_tx.send_if_modified(|current| {
        if *current == view {
            return false;
        }
        *current = view;
        true
    });
}

/// Handle to a mounted guard; dropping it stops the guard
pub struct GuardHandle {
    view: watch::Receiver<GuardView>,
    retry: Arc<Notify>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    /// Current view
    pub fn view(&self) -> GuardView {
        self.view.borrow().clone()
    }

    /// Receiver observing every published view
    pub fn watch(&self) -> watch::Receiver<GuardView> {
        self.view.clone()
    }

    /// Wait until the view satisfies `predicate`
    pub async fn wait_until(&self, predicate: impl FnMut(&GuardView) -> bool) -> GuardView {
        let mut rx = self.view.clone();
        match rx.wait_for(predicate).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    /// Wait until evaluation has finished
    pub async fn settled(&self) -> GuardView {
        self.wait_until(GuardView::is_settled).await
    }

    /// Manually re-run the evaluation, typically after an error
    ///
    /// Has no effect while a lookup is still running.
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop following the session
    pub fn teardown(&self) {
        self.task.abort();
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Identity, ProfileRecord, Role};
    use crate::session::{InMemoryAuthProvider, SessionProvider};
    use crate::store::InMemoryProfileStore;
    use std::time::Duration;

    fn identity(id: &str) -> Identity {
        Identity::new(id, format!("{}@diu.edu.bd", id))
    }

    fn portal_store() -> Arc<InMemoryProfileStore> {
        Arc::new(
            InMemoryProfileStore::with_records([
                ProfileRecord::new("a1", "admin"),
                ProfileRecord::new("c1", "club"),
                ProfileRecord::new("s1", "student").with_student_id("221-15-4821"),
            ])
            .unwrap(),
        )
    }

    async fn within<T>(future: impl std::future::Future<Output = T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), future).await.expect("guard did not settle in time")
    }

    #[tokio::test]
    async fn test_checking_access_while_resolving() {
        let auth = InMemoryAuthProvider::unreachable();
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        let resolver = Arc::new(RoleResolver::new(store.clone()));

        let guard = AccessGuard::new(GuardRequirement::registered(), sessions.watch(), resolver);
        assert_eq!(guard.evaluate().await, GuardView::CheckingAccess);
        assert_eq!(store.reads(), 0);
    }

    #[tokio::test]
    async fn test_evaluate_outcomes() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        let resolver = Arc::new(RoleResolver::new(portal_store()));

        let admin_guard = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), resolver.clone());
        assert_eq!(admin_guard.evaluate().await, GuardView::Redirect("/login".to_string()));

        auth.sign_in(identity("c1"));
        assert_eq!(admin_guard.evaluate().await, GuardView::Redirect("/home".to_string()));

        auth.sign_in(identity("a1"));
        assert_eq!(admin_guard.evaluate().await, GuardView::Render);

        auth.sign_in(identity("new-student"));
        assert_eq!(admin_guard.evaluate().await, GuardView::Redirect("/register".to_string()));

        let register_guard = AccessGuard::new(GuardRequirement::registration(), sessions.watch(), resolver);
        assert_eq!(register_guard.evaluate().await, GuardView::Render);
        assert_eq!(register_guard.evaluate().await, GuardView::Render);
    }

    #[tokio::test]
    async fn test_landing_override_and_custom_paths() {
        let auth = InMemoryAuthProvider::signed_in(identity("s1"));
        let sessions = SessionProvider::mount(&auth);
        let resolver = Arc::new(RoleResolver::new(portal_store()));

        let guard = AccessGuard::new(GuardRequirement::role(Role::Club).with_landing("/student-dashboard"), sessions.watch(), resolver.clone());
        assert_eq!(guard.evaluate().await, GuardView::Redirect("/student-dashboard".to_string()));

        let paths = RedirectPaths {
            login: "/sign-in".to_string(),
            register: "/onboarding".to_string(),
            home: "/feed".to_string(),
        };
        let guard = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), resolver).with_paths(paths);
        assert_eq!(guard.evaluate().await, GuardView::Redirect("/feed".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_failure_holds_and_audits() {
        let auth = InMemoryAuthProvider::signed_in(identity("a1"));
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        store.set_failure(Some(StoreError::Unavailable { message: "network unreachable".to_string() }));
        let audit = Arc::new(AccessAuditLog::new());

        let guard = AccessGuard::new(GuardRequirement::registered(), sessions.watch(), Arc::new(RoleResolver::new(store)))
            .for_route("/home")
            .with_audit(audit.clone());

        let view = guard.evaluate().await;
        assert!(matches!(view, GuardView::Error(ref e) if e.is_retryable()));
        assert_eq!(view.redirect_target(), None);

        let events = audit.events_for_identity("a1").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, "lookup_failed");
        assert_eq!(events[0].route.as_deref(), Some("/home"));
    }

    #[tokio::test]
    async fn test_mounted_guard_follows_session() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        let resolver = Arc::new(RoleResolver::new(portal_store()));

        let handle = AccessGuard::new(GuardRequirement::role(Role::Club), sessions.watch(), resolver).for_route("/club-dashboard").mount();
        assert_eq!(within(handle.settled()).await, GuardView::Redirect("/login".to_string()));

        auth.sign_in(identity("c1"));
        assert_eq!(within(handle.wait_until(|v| *v == GuardView::Render)).await, GuardView::Render);

        auth.sign_out();
        let view = within(handle.wait_until(|v| v.redirect_target().is_some())).await;
        assert_eq!(view, GuardView::Redirect("/login".to_string()));
    }

    #[tokio::test]
    async fn test_mounted_guard_retry_after_failure() {
        let auth = InMemoryAuthProvider::signed_in(identity("a1"));
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        store.set_failure(Some(StoreError::Backend { message: "quota exceeded".to_string() }));

        let handle = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), Arc::new(RoleResolver::new(store.clone()))).mount();
        let view = within(handle.settled()).await;
        assert!(matches!(view, GuardView::Error(_)));

        // No automatic retry
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.reads(), 1);

        store.set_failure(None);
        handle.retry();
        assert_eq!(within(handle.wait_until(|v| *v == GuardView::Render)).await, GuardView::Render);
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_retry_during_lookup_is_not_replayed() {
        let auth = InMemoryAuthProvider::signed_in(identity("a1"));
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        store.set_latency("a1", Duration::from_millis(100));
        store.set_failure(Some(StoreError::Unavailable { message: "network unreachable".to_string() }));

        let handle = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), Arc::new(RoleResolver::new(store.clone()))).mount();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.view(), GuardView::CheckingAccess);
        handle.retry();

        assert!(matches!(within(handle.settled()).await, GuardView::Error(_)));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.reads(), 1);
        assert!(matches!(handle.view(), GuardView::Error(_)));

        store.set_failure(None);
        handle.retry();
        assert_eq!(within(handle.wait_until(|v| *v == GuardView::Render)).await, GuardView::Render);
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_stale_lookup_never_lands() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        store.set_latency("a1", Duration::from_millis(300));
        let audit = Arc::new(AccessAuditLog::new());

        let handle = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), Arc::new(RoleResolver::new(store)))
            .with_audit(audit.clone())
            .mount();
        within(handle.settled()).await;

        // Slow admin lookup is superseded by a fast student sign-in
        auth.sign_in(identity("a1"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        auth.sign_in(identity("s1"));

        let view = within(handle.wait_until(|v| *v == GuardView::Redirect("/home".to_string()))).await;
        assert_eq!(view, GuardView::Redirect("/home".to_string()));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(handle.view(), GuardView::Redirect("/home".to_string()));
        assert!(audit.events_for_identity("a1").await.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_discards_superseded_lookup() {
        let auth = InMemoryAuthProvider::signed_in(identity("a1"));
        let sessions = SessionProvider::mount(&auth);
        let store = portal_store();
        store.set_latency("a1", Duration::from_millis(200));

        let guard = AccessGuard::new(GuardRequirement::role(Role::Admin), sessions.watch(), Arc::new(RoleResolver::new(store)));

        let switcher = {
            let auth = auth.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                auth.sign_in(Identity::new("c1", "c1@diu.edu.bd"));
            })
        };

        assert_eq!(within(guard.evaluate()).await, GuardView::Redirect("/home".to_string()));
        switcher.await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_stops_guard() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        let resolver = Arc::new(RoleResolver::new(portal_store()));

        let handle = AccessGuard::new(GuardRequirement::registered(), sessions.watch(), resolver).mount();
        within(handle.settled()).await;

        handle.teardown();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_active());

        auth.sign_in(identity("s1"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.view(), GuardView::Redirect("/login".to_string()));
    }
}
