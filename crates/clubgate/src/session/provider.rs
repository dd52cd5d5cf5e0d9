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

//! Session provider bound to an auth provider subscription

use super::{AuthListener, AuthProvider, Session, Unsubscribe};
use crate::models::Identity;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info};

/// Publishes the auth provider's state as a watched `Session`
pub struct SessionProvider {
    state: Arc<watch::Sender<Session>>,
    subscription: Mutex<Option<Unsubscribe>>,
    active: Arc<AtomicBool>,
}

impl SessionProvider {
    /// Subscribe to the provider and start tracking its state
    pub fn mount(provider: &dyn AuthProvider) -> Self {
        let (tx, _rx) = watch::channel(Session::resolving());
        let state = Arc::new(tx);
        let active = Arc::new(AtomicBool::new(true));

        let listener: AuthListener = {
            let state = state.clone();
            let active = active.clone();
            Arc::new(move |identity: Option<Identity>| {
                if !active.load(Ordering::Acquire) {
                    debug!("Ignoring auth change delivered after teardown");
                    return;
                }
                apply_auth_change(&state, identity);
            })
        };

        let subscription = provider.subscribe(listener);
        info!("Session provider mounted");

        Self {
            state,
            subscription: Mutex::new(Some(subscription)),
            active,
        }
    }

    /// Current session state
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published session
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Wait until the provider has reported at least once
    pub async fn resolved(&self) -> Session {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|session| !session.is_resolving).await {
            Ok(session) => session.clone(),
            Err(_) => self.snapshot(),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Cancel the subscription; later provider callbacks are ignored
    pub fn teardown(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.cancel();
        }
        info!("Session provider torn down");
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider").field("session", &*self.state.borrow()).field("mounted", &self.is_mounted()).finish()
    }
}

fn apply_auth_change(state: &watch::Sender<Session>, identity: Option<Identity>) {
    state.send_modify(|session| {
        session.identity = identity;
        session.is_resolving = false;
        session.epoch += 1;

        debug!(
            identity_id = ?session.identity_id(),
            epoch = session.epoch,
            "Auth state changed"
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemoryAuthProvider;

    #[tokio::test]
    async fn test_initial_state_resolves_immediately() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);

        let session = sessions.snapshot();
        assert!(!session.is_resolving);
        assert_eq!(session.identity, None);
        assert_eq!(session.epoch, 1);
    }

    #[tokio::test]
    async fn test_stays_resolving_without_provider_report() {
        let auth = InMemoryAuthProvider::unreachable();
        let sessions = SessionProvider::mount(&auth);

        assert!(sessions.snapshot().is_resolving);

        let waited = tokio::time::timeout(std::time::Duration::from_millis(50), sessions.resolved()).await;
        assert!(waited.is_err());

        auth.set_reachable(true);
        let session = sessions.resolved().await;
        assert!(!session.is_resolving);
    }

    #[tokio::test]
    async fn test_sign_in_and_out_replace_identity() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        let mut rx = sessions.watch();

        auth.sign_in(Identity::new("u1", "u1@diu.edu.bd"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().identity_id(), Some("u1"));

        auth.sign_out();
        rx.changed().await.unwrap();
        let session = rx.borrow_and_update().clone();
        assert_eq!(session.identity, None);
        assert_eq!(session.epoch, 3);
    }

    #[tokio::test]
    async fn test_teardown_unsubscribes() {
        let auth = InMemoryAuthProvider::new();
        let sessions = SessionProvider::mount(&auth);
        assert_eq!(auth.listener_count(), 1);

        sessions.teardown();
        assert_eq!(auth.listener_count(), 0);
        assert!(!sessions.is_mounted());

        auth.sign_in(Identity::new("u1", "u1@diu.edu.bd"));
        assert_eq!(sessions.snapshot().identity, None);

        // Second teardown is a no-op
        sessions.teardown();
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let auth = InMemoryAuthProvider::new();
        {
            let _sessions = SessionProvider::mount(&auth);
            assert_eq!(auth.listener_count(), 1);
        }
        assert_eq!(auth.listener_count(), 0);
    }
}
