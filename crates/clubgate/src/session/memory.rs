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

//! In-process auth provider for development and tests

use super::{AuthListener, AuthProvider, Unsubscribe};
use crate::models::Identity;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::debug;

#[derive(Default)]
struct Inner {
    current: Option<Identity>,
    listeners: BTreeMap<u64, AuthListener>,
    next_id: u64,
    reachable: bool,
}

/// Auth provider holding the signed-in identity in memory
///
/// While unreachable, subscriptions are accepted but nothing is delivered,
/// which models a backend that never answers the initial state check.
#[derive(Clone)]
pub struct InMemoryAuthProvider {
    inner: Arc<Mutex<Inner>>,
    /// Held from each state write through its delivery so listeners see
    /// writes in order; reentrant so a listener may sign in or out itself
    delivery: Arc<ReentrantMutex<()>>,
}

impl InMemoryAuthProvider {
    /// Reachable provider with nobody signed in
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                reachable: true,
                ..Inner::default()
            })),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Reachable provider with `identity` already signed in
    pub fn signed_in(identity: Identity) -> Self {
        let provider = Self::new();
        provider.inner.lock().current = Some(identity);
        provider
    }

    /// Provider that does not deliver anything until made reachable
    pub fn unreachable() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            delivery: Arc::new(ReentrantMutex::new(())),
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.inner.lock().current.clone()
    }

    pub fn sign_in(&self, identity: Identity) {
        debug!(identity_id = %identity.id, "Signing in");
        self.replace(Some(identity));
    }

    pub fn sign_out(&self) {
        debug!("Signing out");
        self.replace(None);
    }

    /// Toggle delivery; becoming reachable flushes the current state
    pub fn set_reachable(&self, reachable: bool) {
        let _delivery = self.delivery.lock();
        let (listeners, current) = {
            let mut inner = self.inner.lock();
            inner.reachable = reachable;
            if !reachable {
                return;
            }
            (Self::snapshot_listeners(&inner), inner.current.clone())
        };
        for listener in listeners {
            listener(current.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn replace(&self, identity: Option<Identity>) {
        let _delivery = self.delivery.lock();
        let listeners = {
            let mut inner = self.inner.lock();
            inner.current = identity.clone();
            if !inner.reachable {
                return;
            }
            Self::snapshot_listeners(&inner)
        };
        // Listeners run outside the state lock so they may call back into the provider
        for listener in listeners {
            listener(identity.clone());
        }
    }

    fn snapshot_listeners(inner: &Inner) -> Vec<AuthListener> {
        inner.listeners.values().cloned().collect()
    }
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for InMemoryAuthProvider {
    fn subscribe(&self, listener: AuthListener) -> Unsubscribe {
        let _delivery = self.delivery.lock();
        let (id, initial) = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            let initial = inner.reachable.then(|| inner.current.clone());
            (id, initial)
        };

        if let Some(current) = initial {
            listener(current);
        }

        let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.lock().listeners.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_fires_with_current_state() {
        let provider = InMemoryAuthProvider::signed_in(Identity::new("u1", "u1@diu.edu.bd"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = provider.subscribe(Arc::new(move |identity: Option<Identity>| sink.lock().push(identity.map(|i| i.id))));

        assert_eq!(*seen.lock(), vec![Some("u1".to_string())]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let provider = InMemoryAuthProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let sub = provider.subscribe(Arc::new(move |_: Option<Identity>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        provider.sign_in(Identity::new("u1", "u1@diu.edu.bd"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        sub.cancel();
        provider.sign_out();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.listener_count(), 0);
    }

    #[test]
    fn test_unreachable_provider_holds_delivery() {
        let provider = InMemoryAuthProvider::unreachable();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let _sub = provider.subscribe(Arc::new(move |_: Option<Identity>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        provider.sign_in(Identity::new("u1", "u1@diu.edu.bd"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        provider.set_reachable(true);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.current().map(|i| i.id), Some("u1".to_string()));
    }

    #[test]
    fn test_concurrent_sign_ins_deliver_last_write_last() {
        let provider = InMemoryAuthProvider::new();
        let last_seen = Arc::new(Mutex::new(None));

        let sink = last_seen.clone();
        let _sub = provider.subscribe(Arc::new(move |identity: Option<Identity>| {
            *sink.lock() = identity.map(|i| i.id);
        }));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let provider = provider.clone();
                std::thread::spawn(move || {
                    for n in 0..200 {
                        let id = format!("u{}-{}", worker, n);
                        provider.sign_in(Identity::new(id.clone(), format!("{}@diu.edu.bd", id)));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(*last_seen.lock(), provider.current().map(|i| i.id));
    }

    #[test]
    fn test_listener_may_sign_out_reentrantly() {
        let provider = InMemoryAuthProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let inner = provider.clone();
        let counter = calls.clone();
        let _sub = provider.subscribe(Arc::new(move |identity: Option<Identity>| {
            counter.fetch_add(1, Ordering::SeqCst);
            if identity.is_some_and(|i| i.id == "banned") {
                inner.sign_out();
            }
        }));

        provider.sign_in(Identity::new("banned", "banned@diu.edu.bd"));
        assert_eq!(provider.current(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
