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

//! Authentication session tracking
//!
//! The external auth provider pushes identity changes through a callback.
//! `SessionProvider` turns that stream into a watched `Session` value that
//! guards and views read.

pub mod memory;
pub mod provider;

pub use memory::*;
pub use provider::*;

use crate::models::Identity;
use serde::Serialize;
use std::sync::Arc;

/// Live view of the authentication state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Current identity, `None` when signed out
    pub identity: Option<Identity>,

    /// True until the provider has reported for the first time
    pub is_resolving: bool,

    /// Number of provider emissions applied so far
    pub epoch: u64,
}

impl Session {
    /// State before the provider has reported anything
    pub fn resolving() -> Self {
        Self {
            identity: None,
            is_resolving: true,
            epoch: 0,
        }
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::resolving()
    }
}

/// Callback invoked by the auth provider with the current identity
pub type AuthListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Cancels an auth subscription
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Handle for providers that have nothing to release
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Stop delivery to the listener
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe").field("active", &self.cancel.is_some()).finish()
    }
}

/// External authentication provider
///
/// Implementations call the listener once with the current state right after
/// subscribing, then again on every sign-in and sign-out. Callbacks for one
/// subscription are delivered one at a time.
pub trait AuthProvider: Send + Sync {
    fn subscribe(&self, listener: AuthListener) -> Unsubscribe;
}
