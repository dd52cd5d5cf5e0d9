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

//! Role resolution
//!
//! Maps an authenticated identity to its profile with a single store read.
//! A missing profile is a business state (`ProfileLookup::NotFound`); store
//! faults, corrupt roles and timeouts are `AccessError::ProfileLookupFailed`.
//! The two never collapse into each other.

use crate::cache::{CacheStats, ProfileCache};
use crate::config::GuardConfig;
use crate::error::{AccessError, AccessResult, StoreError};
use crate::models::{Identity, Profile};
use crate::policy::ProfileStatus;
use crate::store::ProfileStore;
use metrics::counter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Successful lookup result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    Found(Profile),
    NotFound,
}

impl ProfileLookup {
    pub fn status(&self) -> ProfileStatus {
        match self {
            ProfileLookup::Found(profile) => ProfileStatus::Found(profile.role),
            ProfileLookup::NotFound => ProfileStatus::NotFound,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            ProfileLookup::Found(profile) => Some(profile),
            ProfileLookup::NotFound => None,
        }
    }
}

/// Resolves identities to profiles
pub struct RoleResolver {
    store: Arc<dyn ProfileStore>,
    cache: Option<ProfileCache>,
    lookup_timeout: Option<Duration>,
    last_identity: Mutex<Option<String>>,
}

impl RoleResolver {
    /// Resolver without caching or a lookup timeout
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            cache: None,
            lookup_timeout: None,
            last_identity: Mutex::new(None),
        }
    }

    pub fn from_config(store: Arc<dyn ProfileStore>, config: &GuardConfig) -> Self {
        let mut resolver = Self::new(store).with_lookup_timeout(config.lookup_timeout());
        if let Some(ttl) = config.cache_ttl() {
            resolver = resolver.with_cache(ttl);
        }
        resolver
    }

    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(ProfileCache::new(ttl));
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Look up the profile for `identity`
    ///
    /// Dropping the returned future abandons the lookup.
    pub async fn resolve(&self, identity: &Identity) -> AccessResult<ProfileLookup> {
        self.note_identity(&identity.id);

        if let Some(profile) = self.cache.as_ref().and_then(|cache| cache.get(&identity.id)) {
            counter!("clubgate_profile_lookups_total", 1, "outcome" => "cache_hit");
            return Ok(ProfileLookup::Found(profile));
        }

        let start = Instant::now();
        let result = self.fetch(&identity.id).await;
        let elapsed_ms = start.elapsed().as_millis();

        match result {
            Ok(ProfileLookup::Found(profile)) => {
                debug!(identity_id = %identity.id, role = %profile.role, elapsed_ms = %elapsed_ms, "Profile resolved");
                counter!("clubgate_profile_lookups_total", 1, "outcome" => "found");
                if let Some(cache) = &self.cache {
                    cache.insert(profile.clone());
                }
                Ok(ProfileLookup::Found(profile))
            }
            Ok(ProfileLookup::NotFound) => {
                debug!(identity_id = %identity.id, elapsed_ms = %elapsed_ms, "No profile registered");
                counter!("clubgate_profile_lookups_total", 1, "outcome" => "not_found");
                Ok(ProfileLookup::NotFound)
            }
            Err(error) => {
                warn!(identity_id = %identity.id, elapsed_ms = %elapsed_ms, error = %error, "Profile lookup failed");
                counter!("clubgate_profile_lookups_total", 1, "outcome" => "failed");
                Err(error)
            }
        }
    }

    /// Forget any cached profile for `identity_id`, e.g. after registration
    pub fn invalidate(&self, identity_id: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(identity_id);
        }
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ProfileCache::stats)
    }

    async fn fetch(&self, identity_id: &str) -> AccessResult<ProfileLookup> {
        let read = self.store.get(identity_id);
        let record = match self.lookup_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(AccessError::ProfileLookupFailed {
                        identity_id: identity_id.to_string(),
                        reason: format!("timed out after {} ms", limit.as_millis()),
                    });
                }
            },
            None => read.await,
        }
        .map_err(|e| e.into_access_error(identity_id))?;

        let Some(record) = record else {
            return Ok(ProfileLookup::NotFound);
        };

        if record.id != identity_id {
            return Err(StoreError::InvalidRecord {
                id: record.id,
                message: format!("returned for identity {}", identity_id),
            }
            .into_access_error(identity_id));
        }

        let profile = Profile::try_from(record).map_err(|e| e.into_access_error(identity_id))?;
        Ok(ProfileLookup::Found(profile))
    }

    /// Drop cached profiles of other identities when the identity changes
    fn note_identity(&self, identity_id: &str) {
        let mut last = self.last_identity.lock();
        if last.as_deref() == Some(identity_id) {
            return;
        }

        if let Some(cache) = &self.cache {
            cache.retain_only(identity_id);
        }
        debug!(previous = ?last.as_deref(), identity_id = %identity_id, "Resolver identity changed");
        *last = Some(identity_id.to_string());
    }
}

impl std::fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("cache", &self.cache.is_some())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}
