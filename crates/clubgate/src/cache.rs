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

//! Profile caching for repeated guard evaluations
//!
//! Only found profiles are cached. A missing profile can appear at any time
//! (registration), and lookup failures must reach the store again on retry.

use crate::models::Profile;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Instant::now() > expires_at)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,

    /// Total cache misses
    pub misses: u64,

    /// Entries dropped by expiry or invalidation
    pub evictions: u64,

    /// Current cache size
    pub current_size: usize,
}

impl CacheStats {
    /// Calculate hit ratio
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 { 0.0 } else { self.hits as f64 / (self.hits + self.misses) as f64 }
    }
}

/// Profiles keyed by identity id
#[derive(Debug)]
pub struct ProfileCache {
    profiles: DashMap<String, CacheEntry<Profile>>,
    ttl: Duration,
    stats: Mutex<CacheStats>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            profiles: DashMap::new(),
            ttl,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached profile
    pub fn get(&self, identity_id: &str) -> Option<Profile> {
        let hit = match self.profiles.get(identity_id) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                self.stats.lock().misses += 1;
                debug!(identity_id = %identity_id, "Profile cache miss");
                return None;
            }
        };

        match hit {
            Some(profile) => {
                self.stats.lock().hits += 1;
                debug!(identity_id = %identity_id, "Profile cache hit");
                Some(profile)
            }
            None => {
                self.profiles.remove(identity_id);
                let mut stats = self.stats.lock();
                stats.evictions += 1;
                stats.misses += 1;
                stats.current_size = self.profiles.len();
                debug!(identity_id = %identity_id, "Profile cache entry expired");
                None
            }
        }
    }

    /// Cache a found profile
    pub fn insert(&self, profile: Profile) {
        let identity_id = profile.id.clone();
        self.profiles.insert(identity_id.clone(), CacheEntry::new(profile, self.ttl));
        self.stats.lock().current_size = self.profiles.len();
        debug!(identity_id = %identity_id, ttl = ?self.ttl, "Profile cached");
    }

    /// Drop the entry for one identity
    pub fn invalidate(&self, identity_id: &str) -> bool {
        let removed = self.profiles.remove(identity_id).is_some();
        if removed {
            let mut stats = self.stats.lock();
            stats.evictions += 1;
            stats.current_size = self.profiles.len();
            debug!(identity_id = %identity_id, "Profile cache entry invalidated");
        }
        removed
    }

    /// Drop every entry except the one for `identity_id`
    pub fn retain_only(&self, identity_id: &str) {
        let before = self.profiles.len();
        self.profiles.retain(|key, _| key == identity_id);
        let dropped = before.saturating_sub(self.profiles.len());

        let mut stats = self.stats.lock();
        stats.evictions += dropped as u64;
        stats.current_size = self.profiles.len();
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> usize {
        let before = self.profiles.len();
        self.profiles.retain(|_, entry| !entry.is_expired());
        let dropped = before.saturating_sub(self.profiles.len());

        if dropped > 0 {
            let mut stats = self.stats.lock();
            stats.evictions += dropped as u64;
            stats.current_size = self.profiles.len();
            debug!(dropped, "Expired profile cache entries removed");
        }
        dropped
    }

    pub fn clear(&self) {
        let dropped = self.profiles.len();
        self.profiles.clear();
        let mut stats = self.stats.lock();
        stats.evictions += dropped as u64;
        stats.current_size = 0;
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileRecord, Role};

    fn profile(id: &str, role: &str) -> Profile {
        Profile::try_from(ProfileRecord::new(id, role)).unwrap()
    }

    #[test]
    fn test_profile_cache() {
        let cache = ProfileCache::new(Duration::from_secs(60));

        assert!(cache.get("u1").is_none());

        cache.insert(profile("u1", "admin"));
        assert_eq!(cache.get("u1").map(|p| p.role), Some(Role::Admin));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_cache_expiration() {
        let cache = ProfileCache::new(Duration::from_secs(60));

        let expired_entry = CacheEntry {
            value: profile("u1", "club"),
            expires_at: Some(Instant::now() - Duration::from_secs(1)),
        };
        cache.profiles.insert("u1".to_string(), expired_entry);

        assert!(cache.get("u1").is_none());
        assert!(!cache.profiles.contains_key("u1"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.insert(profile("fresh", "student"));
        cache.profiles.insert(
            "stale".to_string(),
            CacheEntry {
                value: profile("stale", "student"),
                expires_at: Some(Instant::now() - Duration::from_secs(1)),
            },
        );

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_identity_invalidation() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        cache.insert(profile("u1", "student"));
        cache.insert(profile("u2", "club"));
        cache.insert(profile("u3", "admin"));

        assert!(cache.invalidate("u1"));
        assert!(!cache.invalidate("u1"));

        cache.retain_only("u3");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("u3").is_some());
        assert_eq!(cache.stats().evictions, 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let cache = ProfileCache::new(Duration::from_secs(u64::MAX));
        cache.insert(profile("a1", "admin"));

        assert_eq!(cache.get("a1").map(|p| p.role), Some(Role::Admin));
        assert_eq!(cache.cleanup_expired(), 0);
    }
}
