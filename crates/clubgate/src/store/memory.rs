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

//! In-memory profile store

use super::ProfileStore;
use crate::error::{StoreError, StoreResult};
use crate::models::ProfileRecord;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Profile store backed by a hash map
///
/// Supports injected failures and per-document latency so callers can
/// exercise outage and slow-network paths.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: RwLock<HashMap<String, ProfileRecord>>,
    latency: RwLock<HashMap<String, Duration>>,
    failure: RwLock<Option<StoreError>>,
    reads: AtomicU64,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already validated records
    pub fn with_records(records: impl IntoIterator<Item = ProfileRecord>) -> StoreResult<Self> {
        let store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Insert or replace a profile document (the registration write)
    pub fn insert(&self, record: ProfileRecord) -> StoreResult<()> {
        record.validate()?;
        debug!(id = %record.id, role = %record.role, "Storing profile record");
        self.records.write().insert(record.id.clone(), record);
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<ProfileRecord> {
        self.records.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Make every read fail with `error` until cleared with `None`
    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }

    /// Delay reads of one document
    pub fn set_latency(&self, id: impl Into<String>, latency: Duration) {
        self.latency.write().insert(id.into(), latency);
    }

    /// Number of reads served, including failed ones
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &str) -> StoreResult<Option<ProfileRecord>> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency.read().get(id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.failure.read().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(self.records.read().get(id).cloned())
    }
}
