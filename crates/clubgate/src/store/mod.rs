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

//! Profile storage seam
//!
//! Profiles live in the hosted document store's "users" collection. The core
//! only ever performs single-key reads against it.

pub mod memory;
pub mod seed;

pub use memory::*;
pub use seed::*;

use crate::error::StoreResult;
use crate::models::ProfileRecord;
use async_trait::async_trait;

/// Read access to user profile documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the user document with the given id
    ///
    /// `Ok(None)` means the document does not exist. Transport and backend
    /// faults must be reported as errors, never as a missing document.
    async fn get(&self, id: &str) -> StoreResult<Option<ProfileRecord>>;
}
