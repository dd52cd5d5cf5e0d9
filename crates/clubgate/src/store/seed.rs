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

//! Loading profile documents from JSON seed files
//!
//! A seed file is a JSON array of user documents, the same shape the
//! "users" collection holds:
//!
//! ```json
//! [
//!   { "id": "a1", "role": "admin", "display_name": "Office of Student Affairs" },
//!   { "id": "s1", "role": "student", "student_id": "221-15-4821", "clubs": ["CPC"] }
//! ]
//! ```

use super::InMemoryProfileStore;
use crate::error::ConfigError;
use crate::models::ProfileRecord;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Parse a seed document, rejecting duplicate ids and invalid records
pub fn parse_seed(content: &str) -> Result<Vec<ProfileRecord>, ConfigError> {
    let records: Vec<ProfileRecord> = serde_json::from_str(content)?;

    let mut seen = HashSet::new();
    for record in &records {
        record.validate().map_err(|e| ConfigError::Invalid { message: e.to_string() })?;
        if !seen.insert(record.id.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate profile id '{}'", record.id),
            });
        }
    }

    Ok(records)
}

/// Read and parse a seed file
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<ProfileRecord>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let records = parse_seed(&content)?;
    info!(path = %path.display(), count = records.len(), "Loaded profile seed file");
    Ok(records)
}

impl InMemoryProfileStore {
    /// Build a store from a seed file
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let records = load_seed_file(path)?;
        InMemoryProfileStore::with_records(records).map_err(|e| ConfigError::Invalid { message: e.to_string() })
    }
}
