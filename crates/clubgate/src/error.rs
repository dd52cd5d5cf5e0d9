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

//! Error types for the access-control core
//!
//! `AccessError` is the taxonomy the guard reasons about. Only
//! `ProfileLookupFailed` is a fault; the other variants are ordinary
//! control-flow states that end in a placeholder or a redirect.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessError {
    #[error("Authentication state is still being resolved")]
    AuthUnresolved,

    #[error("No authenticated identity")]
    Unauthenticated,

    #[error("No profile registered for identity {identity_id}")]
    ProfileNotFound { identity_id: String },

    #[error("Profile lookup failed for identity {identity_id}: {reason}")]
    ProfileLookupFailed { identity_id: String, reason: String },
}

impl AccessError {
    /// Stable identifier used in logs, metrics labels and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::AuthUnresolved => "auth_unresolved",
            AccessError::Unauthenticated => "unauthenticated",
            AccessError::ProfileNotFound { .. } => "profile_not_found",
            AccessError::ProfileLookupFailed { .. } => "profile_lookup_failed",
        }
    }

    /// Whether a manual retry can change the outcome
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::ProfileLookupFailed { .. })
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            AccessError::AuthUnresolved => "Checking access...".to_string(),
            AccessError::Unauthenticated => "Please sign in to continue.".to_string(),
            AccessError::ProfileNotFound { .. } => "Please complete your registration.".to_string(),
            AccessError::ProfileLookupFailed { .. } => "We could not verify your account right now. Please try again.".to_string(),
        }
    }
}

/// Errors reported by profile store implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Invalid record {id}: {message}")]
    InvalidRecord { id: String, message: String },
}

impl StoreError {
    /// Convert into the access taxonomy for the given identity
    pub fn into_access_error(self, identity_id: &str) -> AccessError {
        AccessError::ProfileLookupFailed {
            identity_id: identity_id.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result type for access evaluation
pub type AccessResult<T> = Result<T, AccessError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lookup_failures_are_retryable() {
        assert!(!AccessError::AuthUnresolved.is_retryable());
        assert!(!AccessError::Unauthenticated.is_retryable());
        assert!(!AccessError::ProfileNotFound { identity_id: "u1".to_string() }.is_retryable());
        assert!(
            AccessError::ProfileLookupFailed {
                identity_id: "u1".to_string(),
                reason: "offline".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_store_error_conversion() {
        let err = StoreError::Unavailable { message: "connection reset".to_string() }.into_access_error("u7");
        assert_eq!(err.kind(), "profile_lookup_failed");
        assert_eq!(
            err,
            AccessError::ProfileLookupFailed {
                identity_id: "u7".to_string(),
                reason: "Store unavailable: connection reset".to_string()
            }
        );
    }
}
