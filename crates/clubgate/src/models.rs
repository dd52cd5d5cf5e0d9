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

//! Identity, role and profile models

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authenticated principal issued by the external auth provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque account id, stable per account
    pub id: String,

    /// Account email
    pub email: String,
}

impl Identity {
    /// Create a new identity
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: id.into(), email: email.into() }
    }
}

/// Portal role, assigned once at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Club,
    Admin,
}

impl Role {
    /// All roles in display order
    pub const ALL: [Role; 3] = [Role::Student, Role::Club, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Club => "club",
            Role::Admin => "admin",
        }
    }

    /// Landing page for this role after sign-in
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Student => "/home",
            Role::Club => "/club-dashboard",
            Role::Admin => "/admin-dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored role string is not a known role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "club" => Ok(Role::Club),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Raw user document as held by the "users" collection
///
/// Only `role` is required by the access core; the remaining fields come
/// from the registration form and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,

    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default)]
    pub clubs: Vec<String>,

    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_notifications() -> bool {
    true
}

impl ProfileRecord {
    /// Minimal record carrying only an id and a role
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            display_name: None,
            student_id: None,
            phone: None,
            department: None,
            clubs: Vec::new(),
            notifications_enabled: true,
            created_at: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_club(mut self, club: impl Into<String>) -> Self {
        let club = club.into();
        if !self.clubs.contains(&club) {
            self.clubs.push(club);
        }
        self
    }

    /// Check the registration-form constraints on the optional fields
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                id: self.id.clone(),
                message: "empty id".to_string(),
            });
        }

        if let Some(student_id) = &self.student_id {
            if !is_valid_student_id(student_id) {
                return Err(StoreError::InvalidRecord {
                    id: self.id.clone(),
                    message: format!("student id '{}' does not match ddd-dd-dddd", student_id),
                });
            }
        }

        Ok(())
    }
}

/// Student ids are formatted `ddd-dd-dddd`
pub fn is_valid_student_id(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 3
        && groups.iter().zip([3usize, 2, 4]).all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_digit()))
}

/// Application-owned profile associated with an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the owning identity's id
    pub id: String,

    /// Exactly one role per profile
    pub role: Role,

    pub display_name: Option<String>,

    pub student_id: Option<String>,

    pub phone: Option<String>,

    pub department: Option<String>,

    pub clubs: Vec<String>,

    pub notifications_enabled: bool,

    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = StoreError;

    fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
        let role = record.role.parse::<Role>().map_err(|e| StoreError::InvalidRecord {
            id: record.id.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            id: record.id,
            role,
            display_name: record.display_name,
            student_id: record.student_id,
            phone: record.phone,
            department: record.department,
            clubs: record.clubs,
            notifications_enabled: record.notifications_enabled,
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Club ".parse::<Role>().unwrap(), Role::Club);
        assert_eq!("STUDENT".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("moderator".parse::<Role>(), Err(UnknownRole("moderator".to_string())));
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Club).unwrap(), "\"club\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(Role::Admin.dashboard_path(), "/admin-dashboard");
        assert_eq!(Role::Club.dashboard_path(), "/club-dashboard");
        assert_eq!(Role::Student.dashboard_path(), "/home");
    }

    #[test]
    fn test_record_to_profile() {
        let record = ProfileRecord::new("u1", "club").with_display_name("Photography Club").with_club("Photography Club");
        let profile = Profile::try_from(record).unwrap();
        assert_eq!(profile.role, Role::Club);
        assert_eq!(profile.clubs, vec!["Photography Club".to_string()]);
        assert!(profile.notifications_enabled);
    }

    #[test]
    fn test_record_with_unknown_role_is_invalid() {
        let err = Profile::try_from(ProfileRecord::new("u2", "superuser")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { ref id, .. } if id == "u2"));
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let record: ProfileRecord = serde_json::from_str(r#"{"id":"u3","role":"student"}"#).unwrap();
        assert!(record.clubs.is_empty());
        assert!(record.notifications_enabled);
        assert!(record.student_id.is_none());
    }

    #[test]
    fn test_student_id_format() {
        assert!(is_valid_student_id("221-15-4821"));
        assert!(!is_valid_student_id("22115-4821"));
        assert!(!is_valid_student_id("221-1a-4821"));
        assert!(!is_valid_student_id("221-15-48210"));

        let bad = ProfileRecord::new("u4", "student").with_student_id("12-345-6789");
        assert!(bad.validate().is_err());
        let good = ProfileRecord::new("u4", "student").with_student_id("123-45-6789").with_department("CSE");
        assert!(good.validate().is_ok());
    }
}
