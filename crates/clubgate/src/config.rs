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

//! Configuration management for the access guard

use crate::error::ConfigError;
use crate::policy::RedirectPaths;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Profile cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache found profiles between evaluations
    pub enabled: bool,

    /// Lifetime of a cached profile in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, ttl_secs: 300 }
    }
}

/// Configuration for guards and the role resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Upper bound for one profile lookup in milliseconds, 0 for no bound
    pub lookup_timeout_ms: u64,

    /// Maximum number of access decisions kept in the audit trail
    pub audit_max_events: usize,

    /// Redirect targets
    pub paths: RedirectPaths,

    /// Profile cache settings
    pub cache: CacheConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            paths: RedirectPaths::default(),
            lookup_timeout_ms: 10_000,
            cache: CacheConfig::default(),
            audit_max_events: 10_000,
        }
    }
}

impl GuardConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            paths: RedirectPaths {
                login: env::var("CLUBGATE_LOGIN_PATH").unwrap_or(defaults.paths.login),
                register: env::var("CLUBGATE_REGISTER_PATH").unwrap_or(defaults.paths.register),
                home: env::var("CLUBGATE_HOME_PATH").unwrap_or(defaults.paths.home),
            },

            lookup_timeout_ms: match env::var("CLUBGATE_LOOKUP_TIMEOUT_MS") {
                Ok(v) if v.trim().eq_ignore_ascii_case("none") => 0,
                Ok(v) => v.trim().parse().unwrap_or(defaults.lookup_timeout_ms),
                Err(_) => defaults.lookup_timeout_ms,
            },

            cache: CacheConfig {
                enabled: env::var("CLUBGATE_CACHE_ENABLED").map(|v| v.parse().unwrap_or(true)).unwrap_or(true),
                ttl_secs: env::var("CLUBGATE_CACHE_TTL_SECS")
                    .map(|v| v.parse().unwrap_or(defaults.cache.ttl_secs))
                    .unwrap_or(defaults.cache.ttl_secs),
            },

            audit_max_events: env::var("CLUBGATE_AUDIT_MAX_EVENTS")
                .map(|v| v.parse().unwrap_or(defaults.audit_max_events))
                .unwrap_or(defaults.audit_max_events),
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Explicit file, then `$CLUBGATE_CONFIG`, then environment variables
    pub fn resolve(cli_config: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = if let Some(config_path) = cli_config {
            Self::load_from_file(config_path)?
        } else if let Ok(env_config) = env::var("CLUBGATE_CONFIG") {
            Self::load_from_file(env_config)?
        } else {
            Self::from_env()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [("login", &self.paths.login), ("register", &self.paths.register), ("home", &self.paths.home)] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    message: format!("{} path '{}' must start with '/'", name, path),
                });
            }
        }

        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "cache.ttl_secs must be positive when the cache is enabled".to_string(),
            });
        }

        Ok(())
    }

    pub fn lookup_timeout(&self) -> Option<Duration> {
        (self.lookup_timeout_ms > 0).then(|| Duration::from_millis(self.lookup_timeout_ms))
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.enabled.then(|| Duration::from_secs(self.cache.ttl_secs))
    }
}
