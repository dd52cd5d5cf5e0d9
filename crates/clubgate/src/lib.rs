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

//! ClubGate access control
//!
//! Role-gated access control and redirect flow for the campus club portal.
//! Authentication and profile storage belong to the hosted backend and are
//! reached through the `AuthProvider` and `ProfileStore` traits; this crate
//! decides, for each protected route, whether to render, redirect or hold.

pub mod audit;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod models;
pub mod policy;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod store;

pub use config::GuardConfig;
pub use context::{AccessContext, RouteAccess};
pub use error::{AccessError, ConfigError, StoreError};
pub use guard::{AccessGuard, GuardHandle, GuardView};
pub use models::{Identity, Profile, ProfileRecord, Role};
pub use policy::{AccessDecision, Destination, GuardRequirement, ProfileStatus, RedirectPaths, Subject, decide};
pub use resolver::{ProfileLookup, RoleResolver};
pub use session::{AuthProvider, Session, SessionProvider};
pub use store::ProfileStore;
