//! Profile store: users and their dashboards, loaded once at startup.
//!
//! Persistence lives elsewhere; the hub only needs an in-memory view of
//! who owns which dashboards. The store itself is read-only after load;
//! dashboards carry their own interior-mutable state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::dashboard::{Dashboard, DashboardConfig, NoSuchDashboard};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profiles file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profiles: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("duplicate user: {0}")]
    DuplicateUser(String),
    #[error("duplicate dashboard {dash_id} for user {email}")]
    DuplicateDashboard { email: String, dash_id: i32 },
}

#[derive(Debug, Default)]
pub struct Profile {
    pub dashboards: Vec<Arc<Dashboard>>,
}

impl Profile {
    #[must_use]
    pub fn dash_by_id(&self, dash_id: i32) -> Option<&Arc<Dashboard>> {
        self.dashboards.iter().find(|d| d.id == dash_id)
    }

    /// # Errors
    ///
    /// Returns `NoSuchDashboard` when the profile has no dashboard `dash_id`.
    pub fn dash_by_id_or_fault(&self, dash_id: i32) -> Result<&Arc<Dashboard>, NoSuchDashboard> {
        self.dash_by_id(dash_id).ok_or(NoSuchDashboard(dash_id))
    }

    /// Dashboard shared under `token`.
    #[must_use]
    pub fn dash_by_share_token(&self, token: &str) -> Option<&Arc<Dashboard>> {
        self.dashboards
            .iter()
            .find(|d| d.share_token.as_deref() == Some(token))
    }
}

/// An account: the principal whose sessions and dashboards are routed together.
#[derive(Debug)]
pub struct User {
    pub email: String,
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
struct UserConfig {
    email: String,
    #[serde(default)]
    dashboards: Vec<DashboardConfig>,
}

#[derive(Debug, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    users: Vec<UserConfig>,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct ProfileStore {
    users: HashMap<String, Arc<User>>,
}

impl ProfileStore {
    #[must_use]
    pub fn user(&self, email: &str) -> Option<Arc<User>> {
        self.users.get(email).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Build a store from `(email, dashboards)` pairs.
    ///
    /// # Errors
    ///
    /// Rejects duplicate emails and duplicate dashboard ids within a user.
    pub fn from_users(
        users: impl IntoIterator<Item = (String, Vec<DashboardConfig>)>,
    ) -> Result<Self, ProfileError> {
        let mut store = Self::default();
        for (email, configs) in users {
            let mut dashboards: Vec<Arc<Dashboard>> = Vec::with_capacity(configs.len());
            for config in configs {
                if dashboards.iter().any(|d| d.id == config.id) {
                    return Err(ProfileError::DuplicateDashboard { email, dash_id: config.id });
                }
                dashboards.push(Arc::new(Dashboard::from_config(config)));
            }
            if store.users.contains_key(&email) {
                return Err(ProfileError::DuplicateUser(email));
            }
            let user = User { email: email.clone(), profile: Profile { dashboards } };
            store.users.insert(email, Arc::new(user));
        }
        Ok(store)
    }

    /// Parse a YAML profiles document.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed YAML, or a duplicate error.
    pub fn from_yaml(raw: &str) -> Result<Self, ProfileError> {
        let file: ProfilesFile = serde_yaml::from_str(raw)?;
        Self::from_users(file.users.into_iter().map(|u| (u.email, u.dashboards)))
    }
}

/// Load the profile store from a YAML file.
///
/// # Errors
///
/// Returns an I/O error if the file can't be read, otherwise see
/// [`ProfileStore::from_yaml`].
pub fn load_profiles(path: &Path) -> Result<ProfileStore, ProfileError> {
    let raw = std::fs::read_to_string(path)?;
    ProfileStore::from_yaml(&raw)
}

#[cfg(test)]
#[path = "profiles_test.rs"]
mod tests;
