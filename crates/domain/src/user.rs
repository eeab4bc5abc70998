//! User profiles and the admin directory.
//!
//! Authentication lives entirely outside this service; profiles only carry
//! display data and the admin flag the external auth layer asks us to store.

use chrono::{DateTime, Utc};
use common::ShopperId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ports::UserStore;

/// Profile document for a registered shopper. Never holds credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity string issued by the external identity provider.
    pub id: ShopperId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Creates a fresh non-admin profile.
    pub fn new(id: ShopperId, email: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: email.into(),
            display_name: display_name.into(),
            phone: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Service backing the admin user views.
pub struct UserDirectory<U> {
    users: U,
}

impl<U: UserStore> UserDirectory<U> {
    /// Creates a new directory over the given store.
    pub fn new(users: U) -> Self {
        Self { users }
    }

    /// Loads a profile by identity.
    #[tracing::instrument(skip(self))]
    pub async fn profile(&self, id: &ShopperId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.users.get(id).await?)
    }

    /// Creates or replaces a profile, stamping the update time.
    #[tracing::instrument(skip(self, profile))]
    pub async fn save_profile(&self, mut profile: UserProfile) -> Result<UserProfile, DomainError> {
        profile.updated_at = Utc::now();
        self.users.upsert(&profile).await?;
        Ok(profile)
    }

    /// All profiles, newest first (admin view).
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserProfile>, DomainError> {
        Ok(self.users.list().await?)
    }

    /// Grants or revokes the admin flag (admin).
    #[tracing::instrument(skip(self))]
    pub async fn set_admin(
        &self,
        id: &ShopperId,
        is_admin: bool,
    ) -> Result<UserProfile, DomainError> {
        let mut profile = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound {
                user_id: id.clone(),
            })?;

        profile.is_admin = is_admin;
        profile.updated_at = Utc::now();
        self.users.upsert(&profile).await?;

        tracing::info!(user_id = %id, is_admin, "user role updated");
        Ok(profile)
    }
}
