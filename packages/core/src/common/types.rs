// Shared types used across multiple domains.

use serde::{Deserialize, Serialize};

use super::entity_ids::UserId;
use crate::common::errors::{DomainError, DomainResult};
use crate::kernel::store::{paths, BaseStore};

/// Public profile stored at `users/{uid}`.
///
/// Only the fields this crate reads; the app shell owns the rest of the
/// user record (avatar, push token, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
}

impl UserProfile {
    /// Load a user's profile from the store.
    pub async fn load(store: &dyn BaseStore, user_id: &UserId) -> DomainResult<Self> {
        let value = store
            .read(&paths::user(user_id))
            .await?
            .ok_or(DomainError::NotFound("user"))?;
        Ok(serde_json::from_value(value)?)
    }
}
