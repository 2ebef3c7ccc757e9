//! Identity store trait
//!
//! Defines the narrow interface the authentication core needs from
//! persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use janus_core::types::UserIdentity;
use janus_core::Result;

/// Local identity store
///
/// Email lookups are case-insensitive. `create` must check email uniqueness
/// and insert as one atomic step so that two racing signups for the same
/// address cannot both succeed.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find an identity by email, ignoring case
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>>;

    /// Insert a new identity. Fails with `Error::Conflict` if the email is taken.
    async fn create(&self, identity: &UserIdentity) -> Result<()>;

    /// Replace an existing identity. Fails with `Error::NotFound` if the id is unknown.
    async fn update(&self, identity: &UserIdentity) -> Result<()>;

    /// Count a failed login against the stored record in one atomic step,
    /// locking it until `lock_until` once `max_failed_attempts` is reached.
    /// Returns the record as stored afterwards.
    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity>;

    /// Reset the failure counter and lift any lock.
    async fn clear_failed_attempts(&self, id: &str) -> Result<()>;

    /// Set only the directory id of an existing record.
    async fn link_directory(&self, id: &str, directory_uuid: &str) -> Result<()>;
}

