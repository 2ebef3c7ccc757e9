//! In-memory identity store
//!
//! Records are indexed by id and by normalized email. Every mutation runs
//! under a single write lock, so the uniqueness check and the insert in
//! `create` cannot interleave with another writer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use janus_core::types::UserIdentity;
use janus_core::utils::normalize_email;
use janus_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::traits::IdentityStore;

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, UserIdentity>,
    /// normalized email -> id
    by_email: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: RwLock<Inner>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let inner = self.inner.read();
        Ok(inner
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        Ok(self.inner.read().by_id.get(id).cloned())
    }

    async fn create(&self, identity: &UserIdentity) -> Result<()> {
        let key = identity.email_key();
        let mut inner = self.inner.write();

        if inner.by_email.contains_key(&key) {
            return Err(Error::Conflict(identity.email.clone()));
        }
        if inner.by_id.contains_key(&identity.id) {
            return Err(Error::InternalError(format!(
                "Duplicate identity id: {}",
                identity.id
            )));
        }

        inner.by_email.insert(key, identity.id.clone());
        inner.by_id.insert(identity.id.clone(), identity.clone());

        debug!("Created identity: {}", identity.email);
        Ok(())
    }

    async fn update(&self, identity: &UserIdentity) -> Result<()> {
        let new_key = identity.email_key();
        let mut inner = self.inner.write();

        let old_key = match inner.by_id.get(&identity.id) {
            Some(existing) => existing.email_key(),
            None => return Err(Error::NotFound(identity.id.clone())),
        };

        if old_key != new_key {
            if inner.by_email.contains_key(&new_key) {
                return Err(Error::Conflict(identity.email.clone()));
            }
            inner.by_email.remove(&old_key);
            inner.by_email.insert(new_key, identity.id.clone());
        }

        inner.by_id.insert(identity.id.clone(), identity.clone());

        debug!("Updated identity: {}", identity.email);
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        let mut inner = self.inner.write();
        let identity = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        identity.apply_failed_attempt(max_failed_attempts, lock_until);
        Ok(identity.clone())
    }

    async fn clear_failed_attempts(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let identity = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        identity.clear_failed_attempts();
        Ok(())
    }

    async fn link_directory(&self, id: &str, directory_uuid: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let identity = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        identity.directory_uuid = Some(directory_uuid.to_string());
        identity.touch();
        Ok(())
    }
}
