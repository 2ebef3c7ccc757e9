//! Test doubles for the directory connection and the identity store

use crate::ldap::{DirectoryConnector, DirectoryError, DirectorySession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use janus_core::config::LdapConfig;
use janus_core::types::UserIdentity;
use janus_core::{Error, Result};
use janus_metadata::{IdentityStore, MemoryIdentityStore};
use ldap3::{Scope, SearchEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_DN: &str = "cn=admin,dc=example,dc=com";

pub fn directory_config() -> LdapConfig {
    LdapConfig {
        server_url: "ldap://localhost:389".to_string(),
        bind_dn: SERVICE_DN.to_string(),
        bind_password: "admin".to_string(),
        search_base: "ou=users,dc=example,dc=com".to_string(),
        unique_id_attribute: "entryUUID".to_string(),
        ..Default::default()
    }
}

pub fn ldap_entry(dn: &str, unique_id: &str, given: Option<&str>, surname: Option<&str>) -> SearchEntry {
    let mut attrs = HashMap::new();
    attrs.insert("entryUUID".to_string(), vec![unique_id.to_string()]);
    if let Some(given) = given {
        attrs.insert("givenName".to_string(), vec![given.to_string()]);
    }
    if let Some(surname) = surname {
        attrs.insert("sn".to_string(), vec![surname.to_string()]);
    }

    SearchEntry {
        dn: dn.to_string(),
        attrs,
        bin_attrs: HashMap::new(),
    }
}

// ============================================================================
// Fake directory
// ============================================================================

#[derive(Default)]
pub struct FakeState {
    connects: AtomicUsize,
    unbinds: AtomicUsize,
    user_binds: AtomicUsize,
    last_base: Mutex<Option<String>>,
    last_filter: Mutex<Option<String>>,
    last_attrs: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    pub fn user_binds(&self) -> usize {
        self.user_binds.load(Ordering::SeqCst)
    }

    pub fn last_base(&self) -> Option<String> {
        self.last_base.lock().clone()
    }

    pub fn last_filter(&self) -> Option<String> {
        self.last_filter.lock().clone()
    }

    pub fn last_attrs(&self) -> Vec<String> {
        self.last_attrs.lock().clone()
    }
}

#[derive(Clone)]
pub struct FakeDirectory {
    reachable: bool,
    connect_delay: Option<Duration>,
    service_bind_rc: u32,
    user_password: Option<String>,
    entries: Vec<SearchEntry>,
    state: Arc<FakeState>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            reachable: true,
            connect_delay: None,
            service_bind_rc: 0,
            user_password: None,
            entries: Vec::new(),
            state: Arc::new(FakeState::default()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    pub fn with_entry(mut self, entry: SearchEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_user_password(mut self, password: &str) -> Self {
        self.user_password = Some(password.to_string());
        self
    }

    pub fn with_service_bind_rc(mut self, rc: u32) -> Self {
        self.service_bind_rc = rc;
        self
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn state(&self) -> Arc<FakeState> {
        self.state.clone()
    }

    pub fn connector(&self) -> Arc<dyn DirectoryConnector> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(&self) -> std::result::Result<Box<dyn DirectorySession>, DirectoryError> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.reachable {
            return Err(DirectoryError::Connection("connection refused".to_string()));
        }

        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            directory: self.clone(),
        }))
    }
}

struct FakeSession {
    directory: FakeDirectory,
}

#[async_trait]
impl DirectorySession for FakeSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> std::result::Result<u32, DirectoryError> {
        if dn == SERVICE_DN {
            return Ok(self.directory.service_bind_rc);
        }

        self.directory.state.user_binds.fetch_add(1, Ordering::SeqCst);
        match &self.directory.user_password {
            Some(expected) if expected == password => Ok(0),
            _ => Ok(49),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        _scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> std::result::Result<Vec<SearchEntry>, DirectoryError> {
        let state = &self.directory.state;
        *state.last_base.lock() = Some(base.to_string());
        *state.last_filter.lock() = Some(filter.to_string());
        *state.last_attrs.lock() = attrs.iter().map(|a| a.to_string()).collect();

        // Root DSE queries get no entries back.
        if base.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.directory.entries.clone())
    }

    async fn unbind(&mut self) -> std::result::Result<(), DirectoryError> {
        self.directory.state.unbinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Stores
// ============================================================================

/// Memory store that counts writes
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryIdentityStore,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityStore for CountingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, identity: &UserIdentity) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(identity).await
    }

    async fn update(&self, identity: &UserIdentity) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(identity).await
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.record_failed_attempt(id, max_failed_attempts, lock_until).await
    }

    async fn clear_failed_attempts(&self, id: &str) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.clear_failed_attempts(id).await
    }

    async fn link_directory(&self, id: &str, directory_uuid: &str) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.link_directory(id, directory_uuid).await
    }
}

/// Store whose every call fails as if the database were down
pub struct FailingStore;

#[async_trait]
impl IdentityStore for FailingStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<UserIdentity>> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<UserIdentity>> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn create(&self, _identity: &UserIdentity) -> Result<()> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn update(&self, _identity: &UserIdentity) -> Result<()> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn record_failed_attempt(
        &self,
        _id: &str,
        _max_failed_attempts: u32,
        _lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn clear_failed_attempts(&self, _id: &str) -> Result<()> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }

    async fn link_directory(&self, _id: &str, _directory_uuid: &str) -> Result<()> {
        Err(Error::DatabaseError("connection pool timed out".to_string()))
    }
}

/// Store that reads fine but rejects writes
pub struct ReadOnlyStore {
    pub inner: MemoryIdentityStore,
}

#[async_trait]
impl IdentityStore for ReadOnlyStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, _identity: &UserIdentity) -> Result<()> {
        Err(Error::DatabaseError("attempt to write a readonly database".to_string()))
    }

    async fn update(&self, _identity: &UserIdentity) -> Result<()> {
        Err(Error::DatabaseError("attempt to write a readonly database".to_string()))
    }

    async fn record_failed_attempt(
        &self,
        _id: &str,
        _max_failed_attempts: u32,
        _lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        Err(Error::DatabaseError("attempt to write a readonly database".to_string()))
    }

    async fn clear_failed_attempts(&self, _id: &str) -> Result<()> {
        Err(Error::DatabaseError("attempt to write a readonly database".to_string()))
    }

    async fn link_directory(&self, _id: &str, _directory_uuid: &str) -> Result<()> {
        Err(Error::DatabaseError("attempt to write a readonly database".to_string()))
    }
}

/// Store whose first email lookup misses, as if another request created the
/// record between the lookup and the insert
#[derive(Default)]
pub struct RacingStore {
    pub inner: MemoryIdentityStore,
    raced: AtomicBool,
    creates: AtomicUsize,
}

impl RacingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityStore for RacingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, identity: &UserIdentity) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(identity).await
    }

    async fn update(&self, identity: &UserIdentity) -> Result<()> {
        self.inner.update(identity).await
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        self.inner.record_failed_attempt(id, max_failed_attempts, lock_until).await
    }

    async fn clear_failed_attempts(&self, id: &str) -> Result<()> {
        self.inner.clear_failed_attempts(id).await
    }

    async fn link_directory(&self, id: &str, directory_uuid: &str) -> Result<()> {
        self.inner.link_directory(id, directory_uuid).await
    }
}
