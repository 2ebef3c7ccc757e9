//! Directory (LDAP) strategy with just-in-time local provisioning

use super::{required, required_password, AuthService};
use crate::error::{AuthError, AuthResult};
use crate::ldap::{DirectoryEntry, LdapClient};
use async_trait::async_trait;
use janus_core::types::{IdentityId, LoginRequest, SignupRequest, UserIdentity};
use janus_core::Error;
use janus_metadata::IdentityStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const LOOKUP_FAILED: &str = "Failed to look up local account";
const CREATE_FAILED: &str = "Failed to create local account";
const UPDATE_FAILED: &str = "Failed to update local account";

/// Verifies credentials against a directory and mirrors the account locally
pub struct DirectoryAuthService {
    client: LdapClient,
    /// `None` when local sync is disabled
    store: Option<Arc<dyn IdentityStore>>,
}

impl DirectoryAuthService {
    /// Local sync follows the client's `sync_local_identity` setting.
    pub fn new(client: LdapClient, store: Arc<dyn IdentityStore>) -> Self {
        let store = client.config().sync_local_identity.then_some(store);
        Self { client, store }
    }

    pub fn client(&self) -> &LdapClient {
        &self.client
    }

    /// Create or link the local record for a verified directory user
    async fn sync_identity(
        &self,
        store: &dyn IdentityStore,
        email: &str,
        entry: &DirectoryEntry,
    ) -> AuthResult<IdentityId> {
        let existing = store.find_by_email(email).await.map_err(|e| {
            error!("Local account lookup failed for {}: {}", email, e);
            AuthError::provisioning_failed(LOOKUP_FAILED)
        })?;

        match existing {
            Some(identity) => self.link_identity(store, identity, entry).await,
            None => {
                let identity = UserIdentity::provisioned(
                    email,
                    entry.first_name(),
                    entry.last_name(),
                    entry.unique_id.as_str(),
                );

                match store.create(&identity).await {
                    Ok(()) => {
                        info!("Provisioned local account for directory user {}", email);
                        Ok(identity.id)
                    }
                    // A concurrent login for the same user got there first.
                    Err(Error::Conflict(_)) => {
                        debug!("Local account for {} created concurrently", email);
                        match store.find_by_email(email).await {
                            Ok(Some(identity)) => self.link_identity(store, identity, entry).await,
                            Ok(None) => {
                                error!("Local account for {} missing after conflict", email);
                                Err(AuthError::provisioning_failed(CREATE_FAILED))
                            }
                            Err(e) => {
                                error!("Local account lookup after conflict failed for {}: {}", email, e);
                                Err(AuthError::provisioning_failed(CREATE_FAILED))
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to provision local account for {}: {}", email, e);
                        Err(AuthError::provisioning_failed(CREATE_FAILED))
                    }
                }
            }
        }
    }

    /// Record the directory id on an existing account when it differs.
    /// Only the directory id column is written.
    async fn link_identity(
        &self,
        store: &dyn IdentityStore,
        identity: UserIdentity,
        entry: &DirectoryEntry,
    ) -> AuthResult<IdentityId> {
        if identity.is_linked_to(&entry.unique_id) {
            return Ok(identity.id);
        }

        store.link_directory(&identity.id, &entry.unique_id).await.map_err(|e| {
            error!("Failed to link local account {}: {}", identity.email, e);
            AuthError::provisioning_failed(UPDATE_FAILED)
        })?;

        info!("Linked local account {} to directory id {}", identity.email, entry.unique_id);
        Ok(identity.id)
    }
}

#[async_trait]
impl AuthService for DirectoryAuthService {
    async fn signup(&self, request: &SignupRequest) -> AuthResult<IdentityId> {
        warn!("Signup attempted for {} against directory authentication", request.email.trim());
        Err(AuthError::Unsupported)
    }

    async fn login(&self, request: &LoginRequest) -> AuthResult<IdentityId> {
        let email = required("Email", &request.email)?;
        let password = required_password(&request.password)?;

        let entry = self.client.authenticate(&email, password).await.map_err(|e| {
            if e.is_credential_failure() {
                warn!("LDAP authentication failed for {}: {}", email, e);
                AuthError::InvalidCredentials
            } else {
                error!("LDAP authentication error for {}: {}", email, e);
                AuthError::BackendUnavailable
            }
        })?;

        match &self.store {
            Some(store) => self.sync_identity(store.as_ref(), &email, &entry).await,
            None => Ok(entry.unique_id),
        }
    }
}
