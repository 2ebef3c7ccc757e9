//! Local credential strategy

use super::{required, required_password, AuthService};
use crate::credential::CredentialVerifier;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use janus_core::types::{IdentityId, LoginRequest, SignupRequest, UserIdentity};
use janus_core::Error;
use janus_metadata::IdentityStore;
use std::sync::Arc;
use tracing::{error, info, warn};

const UNEXPECTED_CREATION_ERROR: &str = "An unexpected error occurred during user creation";

/// Authenticates against password hashes held in the local store
pub struct LocalAuthService {
    store: Arc<dyn IdentityStore>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl LocalAuthService {
    pub fn new(store: Arc<dyn IdentityStore>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }
}

#[async_trait]
impl AuthService for LocalAuthService {
    async fn signup(&self, request: &SignupRequest) -> AuthResult<IdentityId> {
        let email = required("Email", &request.email)?;
        let password = required_password(&request.password)?;
        let first_name = required("First name", &request.first_name)?;
        let last_name = required("Last name", &request.last_name)?;

        match self.store.find_by_email(&email).await {
            Ok(Some(_)) => {
                warn!("Signup attempt with existing email {}", email);
                return Err(AuthError::AlreadyExists(email));
            }
            Ok(None) => {}
            Err(e) => {
                error!("Unexpected error during signup for user {}: {}", email, e);
                return Err(AuthError::creation_failed(UNEXPECTED_CREATION_ERROR));
            }
        }

        let credential_hash = self.verifier.hash(password).map_err(|reasons| {
            warn!("User creation failed for {}: {}", email, reasons.join(", "));
            AuthError::CreationFailed(reasons)
        })?;

        let identity = UserIdentity::local(email, first_name, last_name, credential_hash);

        match self.store.create(&identity).await {
            Ok(()) => {
                info!("User {} created successfully", identity.email);
                Ok(identity.id)
            }
            // Lost a race with a concurrent signup for the same address.
            Err(Error::Conflict(_)) => {
                warn!("Signup attempt with existing email {}", identity.email);
                Err(AuthError::AlreadyExists(identity.email))
            }
            Err(e) => {
                error!("User creation failed for {}: {}", identity.email, e);
                Err(AuthError::creation_failed(UNEXPECTED_CREATION_ERROR))
            }
        }
    }

    async fn login(&self, request: &LoginRequest) -> AuthResult<IdentityId> {
        let email = required("Email", &request.email)?;
        let password = required_password(&request.password)?;

        let identity = match self.store.find_by_email(&email).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                // Burn the same verify cost as a wrong password.
                self.verifier.verify(password, "");
                warn!("Authentication failed for user {}: unknown email", email);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!("Unexpected error during login for user {}: {}", email, e);
                return Err(AuthError::BackendUnavailable);
            }
        };

        if self.verifier.is_locked_out(&identity) {
            self.verifier.verify(password, "");
            warn!("Authentication failed for user {}: locked out", email);
            return Err(AuthError::InvalidCredentials);
        }

        let credential_hash = identity.credential_hash.as_deref().unwrap_or_default();

        if !self.verifier.verify(password, credential_hash) {
            self.verifier
                .record_failure(self.store.as_ref(), &identity)
                .await
                .map_err(|e| {
                    error!("Failed to record login attempt for {}: {}", email, e);
                    AuthError::BackendUnavailable
                })?;
            warn!("Authentication failed for user {}: wrong password", email);
            return Err(AuthError::InvalidCredentials);
        }

        self.verifier
            .record_success(self.store.as_ref(), &identity)
            .await
            .map_err(|e| {
                error!("Failed to reset login attempts for {}: {}", email, e);
                AuthError::BackendUnavailable
            })?;

        info!("User {} logged in successfully", email);
        Ok(identity.id)
    }
}
