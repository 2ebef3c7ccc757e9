//! Strategy selection

use crate::credential::Argon2Verifier;
use crate::error::{AuthError, AuthResult};
use crate::ldap::LdapClient;
use crate::strategy::{AuthService, DirectoryAuthService, LocalAuthService};
use async_trait::async_trait;
use janus_core::config::{AuthStrategy, JanusConfig};
use janus_core::types::{IdentityId, LoginRequest, SignupRequest};
use janus_metadata::IdentityStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The authentication facade.
///
/// The strategy is fixed when the facade is built and never changes for
/// the life of the process.
pub enum Authenticator {
    Local(LocalAuthService),
    Directory(DirectoryAuthService),
}

impl Authenticator {
    /// Build the configured strategy. Configuration errors surface here,
    /// never during a login.
    pub fn from_config(
        config: &JanusConfig,
        store: Arc<dyn IdentityStore>,
    ) -> janus_core::Result<Self> {
        config.validate()?;

        let authenticator = match config.auth.strategy {
            AuthStrategy::Local => {
                let verifier = Arc::new(Argon2Verifier::from_config(config));
                Authenticator::Local(LocalAuthService::new(store, verifier))
            }
            AuthStrategy::Directory => {
                let client = LdapClient::new(config.ldap.clone())?;
                Authenticator::Directory(DirectoryAuthService::new(client, store))
            }
        };

        info!("Authentication strategy: {}", authenticator.strategy().as_str());
        Ok(authenticator)
    }

    pub fn strategy(&self) -> AuthStrategy {
        match self {
            Authenticator::Local(_) => AuthStrategy::Local,
            Authenticator::Directory(_) => AuthStrategy::Directory,
        }
    }

    fn service(&self) -> &dyn AuthService {
        match self {
            Authenticator::Local(service) => service,
            Authenticator::Directory(service) => service,
        }
    }

    /// Login that gives up as soon as `cancel` fires.
    ///
    /// Dropping the in-flight attempt drops its directory connection, so a
    /// cancelled attempt leaves nothing open and writes nothing further.
    pub async fn login_with_cancel(
        &self,
        request: &LoginRequest,
        cancel: &CancellationToken,
    ) -> AuthResult<IdentityId> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Login for {} cancelled", request.email.trim());
                Err(AuthError::BackendUnavailable)
            }
            result = self.login(request) => result,
        }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn signup(&self, request: &SignupRequest) -> AuthResult<IdentityId> {
        self.service().signup(request).await
    }

    async fn login(&self, request: &LoginRequest) -> AuthResult<IdentityId> {
        self.service().login(request).await
    }
}
