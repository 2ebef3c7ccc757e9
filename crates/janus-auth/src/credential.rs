//! Credential verification and lockout bookkeeping

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use janus_core::config::{JanusConfig, LockoutConfig, PasswordPolicyConfig};
use janus_core::types::UserIdentity;
use janus_crypto::{hash_password, is_password_hash, verify_password};
use janus_metadata::IdentityStore;
use std::collections::HashSet;
use tracing::{error, warn};

/// Verified against when there is no usable stored hash, so an unknown
/// account costs the same as a wrong password.
const DUMMY_PASSWORD: &str = "janus-dummy-credential";

/// Hashes and checks local credentials, and tracks failed attempts.
///
/// Lockout bookkeeping goes through the store's atomic counters, never
/// through a read-modify-write of a snapshot.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Hash a new password. Policy violations come back as reasons.
    fn hash(&self, password: &str) -> Result<String, Vec<String>>;

    /// An empty or malformed hash never verifies.
    fn verify(&self, password: &str, credential_hash: &str) -> bool;

    fn is_locked_out(&self, identity: &UserIdentity) -> bool;

    /// Count a failed attempt, applying the threshold. Returns the stored
    /// record afterwards.
    async fn record_failure(
        &self,
        store: &dyn IdentityStore,
        identity: &UserIdentity,
    ) -> janus_core::Result<UserIdentity>;

    /// Reset the counter and lock after a successful login.
    async fn record_success(
        &self,
        store: &dyn IdentityStore,
        identity: &UserIdentity,
    ) -> janus_core::Result<()>;
}

/// Argon2id verifier with a configurable password and lockout policy
#[derive(Debug, Clone)]
pub struct Argon2Verifier {
    policy: PasswordPolicyConfig,
    lockout: LockoutConfig,
    dummy_hash: Option<String>,
}

impl Default for Argon2Verifier {
    fn default() -> Self {
        Self::new(PasswordPolicyConfig::default(), LockoutConfig::default())
    }
}

impl Argon2Verifier {
    pub fn new(policy: PasswordPolicyConfig, lockout: LockoutConfig) -> Self {
        let dummy_hash = hash_password(DUMMY_PASSWORD)
            .map_err(|e| error!("Failed to prepare dummy credential: {}", e))
            .ok();

        Self {
            policy,
            lockout,
            dummy_hash,
        }
    }

    pub fn from_config(config: &JanusConfig) -> Self {
        Self::new(config.password.clone(), config.lockout.clone())
    }

    /// Every policy rule the password breaks
    pub fn policy_violations(&self, password: &str) -> Vec<String> {
        let policy = &self.policy;
        let mut reasons = Vec::new();

        if password.chars().count() < policy.min_length {
            reasons.push(format!(
                "Passwords must be at least {} characters.",
                policy.min_length
            ));
        }
        let unique: HashSet<char> = password.chars().collect();
        if unique.len() < policy.required_unique_chars {
            reasons.push(format!(
                "Passwords must use at least {} different characters.",
                policy.required_unique_chars
            ));
        }
        if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            reasons.push("Passwords must have at least one digit ('0'-'9').".to_string());
        }
        if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            reasons.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
        }
        if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            reasons.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
        }
        if policy.require_non_alphanumeric && password.chars().all(|c| c.is_alphanumeric()) {
            reasons.push("Passwords must have at least one non alphanumeric character.".to_string());
        }

        reasons
    }

    fn lock_until(&self) -> DateTime<Utc> {
        i64::try_from(self.lockout.lockout_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[async_trait]
impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, Vec<String>> {
        let violations = self.policy_violations(password);
        if !violations.is_empty() {
            return Err(violations);
        }

        hash_password(password).map_err(|e| {
            error!("Password hashing failed: {}", e);
            vec!["An unexpected error occurred during user creation".to_string()]
        })
    }

    fn verify(&self, password: &str, credential_hash: &str) -> bool {
        if is_password_hash(credential_hash) {
            return verify_password(password, credential_hash);
        }

        if let Some(dummy) = &self.dummy_hash {
            let _ = verify_password(password, dummy);
        }
        false
    }

    fn is_locked_out(&self, identity: &UserIdentity) -> bool {
        identity.is_locked_at(Utc::now())
    }

    async fn record_failure(
        &self,
        store: &dyn IdentityStore,
        identity: &UserIdentity,
    ) -> janus_core::Result<UserIdentity> {
        let stored = store
            .record_failed_attempt(&identity.id, self.lockout.max_failed_attempts, self.lock_until())
            .await?;

        if self.is_locked_out(&stored) {
            warn!("Identity {} locked out after repeated failures", stored.email);
        }

        Ok(stored)
    }

    async fn record_success(
        &self,
        store: &dyn IdentityStore,
        identity: &UserIdentity,
    ) -> janus_core::Result<()> {
        if identity.failed_attempt_count == 0 && identity.locked_until.is_none() {
            return Ok(());
        }
        store.clear_failed_attempts(&identity.id).await
    }
}
