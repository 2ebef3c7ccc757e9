//! LDAP Client implementation
//!
//! Runs the service bind, user search and user bind for one login attempt
//! over a single connection, and always unbinds before returning.

use crate::ldap::types::*;
use async_trait::async_trait;
use janus_core::config::LdapConfig;
use ldap3::{ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// Connection seam
// ============================================================================

/// Opens one directory connection per call
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}

/// A single open directory connection
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind. Returns the LDAP result code; 0 means success.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<u32, DirectoryError>;

    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError>;

    async fn unbind(&mut self) -> Result<(), DirectoryError>;
}

/// Connector backed by `ldap3`
pub struct Ldap3Connector {
    server_url: String,
    start_tls: bool,
    timeout: Duration,
}

impl Ldap3Connector {
    pub fn from_config(config: &LdapConfig) -> janus_core::Result<Self> {
        Ok(Self {
            server_url: config.endpoint()?.url(),
            start_tls: config.start_tls,
            timeout: Duration::from_secs(config.timeout_seconds),
        })
    }
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.start_tls);

        debug!("Connecting to LDAP server: {}", self.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.server_url)
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        ldap3::drive!(conn);

        Ok(Box::new(Ldap3Session {
            ldap,
            timeout: self.timeout,
        }))
    }
}

struct Ldap3Session {
    ldap: Ldap,
    timeout: Duration,
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<u32, DirectoryError> {
        self.ldap
            .with_timeout(self.timeout)
            .simple_bind(dn, password)
            .await
            .map(|result| result.rc)
            .map_err(|e| DirectoryError::Protocol(format!("Bind failed: {}", e)))
    }

    async fn search(
        &mut self,
        base: &str,
        scope: Scope,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let (rs, _res) = self
            .ldap
            .with_timeout(self.timeout)
            .search(base, scope, filter, attrs.to_vec())
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(rs.into_iter().map(SearchEntry::construct).collect())
    }

    async fn unbind(&mut self) -> Result<(), DirectoryError> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::Protocol(format!("Unbind failed: {}", e)))
    }
}

// ============================================================================
// Client
// ============================================================================

/// LDAP client for directory-backed authentication
pub struct LdapClient {
    config: LdapConfig,
    connector: Arc<dyn DirectoryConnector>,
}

impl LdapClient {
    /// Create a client for a real directory. The configuration must be valid.
    pub fn new(config: LdapConfig) -> janus_core::Result<Self> {
        config.validate()?;
        let connector = Arc::new(Ldap3Connector::from_config(&config)?);
        Ok(Self { config, connector })
    }

    pub fn with_connector(config: LdapConfig, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Verify `email`/`password` against the directory.
    ///
    /// The connection is unbound on every path out, success or failure.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<DirectoryEntry, DirectoryError> {
        let mut session = self.connector.connect().await?;

        let outcome = self.authenticate_with(session.as_mut(), email, password).await;

        if let Err(e) = session.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }

        outcome
    }

    /// Service bind and root DSE query, for startup and operator checks
    pub async fn check_connection(&self) -> Result<LdapServerInfo, DirectoryError> {
        let mut session = self.connector.connect().await?;

        let outcome = self.server_info_with(session.as_mut()).await;

        if let Err(e) = session.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }

        outcome
    }

    // =========================================================================
    // Private methods
    // =========================================================================

    async fn service_bind(&self, session: &mut dyn DirectorySession) -> Result<(), DirectoryError> {
        let rc = session
            .simple_bind(&self.config.bind_dn, &self.config.bind_password)
            .await
            .map_err(|e| DirectoryError::ServiceBind(e.to_string()))?;

        if rc != 0 {
            return Err(DirectoryError::ServiceBind(format!(
                "bind returned code {}",
                rc
            )));
        }

        Ok(())
    }

    async fn authenticate_with(
        &self,
        session: &mut dyn DirectorySession,
        email: &str,
        password: &str,
    ) -> Result<DirectoryEntry, DirectoryError> {
        // Step 1: Bind with service account
        self.service_bind(session).await?;

        // Step 2: Search for user
        let filter = self.config.build_user_filter(&ldap_escape(email));
        let attrs = [
            self.config.unique_id_attribute.as_str(),
            "dn",
            self.config.given_name_attribute.as_str(),
            self.config.surname_attribute.as_str(),
        ];

        debug!("Searching for user with filter: {}", filter);

        let entries = session
            .search(&self.config.search_base, Scope::Subtree, &filter, &attrs)
            .await?;

        if entries.len() > 1 {
            debug!(
                "Filter {} matched {} entries, using the first",
                filter,
                entries.len()
            );
        }

        let entry = entries
            .into_iter()
            .next()
            .ok_or(DirectoryError::UserNotFound)?;

        debug!("Found user DN: {}", entry.dn);

        // Step 3: Verify user password by binding as the user.
        // An empty password would turn this into an anonymous bind.
        if password.is_empty() {
            return Err(DirectoryError::UserBindRejected(RC_INVALID_CREDENTIALS));
        }

        let rc = session.simple_bind(&entry.dn, password).await?;
        if rc != 0 {
            return Err(DirectoryError::UserBindRejected(rc));
        }

        // Step 4: Normalize the entry
        let unique_id = normalize_unique_id(&entry, &self.config.unique_id_attribute)
            .ok_or_else(|| DirectoryError::MissingUniqueId(self.config.unique_id_attribute.clone()))?;

        info!("LDAP authentication successful for {}, UUID: {}", email, unique_id);

        Ok(DirectoryEntry {
            given_name: get_first_attr(&entry, &self.config.given_name_attribute),
            surname: get_first_attr(&entry, &self.config.surname_attribute),
            distinguished_name: entry.dn,
            unique_id,
        })
    }

    async fn server_info_with(
        &self,
        session: &mut dyn DirectorySession,
    ) -> Result<LdapServerInfo, DirectoryError> {
        self.service_bind(session).await?;

        let rs = session
            .search(
                "",
                Scope::Base,
                "(objectClass=*)",
                &[
                    "vendorName",
                    "vendorVersion",
                    "namingContexts",
                    "supportedLDAPVersion",
                ],
            )
            .await?;

        let info = match rs.into_iter().next() {
            Some(entry) => LdapServerInfo {
                vendor: get_first_attr(&entry, "vendorName"),
                version: get_first_attr(&entry, "vendorVersion"),
                naming_contexts: entry.attrs.get("namingContexts").cloned().unwrap_or_default(),
                supported_ldap_version: entry
                    .attrs
                    .get("supportedLDAPVersion")
                    .cloned()
                    .unwrap_or_default(),
            },
            None => LdapServerInfo {
                supported_ldap_version: vec!["3".to_string()],
                ..Default::default()
            },
        };

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{directory_config, ldap_entry, FakeDirectory};

    #[tokio::test]
    async fn test_authenticate_success() {
        let directory = FakeDirectory::new()
            .with_entry(ldap_entry("uid=jane,ou=users,dc=example,dc=com", "U-123", Some("Jane"), Some("Doe")))
            .with_user_password("pass123");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let entry = client.authenticate("ldap@x.com", "pass123").await.unwrap();
        assert_eq!(entry.unique_id, "U-123");
        assert_eq!(entry.distinguished_name, "uid=jane,ou=users,dc=example,dc=com");
        assert_eq!(entry.given_name.as_deref(), Some("Jane"));
        assert_eq!(entry.surname.as_deref(), Some("Doe"));

        let state = directory.state();
        assert_eq!(state.connects(), 1);
        assert_eq!(state.unbinds(), 1);
        assert_eq!(state.last_filter().as_deref(), Some("(mail=ldap@x.com)"));
        assert_eq!(state.last_base().as_deref(), Some("ou=users,dc=example,dc=com"));
        assert_eq!(
            state.last_attrs(),
            vec!["entryUUID", "dn", "givenName", "sn"]
        );
    }

    #[tokio::test]
    async fn test_unbinds_on_every_failure() {
        let directory = FakeDirectory::new().with_user_password("pass123");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("nobody@x.com", "pass123").await.unwrap_err();
        assert_eq!(err, DirectoryError::UserNotFound);
        assert_eq!(directory.state().unbinds(), 1);

        let directory = FakeDirectory::new().with_service_bind_rc(49);
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("ldap@x.com", "pass123").await.unwrap_err();
        assert!(matches!(err, DirectoryError::ServiceBind(_)));
        assert_eq!(directory.state().unbinds(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let directory = FakeDirectory::new()
            .with_entry(ldap_entry("uid=jane,dc=example,dc=com", "U-123", None, None))
            .with_user_password("pass123");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("ldap@x.com", "wrong").await.unwrap_err();
        assert_eq!(err, DirectoryError::UserBindRejected(49));
        assert_eq!(directory.state().unbinds(), 1);
    }

    #[tokio::test]
    async fn test_empty_password_never_binds() {
        let directory = FakeDirectory::new()
            .with_entry(ldap_entry("uid=jane,dc=example,dc=com", "U-123", None, None))
            .with_user_password("");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("ldap@x.com", "").await.unwrap_err();
        assert!(err.is_credential_failure());
        assert_eq!(directory.state().user_binds(), 0);
    }

    #[tokio::test]
    async fn test_filter_escapes_email() {
        let directory = FakeDirectory::new();
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let _ = client.authenticate("*)(uid=*", "pass123").await;
        assert_eq!(
            directory.state().last_filter().as_deref(),
            Some("(mail=\\2a\\29\\28uid=\\2a)")
        );
    }

    #[tokio::test]
    async fn test_multiple_matches_take_first() {
        let directory = FakeDirectory::new()
            .with_entry(ldap_entry("uid=first,dc=example,dc=com", "U-1", None, None))
            .with_entry(ldap_entry("uid=second,dc=example,dc=com", "U-2", None, None))
            .with_user_password("pass123");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let entry = client.authenticate("ldap@x.com", "pass123").await.unwrap();
        assert_eq!(entry.unique_id, "U-1");
    }

    #[tokio::test]
    async fn test_missing_unique_id() {
        let mut entry = ldap_entry("uid=jane,dc=example,dc=com", "U-1", None, None);
        entry.attrs.clear();
        let directory = FakeDirectory::new()
            .with_entry(entry)
            .with_user_password("pass123");
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("ldap@x.com", "pass123").await.unwrap_err();
        assert_eq!(err, DirectoryError::MissingUniqueId("entryUUID".to_string()));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let directory = FakeDirectory::unreachable();
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let err = client.authenticate("ldap@x.com", "pass123").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Connection(_)));
        assert!(client.check_connection().await.is_err());
    }

    #[tokio::test]
    async fn test_check_connection_defaults() {
        let directory = FakeDirectory::new();
        let client = LdapClient::with_connector(directory_config(), directory.connector());

        let info = client.check_connection().await.unwrap();
        assert_eq!(info.supported_ldap_version, vec!["3".to_string()]);
        assert_eq!(directory.state().unbinds(), 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = directory_config();
        config.unique_id_attribute.clear();
        assert!(LdapClient::new(config).is_err());
    }
}
