//! Configuration for Janus

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

use crate::{DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT, EMAIL_PLACEHOLDER};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JanusConfig {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub lockout: LockoutConfig,

    #[serde(default)]
    pub password: PasswordPolicyConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl JanusConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from `JANUS_*` variables supplied by `lookup`.
    pub fn from_vars<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(strategy) = lookup("JANUS_AUTH_STRATEGY") {
            config.auth.strategy = strategy.parse()?;
        }
        if let Some(url) = lookup("JANUS_DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(max) = lookup("JANUS_DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("JANUS_DATABASE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(level) = lookup("JANUS_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("JANUS_LOG_FORMAT") {
            config.logging.format = format;
        }

        // Directory from environment
        if let Some(server) = lookup("JANUS_LDAP_SERVER") {
            config.ldap.server_url = server;
        }
        if let Some(base) = lookup("JANUS_LDAP_SEARCH_BASE") {
            config.ldap.search_base = base;
        }
        if let Some(filter) = lookup("JANUS_LDAP_USER_FILTER") {
            config.ldap.user_filter = filter;
        }
        if let Some(attr) = lookup("JANUS_LDAP_UNIQUE_ID_ATTRIBUTE") {
            config.ldap.unique_id_attribute = attr;
        }
        if let Some(attr) = lookup("JANUS_LDAP_GIVEN_NAME_ATTRIBUTE") {
            config.ldap.given_name_attribute = attr;
        }
        if let Some(attr) = lookup("JANUS_LDAP_SURNAME_ATTRIBUTE") {
            config.ldap.surname_attribute = attr;
        }
        if let Some(dn) = lookup("JANUS_LDAP_BIND_DN") {
            config.ldap.bind_dn = dn;
        }
        if let Some(password) = lookup("JANUS_LDAP_BIND_PASSWORD") {
            config.ldap.bind_password = password;
        }
        if let Some(flag) = lookup("JANUS_LDAP_START_TLS") {
            config.ldap.start_tls = parse_flag("JANUS_LDAP_START_TLS", &flag)?;
        }
        if let Some(secs) = lookup("JANUS_LDAP_TIMEOUT_SECONDS") {
            config.ldap.timeout_seconds = parse_var("JANUS_LDAP_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(flag) = lookup("JANUS_LDAP_SYNC_LOCAL_IDENTITY") {
            config.ldap.sync_local_identity = parse_flag("JANUS_LDAP_SYNC_LOCAL_IDENTITY", &flag)?;
        }

        // Lockout and password policy
        if let Some(max) = lookup("JANUS_LOCKOUT_MAX_FAILED_ATTEMPTS") {
            config.lockout.max_failed_attempts = parse_var("JANUS_LOCKOUT_MAX_FAILED_ATTEMPTS", &max)?;
        }
        if let Some(secs) = lookup("JANUS_LOCKOUT_DURATION_SECS") {
            config.lockout.lockout_duration_secs = parse_var("JANUS_LOCKOUT_DURATION_SECS", &secs)?;
        }
        if let Some(len) = lookup("JANUS_PASSWORD_MIN_LENGTH") {
            config.password.min_length = parse_var("JANUS_PASSWORD_MIN_LENGTH", &len)?;
        }
        if let Some(count) = lookup("JANUS_PASSWORD_REQUIRED_UNIQUE_CHARS") {
            config.password.required_unique_chars =
                parse_var("JANUS_PASSWORD_REQUIRED_UNIQUE_CHARS", &count)?;
        }
        if let Some(flag) = lookup("JANUS_PASSWORD_REQUIRE_DIGIT") {
            config.password.require_digit = parse_flag("JANUS_PASSWORD_REQUIRE_DIGIT", &flag)?;
        }
        if let Some(flag) = lookup("JANUS_PASSWORD_REQUIRE_LOWERCASE") {
            config.password.require_lowercase = parse_flag("JANUS_PASSWORD_REQUIRE_LOWERCASE", &flag)?;
        }
        if let Some(flag) = lookup("JANUS_PASSWORD_REQUIRE_UPPERCASE") {
            config.password.require_uppercase = parse_flag("JANUS_PASSWORD_REQUIRE_UPPERCASE", &flag)?;
        }
        if let Some(flag) = lookup("JANUS_PASSWORD_REQUIRE_NON_ALPHANUMERIC") {
            config.password.require_non_alphanumeric =
                parse_flag("JANUS_PASSWORD_REQUIRE_NON_ALPHANUMERIC", &flag)?;
        }

        Ok(config)
    }

    /// Check everything the selected strategy needs at startup.
    pub fn validate(&self) -> crate::Result<()> {
        self.lockout.validate()?;
        self.password.validate()?;

        if self.auth.strategy == AuthStrategy::Directory {
            self.ldap.validate()?;
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("{} has an invalid value: {}", name, value)))
}

fn parse_flag(name: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(crate::Error::InvalidConfig(format!(
            "{} must be true or false, got {}",
            name, value
        ))),
    }
}

/// Which authentication strategy backs the facade for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStrategy {
    /// Local credential store
    #[default]
    Local,
    /// External LDAP directory with local identity provisioning
    Directory,
}

impl AuthStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStrategy::Local => "local",
            AuthStrategy::Directory => "directory",
        }
    }
}

impl FromStr for AuthStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AuthStrategy::Local),
            "directory" | "ldap" => Ok(AuthStrategy::Directory),
            other => Err(crate::Error::InvalidConfig(format!(
                "Unknown auth strategy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub strategy: AuthStrategy,
}

/// LDAP directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389"
    #[serde(default)]
    pub server_url: String,

    /// Use STARTTLS for connection upgrade
    #[serde(default)]
    pub start_tls: bool,

    /// Service account DN used for the search bind
    #[serde(default)]
    pub bind_dn: String,

    #[serde(default)]
    pub bind_password: String,

    /// Base DN for user searches
    /// Example: "ou=users,dc=example,dc=com"
    #[serde(default)]
    pub search_base: String,

    /// User search filter, with exactly one {email} placeholder
    /// Example: "(mail={email})"
    #[serde(default = "default_user_filter")]
    pub user_filter: String,

    /// Attribute holding the directory-side stable identifier
    /// Example: "entryUUID", "objectGUID"
    #[serde(default)]
    pub unique_id_attribute: String,

    #[serde(default = "default_given_name_attr")]
    pub given_name_attribute: String,

    #[serde(default = "default_surname_attr")]
    pub surname_attribute: String,

    /// Connection and per-operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Provision and sync a local identity after each directory login
    #[serde(default = "default_true")]
    pub sync_local_identity: bool,
}

fn default_user_filter() -> String {
    "(mail={email})".to_string()
}

fn default_given_name_attr() -> String {
    "givenName".to_string()
}

fn default_surname_attr() -> String {
    "sn".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            start_tls: false,
            bind_dn: String::new(),
            bind_password: String::new(),
            search_base: String::new(),
            user_filter: default_user_filter(),
            unique_id_attribute: String::new(),
            given_name_attribute: default_given_name_attr(),
            surname_attribute: default_surname_attr(),
            timeout_seconds: default_timeout(),
            sync_local_identity: true,
        }
    }
}

/// Directory host and port derived from the server URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapEndpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl LdapEndpoint {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl LdapConfig {
    /// Build the user search filter. The caller escapes the value.
    pub fn build_user_filter(&self, escaped_email: &str) -> String {
        self.user_filter.replace(EMAIL_PLACEHOLDER, escaped_email)
    }

    /// Derive host and port from the configured URL
    pub fn endpoint(&self) -> crate::Result<LdapEndpoint> {
        let url = Url::parse(&self.server_url).map_err(|e| {
            crate::Error::InvalidConfig(format!("Invalid LDAP server URL: {}", e))
        })?;

        let secure = match url.scheme() {
            "ldap" => false,
            "ldaps" => true,
            other => {
                return Err(crate::Error::InvalidConfig(format!(
                    "Unsupported LDAP scheme: {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| crate::Error::InvalidConfig("LDAP server URL has no host".into()))?
            .to_string();

        let port = url
            .port()
            .unwrap_or(if secure { DEFAULT_LDAPS_PORT } else { DEFAULT_LDAP_PORT });

        Ok(LdapEndpoint { host, port, secure })
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("server_url", &self.server_url),
            ("search_base", &self.search_base),
            ("user_filter", &self.user_filter),
            ("unique_id_attribute", &self.unique_id_attribute),
            ("bind_dn", &self.bind_dn),
            ("bind_password", &self.bind_password),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(crate::Error::InvalidConfig(format!(
                    "ldap.{} is required",
                    name
                )));
            }
        }

        self.endpoint()?;

        if self.user_filter.matches(EMAIL_PLACEHOLDER).count() != 1 {
            return Err(crate::Error::InvalidConfig(format!(
                "ldap.user_filter must contain exactly one {} placeholder",
                EMAIL_PLACEHOLDER
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::InvalidConfig(
                "ldap.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Failed-attempt lockout policy for local logins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Consecutive failures before the account locks
    pub max_failed_attempts: u32,
    /// Cool-down once locked, in seconds
    pub lockout_duration_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration_secs: 300,
        }
    }
}

impl LockoutConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_failed_attempts == 0 {
            return Err(crate::Error::InvalidConfig(
                "lockout.max_failed_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Password rules applied when a local credential is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub required_unique_chars: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            required_unique_chars: 1,
            require_digit: false,
            require_lowercase: false,
            require_uppercase: false,
            require_non_alphanumeric: false,
        }
    }
}

impl PasswordPolicyConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_length == 0 {
            return Err(crate::Error::InvalidConfig(
                "password.min_length must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://janus.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
