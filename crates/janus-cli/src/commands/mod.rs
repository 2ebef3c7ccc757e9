//! CLI command implementations

pub mod check_directory;
pub mod login;
pub mod signup;

use crate::OutputFormat;
use anyhow::{Context, Result};
use janus_auth::{AuthError, Authenticator};
use janus_core::config::JanusConfig;
use janus_metadata::{IdentityStore, SqliteIdentityStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Context passed to all commands
pub struct CommandContext {
    pub config: JanusConfig,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    reasons: &'a [String],
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a serializable result as JSON
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Open the configured identity store
    pub async fn open_store(&self) -> Result<Arc<dyn IdentityStore>> {
        let database = &self.config.database;
        debug!("Opening identity store at {}", database.url);
        let store = SqliteIdentityStore::new(&database.url, database.max_connections)
            .await
            .with_context(|| format!("Failed to open identity store at {}", database.url))?;
        Ok(Arc::new(store))
    }

    /// Build the authenticator for the configured strategy
    pub async fn authenticator(&self) -> Result<Authenticator> {
        let store = self.open_store().await?;
        Authenticator::from_config(&self.config, store).context("Invalid authentication configuration")
    }

    /// Report an authentication failure and turn it into a non-zero exit
    pub fn auth_failure(&self, err: AuthError) -> anyhow::Error {
        if self.is_json() {
            let output = ErrorOutput {
                error: err.code(),
                message: err.to_string(),
                reasons: err.reasons(),
            };
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                println!("{}", json);
            }
        }
        anyhow::anyhow!("{}: {}", err.code(), err)
    }
}
