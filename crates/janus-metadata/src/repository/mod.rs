//! SQLite identity repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use janus_core::types::UserIdentity;
use janus_core::utils::normalize_email;
use janus_core::{Error, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::{debug, info};

use crate::traits::IdentityStore;

pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    email: String,
    first_name: String,
    last_name: String,
    credential_hash: Option<String>,
    directory_uuid: Option<String>,
    failed_attempt_count: i64,
    locked_until: Option<String>,
    created_at: String,
    updated_at: String,
}

impl IdentityRow {
    fn into_identity(self) -> Result<UserIdentity> {
        Ok(UserIdentity {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            credential_hash: self.credential_hash,
            directory_uuid: self.directory_uuid,
            failed_attempt_count: u32::try_from(self.failed_attempt_count).unwrap_or(0),
            locked_until: self.locked_until.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DatabaseError(format!("Invalid timestamp {}: {}", value, e)))
}

fn map_write_error(e: sqlx::Error, email: &str) -> Error {
    let unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if unique {
        Error::Conflict(email.to_string())
    } else {
        Error::DatabaseError(e.to_string())
    }
}

const SELECT_IDENTITY: &str = r#"
    SELECT id, email, first_name, last_name, credential_hash, directory_uuid,
           failed_attempt_count, locked_until, created_at, updated_at
    FROM identities
"#;

impl SqliteIdentityStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Every connection to an in-memory database sees its own database.
        let in_memory = database_url.contains(":memory:");
        let mut options = SqlitePoolOptions::new();
        options = if in_memory {
            options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            options.max_connections(max_connections.max(1))
        };

        let pool = options
            .connect(database_url)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                email_key TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                credential_hash TEXT,
                directory_uuid TEXT,
                failed_attempt_count INTEGER NOT NULL DEFAULT 0,
                locked_until TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_identities_directory_uuid ON identities(directory_uuid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        info!("Identity store initialized");
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("{} WHERE email_key = ?", SELECT_IDENTITY))
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.map(IdentityRow::into_identity).transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserIdentity>> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_IDENTITY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.map(IdentityRow::into_identity).transpose()
    }

    async fn create(&self, identity: &UserIdentity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO identities (id, email, email_key, first_name, last_name, credential_hash,
                                    directory_uuid, failed_attempt_count, locked_until,
                                    created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&identity.id)
        .bind(&identity.email)
        .bind(identity.email_key())
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.credential_hash)
        .bind(&identity.directory_uuid)
        .bind(i64::from(identity.failed_attempt_count))
        .bind(identity.locked_until.map(|t| t.to_rfc3339()))
        .bind(identity.created_at.to_rfc3339())
        .bind(identity.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &identity.email))?;

        debug!("Created identity: {}", identity.email);
        Ok(())
    }

    async fn update(&self, identity: &UserIdentity) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE identities
            SET email = ?, email_key = ?, first_name = ?, last_name = ?, credential_hash = ?,
                directory_uuid = ?, failed_attempt_count = ?, locked_until = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&identity.email)
        .bind(identity.email_key())
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(&identity.credential_hash)
        .bind(&identity.directory_uuid)
        .bind(i64::from(identity.failed_attempt_count))
        .bind(identity.locked_until.map(|t| t.to_rfc3339()))
        .bind(identity.updated_at.to_rfc3339())
        .bind(&identity.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &identity.email))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(identity.id.clone()));
        }

        debug!("Updated identity: {}", identity.email);
        Ok(())
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        max_failed_attempts: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<UserIdentity> {
        // SET expressions all see the pre-update row, so the increment and
        // the threshold check happen in one statement.
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            UPDATE identities
            SET failed_attempt_count = CASE
                    WHEN failed_attempt_count + 1 >= ? THEN 0
                    ELSE failed_attempt_count + 1
                END,
                locked_until = CASE
                    WHEN failed_attempt_count + 1 >= ? THEN ?
                    ELSE locked_until
                END,
                updated_at = ?
            WHERE id = ?
            RETURNING id, email, first_name, last_name, credential_hash, directory_uuid,
                      failed_attempt_count, locked_until, created_at, updated_at
            "#,
        )
        .bind(i64::from(max_failed_attempts))
        .bind(i64::from(max_failed_attempts))
        .bind(lock_until.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.ok_or_else(|| Error::NotFound(id.to_string()))?
            .into_identity()
    }

    async fn clear_failed_attempts(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE identities SET failed_attempt_count = 0, locked_until = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn link_directory(&self, id: &str, directory_uuid: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE identities SET directory_uuid = ?, updated_at = ? WHERE id = ?",
        )
        .bind(directory_uuid)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        debug!("Linked identity {} to directory id {}", id, directory_uuid);
        Ok(())
    }
}
