//! Database module for fileupload.
//!
//! SQLite connectivity, migrations, and the [`MetadataStore`] implementation
//! backing upload metadata.

mod schema;

pub use schema::MIGRATIONS;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::store::{is_valid_identifier, MetadataStore, StoreRow, StoreValue};
use crate::{FileUploadError, Result};

/// Database wrapper around a SQLite connection pool.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// The file and its parent directories are created if missing.
    /// Migrations are applied automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Open the database named by the `[database]` section.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::open(&config.path).await
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool is limited to one connection that is never recycled, since
    /// every SQLite in-memory connection is a separate database.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;

        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[async_trait]
impl MetadataStore for Database {
    async fn insert(&self, table: &str, columns: &[String], values: &[StoreValue]) -> Result<i64> {
        if columns.len() != values.len() {
            return Err(FileUploadError::Store(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        if let Some(bad) = std::iter::once(table)
            .chain(columns.iter().map(String::as_str))
            .find(|name| !is_valid_identifier(name))
        {
            return Err(FileUploadError::Store(format!("invalid identifier {bad:?}")));
        }

        let column_list = columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!("INSERT INTO \"{table}\" ({column_list}) VALUES ({placeholders})");

        let result = bind_values(sqlx::query(&sql), values)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn select_many(&self, query: &str, params: &[StoreValue]) -> Result<Vec<StoreRow>> {
        let rows = bind_values(sqlx::query(query), params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_row).collect()
    }
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[StoreValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            StoreValue::Integer(v) => query.bind(*v),
            StoreValue::Real(v) => query.bind(*v),
            StoreValue::Text(s) => query.bind(s.clone()),
            StoreValue::Null => query.bind(None::<String>),
        };
    }
    query
}

/// Map a row to a [`StoreRow`] using each value's storage class.
fn decode_row(row: &SqliteRow) -> Result<StoreRow> {
    let mut out = StoreRow::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let storage_class = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage_class.as_deref() {
            None => StoreValue::Null,
            Some("INTEGER") => StoreValue::Integer(row.try_get(idx)?),
            Some("REAL") => StoreValue::Real(row.try_get(idx)?),
            Some("BLOB") => {
                let bytes: Vec<u8> = row.try_get(idx)?;
                StoreValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            Some(_) => StoreValue::Text(row.try_get(idx)?),
        };

        out.insert(column.name().to_string(), value);
    }

    Ok(out)
}
