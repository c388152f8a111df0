//! `SQLite` plumbing shared by Parklot storage layers.
//!
//! Provides `DatabaseError`, `unix_timestamp()`, pool constructors and the
//! `define_database!` macro that wraps a pool with embedded migrations.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

const FILE_POOL_SIZE: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// The named row does not exist, e.g. `"Parking lot 3"`.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write hit a UNIQUE constraint.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

fn connection_error(e: sqlx::Error) -> DatabaseError {
    DatabaseError::Connection(e.to_string())
}

/// WAL journal and enforced foreign keys, for every pool we open.
fn base_options(url: &str) -> Result<SqliteConnectOptions, DatabaseError> {
    Ok(SqliteConnectOptions::from_str(url)
        .map_err(connection_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true))
}

/// Open (or create) a pool on a database file, creating its directory.
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
    }

    let options =
        base_options(&format!("sqlite:{}?mode=rwc", path.display()))?.busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new()
        .max_connections(FILE_POOL_SIZE)
        .connect_with(options)
        .await
        .map_err(connection_error)?;

    info!(path = %path.display(), "Database opened");
    Ok(pool)
}

/// Open an in-memory pool.
///
/// Exactly one connection that is never recycled: the database lives as
/// long as that connection does.
pub async fn open_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(base_options("sqlite::memory:")?)
        .await
        .map_err(connection_error)
}

/// Seconds since the Unix epoch.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Generate a database handle around a `SQLite` pool.
///
/// ```ignore
/// parklot_core::define_database!(ParkingDatabase, "Parking database migrations complete");
/// ```
///
/// The handle is `Clone` and exposes `open(path)`, `open_in_memory()`,
/// `pool()`, `begin_write()` and `close()`. Both constructors apply the migrations found in
/// `./migrations` of the invoking crate before returning.
#[macro_export]
macro_rules! define_database {
    ($name:ident, $migration_msg:expr) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            /// Open or create a database file and migrate it.
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::migrated($crate::db::open_pool(path).await?).await
            }

            /// Open a migrated in-memory database.
            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::migrated($crate::db::open_pool_in_memory().await?).await
            }

            async fn migrated(
                pool: ::sqlx::Pool<::sqlx::Sqlite>,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                ::sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;
                ::tracing::info!($migration_msg);
                Ok(Self { pool })
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }

            /// Start a transaction that takes the write lock up front.
            ///
            /// A deferred transaction that reads before writing fails with
            /// `SQLITE_BUSY` once another writer commits; `BEGIN IMMEDIATE`
            /// waits on the busy timeout instead.
            pub async fn begin_write(
                &self,
            ) -> ::std::result::Result<
                ::sqlx::Transaction<'static, ::sqlx::Sqlite>,
                $crate::db::DatabaseError,
            > {
                Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
            }

            /// Wait for in-flight queries and close every connection.
            pub async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_is_after_2024() {
        assert!(unix_timestamp() > 1_704_067_200);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn open_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("parklot.db");
        let pool = open_pool(&path).await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn unique_violation_maps_to_conflict() {
        let pool = open_pool_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (name TEXT UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap();

        let err = sqlx::query("INSERT INTO t (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(matches!(DatabaseError::from(err), DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = open_pool_in_memory().await.unwrap();
        let on: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(on, 1);
    }
}
