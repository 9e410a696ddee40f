//! Unified database connection pool supporting SQLite and PostgreSQL.
//!
//! The embedded mode opens a local SQLite file; the remote mode talks to a
//! hosted PostgreSQL database. The backend is chosen from the database URL.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

#[cfg(feature = "postgres")]
use std::sync::{Arc, RwLock};

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::{is_postgres_url, to_diesel_error, to_unavailable_error};

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Async PostgreSQL connection type.
#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// SQLite connection pool (lightweight - creates connections on demand).
#[derive(Clone)]
pub struct SqlitePool {
    database_url: String,
}

impl SqlitePool {
    pub fn new(database_url: &str) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(&path.display().to_string())
    }

    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_unavailable_error)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// PostgreSQL connection pool.
///
/// The inner pool can be swapped out after a credential refresh; clones share it.
#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: Arc<RwLock<DeadPool<AsyncPgConnection>>>,
    no_tls: bool,
}

#[cfg(feature = "postgres")]
impl PgPool {
    pub fn new(database_url: &str, max_size: usize, no_tls: bool) -> Result<Self, DbError> {
        let pool = Self::build(database_url, max_size, no_tls)?;
        Ok(Self {
            pool: Arc::new(RwLock::new(pool)),
            no_tls,
        })
    }

    fn build(
        database_url: &str,
        max_size: usize,
        no_tls: bool,
    ) -> Result<DeadPool<AsyncPgConnection>, DbError> {
        let manager = if no_tls {
            AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url)
        } else {
            let mut config = ManagerConfig::default();
            config.custom_setup = Box::new(super::pg_tls::establish_tls_connection);
            AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
                database_url,
                config,
            )
        };
        DeadPool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(to_diesel_error)
    }

    pub async fn get(&self) -> Result<PgConn, DbError> {
        let pool = self
            .pool
            .read()
            .map_err(|_| to_diesel_error("connection pool lock poisoned"))?
            .clone();
        pool.get().await.map_err(to_unavailable_error)
    }

    /// Replace the pool with one connecting through `database_url`.
    pub fn rebuild(&self, database_url: &str) -> Result<(), DbError> {
        let max_size = self
            .pool
            .read()
            .map_err(|_| to_diesel_error("connection pool lock poisoned"))?
            .status()
            .max_size;
        let fresh = Self::build(database_url, max_size, self.no_tls)?;
        let mut guard = self
            .pool
            .write()
            .map_err(|_| to_diesel_error("connection pool lock poisoned"))?;
        *guard = fresh;
        Ok(())
    }
}

/// Unified database pool that supports both SQLite and PostgreSQL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// Create a pool from a database URL.
    ///
    /// - `postgres://` or `postgresql://` → PostgreSQL (requires the `postgres` feature)
    /// - Everything else → SQLite
    pub fn from_url(url: &str, no_tls: bool) -> Result<Self, DbError> {
        if is_postgres_url(url) {
            #[cfg(feature = "postgres")]
            {
                return Ok(DbPool::Postgres(PgPool::new(url, 10, no_tls)?));
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = no_tls;
                return Err(to_diesel_error(
                    "PostgreSQL support not compiled. Use --features postgres",
                ));
            }
        }

        Ok(DbPool::Sqlite(SqlitePool::new(url)))
    }

    pub fn sqlite_from_path(path: &Path) -> Self {
        DbPool::Sqlite(SqlitePool::from_path(path))
    }

    pub fn is_sqlite(&self) -> bool {
        matches!(self, DbPool::Sqlite(_))
    }

    #[cfg(feature = "postgres")]
    pub fn is_postgres(&self) -> bool {
        matches!(self, DbPool::Postgres(_))
    }

    /// Point a remote pool at a new URL. Returns false for SQLite, which has
    /// no credentials to refresh.
    pub fn rebuild(&self, database_url: &str) -> Result<bool, DbError> {
        match self {
            DbPool::Sqlite(_) => {
                let _ = database_url;
                Ok(false)
            }
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.rebuild(database_url).map(|_| true),
        }
    }
}

/// Macro for running database operations on either backend.
///
/// The body is expanded once per backend, so the same Diesel DSL code runs
/// against SQLite and PostgreSQL connections.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     energy_data::table.load::<RecordRow>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Macro for running database operations that need different SQL per backend.
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}

#[allow(unused_imports)]
pub use with_conn;
#[allow(unused_imports)]
pub use with_conn_split;
