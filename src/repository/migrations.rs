//! Schema migrations using cetane.
//!
//! SQLite runs through rusqlite on a blocking task; PostgreSQL through a raw
//! tokio-postgres client. Applied migrations are tracked in `__cetane_migrations`.

use tracing::info;

use crate::error::StoreError;

/// Run pending migrations for a database URL.
pub async fn run_migrations(database_url: &str, no_tls: bool) -> Result<Vec<String>, StoreError> {
    if super::util::is_postgres_url(database_url) {
        #[cfg(feature = "postgres")]
        {
            run_postgres_migrations(database_url, no_tls).await
        }
        #[cfg(not(feature = "postgres"))]
        {
            let _ = no_tls;
            Err(StoreError::Configuration(
                "PostgreSQL support not compiled. Use --features postgres".to_string(),
            ))
        }
    } else {
        let _ = no_tls;
        run_sqlite_migrations(database_url).await
    }
}

fn migration_error(msg: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("migration failed: {}", msg))
}

fn names_of<N: ToString>(names: Vec<N>) -> Vec<String> {
    names.into_iter().map(|n| n.to_string()).collect()
}

fn log_applied(applied: &[String]) {
    for name in applied {
        info!("Applied migration: {}", name);
    }
    if applied.is_empty() {
        info!("No pending migrations");
    }
}

async fn run_sqlite_migrations(database_url: &str) -> Result<Vec<String>, StoreError> {
    use cetane::backend::Sqlite;
    use cetane::migrator::Migrator;

    let path = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    let applied = tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let backend = Sqlite;
        let registry = crate::migrations::registry();
        let state = SqliteState::new(&conn)?;

        let mut migrator = Migrator::new(&registry, &backend, state);
        migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map(names_of)
            .map_err(migration_error)
    })
    .await
    .map_err(|e| StoreError::Unavailable(e.to_string()))??;

    log_applied(&applied);
    Ok(applied)
}

#[cfg(feature = "postgres")]
async fn run_postgres_migrations(
    database_url: &str,
    no_tls: bool,
) -> Result<Vec<String>, StoreError> {
    use cetane::backend::Postgres;
    use cetane::migrator::Migrator;

    let client = super::pg_tls::connect_raw(database_url, no_tls)
        .await
        .map_err(|e| StoreError::from(super::util::pg_to_diesel_error(e)))?;

    let backend = Postgres;
    let registry = crate::migrations::registry();
    let state = PostgresState::new(&client).await?;

    let mut migrator = Migrator::new(&registry, &backend, state);
    let applied = migrator
        .migrate_forward(|sql| block_on_client(&client, sql))
        .map(names_of)
        .map_err(migration_error)?;

    log_applied(&applied);
    Ok(applied)
}

/// Run one statement from the synchronous migrator interface.
#[cfg(feature = "postgres")]
fn block_on_client(client: &tokio_postgres::Client, sql: &str) -> Result<(), String> {
    let rt = tokio::runtime::Handle::current();
    std::thread::scope(|s| {
        s.spawn(|| {
            rt.block_on(async {
                client
                    .batch_execute(sql)
                    .await
                    .map_err(|e| e.to_string())
            })
        })
        .join()
        .map_err(|_| "thread panicked".to_string())?
    })
}

// -- SQLite state store --

struct SqliteState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(migration_error)?;

        Ok(Self { conn })
    }
}

impl cetane::migrator::MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(names)
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// -- PostgreSQL state store --

#[cfg(feature = "postgres")]
struct PostgresState<'a> {
    client: &'a tokio_postgres::Client,
    applied: Vec<String>,
}

#[cfg(feature = "postgres")]
impl<'a> PostgresState<'a> {
    async fn new(client: &'a tokio_postgres::Client) -> Result<Self, StoreError> {
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                    name TEXT PRIMARY KEY NOT NULL,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .await
            .map_err(migration_error)?;

        let rows = client
            .query("SELECT name FROM __cetane_migrations ORDER BY name", &[])
            .await
            .map_err(migration_error)?;

        let applied = rows.iter().map(|r| r.get::<_, String>(0)).collect();

        Ok(Self { client, applied })
    }
}

#[cfg(feature = "postgres")]
impl cetane::migrator::MigrationStateStore for PostgresState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        Ok(self.applied.clone())
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        let escaped = name.replace('\'', "''");
        block_on_client(
            self.client,
            &format!(
                "INSERT INTO __cetane_migrations (name) VALUES ('{}') ON CONFLICT DO NOTHING",
                escaped
            ),
        )?;
        if !self.applied.iter().any(|n| n == name) {
            self.applied.push(name.to_string());
        }
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        let escaped = name.replace('\'', "''");
        block_on_client(
            self.client,
            &format!("DELETE FROM __cetane_migrations WHERE name = '{}'", escaped),
        )?;
        self.applied.retain(|n| n != name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sqlite_migrations_are_idempotent() {
        let dir = tempdir().unwrap();
        let url = dir.path().join("evidence.db").display().to_string();

        let first = run_migrations(&url, false).await.unwrap();
        assert_eq!(first.len(), 2);

        let second = run_migrations(&url, false).await.unwrap();
        assert!(second.is_empty());
    }
}
