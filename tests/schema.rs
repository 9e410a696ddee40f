//! Schema Tests
//!
//! Verifies that the cetane migrations create the tables and indexes the
//! repositories read and write.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, Result as SqliteResult};
use tempfile::tempdir;

use energy_evidence::repository::migrations::run_migrations;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnInfo {
    col_type: String,
    not_null: bool,
    primary_key: bool,
}

/// Column info per table, skipping SQLite internals and the migration ledger.
fn extract_tables(conn: &Connection) -> SqliteResult<BTreeMap<String, BTreeMap<String, ColumnInfo>>> {
    let mut tables = BTreeMap::new();

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' \
         AND name NOT LIKE 'sqlite_%' AND name != '__cetane_migrations' ORDER BY name",
    )?;
    let table_names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<_>>>()?;

    for table_name in table_names {
        let mut pragma = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table_name))?;
        let columns = pragma
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    ColumnInfo {
                        col_type: row.get::<_, String>(2)?.to_uppercase(),
                        not_null: row.get(3)?,
                        primary_key: row.get::<_, i32>(5)? > 0,
                    },
                ))
            })?
            .collect::<SqliteResult<BTreeMap<_, _>>>()?;
        tables.insert(table_name, columns);
    }

    Ok(tables)
}

fn extract_index_names(conn: &Connection) -> SqliteResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='index' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<BTreeSet<String>>>()?;
    Ok(names)
}

#[tokio::test]
async fn test_migrations_create_expected_tables() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("evidence.db");
    run_migrations(&path.display().to_string(), false)
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let tables = extract_tables(&conn).unwrap();
    let names: Vec<&str> = tables.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["energy_data", "user_saved_analyses", "users"]);

    let energy = &tables["energy_data"];
    for column in [
        "id",
        "group_id",
        "criteria",
        "energy_method",
        "direction",
        "paragraph",
        "status",
        "user",
        "scale",
        "climate",
        "location",
        "building_use",
        "approach",
        "sample_size",
        "created_at",
    ] {
        assert!(energy.contains_key(column), "energy_data.{} missing", column);
    }
    assert!(energy["id"].primary_key);
    assert!(energy["criteria"].not_null);
    assert!(!energy["climate"].not_null);

    let saved = &tables["user_saved_analyses"];
    assert_eq!(saved["top_height"].col_type, "INTEGER");
    assert!(saved["user_id"].not_null);
    assert!(tables["users"]["username"].not_null);
}

#[tokio::test]
async fn test_migrations_create_lookup_indexes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("evidence.db");
    run_migrations(&path.display().to_string(), false)
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let indexes = extract_index_names(&conn).unwrap();
    for name in [
        "idx_energy_data_criteria",
        "idx_energy_data_status",
        "idx_saved_analyses_user",
    ] {
        assert!(indexes.contains(name), "index {} missing", name);
    }
}

#[tokio::test]
async fn test_migrations_are_recorded_once() {
    let dir = tempdir().unwrap();
    let url = dir.path().join("evidence.db").display().to_string();

    let first = run_migrations(&url, false).await.unwrap();
    assert_eq!(first, vec!["0001_initial_schema", "0002_lookup_indexes"]);
    assert!(run_migrations(&url, false).await.unwrap().is_empty());

    let conn = Connection::open(dir.path().join("evidence.db")).unwrap();
    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM __cetane_migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied, 2);
}
