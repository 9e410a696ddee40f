use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE energy_data (
    id INTEGER PRIMARY KEY NOT NULL,
    group_id INTEGER,
    criteria TEXT NOT NULL,
    energy_method TEXT NOT NULL,
    direction TEXT NOT NULL,
    paragraph TEXT,
    status TEXT,
    "user" TEXT,
    scale TEXT,
    climate TEXT,
    location TEXT,
    building_use TEXT,
    approach TEXT,
    sample_size TEXT,
    created_at TEXT
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS energy_data (
    id BIGINT PRIMARY KEY,
    group_id BIGINT,
    criteria TEXT NOT NULL,
    energy_method TEXT NOT NULL,
    direction TEXT NOT NULL,
    paragraph TEXT,
    status TEXT,
    "user" TEXT,
    scale TEXT,
    climate TEXT,
    location TEXT,
    building_use TEXT,
    approach TEXT,
    sample_size TEXT,
    created_at TEXT
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    password TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    email_confirmed BOOLEAN NOT NULL DEFAULT 0,
    auth_id TEXT,
    created_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    password TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
    auth_id TEXT,
    created_at TEXT NOT NULL
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE user_saved_analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    analysis_type TEXT NOT NULL,
    determinant TEXT NOT NULL,
    top_energy TEXT,
    bottom_energy TEXT,
    top_sorted TEXT,
    bottom_sorted TEXT,
    top_height INTEGER,
    bottom_height INTEGER,
    html TEXT,
    created_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE IF NOT EXISTS user_saved_analyses (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    analysis_type TEXT NOT NULL,
    determinant TEXT NOT NULL,
    top_energy TEXT,
    bottom_energy TEXT,
    top_sorted TEXT,
    bottom_sorted TEXT,
    top_height BIGINT,
    bottom_height BIGINT,
    html TEXT,
    created_at TEXT NOT NULL
)"#,
                ),
        )
}
