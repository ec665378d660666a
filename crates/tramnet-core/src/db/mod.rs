//! SQLite store for the tram network.
//!
//! The store is the single source of truth; every graph view is derived from
//! it on demand. Runtime defaults:
//! - `journal_mode = WAL` so readers never block the writer
//! - `busy_timeout = 5s` to absorb short lock contention between front-ends
//! - `foreign_keys = ON` so connections cannot point at missing stops or lines

pub mod migrations;
pub mod query;
pub mod schema;
pub mod write;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database, apply runtime pragmas, and migrate
/// the schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }
    }

    let mut conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;

    Ok(conn)
}

/// Open a private in-memory store with the full schema applied.
///
/// # Errors
///
/// Returns an error if configuring or migrating the database fails.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("open in-memory store")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    migrations::migrate(&mut conn).context("apply store migrations")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, open_in_memory, open_store};
    use crate::db::migrations;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("tram_data.db");
        (dir, path)
    }

    #[test]
    fn open_store_sets_wal_busy_timeout_and_fk() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path).expect("open store db");

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .expect("query foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn open_store_runs_migrations() {
        let (_dir, path) = temp_db_path();
        let conn = open_store(&path).expect("open store db");

        let version = migrations::current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, migrations::LATEST_SCHEMA_VERSION);

        let meta_version: i64 = conn
            .query_row(
                "SELECT schema_version FROM store_meta WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .expect("store_meta schema version");
        assert_eq!(meta_version, i64::from(migrations::LATEST_SCHEMA_VERSION));
    }

    #[test]
    fn reopening_existing_store_keeps_data() {
        let (_dir, path) = temp_db_path();
        {
            let conn = open_store(&path).expect("first open");
            conn.execute(
                "INSERT INTO stops (stop_id, stop_name) VALUES ('P', 'Plac')",
                [],
            )
            .expect("insert stop");
        }
        let conn = open_store(&path).expect("second open");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM stops", [], |row| row.get(0))
            .expect("count stops");
        assert_eq!(count, 1);
    }

    #[test]
    fn in_memory_store_enforces_foreign_keys() {
        let conn = open_in_memory().expect("in-memory store");
        let result = conn.execute(
            "INSERT INTO connections (line_number, from_stop, to_stop, stop_lo, stop_hi, weight)
             VALUES ('MANUAL', 'A', 'B', 'A', 'B', 3)",
            [],
        );
        assert!(result.is_err(), "dangling connection must be rejected");
    }
}
