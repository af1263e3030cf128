//! Per-worker catalog handle: opens the file, registers the `DAAP`
//! collation and the `like`/`daap_no_zero` functions, applies PRAGMAs,
//! ensures the schema exists, and gates on schema version. Grounded in
//! `original_source/src/db_init.c` (schema) and `sqlext.c`
//! (`sqlite3_extension_init`'s registration calls).

pub mod pragma;
pub mod retry;
pub mod schema;

use std::cmp::Ordering;
use std::path::Path;

use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;

use crate::collation::{daap_collate, daap_no_zero, like_match};
use crate::config::PragmaConfig;
use crate::error::{CoreError, Result};
use crate::model::SchemaVersion;

/// A worker's private catalog handle. Created at thread start, dropped at
/// thread exit — `Connection`'s own `Drop` finalizes any live statements
/// and closes the file, matching `store_thread_deinit()`.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// `store_thread_init()`: open, wire up collation/functions, apply
    /// PRAGMAs, and ensure the schema/seed data/version row exist.
    pub fn open(path: &Path, pragma_overrides: &PragmaConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        register_extensions(&conn)?;
        pragma::apply(&conn, pragma::CATALOG_DEFAULTS, pragma_overrides)?;

        let store = Store { conn };
        store.ensure_schema()?;
        store.gate_schema_version()?;
        Ok(store)
    }

    /// An in-memory handle for tests: same registration and schema, no
    /// version row persisted across runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        register_extensions(&conn)?;
        pragma::apply(&conn, pragma::CATALOG_DEFAULTS, &PragmaConfig::default())?;
        let store = Store { conn };
        store.ensure_schema()?;
        store.gate_schema_version()?;
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_schema(&self) -> Result<()> {
        for table in schema::TABLES {
            retry::exec(&self.conn, table)?;
        }
        for index in schema::INDICES {
            retry::exec(&self.conn, index)?;
        }
        for trigger in schema::TRIGGERS {
            // CREATE TRIGGER IF NOT EXISTS isn't idempotent across
            // concurrent first-openers in every sqlite build; tolerate
            // "already exists" the same way IF NOT EXISTS would.
            match self.conn.execute(trigger, []) {
                Ok(_) => {}
                Err(rusqlite::Error::SqlInputError { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        for playlist in schema::BUILTIN_PLAYLISTS {
            retry::exec(&self.conn, playlist)?;
        }
        for directory in schema::BUILTIN_DIRECTORIES {
            retry::exec(&self.conn, directory)?;
        }
        Ok(())
    }

    fn read_version(&self) -> Result<Option<SchemaVersion>> {
        let major: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM admin WHERE key = 'schema_version_major'",
                [],
                |r| r.get(0),
            )
            .ok();
        let minor: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM admin WHERE key = 'schema_version_minor'",
                [],
                |r| r.get(0),
            )
            .ok();
        match (major, minor) {
            (Some(maj), Some(min)) => Ok(Some(SchemaVersion {
                major: maj.parse().map_err(|_| {
                    CoreError::Integrity("schema_version_major is not numeric".to_string())
                })?,
                minor: min.parse().map_err(|_| {
                    CoreError::Integrity("schema_version_minor is not numeric".to_string())
                })?,
            })),
            _ => Ok(None),
        }
    }

    fn gate_schema_version(&self) -> Result<()> {
        match self.read_version()? {
            None => {
                retry::exec(
                    &self.conn,
                    &format!(
                        "INSERT INTO admin (key, value) VALUES ('schema_version_major', '{}')",
                        schema::SCHEMA_VERSION_MAJOR
                    ),
                )?;
                retry::exec(
                    &self.conn,
                    &format!(
                        "INSERT INTO admin (key, value) VALUES ('schema_version_minor', '{}')",
                        schema::SCHEMA_VERSION_MINOR
                    ),
                )?;
                retry::exec(
                    &self.conn,
                    "INSERT INTO admin (key, value) VALUES ('queue_version', '0')",
                )?;
                Ok(())
            }
            Some(found) => match found.major.cmp(&schema::SCHEMA_VERSION_MAJOR) {
                Ordering::Equal => Ok(()),
                Ordering::Less => Err(CoreError::Integrity(format!(
                    "catalog schema major {} predates this build's {} and cannot be migrated",
                    found.major,
                    schema::SCHEMA_VERSION_MAJOR
                ))),
                Ordering::Greater => Err(CoreError::Integrity(format!(
                    "catalog schema major {} is newer than this build's {}",
                    found.major,
                    schema::SCHEMA_VERSION_MAJOR
                ))),
            },
        }
    }
}

fn register_extensions(conn: &Connection) -> Result<()> {
    conn.create_collation("DAAP", daap_collate)?;

    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("daap_no_zero", 2, flags, |ctx| {
        let new_value: i64 = ctx.get(0)?;
        let old_value: i64 = ctx.get(1)?;
        Ok(daap_no_zero(new_value, old_value))
    })?;

    conn.create_scalar_function("like", 2, flags, |ctx| {
        let pattern: String = ctx.get(0)?;
        let subject: String = ctx.get(1)?;
        like_match(&pattern, &subject, None)
            .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
    })?;

    conn.create_scalar_function("like", 3, flags, |ctx| {
        let pattern: String = ctx.get(0)?;
        let subject: String = ctx.get(1)?;
        let escape: String = ctx.get(2)?;
        let escape_char = escape.chars().next().filter(|_| escape.chars().count() == 1);
        if escape_char.is_none() {
            return Err(rusqlite::Error::UserFunctionError(Box::new(
                CoreError::ClientMalformed(
                    "ESCAPE expression must be a single character".to_string(),
                ),
            )));
        }
        like_match(&pattern, &subject, escape_char)
            .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn opens_and_seeds_builtin_playlists() {
        let store = Store::open_in_memory().unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM playlists", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn seeds_builtin_directories() {
        let store = Store::open_in_memory().unwrap();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM directories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn records_schema_version_on_first_open() {
        let store = Store::open_in_memory().unwrap();
        let version = store.read_version().unwrap().unwrap();
        assert_eq!(version.major, schema::SCHEMA_VERSION_MAJOR);
        assert_eq!(version.minor, schema::SCHEMA_VERSION_MINOR);
    }

    #[test]
    fn like_function_is_registered_and_fold_aware() {
        let store = Store::open_in_memory().unwrap();
        let matched: bool = store
            .connection()
            .query_row("SELECT like('o', 'Ö')", [], |r| r.get(0))
            .unwrap();
        assert!(matched);
    }

    #[test]
    fn daap_collation_sorts_digits_last() {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE t (v TEXT COLLATE DAAP);
                 INSERT INTO t VALUES ('9'), ('Zebra'), ('apple');",
            )
            .unwrap();
        let rows: Vec<String> = store
            .connection()
            .prepare("SELECT v FROM t ORDER BY v COLLATE DAAP")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rows, vec!["apple", "Zebra", "9"]);
    }
}
