//! The artwork cache: a companion SQLite file keyed by
//! `(persistentid, max_w, max_h)`, ground in
//! `original_source/src/artwork_cache.c`. `format == 0` is a sticky "known
//! to have no artwork" marker, not a missing row.

use camino::Utf8Path;
use jiff::Timestamp;
use rusqlite::OptionalExtension;

use crate::error::{CoreError, Result};
use crate::model::ArtworkFormat;
use crate::store::pragma;
use crate::store::retry;

pub const CACHE_VERSION: u32 = 1;

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS admin_artwork (
        key   VARCHAR(32) NOT NULL,
        value VARCHAR(32) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS artwork (
        id             INTEGER PRIMARY KEY NOT NULL,
        persistentid   INTEGER NOT NULL,
        max_w          INTEGER NOT NULL,
        max_h          INTEGER NOT NULL,
        format         INTEGER NOT NULL,
        filepath       VARCHAR(4096) NOT NULL,
        db_timestamp   INTEGER DEFAULT 0,
        data           BLOB
    )",
];

const INDICES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_persistentidwh ON artwork(persistentid, max_w, max_h)",
    "CREATE INDEX IF NOT EXISTS idx_pathtime ON artwork(filepath, db_timestamp)",
];

/// The result of [`ArtworkCache::lookup`].
pub struct Lookup {
    pub cached: bool,
    pub format: ArtworkFormat,
    pub data: Vec<u8>,
}

/// A worker's private artwork-cache handle, mirroring
/// `artworkcache_perthread_init`/`_deinit`.
pub struct ArtworkCache {
    conn: rusqlite::Connection,
}

impl ArtworkCache {
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path.as_std_path())?;
        pragma::apply(&conn, pragma::ARTWORK_DEFAULTS, &Default::default())?;
        let cache = ArtworkCache { conn };
        cache.ensure_schema()?;
        Ok(cache)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        pragma::apply(&conn, pragma::ARTWORK_DEFAULTS, &Default::default())?;
        let cache = ArtworkCache { conn };
        cache.ensure_schema()?;
        Ok(cache)
    }

    fn ensure_schema(&self) -> Result<()> {
        retry::exec(&self.conn, "CREATE TABLE IF NOT EXISTS admin_artwork (key VARCHAR(32) NOT NULL, value VARCHAR(32) NOT NULL)")?;

        if self.read_version()?.is_some_and(|v| v != CACHE_VERSION) {
            retry::exec(&self.conn, "DROP INDEX IF EXISTS idx_persistentidwh")?;
            retry::exec(&self.conn, "DROP INDEX IF EXISTS idx_pathtime")?;
            retry::exec(&self.conn, "DROP TABLE IF EXISTS artwork")?;
            retry::exec(&self.conn, "DROP TABLE IF EXISTS admin_artwork")?;
            self.conn.execute_batch("VACUUM").map_err(CoreError::from)?;
            retry::exec(&self.conn, "CREATE TABLE IF NOT EXISTS admin_artwork (key VARCHAR(32) NOT NULL, value VARCHAR(32) NOT NULL)")?;
        }

        for table in TABLES {
            retry::exec(&self.conn, table)?;
        }
        for index in INDICES {
            retry::exec(&self.conn, index)?;
        }
        if self.read_version()?.is_none() {
            retry::exec(
                &self.conn,
                &format!("INSERT INTO admin_artwork (key, value) VALUES ('cache_version', '{CACHE_VERSION}')"),
            )?;
        }
        Ok(())
    }

    fn read_version(&self) -> Result<Option<u32>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM admin_artwork WHERE key = 'cache_version'",
                [],
                |r| r.get(0),
            )
            .optional()
            .map_err(CoreError::from)?;
        raw.map(|v| {
            v.parse()
                .map_err(|_| CoreError::Integrity("cache_version is not numeric".to_string()))
        })
        .transpose()
    }

    /// `artworkcache_get`.
    pub fn lookup(&self, persistent_id: i64, max_w: u32, max_h: u32) -> Result<Lookup> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT format, data FROM artwork WHERE persistentid = ?1 AND max_w = ?2 AND max_h = ?3",
                (persistent_id, max_w, max_h),
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()
            .map_err(CoreError::from)?;

        match row {
            None => Ok(Lookup { cached: false, format: ArtworkFormat::None, data: Vec::new() }),
            Some((format, data)) => Ok(Lookup {
                cached: true,
                format: ArtworkFormat::from_repr(format).unwrap_or(ArtworkFormat::None),
                data,
            }),
        }
    }

    /// `artworkcache_add`. `format == 0` with empty `data`/`source_path`
    /// records a sticky "no artwork" entry.
    pub fn insert(
        &self,
        persistent_id: i64,
        max_w: u32,
        max_h: u32,
        format: ArtworkFormat,
        source_path: &str,
        data: &[u8],
    ) -> Result<()> {
        retry::with_retry(|| {
            self.conn.execute(
                "INSERT INTO artwork (id, persistentid, max_w, max_h, format, filepath, db_timestamp, data)
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    persistent_id,
                    max_w,
                    max_h,
                    format as i64,
                    source_path,
                    now_unix(),
                    data,
                ],
            )
        })?;
        Ok(())
    }

    /// `artworkcache_ping`: "I saw this file" (`del == false`) bumps
    /// `db_timestamp` for entries not yet invalidated by a newer mtime;
    /// "I saw this file and it changed" (`del == true`) additionally drops
    /// the now-stale entries.
    pub fn ping(&self, source_path: &str, mtime: i64, del: bool) -> Result<()> {
        retry::with_retry(|| {
            self.conn.execute(
                "UPDATE artwork SET db_timestamp = ?1 WHERE filepath = ?2 AND db_timestamp >= ?3",
                rusqlite::params![now_unix(), source_path, mtime],
            )
        })?;

        if del {
            retry::with_retry(|| {
                self.conn.execute(
                    "DELETE FROM artwork WHERE filepath = ?1 AND db_timestamp < ?2",
                    rusqlite::params![source_path, mtime],
                )
            })?;
        }
        Ok(())
    }

    /// `artworkcache_delete_by_path`.
    pub fn delete_by_path(&self, source_path: &str) -> Result<()> {
        retry::with_retry(|| {
            self.conn.execute("DELETE FROM artwork WHERE filepath = ?1", [source_path])
        })?;
        Ok(())
    }

    /// `artworkcache_purge_cruft`.
    pub fn purge_older_than(&self, reference: Timestamp) -> Result<usize> {
        retry::with_retry(|| {
            self.conn
                .execute("DELETE FROM artwork WHERE db_timestamp < ?1", [reference.as_second()])
        })
    }
}

fn now_unix() -> i64 {
    Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_misses_when_no_row() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        let found = cache.lookup(1, 100, 100).unwrap();
        assert!(!found.cached);
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(1, 100, 100, ArtworkFormat::Png, "/art/cover.png", b"fakepng").unwrap();
        let found = cache.lookup(1, 100, 100).unwrap();
        assert!(found.cached);
        assert_eq!(found.format, ArtworkFormat::Png);
        assert_eq!(found.data, b"fakepng");
    }

    #[test]
    fn format_zero_is_a_sticky_no_artwork_marker() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(2, 100, 100, ArtworkFormat::None, "", b"").unwrap();
        let found = cache.lookup(2, 100, 100).unwrap();
        assert!(found.cached);
        assert_eq!(found.format, ArtworkFormat::None);
    }

    #[test]
    fn multiple_scales_per_persistentid_coexist() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(3, 100, 100, ArtworkFormat::Jpeg, "/a.jpg", b"small").unwrap();
        cache.insert(3, 600, 600, ArtworkFormat::Jpeg, "/a.jpg", b"large").unwrap();
        assert_eq!(cache.lookup(3, 100, 100).unwrap().data, b"small");
        assert_eq!(cache.lookup(3, 600, 600).unwrap().data, b"large");
    }

    #[test]
    fn ping_without_delete_only_bumps_unmodified_entries() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(4, 100, 100, ArtworkFormat::Png, "/a.png", b"x").unwrap();
        cache.conn.execute("UPDATE artwork SET db_timestamp = 1000", []).unwrap();
        cache.ping("/a.png", 2000, false).unwrap();
        let ts: i64 = cache
            .conn
            .query_row("SELECT db_timestamp FROM artwork WHERE persistentid = 4", [], |r| r.get(0))
            .unwrap();
        assert_eq!(ts, 1000, "mtime 2000 is newer than the cached 1000, so ping must not refresh it");
    }

    #[test]
    fn ping_with_delete_drops_stale_entries() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(5, 100, 100, ArtworkFormat::Png, "/a.png", b"x").unwrap();
        cache.conn.execute("UPDATE artwork SET db_timestamp = 1000", []).unwrap();
        cache.ping("/a.png", 2000, true).unwrap();
        let found = cache.lookup(5, 100, 100).unwrap();
        assert!(!found.cached);
    }

    #[test]
    fn purge_older_than_removes_abandoned_entries() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(6, 100, 100, ArtworkFormat::Png, "/a.png", b"x").unwrap();
        cache.conn.execute("UPDATE artwork SET db_timestamp = 1", []).unwrap();
        let purged = cache.purge_older_than(Timestamp::now()).unwrap();
        assert_eq!(purged, 1);
    }

    #[test]
    fn schema_version_mismatch_drops_and_recreates() {
        let cache = ArtworkCache::open_in_memory().unwrap();
        cache.insert(7, 100, 100, ArtworkFormat::Png, "/a.png", b"x").unwrap();
        cache
            .conn
            .execute("UPDATE admin_artwork SET value = '999' WHERE key = 'cache_version'", [])
            .unwrap();
        cache.ensure_schema().unwrap();
        assert_eq!(cache.read_version().unwrap(), Some(CACHE_VERSION));
        assert!(!cache.lookup(7, 100, 100).unwrap().cached);
    }
}
