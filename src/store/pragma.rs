//! PRAGMA defaults and application, grounded in
//! `original_source/src/artwork_cache.c`'s `artworkcache_perthread_init`
//! (the same four knobs apply to the main catalog handle).

use rusqlite::Connection;

use crate::config::PragmaConfig;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct Pragmas {
    pub page_size: u32,
    pub cache_size: i32,
    pub journal_mode: &'static str,
    pub synchronous: u8,
}

/// The catalog's own defaults differ from the artwork cache's (which turns
/// the journal off entirely, see [`crate::artwork`]): the catalog is
/// write-heavy from a single scanner thread but read-heavy from many
/// workers, so WAL is worth the extra file.
pub const CATALOG_DEFAULTS: Pragmas = Pragmas {
    page_size: 4096,
    cache_size: 5000,
    journal_mode: "WAL",
    synchronous: 1,
};

pub const ARTWORK_DEFAULTS: Pragmas = Pragmas {
    page_size: 4096,
    cache_size: 5000,
    journal_mode: "OFF",
    synchronous: 0,
};

pub fn apply(conn: &Connection, defaults: Pragmas, overrides: &PragmaConfig) -> Result<()> {
    let page_size = overrides.page_size.unwrap_or(defaults.page_size);
    let cache_size = overrides.cache_size.unwrap_or(defaults.cache_size);
    let journal_mode = overrides
        .journal_mode
        .as_deref()
        .unwrap_or(defaults.journal_mode);
    let synchronous = overrides.synchronous.unwrap_or(defaults.synchronous);

    conn.pragma_update(None, "page_size", page_size)?;
    conn.pragma_update(None, "cache_size", cache_size)?;
    conn.pragma_update(None, "journal_mode", journal_mode)?;
    conn.pragma_update(None, "synchronous", synchronous)?;
    Ok(())
}
