//! The browse/enumerate engine: turns a [`QueryDescriptor`] into a bound
//! SQL statement against the `files`/`playlists`/`groups` tables and walks
//! the result row by row. Field tables are ported from
//! `original_source/src/plugins/rsp.c`'s `rsp_fields[]`/`rsp_playlist_fields[]`
//! `FIELDSPEC` arrays, trimmed to the columns [`crate::model::MediaItem`]
//! and [`crate::model::Playlist`] actually carry.

use rusqlite::Connection;

use crate::error::{CoreError, Result};
use crate::query_compiler::CompiledPredicate;

/// "No upper limit in practice" — see spec's open-question resolution.
pub const DEFAULT_INDEX_HIGH: u32 = 999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Items,
    Playlists,
    PlaylistItems,
    BrowseArtists,
    BrowseAlbums,
    BrowseGenres,
    BrowseComposers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    #[default]
    None,
    First,
    Last,
    Sub,
}

/// Field-projection flags, ported verbatim from `rsp.c`'s `F_FULL`/`F_BROWSE`/`F_ID`.
pub mod projection {
    pub const FULL: u8 = 1;
    pub const BROWSE: u8 = 2;
    pub const ID: u8 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub flags: u8,
    pub kind: FieldKind,
}

/// Ported from `rsp_fields[]`. Columns the original carried that this
/// implementation's model dropped (`orchestra`, `conductor`, `url`,
/// `force_update`, `idx`) have no entry here — see DESIGN.md.
pub const ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "id", flags: projection::FULL | projection::BROWSE | projection::ID, kind: FieldKind::Int },
    FieldSpec { name: "path", flags: 0, kind: FieldKind::Str },
    FieldSpec { name: "fname", flags: 0, kind: FieldKind::Str },
    FieldSpec { name: "title", flags: projection::FULL | projection::BROWSE | projection::ID, kind: FieldKind::Str },
    FieldSpec { name: "artist", flags: projection::FULL | projection::ID, kind: FieldKind::Str },
    FieldSpec { name: "album", flags: projection::FULL | projection::ID, kind: FieldKind::Str },
    FieldSpec { name: "genre", flags: projection::FULL, kind: FieldKind::Str },
    FieldSpec { name: "comment", flags: 0, kind: FieldKind::Str },
    FieldSpec { name: "composer", flags: projection::FULL, kind: FieldKind::Str },
    FieldSpec { name: "grouping", flags: 0, kind: FieldKind::Str },
    FieldSpec { name: "bitrate", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "samplerate", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "song_length", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "file_size", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "year", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "track", flags: projection::FULL | projection::ID, kind: FieldKind::Int },
    FieldSpec { name: "total_tracks", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "disc", flags: projection::FULL | projection::ID, kind: FieldKind::Int },
    FieldSpec { name: "total_discs", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "bpm", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "compilation", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "rating", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "play_count", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "data_kind", flags: 0, kind: FieldKind::Int },
    FieldSpec { name: "item_kind", flags: 0, kind: FieldKind::Int },
    FieldSpec { name: "description", flags: projection::FULL, kind: FieldKind::Str },
    FieldSpec { name: "time_added", flags: projection::FULL, kind: FieldKind::Date },
    FieldSpec { name: "time_modified", flags: projection::FULL, kind: FieldKind::Date },
    FieldSpec { name: "time_played", flags: projection::FULL, kind: FieldKind::Date },
    FieldSpec { name: "db_timestamp", flags: 0, kind: FieldKind::Date },
    FieldSpec { name: "disabled", flags: projection::FULL, kind: FieldKind::Int },
    FieldSpec { name: "sample_count", flags: 0, kind: FieldKind::Int },
    FieldSpec { name: "codectype", flags: projection::FULL | projection::ID, kind: FieldKind::Str },
    FieldSpec { name: "has_video", flags: 0, kind: FieldKind::Int },
    FieldSpec { name: "contentrating", flags: 0, kind: FieldKind::Int },
];

/// Ported from `rsp_playlist_fields[]`.
pub const PLAYLIST_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "id", flags: projection::FULL | projection::BROWSE | projection::ID, kind: FieldKind::Int },
    FieldSpec { name: "title", flags: projection::FULL | projection::BROWSE, kind: FieldKind::Str },
    FieldSpec { name: "type", flags: 0, kind: FieldKind::Int },
    FieldSpec { name: "items", flags: projection::FULL | projection::BROWSE, kind: FieldKind::Int },
    FieldSpec { name: "query", flags: 0, kind: FieldKind::Str },
    FieldSpec { name: "db_timestamp", flags: 0, kind: FieldKind::Date },
    FieldSpec { name: "path", flags: 0, kind: FieldKind::Str },
];

fn fields_for(query_type: QueryType) -> &'static [FieldSpec] {
    match query_type {
        QueryType::Playlists => PLAYLIST_FIELDS,
        _ => ITEM_FIELDS,
    }
}

fn default_order(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Items => "f.title_sort COLLATE DAAP",
        QueryType::Playlists => "p.title COLLATE DAAP",
        QueryType::PlaylistItems => "f.title_sort COLLATE DAAP",
        QueryType::BrowseArtists => "f.album_artist_sort COLLATE DAAP",
        QueryType::BrowseAlbums => "f.album_sort COLLATE DAAP",
        QueryType::BrowseGenres => "f.genre COLLATE DAAP",
        QueryType::BrowseComposers => "f.composer_sort COLLATE DAAP",
    }
}

fn from_clause(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Items | QueryType::BrowseArtists | QueryType::BrowseAlbums | QueryType::BrowseGenres
        | QueryType::BrowseComposers => "files f",
        QueryType::Playlists => "playlists p",
        QueryType::PlaylistItems => "files f JOIN playlistitems pi ON pi.filepath = f.path",
    }
}

/// Distinct browse queries project one text column per row rather than the
/// full field table.
fn browse_column(query_type: QueryType) -> Option<&'static str> {
    match query_type {
        QueryType::BrowseArtists => Some("f.album_artist"),
        QueryType::BrowseAlbums => Some("f.album"),
        QueryType::BrowseGenres => Some("f.genre"),
        QueryType::BrowseComposers => Some("f.composer"),
        _ => None,
    }
}

/// Every `files`-backed query type reports disabled items nowhere (spec
/// §8: "selecting items of playlist 1 returns every non-disabled item").
/// ANDed with any compiled predicate, never overridable by it — a client
/// predicate narrows the result, it never reaches back into disabled rows.
fn base_filter(query_type: QueryType) -> Option<&'static str> {
    match query_type {
        QueryType::Items
        | QueryType::PlaylistItems
        | QueryType::BrowseArtists
        | QueryType::BrowseAlbums
        | QueryType::BrowseGenres
        | QueryType::BrowseComposers => Some("f.disabled = 0"),
        QueryType::Playlists => None,
    }
}

#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub query_type: QueryType,
    pub index_type: IndexType,
    pub index_low: u32,
    pub index_high: u32,
    pub playlist_id: Option<i64>,
    pub session_id: Option<i64>,
    pub want_count: bool,
    pub projection: u8,
    pub zero_length: bool,
    pub query_order_override: Option<String>,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        QueryDescriptor {
            query_type: QueryType::Items,
            index_type: IndexType::None,
            index_low: 0,
            index_high: DEFAULT_INDEX_HIGH,
            playlist_id: None,
            session_id: None,
            want_count: false,
            projection: projection::FULL,
            zero_length: false,
            query_order_override: None,
        }
    }
}

/// One projected row: `(field name, text value)` pairs in field-table order.
pub type Row = Vec<(&'static str, String)>;

pub struct QueryCursor {
    fields: &'static [FieldSpec],
    projection: u8,
    zero_length: bool,
    rows: Vec<Vec<Option<String>>>,
    next: usize,
    pub total: u64,
    pub specified_total: Option<u64>,
}

/// `enum_start`: prepares and runs the statement (plus a paired `COUNT(*)`
/// when `qd.want_count`), returning a cursor ready for `enum_fetch_row`.
pub fn enum_start(
    conn: &Connection,
    qd: &QueryDescriptor,
    predicate: Option<&CompiledPredicate>,
) -> Result<QueryCursor> {
    let fields = fields_for(qd.query_type);
    let from = from_clause(qd.query_type);
    let order = qd.query_order_override.as_deref().unwrap_or_else(|| default_order(qd.query_type));

    let combined_where = match (base_filter(qd.query_type), predicate.map(|p| p.sql.as_str())) {
        (Some(base), Some(pred)) => Some(format!("{base} AND ({pred})")),
        (Some(base), None) => Some(base.to_string()),
        (None, Some(pred)) => Some(pred.to_string()),
        (None, None) => None,
    };
    let where_sql = combined_where.as_deref().map(|w| format!("WHERE {w}")).unwrap_or_default();

    let (select_list, distinct) = match browse_column(qd.query_type) {
        Some(col) => (col.to_string(), true),
        None => {
            let cols: Vec<String> = fields.iter().map(|f| format!("{} AS {}", sql_column(qd.query_type, f.name), f.name)).collect();
            (cols.join(", "), false)
        }
    };

    let distinct_kw = if distinct { "DISTINCT " } else { "" };

    let mut total: u64 = 0;
    if qd.want_count {
        let count_sql = if distinct {
            format!("SELECT COUNT(DISTINCT {select_list}) FROM {from} {where_sql}")
        } else {
            format!("SELECT COUNT(*) FROM {from} {where_sql}")
        };
        total = count_rows(conn, &count_sql, predicate)?;
    }

    let (limit_sql, low, high) = match qd.index_type {
        IndexType::None => (String::new(), 0u32, u32::MAX),
        IndexType::First => ("LIMIT 1".to_string(), 0, 1),
        IndexType::Last => ("LIMIT 1".to_string(), 0, 1),
        IndexType::Sub => (String::new(), qd.index_low, qd.index_high),
    };

    let sql = format!("SELECT {distinct_kw}{select_list} FROM {from} {where_sql} ORDER BY {order} {limit_sql}");

    let mut stmt = conn.prepare(&sql).map_err(CoreError::from)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = predicate.map(|p| p.params.iter().map(|v| v as &dyn rusqlite::ToSql).collect()).unwrap_or_default();

    let col_count = if distinct { 1 } else { fields.len() };
    let mut all_rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut rows = stmt.query(param_refs.as_slice()).map_err(CoreError::from)?;
    while let Some(row) = rows.next().map_err(CoreError::from)? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let v = row.get_ref(i).map_err(CoreError::from)?;
            values.push(value_ref_to_text(v));
        }
        all_rows.push(values);
    }
    drop(rows);

    if matches!(qd.index_type, IndexType::Sub) {
        let start = low as usize;
        let end = (high as usize).min(all_rows.len());
        all_rows = if start >= all_rows.len() { Vec::new() } else { all_rows[start..end.max(start)].to_vec() };
    }

    let specified_total = if qd.want_count { Some(total) } else { None };

    Ok(QueryCursor {
        fields: if distinct { &[] } else { fields },
        projection: qd.projection,
        zero_length: qd.zero_length,
        rows: all_rows,
        next: 0,
        total: specified_total.unwrap_or(0),
        specified_total,
    })
}

fn value_ref_to_text(v: rusqlite::types::ValueRef<'_>) -> Option<String> {
    use rusqlite::types::ValueRef;
    match v {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => None,
    }
}

fn count_rows(conn: &Connection, sql: &str, predicate: Option<&CompiledPredicate>) -> Result<u64> {
    let mut stmt = conn.prepare(sql).map_err(CoreError::from)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = predicate.map(|p| p.params.iter().map(|v| v as &dyn rusqlite::ToSql).collect()).unwrap_or_default();
    let n: i64 = stmt.query_row(param_refs.as_slice(), |r| r.get(0)).map_err(CoreError::from)?;
    Ok(n as u64)
}

/// Maps a field name to the SQL expression that produces its projected
/// value for the given query type (browse distinct-column queries never
/// reach this — they're handled separately).
fn sql_column(_query_type: QueryType, name: &str) -> String {
    match name {
        "type" => "p.type".to_string(),
        "items" => "(SELECT COUNT(*) FROM playlistitems WHERE playlistid = p.id)".to_string(),
        "query" => "p.query".to_string(),
        "db_timestamp" if _query_type == QueryType::Playlists => "p.db_timestamp".to_string(),
        "path" if _query_type == QueryType::Playlists => "p.virtual_path".to_string(),
        "title" if _query_type == QueryType::Playlists => "p.title".to_string(),
        "id" if _query_type == QueryType::Playlists => "p.id".to_string(),
        other => format!("f.{other}"),
    }
}

impl QueryCursor {
    /// `enum_fetch_row`: returns the next projected row, or `None` at end.
    pub fn fetch_row(&mut self) -> Option<Row> {
        let raw = self.rows.get(self.next)?.clone();
        self.next += 1;

        if self.fields.is_empty() {
            let value = raw.into_iter().next().flatten().unwrap_or_default();
            return Some(vec![("value", value)]);
        }

        let mut out = Vec::new();
        for (field, value) in self.fields.iter().zip(raw) {
            if field.flags & self.projection == 0 {
                continue;
            }
            let text = value.unwrap_or_default();
            if text.is_empty() && !self.zero_length {
                continue;
            }
            out.push((field.name, text));
        }
        Some(out)
    }

    /// `enum_end`: no explicit teardown is needed once rows are
    /// materialized, but kept as an explicit call site so callers don't
    /// need to know that.
    pub fn end(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn seed(conn: &Connection) {
        conn.execute(
            "INSERT INTO files (id, path, virtual_path, fname, title, artist, album, album_artist, media_kind, title_sort, album_sort, album_artist_sort)
             VALUES (1, '/m/a.mp3', '/a.mp3', 'a.mp3', 'Alpha', 'Artist A', 'Album A', 'Artist A', 1, 'alpha', 'album a', 'artist a'),
                    (2, '/m/b.mp3', '/b.mp3', 'b.mp3', 'Beta', 'Artist B', 'Album B', 'Artist B', 1, 'beta', 'album b', 'artist b')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn enumerates_items_with_full_projection() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        let qd = QueryDescriptor { query_type: QueryType::Items, want_count: true, ..Default::default() };
        let mut cursor = enum_start(store.connection(), &qd, None).unwrap();
        assert_eq!(cursor.specified_total, Some(2));
        let first = cursor.fetch_row().unwrap();
        assert!(first.iter().any(|(k, v)| *k == "title" && v == "Alpha"));
        assert!(cursor.fetch_row().is_some());
        assert!(cursor.fetch_row().is_none());
    }

    #[test]
    fn id_projection_omits_non_id_fields() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        let qd = QueryDescriptor { query_type: QueryType::Items, projection: projection::ID, ..Default::default() };
        let mut cursor = enum_start(store.connection(), &qd, None).unwrap();
        let row = cursor.fetch_row().unwrap();
        assert!(row.iter().all(|(k, _)| ITEM_FIELDS.iter().any(|f| f.name == *k && f.flags & projection::ID != 0)));
    }

    #[test]
    fn sub_range_respects_index_low_high() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        let qd = QueryDescriptor {
            query_type: QueryType::Items,
            index_type: IndexType::Sub,
            index_low: 1,
            index_high: 2,
            want_count: true,
            ..Default::default()
        };
        let mut cursor = enum_start(store.connection(), &qd, None).unwrap();
        assert_eq!(cursor.specified_total, Some(2));
        let row = cursor.fetch_row().unwrap();
        assert!(row.iter().any(|(k, v)| *k == "title" && v == "Beta"));
        assert!(cursor.fetch_row().is_none());
    }

    #[test]
    fn index_low_past_total_yields_empty_result_but_reports_total() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        let qd = QueryDescriptor {
            query_type: QueryType::Items,
            index_type: IndexType::Sub,
            index_low: 50,
            index_high: 60,
            want_count: true,
            ..Default::default()
        };
        let mut cursor = enum_start(store.connection(), &qd, None).unwrap();
        assert_eq!(cursor.specified_total, Some(2));
        assert!(cursor.fetch_row().is_none());
    }

    #[test]
    fn browse_artists_returns_distinct_values() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        conn_insert_third_with_same_artist(store.connection());
        let qd = QueryDescriptor { query_type: QueryType::BrowseArtists, ..Default::default() };
        let mut cursor = enum_start(store.connection(), &qd, None).unwrap();
        let mut values = Vec::new();
        while let Some(row) = cursor.fetch_row() {
            values.push(row[0].1.clone());
        }
        assert_eq!(values.len(), 2);
    }

    fn conn_insert_third_with_same_artist(conn: &Connection) {
        conn.execute(
            "INSERT INTO files (id, path, virtual_path, fname, title, artist, album, album_artist, media_kind, title_sort, album_sort, album_artist_sort)
             VALUES (3, '/m/c.mp3', '/c.mp3', 'c.mp3', 'Gamma', 'Artist A', 'Album A', 'Artist A', 1, 'gamma', 'album a', 'artist a')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn predicate_filters_items() {
        let store = Store::open_in_memory().unwrap();
        seed(store.connection());
        let predicate = crate::query_compiler::compile("title == \"Alpha\"").unwrap();
        let qd = QueryDescriptor { query_type: QueryType::Items, want_count: true, ..Default::default() };
        let mut cursor = enum_start(store.connection(), &qd, Some(&predicate)).unwrap();
        assert_eq!(cursor.specified_total, Some(1));
        let row = cursor.fetch_row().unwrap();
        assert!(row.iter().any(|(k, v)| *k == "title" && v == "Alpha"));
        assert!(cursor.fetch_row().is_none());
    }
}
