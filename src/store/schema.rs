//! Catalog DDL, seed data, and the schema-version gate. Ported from
//! `original_source/src/db_init.c`'s table/index/trigger/seed lists.

/// Bumped on any catalog schema change this implementation makes; tracked
/// independently from the original source's own version numbering.
pub const SCHEMA_VERSION_MAJOR: u32 = 1;
pub const SCHEMA_VERSION_MINOR: u32 = 0;

pub const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS admin (
        key   VARCHAR(32) PRIMARY KEY NOT NULL,
        value VARCHAR(255) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS files (
        id                 INTEGER PRIMARY KEY NOT NULL,
        path               VARCHAR(4096) NOT NULL,
        virtual_path       VARCHAR(4096) DEFAULT NULL,
        fname              VARCHAR(255) NOT NULL,
        directory_id       INTEGER DEFAULT 0,
        title              VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        artist             VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        album              VARCHAR(1024) NOT NULL COLLATE DAAP,
        album_artist       VARCHAR(1024) NOT NULL COLLATE DAAP,
        genre              VARCHAR(255) DEFAULT NULL COLLATE DAAP,
        comment            VARCHAR(4096) DEFAULT NULL COLLATE DAAP,
        composer           VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        grouping           VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        bitrate            INTEGER DEFAULT 0,
        samplerate         INTEGER DEFAULT 0,
        channels           INTEGER DEFAULT 0,
        bits_per_sample    INTEGER DEFAULT 0,
        song_length        INTEGER DEFAULT 0,
        file_size          INTEGER DEFAULT 0,
        sample_count       INTEGER DEFAULT 0,
        codectype          VARCHAR(5) DEFAULT NULL,
        year               INTEGER DEFAULT 0,
        date_released      INTEGER DEFAULT 0,
        track              INTEGER DEFAULT 0,
        total_tracks       INTEGER DEFAULT 0,
        disc               INTEGER DEFAULT 0,
        total_discs        INTEGER DEFAULT 0,
        bpm                INTEGER DEFAULT 0,
        compilation        INTEGER DEFAULT 0,
        rating             INTEGER DEFAULT 0,
        play_count         INTEGER DEFAULT 0,
        skip_count         INTEGER DEFAULT 0,
        seek               INTEGER DEFAULT 0,
        data_kind          INTEGER DEFAULT 0,
        media_kind         INTEGER DEFAULT 0,
        item_kind          INTEGER DEFAULT 0,
        description        VARCHAR(1024) DEFAULT NULL,
        db_timestamp       INTEGER DEFAULT 0,
        time_added         INTEGER DEFAULT 0,
        time_modified      INTEGER DEFAULT 0,
        time_played        INTEGER DEFAULT 0,
        time_skipped       INTEGER DEFAULT 0,
        disabled           INTEGER DEFAULT 0,
        has_video          INTEGER DEFAULT 0,
        contentrating      INTEGER DEFAULT 0,
        tv_series_name     VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        tv_episode_num_str VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        tv_network_name    VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        tv_episode_sort    INTEGER NOT NULL DEFAULT 0,
        tv_season_num      INTEGER NOT NULL DEFAULT 0,
        songartistid       INTEGER DEFAULT 0,
        songalbumid        INTEGER DEFAULT 0,
        title_sort         VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        artist_sort        VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        album_sort         VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        album_artist_sort  VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        composer_sort      VARCHAR(1024) DEFAULT NULL COLLATE DAAP,
        usermark           INTEGER DEFAULT 0,
        scan_kind          INTEGER DEFAULT 0,
        lyrics             TEXT DEFAULT NULL COLLATE DAAP
    )",
    "CREATE TABLE IF NOT EXISTS playlists (
        id             INTEGER PRIMARY KEY NOT NULL,
        title          VARCHAR(255) NOT NULL COLLATE DAAP,
        type           INTEGER NOT NULL,
        query          VARCHAR(1024),
        query_order    VARCHAR(1024),
        query_limit    INTEGER DEFAULT 0,
        db_timestamp   INTEGER NOT NULL,
        disabled       INTEGER DEFAULT 0,
        virtual_path   VARCHAR(4096),
        parent_id      INTEGER DEFAULT 0,
        directory_id   INTEGER DEFAULT 0,
        media_kind     INTEGER DEFAULT 1,
        artwork_url    VARCHAR(4096) DEFAULT NULL,
        scan_kind      INTEGER DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS playlistitems (
        id             INTEGER PRIMARY KEY NOT NULL,
        playlistid     INTEGER NOT NULL,
        filepath       VARCHAR(4096) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS groups (
        id             INTEGER PRIMARY KEY NOT NULL,
        type           INTEGER NOT NULL,
        name           VARCHAR(1024) NOT NULL COLLATE DAAP,
        persistentid   INTEGER NOT NULL,
        CONSTRAINT groups_type_unique_persistentid UNIQUE (type, persistentid)
    )",
    "CREATE TABLE IF NOT EXISTS directories (
        id                  INTEGER PRIMARY KEY NOT NULL,
        virtual_path        VARCHAR(4096) NOT NULL,
        db_timestamp        INTEGER DEFAULT 0,
        disabled            INTEGER DEFAULT 0,
        parent_id           INTEGER DEFAULT 0,
        path                VARCHAR(4096) DEFAULT NULL,
        scan_kind           INTEGER DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS queue (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        file_id             INTEGER NOT NULL,
        pos                 INTEGER NOT NULL,
        shuffle_pos         INTEGER NOT NULL,
        queue_version       INTEGER DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS files_metadata (
        file_id            INTEGER NOT NULL,
        songalbumid        INTEGER NOT NULL,
        songartistid       INTEGER NOT NULL,
        metadata_kind      INTEGER NOT NULL,
        idx                INTEGER DEFAULT 0,
        value              TEXT NOT NULL COLLATE DAAP
    )",
];

/// Index list, see spec §4.4. Prefixed `idx_` as in the original, kept for
/// parity even though this implementation has no index-drop migration path.
pub const INDICES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_rescan ON files(path, db_timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_sari ON files(songartistid)",
    "CREATE INDEX IF NOT EXISTS idx_sali ON files(songalbumid, disabled, media_kind, album_sort, disc, track)",
    "CREATE INDEX IF NOT EXISTS idx_state_mkind_sari ON files(disabled, media_kind, songartistid)",
    "CREATE INDEX IF NOT EXISTS idx_state_mkind_sali ON files(disabled, media_kind, songalbumid)",
    "CREATE INDEX IF NOT EXISTS idx_album ON files(disabled, album_sort, album, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_albumartist ON files(disabled, album_artist_sort, album_artist, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_composer ON files(disabled, composer_sort, composer, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_genre ON files(disabled, genre, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_title ON files(disabled, title_sort, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_filelist ON files(disabled, virtual_path, time_modified)",
    "CREATE INDEX IF NOT EXISTS idx_file_dir ON files(disabled, directory_id)",
    "CREATE INDEX IF NOT EXISTS idx_date_released ON files(disabled, date_released DESC, media_kind)",
    "CREATE INDEX IF NOT EXISTS idx_pl_disabled ON playlists(disabled, type, virtual_path, db_timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_filepath ON playlistitems(filepath ASC)",
    "CREATE INDEX IF NOT EXISTS idx_playlistid ON playlistitems(playlistid, filepath)",
    "CREATE INDEX IF NOT EXISTS idx_grp_persist ON groups(persistentid)",
    "CREATE INDEX IF NOT EXISTS idx_dir_vpath ON directories(disabled, virtual_path)",
    "CREATE INDEX IF NOT EXISTS idx_dir_parentid ON directories(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_queue_pos ON queue(pos)",
    "CREATE INDEX IF NOT EXISTS idx_queue_shufflepos ON queue(shuffle_pos)",
    "CREATE INDEX IF NOT EXISTS idx_filesmd_fileid_type_idx ON files_metadata(file_id, metadata_kind, idx)",
    "CREATE INDEX IF NOT EXISTS idx_filesmd_albumid_type_idx ON files_metadata(songalbumid, metadata_kind, idx)",
    "CREATE INDEX IF NOT EXISTS idx_filesmd_artistid_type_idx ON files_metadata(songartistid, metadata_kind, idx)",
];

pub const TRIGGERS: &[&str] = &[
    "CREATE TRIGGER IF NOT EXISTS trg_groups_insert AFTER INSERT ON files FOR EACH ROW
     BEGIN
        INSERT OR IGNORE INTO groups (type, name, persistentid) VALUES (1, NEW.album, NEW.songalbumid);
        INSERT OR IGNORE INTO groups (type, name, persistentid) VALUES (2, NEW.album_artist, NEW.songartistid);
     END",
    "CREATE TRIGGER IF NOT EXISTS trg_groups_update AFTER UPDATE OF songartistid, songalbumid ON files FOR EACH ROW
     BEGIN
        INSERT OR IGNORE INTO groups (type, name, persistentid) VALUES (1, NEW.album, NEW.songalbumid);
        INSERT OR IGNORE INTO groups (type, name, persistentid) VALUES (2, NEW.album_artist, NEW.songartistid);
     END",
];

/// The six built-in playlists, fixed ids 1-6, per spec §3. `query` is the
/// predicate text `query_compiler::compile` parses — it must stay in that
/// grammar (bare column names, `==`, no `f.` qualification), not raw SQL.
/// Playlist 1 (Library) has no query at all: a NULL `query` means "every
/// item", which is what "every non-disabled item" (spec §8) requires once
/// the browse engine's own `disabled = 0` filter is applied.
pub const BUILTIN_PLAYLISTS: &[&str] = &[
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (1, 'Library', 0, NULL, 0, '')",
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (2, 'Music', 0, 'media_kind == 1', 0, '')",
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (3, 'Movies', 0, 'media_kind == 2', 0, '')",
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (4, 'TV Shows', 0, 'media_kind == 64', 0, '')",
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (5, 'Podcasts', 0, 'media_kind == 4', 0, '')",
    "INSERT OR IGNORE INTO playlists (id, title, type, query, db_timestamp, virtual_path)
     VALUES (6, 'Audiobooks', 0, 'media_kind == 8', 0, '')",
];

/// The four fixed directories: root, and one child per scan-kind family.
pub const BUILTIN_DIRECTORIES: &[&str] = &[
    "INSERT OR IGNORE INTO directories (id, virtual_path, db_timestamp, disabled, parent_id, path)
     VALUES (1, '/', 0, 0, 0, NULL)",
    "INSERT OR IGNORE INTO directories (id, virtual_path, db_timestamp, disabled, parent_id, path)
     VALUES (2, '/file:', 0, 0, 1, '/')",
    "INSERT OR IGNORE INTO directories (id, virtual_path, db_timestamp, disabled, parent_id, path)
     VALUES (3, '/http:', 0, 0, 1, NULL)",
    "INSERT OR IGNORE INTO directories (id, virtual_path, db_timestamp, disabled, parent_id, path)
     VALUES (4, '/spotify:', 0, 0, 1, NULL)",
];
