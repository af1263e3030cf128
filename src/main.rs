#![allow(unused)]
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use color_eyre::{Result, eyre::Context};

use crate::browse::{IndexType, QueryDescriptor, QueryType};
use crate::cli::{Cli, Commands};
use crate::collaborators::{FilesystemScanner, Scanner};
use crate::dispatcher::QueryVars;
use crate::error::CoreError;
use crate::handlers::{Status, rsp_handlers, tlv_handlers};
use crate::model::builtin_directory;
use crate::store::Store;

mod artwork;
mod browse;
mod cli;
mod collation;
mod collaborators;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod model;
mod query_compiler;
mod store;
mod tlv;
mod unicode_fold;

/// Shared state across the tokio worker pool. A single catalog handle
/// guarded by a mutex, the way the teacher guards its single `System`
/// struct — a per-worker-thread handle is out of scope for this wiring
/// layer but the `Store`/`ArtworkCache` types themselves place no
/// restriction on callers who want to give each thread its own.
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Store>>,
    artwork: Arc<Mutex<artwork::ArtworkCache>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().unwrap();
    setup_tracing();

    let options = Cli::parse();
    let config = config::Config::load(&options.config).wrap_err("could not load configuration")?;

    let store = Store::open(config.general.db_path.as_std_path(), &config.general.db_pragma)
        .map_err(|e| color_eyre::eyre::eyre!(e))
        .wrap_err("could not open catalog")?;
    let artwork = artwork::ArtworkCache::open(&config.general.artworkcache_path)
        .map_err(|e| color_eyre::eyre::eyre!(e))
        .wrap_err("could not open artwork cache")?;

    match options.command {
        Commands::Scan => run_scan(&config, &store).wrap_err("scan failed"),
        Commands::Serve => {
            run_scan(&config, &store).wrap_err("initial scan failed")?;
            serve(config, store, artwork).await
        }
    }
}

/// Walks the configured music directory and records path/size/mtime for
/// any file not already in the catalog. Bibliographic fields are left
/// blank — tag extraction is an external collaborator's job.
fn run_scan(config: &config::Config, store: &Store) -> Result<()> {
    let scanner = FilesystemScanner;
    let files = scanner
        .scan_root(&config.general.music_dir)
        .map_err(|e| color_eyre::eyre::eyre!(e))?;

    for file in files {
        let relative = file
            .path
            .strip_prefix(&config.general.music_dir)
            .unwrap_or(&file.path);
        let fname = relative.file_name().unwrap_or("").to_string();
        let virtual_path = format!("/{relative}");

        store
            .connection()
            .execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, file_size, time_added, time_modified)
                 SELECT ?1, ?2, ?3, ?4, '', '', ?5, ?6, ?6
                 WHERE NOT EXISTS (SELECT 1 FROM files WHERE path = ?1)",
                rusqlite::params![
                    file.path.as_str(),
                    virtual_path,
                    fname,
                    builtin_directory::FILE,
                    file.size as i64,
                    file.mtime.as_second(),
                ],
            )
            .map_err(CoreError::from)
            .map_err(|e| color_eyre::eyre::eyre!(e))?;
    }
    Ok(())
}

async fn serve(config: config::Config, store: Store, artwork: artwork::ArtworkCache) -> Result<()> {
    let state = AppState { store: Arc::new(Mutex::new(store)), artwork: Arc::new(Mutex::new(artwork)) };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.library.port))
        .await
        .wrap_err("could not bind listener")?;
    tracing::info!(port = config.library.port, "serving");
    axum::serve(listener, router).await.wrap_err("server loop failed")
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/server-info", get(server_info))
        .route("/content-codes", get(content_codes))
        .route("/login", get(login))
        .route("/update", get(update))
        .route("/databases", get(databases))
        .route("/databases/{id}/items", get(database_items))
        .route("/databases/{id}/items/{itemid}", get(stream_item_db))
        .route("/databases/{id}/containers", get(containers))
        .route("/databases/{id}/containers/{plid}/items", get(container_items))
        .route("/databases/{id}/browse/{field}", get(database_browse))
        .route("/rsp/info", get(rsp_info))
        .route("/rsp/db", get(rsp_db))
        .route("/rsp/db/{plid}", get(rsp_playlist_items))
        .route("/rsp/db/{plid}/{field}", get(rsp_browse))
        .route("/rsp/stream/{itemid}", get(stream_item_rsp))
        .with_state(state)
}

/// `mccr`: the fixed content-codes reply. This core's tag vocabulary never
/// changes at runtime, so there's nothing per-request to compute here.
async fn content_codes() -> impl IntoResponse {
    tlv_response(tlv_handlers::content_codes())
}

/// `mupd`: update responses never actually block on a real change feed
/// here — there's no push-update subsystem behind this core — so the
/// current `queue_version` is reported and the handler returns immediately.
async fn update(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.lock().unwrap();
    let revision: i64 = store
        .connection()
        .query_row("SELECT value FROM admin WHERE key = 'queue_version'", [], |r| r.get::<_, String>(0))
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    tlv_response(tlv_handlers::update(revision))
}

fn query_type_for_field(field: &str) -> Option<QueryType> {
    match field {
        "artist" => Some(QueryType::BrowseArtists),
        "album" => Some(QueryType::BrowseAlbums),
        "genre" => Some(QueryType::BrowseGenres),
        "composer" => Some(QueryType::BrowseComposers),
        _ => None,
    }
}

async fn database_browse(State(state): State<AppState>, Path((_id, field)): Path<(i64, String)>) -> Response {
    let Some(query_type) = query_type_for_field(&field) else {
        return tlv_response(tlv_handlers::item_listing(
            "abro",
            &Status::error(format!("unknown browse field {field}")),
            &[],
        ));
    };
    let qd = QueryDescriptor { query_type, want_count: true, ..Default::default() };
    let store = state.store.lock().unwrap();
    match browse::enum_start(store.connection(), &qd, None) {
        Ok(mut cursor) => {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_row() {
                rows.push(row);
            }
            let status = Status::ok(rows.len() as u64, cursor.specified_total.unwrap_or(0));
            tlv_response(tlv_handlers::item_listing("abro", &status, &rows))
        }
        Err(e) => tlv_response(tlv_handlers::item_listing("abro", &Status::error(e.to_string()), &[])),
    }
}

async fn rsp_browse(State(state): State<AppState>, Path((_plid, field)): Path<(i64, String)>) -> Response {
    let Some(query_type) = query_type_for_field(&field) else {
        return xml_response(rsp_handlers::error_xml(&Status::error(format!("unknown browse field {field}"))));
    };
    let qd = QueryDescriptor { query_type, want_count: true, ..Default::default() };
    let store = state.store.lock().unwrap();
    rows_to_xml(browse::enum_start(store.connection(), &qd, None))
}

async fn containers(State(state): State<AppState>) -> Response {
    let qd = QueryDescriptor { query_type: QueryType::Playlists, want_count: true, ..Default::default() };
    let store = state.store.lock().unwrap();
    match browse::enum_start(store.connection(), &qd, None) {
        Ok(mut cursor) => {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_row() {
                rows.push(row);
            }
            let status = Status::ok(rows.len() as u64, cursor.specified_total.unwrap_or(0));
            tlv_response(tlv_handlers::item_listing("aply", &status, &rows))
        }
        Err(e) => tlv_response(tlv_handlers::item_listing("aply", &Status::error(e.to_string()), &[])),
    }
}

async fn container_items(State(state): State<AppState>, Path((_id, plid)): Path<(i64, i64)>) -> Response {
    let store = state.store.lock().unwrap();
    let predicate = playlist_predicate(&store, plid);
    let predicate = match predicate {
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => return tlv_response(tlv_handlers::item_listing("apso", &Status::error(e.to_string()), &[])),
        None => None,
    };
    let qd = QueryDescriptor { query_type: QueryType::Items, playlist_id: Some(plid), want_count: true, ..Default::default() };
    match browse::enum_start(store.connection(), &qd, predicate.as_ref()) {
        Ok(mut cursor) => {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_row() {
                rows.push(row);
            }
            let status = Status::ok(rows.len() as u64, cursor.specified_total.unwrap_or(0));
            tlv_response(tlv_handlers::item_listing("apso", &status, &rows))
        }
        Err(e) => tlv_response(tlv_handlers::item_listing("apso", &Status::error(e.to_string()), &[])),
    }
}

fn playlist_predicate(store: &Store, plid: i64) -> Option<Result<query_compiler::CompiledPredicate, CoreError>> {
    let query: Option<String> =
        store.connection().query_row("SELECT query FROM playlists WHERE id = ?1", [plid], |r| r.get(0)).ok()?;
    query.map(|q| query_compiler::compile(&q))
}

/// No transcoder/output collaborator is implemented in this core (see
/// `collaborators::Transcoder`) — streaming bytes for an item is out of
/// scope, so the handler reports that plainly instead of pretending to
/// serve audio it doesn't have.
async fn stream_item_db(Path(_ids): Path<(i64, i64)>) -> impl IntoResponse {
    stream_item().await
}

async fn stream_item_rsp(Path(_itemid): Path<i64>) -> impl IntoResponse {
    stream_item().await
}

async fn stream_item() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, "no transcoder collaborator configured")
}

async fn server_info() -> impl IntoResponse {
    tlv_response(tlv_handlers::server_info())
}

async fn login() -> impl IntoResponse {
    tlv_response(tlv_handlers::login(1))
}

async fn databases() -> impl IntoResponse {
    tlv_response(tlv_handlers::databases())
}

async fn database_items(
    State(state): State<AppState>,
    Path(_id): Path<i64>,
    Query(vars): Query<QueryVars>,
) -> Response {
    let predicate = match vars.query.as_deref().map(query_compiler::compile) {
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => return tlv_response(tlv_handlers::item_listing("adbs", &Status::error(e.to_string()), &[])),
        None => None,
    };

    let qd = QueryDescriptor {
        query_type: QueryType::Items,
        index_type: if vars.offset.is_some() || vars.limit.is_some() { IndexType::Sub } else { IndexType::None },
        index_low: vars.offset.unwrap_or(0),
        index_high: vars.offset.unwrap_or(0) + vars.limit.unwrap_or(browse::DEFAULT_INDEX_HIGH),
        want_count: true,
        ..Default::default()
    };

    let store = state.store.lock().unwrap();
    match browse::enum_start(store.connection(), &qd, predicate.as_ref()) {
        Ok(mut cursor) => {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_row() {
                rows.push(row);
            }
            let status = Status::ok(rows.len() as u64, cursor.specified_total.unwrap_or(0));
            tlv_response(tlv_handlers::item_listing("adbs", &status, &rows))
        }
        Err(e) => tlv_response(tlv_handlers::item_listing("adbs", &Status::error(e.to_string()), &[])),
    }
}

async fn rsp_info() -> impl IntoResponse {
    xml_response(rsp_handlers::info_xml())
}

async fn rsp_db(State(state): State<AppState>) -> Response {
    let qd = QueryDescriptor { query_type: QueryType::Playlists, want_count: true, ..Default::default() };
    let store = state.store.lock().unwrap();
    rows_to_xml(browse::enum_start(store.connection(), &qd, None))
}

async fn rsp_playlist_items(State(state): State<AppState>, Path(plid): Path<i64>) -> Response {
    let store = state.store.lock().unwrap();
    let query: Option<String> = store
        .connection()
        .query_row("SELECT query FROM playlists WHERE id = ?1", [plid], |r| r.get(0))
        .ok();
    let predicate = match query.map(|q| query_compiler::compile(&q)) {
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => return xml_response(rsp_handlers::error_xml(&Status::error(e.to_string()))),
        None => None,
    };
    let qd = QueryDescriptor { query_type: QueryType::Items, want_count: true, ..Default::default() };
    rows_to_xml(browse::enum_start(store.connection(), &qd, predicate.as_ref()))
}

fn rows_to_xml(result: Result<browse::QueryCursor, CoreError>) -> Response {
    match result {
        Ok(mut cursor) => {
            let mut rows = Vec::new();
            while let Some(row) = cursor.fetch_row() {
                rows.push(row);
            }
            let status = Status::ok(rows.len() as u64, cursor.specified_total.unwrap_or(0));
            xml_response(rsp_handlers::items_xml(&status, &rows))
        }
        Err(e) => xml_response(rsp_handlers::error_xml(&Status::error(e.to_string()))),
    }
}

fn tlv_response(bytes: Vec<u8>) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/x-dmap-tagged")], bytes).into_response()
}

fn xml_response(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

pub fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::builder().from_env().unwrap();
    let fmt = fmt::layer().pretty().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry()
        .with(fmt)
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            store: Arc::new(Mutex::new(Store::open_in_memory().unwrap())),
            artwork: Arc::new(Mutex::new(artwork::ArtworkCache::open_in_memory().unwrap())),
        }
    }

    #[tokio::test]
    async fn server_info_route_returns_tlv() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/server-info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rsp_info_route_returns_xml() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/rsp/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn database_items_route_reports_empty_catalog() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/databases/1/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn content_codes_route_returns_tlv() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/content-codes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn database_browse_route_rejects_unknown_field() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/databases/1/browse/nonsense").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let (tag, atom) = crate::tlv::decode(&body).unwrap();
        assert_eq!(tag, "abro");
        let crate::tlv::Atom::Container(children) = atom else { panic!("expected container") };
        let status = children.iter().find(|(t, _)| t == "mstt").unwrap();
        assert_eq!(status.1, crate::tlv::Atom::Int(500));
    }

    #[tokio::test]
    async fn rsp_db_route_lists_builtin_playlists() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/rsp/db").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let xml = String::from_utf8(body.to_vec()).unwrap();
        assert!(xml.contains("<totalrecords>6</totalrecords>"));
    }

    #[tokio::test]
    async fn container_items_route_selects_builtin_playlist_by_media_kind_and_excludes_disabled() {
        let state = test_state();
        {
            let store = state.store.lock().unwrap();
            let conn = store.connection();
            conn.execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, media_kind, disabled)
                 VALUES ('/p1', '/p1', 'p1', 0, '', '', 4, 0)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, media_kind, disabled)
                 VALUES ('/p2', '/p2', 'p2', 0, '', '', 4, 1)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, media_kind, disabled)
                 VALUES ('/m1', '/m1', 'm1', 0, '', '', 1, 0)",
                [],
            )
            .unwrap();
        }
        let router = build_router(state);
        // playlist 5 = Podcasts (media_kind == 4): one enabled podcast matches, the
        // disabled podcast and the unrelated music file do not.
        let response = router
            .oneshot(Request::builder().uri("/databases/1/containers/5/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let (tag, atom) = crate::tlv::decode(&body).unwrap();
        assert_eq!(tag, "apso");
        let crate::tlv::Atom::Container(children) = atom else { panic!("expected container") };
        let status = children.iter().find(|(t, _)| t == "mstt").unwrap();
        assert_eq!(status.1, crate::tlv::Atom::Int(200));
        let total = children.iter().find(|(t, _)| t == "mtco").unwrap();
        assert_eq!(total.1, crate::tlv::Atom::Int(1));
    }

    #[tokio::test]
    async fn container_items_route_selects_library_playlist_excluding_disabled() {
        let state = test_state();
        {
            let store = state.store.lock().unwrap();
            let conn = store.connection();
            conn.execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, media_kind, disabled)
                 VALUES ('/m1', '/m1', 'm1', 0, '', '', 1, 0)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO files (path, virtual_path, fname, directory_id, album, album_artist, media_kind, disabled)
                 VALUES ('/m2', '/m2', 'm2', 0, '', '', 1, 1)",
                [],
            )
            .unwrap();
        }
        let router = build_router(state);
        // playlist 1 = Library (no predicate): every non-disabled item, i.e. one row.
        let response = router
            .oneshot(Request::builder().uri("/databases/1/containers/1/items").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let (_, atom) = crate::tlv::decode(&body).unwrap();
        let crate::tlv::Atom::Container(children) = atom else { panic!("expected container") };
        let total = children.iter().find(|(t, _)| t == "mtco").unwrap();
        assert_eq!(total.1, crate::tlv::Atom::Int(1));
    }

    #[tokio::test]
    async fn stream_item_route_reports_not_implemented() {
        let router = build_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/rsp/stream/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
