//! The URI pattern table: up to ten segments, `*` as a wildcard, first
//! match wins. Ported from `original_source/src/plugins/rsp.c`'s
//! `rsp_uri_map[]`/`plugin_handler`.

use serde::Deserialize;

pub const MAX_SEGMENTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Wildcard,
}

/// A single dispatch-table entry: its URI pattern and the handler it maps
/// to. `H` is left generic so tests can dispatch to a plain marker type
/// while the real router (wired in `main.rs`) dispatches to axum handler
/// functions.
pub struct Route<H> {
    pub pattern: &'static [Segment],
    pub handler: H,
}

/// Splits a request path into up to [`MAX_SEGMENTS`] non-empty segments,
/// matching `plugin_handler`'s `strtok_r(string, "/", &save)` tokenizing
/// (a leading `/` produces no empty first segment; more than ten segments
/// never match a pattern and the caller should treat that as "not found").
pub fn split_path(path: &str) -> Vec<&str> {
    path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}

fn matches(pattern: &[Segment], sections: &[&str]) -> bool {
    if pattern.len() != sections.len() {
        return false;
    }
    pattern.iter().zip(sections.iter()).all(|(p, s)| match p {
        Segment::Literal(lit) => *lit == *s,
        Segment::Wildcard => true,
    })
}

/// First-match-wins lookup. Returns `None` ("Bad path" in the original)
/// when no route's segment count and literals line up with `sections`.
pub fn dispatch<'a, H>(routes: &'a [Route<H>], sections: &[&str]) -> Option<&'a H> {
    routes.iter().find(|r| matches(r.pattern, sections)).map(|r| &r.handler)
}

/// Query-string variables recognized across handlers (spec §4.8).
/// Deserialized from the request's query string via `axum::extract::Query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryVars {
    pub query: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub meta: Option<String>,
    #[serde(rename = "session-id")]
    pub session_id: Option<i64>,
}

impl QueryVars {
    /// `meta` is a comma-separated field list; unset means "use the
    /// handler's default projection".
    pub fn meta_fields(&self) -> Vec<&str> {
        self.meta.as_deref().map(|m| m.split(',').filter(|s| !s.is_empty()).collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &[Segment] = &[Segment::Literal("rsp"), Segment::Literal("info")];
    const DB: &[Segment] = &[Segment::Literal("rsp"), Segment::Literal("db")];
    const PLAYLIST: &[Segment] = &[Segment::Literal("rsp"), Segment::Literal("db"), Segment::Wildcard];
    const BROWSE: &[Segment] =
        &[Segment::Literal("rsp"), Segment::Literal("db"), Segment::Wildcard, Segment::Wildcard];

    fn table() -> Vec<Route<&'static str>> {
        vec![
            Route { pattern: INFO, handler: "info" },
            Route { pattern: DB, handler: "db" },
            Route { pattern: PLAYLIST, handler: "playlist" },
            Route { pattern: BROWSE, handler: "browse" },
        ]
    }

    #[test]
    fn matches_exact_literal_route() {
        let routes = table();
        let sections = split_path("/rsp/info");
        assert_eq!(dispatch(&routes, &sections), Some(&"info"));
    }

    #[test]
    fn matches_wildcard_segment() {
        let routes = table();
        let sections = split_path("/rsp/db/4");
        assert_eq!(dispatch(&routes, &sections), Some(&"playlist"));
    }

    #[test]
    fn first_match_wins_over_more_specific_later_entry() {
        let routes = table();
        let sections = split_path("/rsp/db");
        assert_eq!(dispatch(&routes, &sections), Some(&"db"));
    }

    #[test]
    fn no_match_on_unknown_path() {
        let routes = table();
        let sections = split_path("/rsp/nonexistent/too/many/segments/here");
        assert_eq!(dispatch(&routes, &sections), None);
    }

    #[test]
    fn split_path_ignores_leading_and_trailing_slashes() {
        assert_eq!(split_path("/rsp/db/4/"), vec!["rsp", "db", "4"]);
    }

    #[test]
    fn meta_fields_splits_on_comma() {
        let vars = QueryVars { meta: Some("artist,album,genre".to_string()), ..Default::default() };
        assert_eq!(vars.meta_fields(), vec!["artist", "album", "genre"]);
    }

    #[test]
    fn meta_fields_empty_when_unset() {
        let vars = QueryVars::default();
        assert!(vars.meta_fields().is_empty());
    }
}
