//! Configuration file handling. A small key-value TOML file, loaded once at
//! startup. Mirrors the teacher's preference for loading ambient state with
//! a small hand-rolled reader (see `playlist::load_from_dir`) rather than a
//! generic config framework.

use camino::Utf8PathBuf;
use color_eyre::eyre::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub library: LibraryConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Deserialize)]
pub struct LibraryConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub music_dir: Utf8PathBuf,
    pub db_path: Utf8PathBuf,
    pub artworkcache_path: Utf8PathBuf,
    #[serde(default)]
    pub db_pragma: PragmaConfig,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            music_dir: "./music".into(),
            db_path: "./catalog.db".into(),
            artworkcache_path: "./artwork.db".into(),
            db_pragma: PragmaConfig::default(),
        }
    }
}

/// PRAGMA overrides, see spec §6. Any field left unset keeps the catalog's
/// built-in default (see [`crate::store::pragma::DEFAULTS`]).
#[derive(Debug, Default, Deserialize)]
pub struct PragmaConfig {
    pub page_size: Option<u32>,
    pub cache_size: Option<i32>,
    pub journal_mode: Option<String>,
    pub synchronous: Option<u8>,
}

impl Config {
    pub fn load(path: &camino::Utf8Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("could not read config file at {path}"))?;
        toml::from_str(&raw).wrap_err("could not parse config file as TOML")
    }
}
