//! Narrow trait boundaries for the four subsystems this core depends on by
//! interface only: filesystem scanning, transcoding, audio output, and the
//! OAuth helper used by remote services. Grounded in the teacher's
//! `FormatScanner` trait (`scan.rs`) — pluggable, swappable implementations
//! behind a small trait rather than a concrete type the core owns.
//!
//! Metadata extraction, real transcoding, and real audio output are out of
//! scope; only a minimal filesystem walker is provided so the catalog can
//! be exercised end-to-end without a tag-extraction library.

use camino::{Utf8Path, Utf8PathBuf};
use jiff::Timestamp;

use crate::error::{CoreError, Result};

/// One file the scanner observed on disk, with no bibliographic fields
/// populated — those belong to a real tag-extraction library, which is
/// out of scope here.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFile {
    pub path: Utf8PathBuf,
    pub size: u64,
    pub mtime: Timestamp,
}

pub trait Scanner: Send + Sync {
    fn scan_root(&self, root: &Utf8Path) -> Result<Vec<ScannedFile>>;
}

/// Walks `root` and records path/size/mtime only.
pub struct FilesystemScanner;

impl Scanner for FilesystemScanner {
    fn scan_root(&self, root: &Utf8Path) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root) {
            let entry = entry.map_err(|e| CoreError::External(Box::new(e)))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(abspath) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            let metadata = entry.metadata().map_err(|e| CoreError::External(Box::new(e)))?;
            let Ok(mtime) = metadata.modified().and_then(|m| {
                Timestamp::try_from(m).map_err(|e| std::io::Error::other(e.to_string()))
            }) else {
                continue;
            };
            files.push(ScannedFile { path: abspath.to_path_buf(), size: metadata.len(), mtime });
        }
        Ok(files)
    }
}

/// The transcoder hands back a stream of encoded bytes for a catalog item;
/// no implementation lives in this core.
pub trait Transcoder: Send + Sync {
    fn stream_item(&self, item_id: i64) -> Result<Vec<u8>>;
}

/// The audio output subsystem; no implementation lives in this core.
pub trait OutputSink: Send + Sync {
    fn output_write(&self, bytes: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_scanner_finds_files_not_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("a.mp3"), b"x").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/b.mp3"), b"yy").unwrap();

        let scanner = FilesystemScanner;
        let mut found = scanner.scan_root(root).unwrap();
        found.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].size, 1);
        assert_eq!(found[1].size, 2);
    }

    struct FakeTranscoder;
    impl Transcoder for FakeTranscoder {
        fn stream_item(&self, item_id: i64) -> Result<Vec<u8>> {
            Ok(format!("item-{item_id}").into_bytes())
        }
    }

    #[test]
    fn transcoder_trait_is_object_safe_and_usable() {
        let t: Box<dyn Transcoder> = Box::new(FakeTranscoder);
        assert_eq!(t.stream_item(7).unwrap(), b"item-7");
    }
}
