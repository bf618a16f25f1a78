use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which scan source produced a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackSource {
    /// The OS-level media index; `source_id` is the index's own id.
    MediaIndex,
    /// The manual filesystem walk; `source_id` is synthesized locally.
    FileWalk,
}

/// One catalog record per physical audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub source_id: i64,
    pub source: TrackSource,
    pub path: PathBuf,
    pub guid: Option<String>,
    pub audio_checksum: Option<String>,
    pub embedded_created_at: Option<i64>,

    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    pub duration_ms: Option<u64>,
    pub date_added: Option<i64>,

    /// Free-text annotation owned by the caller.
    pub content: Option<String>,
    /// Normalized derivative of `content`, owned by the caller.
    pub normalized_content: Option<String>,
}

/// How a catalog record is addressed: by GUID when it has one, else by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKey {
    Guid(String),
    Path(PathBuf),
}

impl Track {
    /// A bare record for `path`; the title defaults to the file stem.
    pub fn new(path: &Path, source: TrackSource, source_id: i64) -> Self {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        Self {
            source_id,
            source,
            path: path.to_path_buf(),
            guid: None,
            audio_checksum: None,
            embedded_created_at: None,
            title,
            artist: None,
            album: None,
            album_id: None,
            artist_id: None,
            track_number: None,
            year: None,
            duration_ms: None,
            date_added: None,
            content: None,
            normalized_content: None,
        }
    }

    pub fn key(&self) -> TrackKey {
        match &self.guid {
            Some(g) => TrackKey::Guid(g.clone()),
            None => TrackKey::Path(self.path.clone()),
        }
    }

    /// Carry the caller-owned fields over from the catalog's copy of this file.
    ///
    /// Only values the catalog actually holds are copied, so a rescan can add
    /// a missing field but never erase one.
    pub fn copy_owned_from(&mut self, existing: &Track) {
        fn carry<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        carry(&mut self.content, &existing.content);
        carry(&mut self.normalized_content, &existing.normalized_content);
        carry(&mut self.guid, &existing.guid);
        carry(&mut self.embedded_created_at, &existing.embedded_created_at);
        carry(&mut self.audio_checksum, &existing.audio_checksum);
    }
}

/// Lowercase, collapse whitespace runs to one space, trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
