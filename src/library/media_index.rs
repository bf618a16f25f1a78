use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{Track, TrackSource};

#[derive(Debug, Error)]
pub enum MediaIndexError {
    #[error("media index unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("bad media index snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// One row as reported by the OS media index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRow {
    pub id: i64,
    pub path: PathBuf,
    pub mime_type: Option<String>,
    pub duration_ms: Option<u64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    pub date_added: Option<i64>,
}

impl MediaRow {
    pub fn to_track(&self) -> Track {
        let mut track = Track::new(&self.path, TrackSource::MediaIndex, self.id);
        if let Some(t) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            track.title = t.to_string();
        }
        track.artist = non_blank(self.artist.as_deref());
        track.album = non_blank(self.album.as_deref());
        track.album_id = self.album_id;
        track.artist_id = self.artist_id;
        track.track_number = self.track_number;
        track.year = self.year;
        track.duration_ms = self.duration_ms;
        track.date_added = self.date_added;
        track
    }
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The OS-level index of media files. Its contents may lag the filesystem.
pub trait MediaIndex: Send {
    /// Rows whose MIME type is one of `mime_types`. Rows that do not report
    /// a MIME type are always returned.
    fn query(&self, mime_types: &[String]) -> Result<Vec<MediaRow>, MediaIndexError>;
}

/// Platforms without an index: every file comes from the walk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMediaIndex;

impl MediaIndex for NoMediaIndex {
    fn query(&self, _mime_types: &[String]) -> Result<Vec<MediaRow>, MediaIndexError> {
        Ok(Vec::new())
    }
}

/// A fixed set of rows, e.g. an exported snapshot of the OS index.
#[derive(Debug, Default, Clone)]
pub struct StaticMediaIndex {
    rows: Vec<MediaRow>,
}

impl StaticMediaIndex {
    pub fn new(rows: Vec<MediaRow>) -> Self {
        Self { rows }
    }

    /// Load rows from a JSON array.
    pub fn from_json_file(path: &Path) -> Result<Self, MediaIndexError> {
        let text = fs::read_to_string(path)?;
        let rows: Vec<MediaRow> = serde_json::from_str(&text)?;
        Ok(Self { rows })
    }
}

impl MediaIndex for StaticMediaIndex {
    fn query(&self, mime_types: &[String]) -> Result<Vec<MediaRow>, MediaIndexError> {
        Ok(self
            .rows
            .iter()
            .filter(|r| mime_matches(r.mime_type.as_deref(), mime_types))
            .cloned()
            .collect())
    }
}

fn mime_matches(mime: Option<&str>, wanted: &[String]) -> bool {
    match mime {
        None => true,
        Some(_) if wanted.is_empty() => true,
        Some(m) => wanted.iter().any(|w| w.eq_ignore_ascii_case(m.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, path: &str, mime: Option<&str>) -> MediaRow {
        MediaRow {
            id,
            path: PathBuf::from(path),
            mime_type: mime.map(str::to_string),
            ..MediaRow::default()
        }
    }

    #[test]
    fn static_index_filters_by_mime_case_insensitive() {
        let index = StaticMediaIndex::new(vec![
            row(1, "/m/a.mp3", Some("audio/mpeg")),
            row(2, "/m/b.flac", Some("audio/flac")),
            row(3, "/m/c.mp3", Some("AUDIO/MPEG")),
            row(4, "/m/d.mp3", None),
        ]);
        let ids: Vec<i64> = index
            .query(&["audio/mpeg".to_string()])
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(index.query(&[]).unwrap().len(), 4);
    }

    #[test]
    fn snapshot_loads_partial_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(
            &path,
            r#"[{"id": 7, "path": "/m/x.mp3", "title": " X ", "artist": "  ", "year": 1999}]"#,
        )
        .unwrap();

        let rows = StaticMediaIndex::from_json_file(&path)
            .unwrap()
            .query(&[])
            .unwrap();
        assert_eq!(rows.len(), 1);

        let track = rows[0].to_track();
        assert_eq!(track.source, TrackSource::MediaIndex);
        assert_eq!(track.source_id, 7);
        assert_eq!(track.title, "X");
        assert_eq!(track.artist, None);
        assert_eq!(track.year, Some(1999));
    }

    #[test]
    fn untitled_row_falls_back_to_file_stem() {
        let track = row(1, "/m/untitled take.mp3", None).to_track();
        assert_eq!(track.title, "untitled take");
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            StaticMediaIndex::from_json_file(&path),
            Err(MediaIndexError::Json(_))
        ));
    }
}
