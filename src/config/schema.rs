use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tracksync/config.toml` or `~/.config/tracksync/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TRACKSYNC__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub identity: IdentitySettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Folders walked by the filesystem pass.
    pub roots: Vec<PathBuf>,
    /// Folders (and everything below them) skipped by both scan sources.
    pub excluded_folders: Vec<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// If non-empty, only file names starting with one of these are picked up by the walk.
    pub name_prefixes: Vec<String>,
    /// MIME types requested from the media index.
    pub mime_types: Vec<String>,
    /// Optional JSON export of media-index rows used as the primary source.
    pub media_index_snapshot: Option<PathBuf>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// A directory containing a file with this name is skipped entirely.
    pub nomedia_marker: String,

    /// Which fields `tracksync list` prints, and in what order.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            excluded_folders: Vec::new(),
            extensions: vec!["mp3".into()],
            name_prefixes: Vec::new(),
            mime_types: vec!["audio/mpeg".into()],
            media_index_snapshot: None,
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            nomedia_marker: ".nomedia".to_string(),
            display_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            display_separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Title,
    Artist,
    Album,
    Filename,
    Path,
    Guid,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// File-name prefix that precedes the `YYYY-MM-DDTHH_MM_SS` creation stamp.
    pub timestamp_prefix: String,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            timestamp_prefix: crate::tags::DEFAULT_TIMESTAMP_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// JSON catalog file. Defaults to `$XDG_DATA_HOME/tracksync/catalog.json`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
