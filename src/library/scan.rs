use std::collections::HashSet;
use std::panic;
use std::path::{Path, PathBuf};

use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::tag::ItemKey;
use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::LibrarySettings;

use super::model::{Track, TrackSource};
use super::scanner::panic_message;

/// Configured extensions, lowercased and without leading dots.
fn wanted_extensions(settings: &LibrarySettings) -> Vec<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_audio_file(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn has_wanted_prefix(path: &Path, settings: &LibrarySettings) -> bool {
    if settings.name_prefixes.is_empty() {
        return true;
    }
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| settings.name_prefixes.iter().any(|p| name.starts_with(p.as_str())))
        .unwrap_or(false)
}

/// Whether `path` is one of `excluded` or lies below one of them.
pub fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    excluded.iter().any(|ex| path.starts_with(ex))
}

fn has_nomedia_marker(entry: &DirEntry, marker: &str) -> bool {
    !marker.is_empty() && entry.file_type().is_dir() && entry.path().join(marker).exists()
}

fn keep_entry(entry: &DirEntry, settings: &LibrarySettings) -> bool {
    if !settings.include_hidden && entry.depth() > 0 && is_hidden(entry.path()) {
        return false;
    }
    if is_excluded(entry.path(), &settings.excluded_folders) {
        return false;
    }
    if has_nomedia_marker(entry, &settings.nomedia_marker) {
        debug!("Skipping {} (marker present)", entry.path().display());
        return false;
    }
    true
}

/// Walk every root and collect the audio files found, deduplicated by path.
pub fn walk(roots: &[PathBuf], settings: &LibrarySettings) -> Vec<Track> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut tracks: Vec<Track> = Vec::new();
    for root in roots {
        for t in walk_root(root, settings) {
            if seen.insert(t.path.clone()) {
                tracks.push(t);
            }
        }
    }
    tracks
}

/// Walk one folder tree, honoring the configured filters.
pub fn walk_root(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();
    let exts = wanted_extensions(settings);

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| keep_entry(e, settings))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file() && is_audio_file(path, &exts) && has_wanted_prefix(path, settings) {
            tracks.push(read_track(path));
        }
    }

    tracks.sort_by(|a, b| a.path.cmp(&b.path));
    tracks
}

/// Build a walk record from whatever descriptive tags the file carries.
///
/// A file lofty cannot parse (or panics on) keeps the defaults from
/// [`Track::new`].
pub fn read_track(path: &Path) -> Track {
    let mut track = Track::new(path, TrackSource::FileWalk, 0);

    match panic::catch_unwind(|| lofty::read_from_path(path)) {
        Ok(Ok(tagged)) => fill_from_tags(&mut track, &tagged),
        Ok(Err(e)) => debug!("No readable tags in {}: {}", path.display(), e),
        Err(payload) => warn!(
            "Tag reader crashed on {}: {}",
            path.display(),
            panic_message(&*payload)
        ),
    }

    track.source_id = synthesize_source_id(&track);
    track
}

fn fill_from_tags(track: &mut Track, tagged: &TaggedFile) {
    let duration = tagged.properties().duration();
    if !duration.is_zero() {
        track.duration_ms = Some(duration.as_millis() as u64);
    }

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return;
    };
    if let Some(v) = tag.get_string(&ItemKey::TrackTitle) {
        if !v.trim().is_empty() {
            track.title = v.trim().to_string();
        }
    }
    if let Some(v) = tag.get_string(&ItemKey::TrackArtist) {
        let v = v.trim();
        if !v.is_empty() {
            track.artist = Some(v.to_string());
        }
    }
    if let Some(v) = tag.get_string(&ItemKey::AlbumTitle) {
        let v = v.trim();
        if !v.is_empty() {
            track.album = Some(v.to_string());
        }
    }
    track.track_number = tag.track();
    track.year = tag.get_string(&ItemKey::Year).and_then(parse_year);
}

fn parse_year(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// A local id for files the media index never reported.
///
/// Derived from the path and descriptive fields, so editing a file's tags
/// changes it. Always negative, which keeps it apart from index ids.
pub fn synthesize_source_id(track: &Track) -> i64 {
    let key = format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
        track.path.display(),
        track.title,
        track.artist.as_deref().unwrap_or(""),
        track.album.as_deref().unwrap_or(""),
        track.duration_ms.unwrap_or(0),
    );
    let digest = md5::compute(key.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.0[..8]);
    let folded = (u64::from_be_bytes(head) >> 1) as i64;
    -folded - 1
}
