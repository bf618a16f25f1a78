//! Album and artist roll-ups derived from the track set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::Track;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    pub artist: Option<String>,
    pub track_count: usize,
    pub total_duration_ms: u64,
    pub year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    pub track_count: usize,
    pub album_count: usize,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
}

/// Recompute every aggregate from scratch.
///
/// Tracks without an album (or artist) contribute to no album (or artist)
/// group, so a group only exists while it has members.
pub fn rebuild(tracks: &[Track]) -> Aggregates {
    let mut albums: BTreeMap<(String, Option<String>), Album> = BTreeMap::new();
    let mut artists: BTreeMap<String, (Artist, BTreeSet<String>)> = BTreeMap::new();

    for t in tracks {
        let duration = t.duration_ms.unwrap_or(0);

        if let Some(name) = &t.album {
            let album = albums
                .entry((name.clone(), t.artist.clone()))
                .or_insert_with(|| Album {
                    name: name.clone(),
                    artist: t.artist.clone(),
                    track_count: 0,
                    total_duration_ms: 0,
                    year: None,
                });
            album.track_count += 1;
            album.total_duration_ms += duration;
            album.year = album.year.max(t.year);
        }

        if let Some(name) = &t.artist {
            let (artist, album_names) = artists.entry(name.clone()).or_insert_with(|| {
                (
                    Artist {
                        name: name.clone(),
                        track_count: 0,
                        album_count: 0,
                        total_duration_ms: 0,
                    },
                    BTreeSet::new(),
                )
            });
            artist.track_count += 1;
            artist.total_duration_ms += duration;
            if let Some(album) = &t.album {
                album_names.insert(album.clone());
            }
        }
    }

    let mut albums: Vec<Album> = albums.into_values().collect();
    albums.sort_by_key(|a| a.name.to_lowercase());

    let mut artists: Vec<Artist> = artists
        .into_values()
        .map(|(mut a, names)| {
            a.album_count = names.len();
            a
        })
        .collect();
    artists.sort_by_key(|a| a.name.to_lowercase());

    Aggregates { albums, artists }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::model::TrackSource;
    use std::path::Path;

    fn track(path: &str, artist: Option<&str>, album: Option<&str>, ms: u64) -> Track {
        let mut t = Track::new(Path::new(path), TrackSource::FileWalk, -1);
        t.artist = artist.map(str::to_string);
        t.album = album.map(str::to_string);
        t.duration_ms = Some(ms);
        t
    }

    #[test]
    fn groups_albums_by_name_and_artist() {
        let tracks = vec![
            track("/a1", Some("Ann"), Some("Live"), 1000),
            track("/a2", Some("Ann"), Some("Live"), 2000),
            track("/b1", Some("Bob"), Some("Live"), 500),
            track("/b2", Some("bob"), Some("Demos"), 100),
            track("/n1", None, None, 10),
        ];
        let agg = rebuild(&tracks);

        assert_eq!(agg.albums.len(), 3);
        let ann_live = agg
            .albums
            .iter()
            .find(|a| a.name == "Live" && a.artist.as_deref() == Some("Ann"))
            .unwrap();
        assert_eq!(ann_live.track_count, 2);
        assert_eq!(ann_live.total_duration_ms, 3000);

        assert_eq!(agg.artists.len(), 3);
        let ann = agg.artists.iter().find(|a| a.name == "Ann").unwrap();
        assert_eq!(ann.track_count, 2);
        assert_eq!(ann.album_count, 1);
    }

    #[test]
    fn empty_track_set_has_no_groups() {
        assert_eq!(rebuild(&[]), Aggregates::default());
    }

    #[test]
    fn album_year_takes_latest_member() {
        let mut a = track("/a", Some("Ann"), Some("Best Of"), 0);
        a.year = Some(1990);
        let mut b = track("/b", Some("Ann"), Some("Best Of"), 0);
        b.year = Some(2001);
        let agg = rebuild(&[a, b]);
        assert_eq!(agg.albums[0].year, Some(2001));
    }
}
