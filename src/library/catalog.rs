//! Persistence of the track catalog.
//!
//! The reconciler only talks to [`CatalogStore`]; this module ships an
//! in-memory store and a JSON-file store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::aggregate::Aggregates;
use super::model::{Track, TrackKey};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("catalog file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("a record with key {0:?} already exists")]
    Conflict(TrackKey),

    #[error("no record with key {0:?}")]
    NotFound(TrackKey),
}

/// Storage of track records, one row per [`TrackKey`].
pub trait CatalogStore: Send {
    fn all(&self) -> Result<Vec<Track>, CatalogError>;

    /// Insert new records. Fails without changes if any key is already taken.
    fn insert_many(&mut self, tracks: &[Track]) -> Result<(), CatalogError>;

    /// Replace the record stored under each key.
    fn update_many(&mut self, updates: &[(TrackKey, Track)]) -> Result<(), CatalogError>;

    /// Remove the records with these keys; returns how many existed.
    fn delete_many(&mut self, keys: &[TrackKey]) -> Result<usize, CatalogError>;

    fn replace_aggregates(&mut self, aggregates: Aggregates) -> Result<(), CatalogError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub tracks: Vec<Track>,
    pub aggregates: Aggregates,
}

impl CatalogData {
    fn position(&self, key: &TrackKey) -> Option<usize> {
        self.tracks.iter().position(|t| &t.key() == key)
    }

    fn insert_many(&mut self, tracks: &[Track]) -> Result<(), CatalogError> {
        let mut keys = Vec::with_capacity(tracks.len());
        for t in tracks {
            let key = t.key();
            if keys.contains(&key) || self.position(&key).is_some() {
                return Err(CatalogError::Conflict(key));
            }
            keys.push(key);
        }
        self.tracks.extend_from_slice(tracks);
        Ok(())
    }

    fn update_many(&mut self, updates: &[(TrackKey, Track)]) -> Result<(), CatalogError> {
        let mut slots = Vec::with_capacity(updates.len());
        for (key, _) in updates {
            let idx = self
                .position(key)
                .ok_or_else(|| CatalogError::NotFound(key.clone()))?;
            slots.push(idx);
        }
        for (idx, (_, track)) in slots.into_iter().zip(updates) {
            self.tracks[idx] = track.clone();
        }
        Ok(())
    }

    fn delete_many(&mut self, keys: &[TrackKey]) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|t| !keys.contains(&t.key()));
        before - self.tracks.len()
    }
}

/// A store held in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    data: Arc<Mutex<CatalogData>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Self {
            data: Arc::new(Mutex::new(CatalogData {
                tracks,
                aggregates: Aggregates::default(),
            })),
        }
    }

    pub fn snapshot(&self) -> CatalogData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut CatalogData) -> T) -> T {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }
}

impl CatalogStore for MemoryCatalog {
    fn all(&self) -> Result<Vec<Track>, CatalogError> {
        Ok(self.with_data(|d| d.tracks.clone()))
    }

    fn insert_many(&mut self, tracks: &[Track]) -> Result<(), CatalogError> {
        self.with_data(|d| d.insert_many(tracks))
    }

    fn update_many(&mut self, updates: &[(TrackKey, Track)]) -> Result<(), CatalogError> {
        self.with_data(|d| d.update_many(updates))
    }

    fn delete_many(&mut self, keys: &[TrackKey]) -> Result<usize, CatalogError> {
        Ok(self.with_data(|d| d.delete_many(keys)))
    }

    fn replace_aggregates(&mut self, aggregates: Aggregates) -> Result<(), CatalogError> {
        self.with_data(|d| d.aggregates = aggregates);
        Ok(())
    }
}

/// A store persisted as one JSON document, rewritten atomically after every change.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    data: CatalogData,
}

impl JsonCatalog {
    /// Open the catalog at `path`; a missing file is an empty catalog.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let data = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogData::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(
            "Opened catalog {} with {} track(s)",
            path.display(),
            data.tracks.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    /// Apply `f` to a copy of the data and persist it; memory only changes
    /// once the file is written.
    fn commit<T>(
        &mut self,
        f: impl FnOnce(&mut CatalogData) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let mut next = self.data.clone();
        let out = f(&mut next)?;
        self.save(&next)?;
        self.data = next;
        Ok(out)
    }

    fn save(&self, data: &CatalogData) -> Result<(), CatalogError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".catalog")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), data)?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl CatalogStore for JsonCatalog {
    fn all(&self) -> Result<Vec<Track>, CatalogError> {
        Ok(self.data.tracks.clone())
    }

    fn insert_many(&mut self, tracks: &[Track]) -> Result<(), CatalogError> {
        if tracks.is_empty() {
            return Ok(());
        }
        self.commit(|d| d.insert_many(tracks))
    }

    fn update_many(&mut self, updates: &[(TrackKey, Track)]) -> Result<(), CatalogError> {
        if updates.is_empty() {
            return Ok(());
        }
        self.commit(|d| d.update_many(updates))
    }

    fn delete_many(&mut self, keys: &[TrackKey]) -> Result<usize, CatalogError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.commit(|d| Ok(d.delete_many(keys)))
    }

    fn replace_aggregates(&mut self, aggregates: Aggregates) -> Result<(), CatalogError> {
        self.commit(|d| {
            d.aggregates = aggregates;
            Ok(())
        })
    }
}
