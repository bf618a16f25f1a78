//! One synchronization cycle between the scan sources and the catalog.
//!
//! A cycle runs five phases in order: gather from the media index, gather
//! from the filesystem walk, merge against the catalog, guarded cleanup and
//! the aggregate rebuild. All bookkeeping for a cycle lives in [`ScanCycle`],
//! which is created fresh for every run and dropped at the end of it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::PoisonError;

use log::{Level, debug, error, info, log, warn};
use thiserror::Error;

use crate::config::LibrarySettings;
use crate::identity::{Identity, IdentityResolver};

use super::aggregate;
use super::catalog::{CatalogError, CatalogStore};
use super::media_index::MediaIndex;
use super::model::{Track, TrackKey, normalize_text};
use super::scan::{is_excluded, walk};
use super::types::{ProgressHandle, ScanPhase, ScanReport};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan produced no tracks")]
    NoTracks,

    #[error("catalog store failed: {0}")]
    Store(#[from] CatalogError),
}

/// A file observed this cycle, with the identity it carries right now.
struct Candidate {
    track: Track,
    identity: Identity,
}

struct ScanCycle {
    existing: Vec<Track>,
    by_guid: HashMap<String, usize>,
    by_path: HashMap<PathBuf, usize>,
    by_checksum: HashMap<String, usize>,

    candidates: Vec<Candidate>,
    gathered: HashSet<PathBuf>,
    /// Files that failed this cycle but still exist; never deleted.
    protected: HashSet<PathBuf>,

    matched: HashSet<usize>,
    claimed_guids: HashSet<String>,
    claimed_checksums: HashSet<String>,
    seen_guids: HashSet<String>,
    seen_paths: HashSet<PathBuf>,

    inserts: Vec<Track>,
    updates: Vec<(TrackKey, Track)>,
    report: ScanReport,
    progress: Option<ProgressHandle>,
}

impl ScanCycle {
    fn new(existing: Vec<Track>, progress: Option<ProgressHandle>) -> Self {
        let mut by_guid = HashMap::new();
        let mut by_path = HashMap::new();
        let mut by_checksum = HashMap::new();
        for (i, t) in existing.iter().enumerate() {
            if let Some(g) = &t.guid {
                by_guid.insert(g.clone(), i);
            }
            by_path.insert(t.path.clone(), i);
            if let Some(c) = &t.audio_checksum {
                by_checksum.entry(c.clone()).or_insert(i);
            }
        }
        Self {
            existing,
            by_guid,
            by_path,
            by_checksum,
            candidates: Vec::new(),
            gathered: HashSet::new(),
            protected: HashSet::new(),
            matched: HashSet::new(),
            claimed_guids: HashSet::new(),
            claimed_checksums: HashSet::new(),
            seen_guids: HashSet::new(),
            seen_paths: HashSet::new(),
            inserts: Vec::new(),
            updates: Vec::new(),
            report: ScanReport::default(),
            progress,
        }
    }

    fn level(&self) -> Level {
        if self.progress.is_some() {
            Level::Info
        } else {
            Level::Debug
        }
    }

    fn enter(&self, phase: ScanPhase, total: usize) {
        log!(self.level(), "Scan phase: {} ({} item(s))", phase, total);
        if let Some(p) = &self.progress {
            let mut p = p.lock().unwrap_or_else(PoisonError::into_inner);
            p.phase = phase;
            p.processed = 0;
            p.total = total;
        }
    }

    fn tick(&self) {
        if let Some(p) = &self.progress {
            p.lock().unwrap_or_else(PoisonError::into_inner).processed += 1;
        }
    }

    /// The catalog record this candidate corresponds to, if any.
    ///
    /// A GUID read from the file is authoritative; the path is only consulted
    /// for records that never had one. A GUID generated in memory means
    /// nothing to the catalog, so such files match by path alone.
    fn lookup(&self, c: &Candidate) -> Option<usize> {
        if c.identity.guid_from_file {
            self.by_guid.get(&c.identity.guid).copied().or_else(|| {
                self.by_path
                    .get(&c.track.path)
                    .copied()
                    .filter(|&i| self.existing[i].guid.is_none())
            })
        } else {
            self.by_path.get(&c.track.path).copied()
        }
    }

    /// An unmatched record holding the same audio that this file stands in for.
    ///
    /// Either the file sits at the record's own path under a GUID the catalog
    /// does not know (a retag), or the record's path turned up nowhere this
    /// cycle (a move).
    fn moved_from(&self, c: &Candidate) -> Option<usize> {
        let checksum = c.identity.checksum.as_deref()?;
        let i = *self.by_checksum.get(checksum)?;
        if self.matched.contains(&i) {
            return None;
        }
        let record = &self.existing[i];
        let retagged = record.path == c.track.path;
        let moved = !self.gathered.contains(&record.path) && !self.protected.contains(&record.path);
        (retagged || moved).then_some(i)
    }

    fn is_exact_match(&self, c: &Candidate) -> bool {
        self.lookup(c)
            .is_some_and(|i| self.existing[i].path == c.track.path)
    }

    fn guid_taken(&self, guid: &str) -> bool {
        self.claimed_guids.contains(guid)
    }

    fn checksum_taken(&self, checksum: Option<&str>) -> bool {
        checksum.is_some_and(|c| {
            self.claimed_checksums.contains(c) || self.by_checksum.contains_key(c)
        })
    }

    fn claim(&mut self, track: &Track) {
        if let Some(g) = &track.guid {
            self.claimed_guids.insert(g.clone());
            self.seen_guids.insert(g.clone());
        }
        if let Some(c) = &track.audio_checksum {
            self.claimed_checksums.insert(c.clone());
        }
        self.seen_paths.insert(track.path.clone());
    }

    fn protect_if_present(&mut self, path: PathBuf) {
        if path.exists() {
            self.protected.insert(path);
        }
    }

    fn is_seen(&self, record: &Track) -> bool {
        match &record.guid {
            Some(g) => self.seen_guids.contains(g),
            None => self.seen_paths.contains(&record.path),
        }
    }
}

/// Keeps a catalog in step with the media index and the configured folders.
pub struct Reconciler {
    settings: LibrarySettings,
    resolver: IdentityResolver,
    index: Box<dyn MediaIndex>,
    store: Box<dyn CatalogStore>,
}

impl Reconciler {
    pub fn new(
        settings: LibrarySettings,
        resolver: IdentityResolver,
        index: Box<dyn MediaIndex>,
        store: Box<dyn CatalogStore>,
    ) -> Self {
        Self {
            settings,
            resolver,
            index,
            store,
        }
    }

    /// Run one full cycle.
    ///
    /// Per-file problems never fail the cycle; they are logged and counted.
    /// The cycle fails when the catalog cannot be loaded or written, or when
    /// an empty catalog meets a scan that found nothing.
    pub fn run_cycle(&mut self, progress: Option<&ProgressHandle>) -> Result<ScanReport, ScanError> {
        let existing = self.store.all().inspect_err(|e| error!("Cannot load catalog: {e}"))?;
        let mut cycle = ScanCycle::new(existing, progress.cloned());

        self.gather_primary(&mut cycle);
        self.gather_secondary(&mut cycle);
        cycle.report.candidates = cycle.candidates.len();

        if cycle.existing.is_empty() && cycle.candidates.is_empty() {
            warn!("Scan produced no tracks");
            return Err(ScanError::NoTracks);
        }

        self.merge(&mut cycle);
        self.write_changes(&mut cycle)?;
        self.cleanup(&mut cycle);
        self.rebuild_aggregates(&cycle);

        cycle.enter(ScanPhase::Done, 0);
        log!(cycle.level(), "Scan finished: {}", cycle.report);
        Ok(cycle.report)
    }

    fn gather_primary(&self, cycle: &mut ScanCycle) {
        let rows = match self.index.query(&self.settings.mime_types) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Media index unavailable, relying on the folder walk: {e}");
                Vec::new()
            }
        };
        cycle.enter(ScanPhase::GatherPrimary, rows.len());
        for row in rows {
            cycle.tick();
            if is_excluded(&row.path, &self.settings.excluded_folders) {
                debug!("Ignoring excluded {}", row.path.display());
                continue;
            }
            self.admit(cycle, row.to_track());
        }
    }

    fn gather_secondary(&self, cycle: &mut ScanCycle) {
        let found = walk(&self.settings.roots, &self.settings);
        cycle.enter(ScanPhase::GatherSecondary, found.len());
        for track in found {
            cycle.tick();
            if cycle.gathered.contains(&track.path) {
                continue;
            }
            self.admit(cycle, track);
        }
    }

    /// Resolve a gathered file's identity without touching it.
    fn admit(&self, cycle: &mut ScanCycle, track: Track) {
        if !cycle.gathered.insert(track.path.clone()) {
            return;
        }
        match self.resolver.resolve(&track.path, false) {
            Ok(identity) => {
                debug!("Gathered {} ({})", track.path.display(), identity.guid);
                cycle.candidates.push(Candidate { track, identity });
            }
            Err(e) => {
                warn!("Skipping {}: {}", track.path.display(), e);
                cycle.report.skipped += 1;
                cycle.protect_if_present(track.path);
            }
        }
    }

    fn merge(&self, cycle: &mut ScanCycle) {
        let mut candidates = std::mem::take(&mut cycle.candidates);
        // A record's own file wins over copies that carry the same GUID.
        candidates.sort_by_key(|c| !cycle.is_exact_match(c));

        cycle.enter(ScanPhase::Merge, candidates.len());
        for c in candidates {
            cycle.tick();
            match cycle.lookup(&c) {
                Some(i) if cycle.matched.contains(&i) => {
                    warn!(
                        "{} carries GUID {} already claimed this scan, skipping",
                        c.track.path.display(),
                        c.identity.guid
                    );
                    cycle.seen_paths.insert(c.track.path.clone());
                    cycle.report.duplicates.push(c.track.path);
                }
                Some(i) => {
                    cycle.matched.insert(i);
                    self.merge_existing(cycle, c, i);
                }
                None => match cycle.moved_from(&c) {
                    Some(i) => {
                        info!(
                            "{} has the audio of {}, keeping its record",
                            c.track.path.display(),
                            cycle.existing[i].path.display()
                        );
                        cycle.matched.insert(i);
                        self.merge_existing(cycle, c, i);
                    }
                    None => self.merge_new(cycle, c),
                },
            }
        }
    }

    fn merge_existing(&self, cycle: &mut ScanCycle, c: Candidate, idx: usize) {
        let existing = cycle.existing[idx].clone();
        let Candidate { mut track, identity } = c;
        apply_identity(&mut track, &identity);
        track.copy_owned_from(&existing);

        match &existing.guid {
            Some(g) if !identity.guid_from_file || *g != identity.guid => {
                if let Err(e) = self.resolver.stamp_guid(&track.path, g) {
                    warn!("Could not restore GUID into {}: {}", track.path.display(), e);
                }
            }
            None if !identity.guid_from_file => self.adopt_identity(&mut track),
            _ => {}
        }

        cycle.claim(&track);
        if track == existing {
            cycle.report.unchanged += 1;
        } else {
            debug!("Updating {}", track.path.display());
            cycle.updates.push((existing.key(), track));
        }
    }

    /// A catalog record known only by path gets the identity its file is now stamped with.
    fn adopt_identity(&self, track: &mut Track) {
        match self.resolver.resolve(&track.path, true) {
            Ok(identity) if identity.write_error.is_none() => {
                track.guid = Some(identity.guid);
                if track.audio_checksum.is_none() {
                    track.audio_checksum = identity.checksum;
                }
                if track.embedded_created_at.is_none() {
                    track.embedded_created_at = identity.created_at;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not stamp {}: {}", track.path.display(), e),
        }
    }

    fn merge_new(&self, cycle: &mut ScanCycle, c: Candidate) {
        let Candidate { mut track, identity } = c;

        let guid_dup = identity.guid_from_file && cycle.guid_taken(&identity.guid);
        if guid_dup || cycle.checksum_taken(identity.checksum.as_deref()) {
            warn!(
                "{} duplicates an existing track ({}), not adding it",
                track.path.display(),
                if guid_dup { "same GUID" } else { "same audio" }
            );
            cycle.seen_paths.insert(track.path.clone());
            cycle.report.duplicates.push(track.path);
            return;
        }

        let identity = match self.resolver.resolve(&track.path, true) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Skipping {}: {}", track.path.display(), e);
                cycle.report.skipped += 1;
                cycle.protect_if_present(track.path);
                return;
            }
        };
        apply_identity(&mut track, &identity);
        track.guid = Some(identity.guid.clone());

        if let Some(content) = identity.frames.content.as_deref().filter(|s| !s.trim().is_empty()) {
            track.content = Some(content.to_string());
            track.normalized_content = Some(normalize_text(content));
        }

        debug!("Adding {} as {}", track.path.display(), identity.guid);
        cycle.claim(&track);
        cycle.inserts.push(track);
    }

    fn write_changes(&mut self, cycle: &mut ScanCycle) -> Result<(), ScanError> {
        if !cycle.inserts.is_empty() {
            self.store
                .insert_many(&cycle.inserts)
                .inspect_err(|e| error!("Cannot insert new tracks: {e}"))?;
            cycle.report.inserted = cycle.inserts.len();
        }
        if !cycle.updates.is_empty() {
            self.store
                .update_many(&cycle.updates)
                .inspect_err(|e| error!("Cannot update tracks: {e}"))?;
            cycle.report.updated = cycle.updates.len();
        }
        Ok(())
    }

    fn cleanup(&mut self, cycle: &mut ScanCycle) {
        let existing = cycle.existing.len();
        let candidates = cycle.report.candidates;
        if existing > 0 && candidates * 2 < existing {
            warn!(
                "Only {candidates} file(s) found for {existing} catalog track(s); skipping cleanup"
            );
            cycle.report.guard_tripped = true;
            return;
        }

        let gone: Vec<TrackKey> = cycle
            .existing
            .iter()
            .enumerate()
            .filter(|(i, r)| {
                !cycle.matched.contains(i) && !cycle.is_seen(r) && !cycle.protected.contains(&r.path)
            })
            .map(|(_, r)| r.key())
            .collect();
        cycle.enter(ScanPhase::Cleanup, gone.len());
        if gone.is_empty() {
            return;
        }
        for key in &gone {
            debug!("Removing {key:?}");
        }
        match self.store.delete_many(&gone) {
            Ok(n) => cycle.report.deleted = n,
            Err(e) => error!("Cleanup aborted, nothing removed: {e}"),
        }
    }

    fn rebuild_aggregates(&mut self, cycle: &ScanCycle) {
        cycle.enter(ScanPhase::Aggregate, 0);
        let result = self
            .store
            .all()
            .and_then(|tracks| self.store.replace_aggregates(aggregate::rebuild(&tracks)));
        if let Err(e) = result {
            error!("Cannot rebuild aggregates: {e}");
        }
    }
}

/// Copy what the identity pass learned onto a gathered record.
fn apply_identity(track: &mut Track, identity: &Identity) {
    if identity.guid_from_file {
        track.guid = Some(identity.guid.clone());
    }
    track.audio_checksum = identity.checksum.clone();
    track.embedded_created_at = identity.created_at;
    if track.duration_ms.is_none() {
        track.duration_ms = identity.frames.duration_ms();
    }
}
