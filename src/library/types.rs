//! Scan-related small types and handles.
//!
//! Commands for the scan worker, the phases of a reconciliation cycle and
//! the shared progress handle.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum ScanCmd {
    /// Run one reconciliation cycle; publish progress when `progress` is set.
    Scan { progress: bool },
    /// Stop the worker once the current cycle is done.
    Quit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    GatherPrimary,
    GatherSecondary,
    Merge,
    Cleanup,
    Aggregate,
    Done,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::GatherPrimary => "gathering from media index",
            ScanPhase::GatherSecondary => "walking folders",
            ScanPhase::Merge => "merging",
            ScanPhase::Cleanup => "cleaning up",
            ScanPhase::Aggregate => "rebuilding aggregates",
            ScanPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Live view of the in-flight cycle, shared with callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    /// Items handled so far in the current phase.
    pub processed: usize,
    /// Items the current phase will handle, when known.
    pub total: usize,
}

pub type ProgressHandle = Arc<Mutex<ScanProgress>>;

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files gathered from both sources with a resolved identity.
    pub candidates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Files whose GUID or audio checksum was already claimed by another record.
    pub duplicates: Vec<PathBuf>,
    /// Files dropped from this cycle because they could not be read.
    pub skipped: usize,
    /// Cleanup was skipped because the scan looked implausibly small.
    pub guard_tripped: bool,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidate(s): {} inserted, {} updated, {} unchanged, {} deleted, {} duplicate(s), {} skipped",
            self.candidates,
            self.inserted,
            self.updated,
            self.unchanged,
            self.deleted,
            self.duplicates.len(),
            self.skipped
        )?;
        if self.guard_tripped {
            f.write_str(" (cleanup skipped: scan too small)")?;
        }
        Ok(())
    }
}
