use std::path::Path;

use log::{debug, warn};

use crate::tags::{
    self, FrameName, FrameValues, format_created_on, parse_created_on_date, parse_created_on_ts,
    parse_timestamp_from_filename,
};

use super::IdentityError;
use super::guid::{new_guid, normalize_checksum, normalize_guid};

/// Identity and derived fields of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Canonical GUID; freshly generated when the file carried none.
    pub guid: String,
    /// Whether `guid` was read from the file (as opposed to generated now).
    pub guid_from_file: bool,
    pub checksum: Option<String>,
    /// Unix seconds, from the tag or the file name.
    pub created_at: Option<i64>,
    /// Frame values as read, updated with whatever was persisted by this call.
    pub frames: FrameValues,
    /// Frames written to the file by this call.
    pub writes: usize,
    pub write_error: Option<String>,
}

/// Stamps files with a durable identity.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    timestamp_prefix: String,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(tags::DEFAULT_TIMESTAMP_PREFIX)
    }
}

impl IdentityResolver {
    pub fn new(timestamp_prefix: impl Into<String>) -> Self {
        Self {
            timestamp_prefix: timestamp_prefix.into(),
        }
    }

    /// Resolve the identity of `path`.
    ///
    /// With `write_back` every missing (or non-canonical) GUID, checksum and
    /// timestamp frame is persisted in one commit. Values already present are
    /// never regenerated, so a second call on an unmodified file writes nothing.
    /// A failed write is logged and recorded in `write_error`; the in-memory
    /// identity is still returned.
    pub fn resolve(&self, path: &Path, write_back: bool) -> Result<Identity, IdentityError> {
        if !path.is_file() {
            return Err(IdentityError::NotAFile(path.to_path_buf()));
        }
        let mut frames = tags::read_frames(path).map_err(|source| IdentityError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut pending: Vec<(FrameName, String)> = Vec::new();

        let stored_guid = frames.guid.as_deref().and_then(normalize_guid);
        let guid_from_file = stored_guid.is_some();
        let guid = match stored_guid {
            Some(g) => {
                if frames.guid.as_deref() != Some(g.as_str()) {
                    pending.push((FrameName::Guid, g.clone()));
                }
                g
            }
            None => {
                if let Some(bad) = frames.guid.as_deref() {
                    warn!("Malformed GUID {:?} in {}, replacing", bad, path.display());
                }
                let g = new_guid();
                pending.push((FrameName::Guid, g.clone()));
                g
            }
        };

        let stored_checksum = frames
            .checksum_md5_audio
            .as_deref()
            .and_then(normalize_checksum);
        let checksum = match stored_checksum {
            Some(c) => {
                if frames.checksum_md5_audio.as_deref() != Some(c.as_str()) {
                    pending.push((FrameName::ChecksumMd5Audio, c.clone()));
                }
                Some(c)
            }
            None => {
                let c = tags::compute_audio_checksum(path);
                if let Some(c) = &c {
                    pending.push((FrameName::ChecksumMd5Audio, c.clone()));
                }
                c
            }
        };

        let created_at = match self.stored_created_at(&frames) {
            Some(ts) => Some(ts),
            None => {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                let ts = parse_timestamp_from_filename(name, &self.timestamp_prefix);
                if let Some((date, iso)) = ts.and_then(format_created_on) {
                    pending.push((FrameName::CreatedOnDate, date));
                    pending.push((FrameName::CreatedOnTs, iso));
                }
                ts
            }
        };

        let mut writes = 0;
        let mut write_error = None;
        if write_back && !pending.is_empty() {
            match tags::write_named_frames(path, &pending) {
                Ok(()) => {
                    writes = pending.len();
                    for (name, value) in pending {
                        frames.set(name, Some(value));
                    }
                    debug!("Stamped {} frame(s) into {}", writes, path.display());
                }
                Err(e) => {
                    warn!("Could not persist identity of {}: {}", path.display(), e);
                    write_error = Some(e.to_string());
                }
            }
        }

        Ok(Identity {
            guid,
            guid_from_file,
            checksum,
            created_at,
            frames,
            writes,
            write_error,
        })
    }

    /// Persist a GUID the catalog already owns, replacing whatever GUID the file carries.
    pub fn stamp_guid(&self, path: &Path, guid: &str) -> Result<(), IdentityError> {
        let guid = normalize_guid(guid).ok_or_else(|| IdentityError::InvalidGuid(guid.to_string()))?;
        tags::write_named_frames(path, &[(FrameName::Guid, guid)]).map_err(|source| {
            IdentityError::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    fn stored_created_at(&self, frames: &FrameValues) -> Option<i64> {
        frames
            .created_on_ts
            .as_deref()
            .and_then(parse_created_on_ts)
            .or_else(|| frames.created_on_date.as_deref().and_then(parse_created_on_date))
    }
}
