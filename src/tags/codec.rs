//! File-level read/write of custom frames.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use id3::frame::ExtendedText;
use id3::{ErrorKind, Tag, TagLike};
use log::{debug, warn};

use super::TagError;
use super::header::{HEADER_LEN, TagHeader, TagVersion};
use super::names::{FrameName, FrameValues, sanitize_value};

/// Read and decode the tag of `path`.
///
/// `Ok(None)` means the file has no ID3v2 tag at all. Sub-versions other than
/// 2.3 and 2.4 are refused before the tag body is decoded.
pub(super) fn load_tag(path: &Path) -> Result<Option<(TagVersion, Tag)>, TagError> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    let mut head = Vec::with_capacity(HEADER_LEN);
    (&mut file).take(HEADER_LEN as u64).read_to_end(&mut head)?;
    let Some(header) = TagHeader::parse(&head) else {
        return Ok(None);
    };
    let version = header.version()?;
    if header.audio_offset() > len {
        return Err(TagError::Malformed("tag overruns file".to_string()));
    }

    match Tag::read_from_path(path) {
        Ok(tag) => Ok(Some((version, tag))),
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read every known frame of `path` in one pass.
///
/// Only I/O failures are errors. A missing, unsupported or damaged tag reads
/// as "no frames".
pub fn read_frames(path: &Path) -> Result<FrameValues, TagError> {
    let mut values = FrameValues::default();
    match load_tag(path) {
        Ok(Some((_, tag))) => {
            for text in tag.extended_texts() {
                values.fill(&text.description, text.value.clone());
            }
        }
        Ok(None) => {}
        Err(TagError::Io(e)) => return Err(TagError::Io(e)),
        Err(e) => debug!("Ignoring unreadable tag in {}: {}", path.display(), e),
    }
    Ok(values)
}

/// Value of the user-text frame `name`, or `None` if absent or unreadable.
pub fn read_frame(path: &Path, name: &str) -> Option<String> {
    match load_tag(path) {
        Ok(loaded) => {
            let (_, tag) = loaded?;
            tag.extended_texts()
                .find(|text| text.description == name)
                .map(|text| text.value.clone())
        }
        Err(e) => {
            debug!("Cannot read frame {} from {}: {}", name, path.display(), e);
            None
        }
    }
}

/// Replace the user-text frame `name` with `value` and commit atomically.
pub fn write_frame(path: &Path, name: &str, value: &str) -> Result<(), TagError> {
    write_frames(path, &[(name, value)])
}

/// Replace several user-text frames in a single atomic commit.
///
/// Every existing frame with a given name is removed first, so at most one
/// remains afterwards. Values are sanitized; a value that sanitizes to an
/// empty string removes the frame. Untagged files get a new v2.4 tag.
pub fn write_frames<N, V>(path: &Path, entries: &[(N, V)]) -> Result<(), TagError>
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let (version, mut tag) = load_tag(path)?.unwrap_or_else(|| (TagVersion::V24, Tag::new()));

    for (name, value) in entries {
        let name = name.as_ref();
        let existing = tag
            .extended_texts()
            .filter(|text| text.description == name)
            .count();
        if existing > 1 {
            warn!(
                "Collapsed {} duplicate {} frames in {}",
                existing,
                name,
                path.display()
            );
        }
        tag.remove_extended_text(Some(name), None);

        let value = sanitize_value(value.as_ref());
        if !value.is_empty() {
            tag.add_frame(ExtendedText {
                description: name.to_string(),
                value,
            });
        }
    }

    commit(path, &tag, version)?;
    debug!("Wrote {} frame(s) to {}", entries.len(), path.display());
    Ok(())
}

/// Convenience for callers that work with [`FrameName`].
pub fn write_named_frames(path: &Path, entries: &[(FrameName, String)]) -> Result<(), TagError> {
    let entries: Vec<(&str, &str)> = entries
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    write_frames(path, &entries)
}

/// Copy `path` into a temp file next to it, write `tag` into the copy, then
/// rename the copy over `path`.
fn commit(path: &Path, tag: &Tag, version: TagVersion) -> Result<(), TagError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = tempfile::Builder::new()
        .prefix(".tracksync-")
        .tempfile_in(dir)?;
    fs::copy(path, tmp.path())?;
    tag.write_to_path(tmp.path(), version.id3())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TagError::Io(e.error))?;
    Ok(())
}

impl From<id3::Error> for TagError {
    fn from(err: id3::Error) -> Self {
        match err.kind {
            ErrorKind::Io(e) => TagError::Io(e),
            _ => TagError::Malformed(err.description),
        }
    }
}
