//! ID3v2 header fields the crate reads itself, and the two supported sub-versions.

use id3::Version;

use super::TagError;

/// Length of the fixed ID3v2 header (and of the optional v2.4 footer).
pub const HEADER_LEN: usize = 10;

/// Marker that opens every ID3v2 tag.
pub const MAGIC: &[u8; 3] = b"ID3";

const FLAG_FOOTER: u8 = 0x10;

/// Decode a 4-byte syncsafe integer (7 significant bits per byte, MSB ignored).
pub fn decode_syncsafe(bytes: [u8; 4]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, b| (acc << 7) | u32::from(b & 0x7f))
}

/// The container sub-versions the codec reads and writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TagVersion {
    V23,
    V24,
}

impl TagVersion {
    pub fn from_major(major: u8) -> Result<Self, TagError> {
        match major {
            3 => Ok(Self::V23),
            4 => Ok(Self::V24),
            other => Err(TagError::UnsupportedVersion(other)),
        }
    }

    pub fn major(self) -> u8 {
        match self {
            Self::V23 => 3,
            Self::V24 => 4,
        }
    }

    pub(crate) fn id3(self) -> Version {
        match self {
            Self::V23 => Version::Id3v23,
            Self::V24 => Version::Id3v24,
        }
    }
}

/// The fixed 10-byte header at the start of a tagged file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TagHeader {
    pub major: u8,
    pub flags: u8,
    /// Size of the tag region following the header (excludes header and footer).
    pub size: u32,
}

impl TagHeader {
    /// Parse a header from the first bytes of a file.
    ///
    /// Returns `None` when fewer than 10 bytes are available or the marker is missing.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..3] != MAGIC {
            return None;
        }
        Some(Self {
            major: bytes[3],
            flags: bytes[5],
            size: decode_syncsafe([bytes[6], bytes[7], bytes[8], bytes[9]]),
        })
    }

    pub fn version(&self) -> Result<TagVersion, TagError> {
        TagVersion::from_major(self.major)
    }

    pub fn has_footer(&self) -> bool {
        self.major == 4 && self.flags & FLAG_FOOTER != 0
    }

    /// Byte offset at which the audio payload starts.
    pub fn audio_offset(&self) -> u64 {
        let footer = if self.has_footer() { HEADER_LEN as u64 } else { 0 };
        HEADER_LEN as u64 + u64::from(self.size) + footer
    }
}
