//! Tag codec: custom user-text frames inside ID3v2 containers.
//!
//! This module reads and writes a small fixed set of `TXXX` frames
//! (see [`FrameName`]), computes an MD5 over the audio payload that ignores the
//! tag region, and parses creation timestamps out of file names.
//!
//! Frames are decoded and re-encoded with the `id3` crate. ID3v2.3 and ID3v2.4
//! are selected through one [`TagVersion`] enum; callers never need to know
//! which sub-version a file uses.

mod checksum;
mod codec;
mod header;
mod names;
mod timestamp;

use thiserror::Error;

pub use checksum::compute_audio_checksum;
pub use codec::{read_frame, read_frames, write_frame, write_frames, write_named_frames};
pub use header::{TagVersion, decode_syncsafe};
pub use names::{
    FrameName, FrameValues, format_duration_secs, parse_duration_secs, sanitize_value,
};
pub use timestamp::{
    DEFAULT_TIMESTAMP_PREFIX, format_created_on, parse_created_on_date, parse_created_on_ts,
    parse_timestamp_from_filename,
};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported ID3v2 major version {0}")]
    UnsupportedVersion(u8),

    #[error("malformed tag: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests;
