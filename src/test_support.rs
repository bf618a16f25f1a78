//! Builders for synthetic tagged files used across the test suites.

use std::fs;
use std::path::{Path, PathBuf};

/// 4-byte syncsafe encoding of `value` (must fit in 28 bits).
pub fn syncsafe(value: u32) -> [u8; 4] {
    assert!(value <= 0x0FFF_FFFF, "syncsafe overflow: {value}");
    [
        ((value >> 21) & 0x7f) as u8,
        ((value >> 14) & 0x7f) as u8,
        ((value >> 7) & 0x7f) as u8,
        (value & 0x7f) as u8,
    ]
}

/// A Latin-1 `TXXX` frame for the given major version.
pub fn txxx(major: u8, name: &str, value: &str) -> Vec<u8> {
    let mut body = vec![0u8];
    body.extend_from_slice(name.as_bytes());
    body.push(0);
    body.extend_from_slice(value.as_bytes());
    raw_frame(major, b"TXXX", &body)
}

/// Any frame with an arbitrary body.
pub fn raw_frame(major: u8, id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let size = body.len() as u32;
    let mut frame = id.to_vec();
    if major == 4 {
        frame.extend_from_slice(&syncsafe(size));
    } else {
        frame.extend_from_slice(&size.to_be_bytes());
    }
    frame.extend_from_slice(&[0, 0]);
    frame.extend_from_slice(body);
    frame
}

/// Header + frames + zero padding + audio bytes.
pub fn tagged(major: u8, frames: &[Vec<u8>], padding: usize, audio: &[u8]) -> Vec<u8> {
    let mut region = frames.concat();
    region.resize(region.len() + padding, 0);
    let mut out = b"ID3".to_vec();
    out.extend_from_slice(&[major, 0, 0]);
    out.extend_from_slice(&syncsafe(region.len() as u32));
    out.extend_from_slice(&region);
    out.extend_from_slice(audio);
    out
}

/// Fake MPEG payload; not decodable, but stable bytes for hashing.
pub fn audio_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// A v2.4 file carrying the given frames.
pub fn mp3_with_frames(dir: &Path, name: &str, frames: &[(&str, &str)], seed: u8) -> PathBuf {
    let frames: Vec<Vec<u8>> = frames.iter().map(|(n, v)| txxx(4, n, v)).collect();
    write_file(dir, name, &tagged(4, &frames, 256, &audio_bytes(seed, 4096)))
}
