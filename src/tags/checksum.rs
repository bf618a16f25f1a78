use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use super::header::{HEADER_LEN, TagHeader};

const CHUNK_SIZE: usize = 8 * 1024;

/// MD5 of the audio payload only, as 32 lowercase hex digits.
///
/// When the file opens with an ID3v2 header the tag region is skipped, so
/// rewriting tags never changes the result. Files without a header (or shorter
/// than one) are hashed whole. Returns `None` if the file cannot be read.
pub fn compute_audio_checksum(path: &Path) -> Option<String> {
    match File::open(path).and_then(checksum_reader) {
        Ok(hex) => Some(hex),
        Err(e) => {
            debug!("Audio checksum failed for {}: {}", path.display(), e);
            None
        }
    }
}

fn checksum_reader<R: Read + Seek>(mut reader: R) -> io::Result<String> {
    let mut head = [0u8; HEADER_LEN];
    let got = read_up_to(&mut reader, &mut head)?;

    let offset = TagHeader::parse(&head[..got])
        .map(|h| h.audio_offset())
        .unwrap_or(0);
    reader.seek(SeekFrom::Start(offset))?;

    let mut ctx = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
