//! zlib compression helpers for loose-object storage.
//!
//! Git requires loose objects to be stored as zlib streams (RFC 1950).
//! Both directions run through `flate2` and enforce the per-object size
//! cap, so a corrupt or hostile stream cannot balloon past it.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::errors::{Error, Result};

/// Hard cap on a single object's payload, compressed input, and index file.
pub const MAX_FILE_SIZE: u64 = 1 << 30;

/// Deflate `data` into a zlib stream written to `writer`.
pub fn deflate_to<W: Write>(data: &[u8], writer: W) -> Result<W> {
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Deflate `data` into a fresh buffer.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    deflate_to(data, Vec::new())
}

/// Inflate a zlib stream, failing with `ObjectTooLarge` past the cap.
pub fn inflate_from<R: Read>(reader: R) -> Result<Vec<u8>> {
    read_capped(ZlibDecoder::new(reader))
}

/// Read `reader` to the end, failing with `ObjectTooLarge` past the cap.
pub fn read_capped<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.take(MAX_FILE_SIZE + 1).read_to_end(&mut data)?;
    if data.len() as u64 > MAX_FILE_SIZE {
        return Err(Error::ObjectTooLarge(data.len() as u64));
    }
    Ok(data)
}
