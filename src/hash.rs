//! Hashing primitives for object identity and checksums.
//!
//! Everything on disk is pinned to SHA-1 for bit-exact Git compatibility;
//! [`Hasher`] is generic over the digest algorithm so a SHA-256 object
//! format only has to swap the type parameter.

use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};

/// Streaming hasher over any RustCrypto digest, defaulting to SHA-1.
pub struct Hasher<D: Digest = Sha1> {
    inner: D,
}

impl<D: Digest> Hasher<D> {
    pub fn new() -> Self {
        Self { inner: D::new() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Vec<u8> {
        self.inner.finalize().to_vec()
    }

    /// Digest length in bytes (20 for SHA-1, 32 for SHA-256).
    pub fn digest_len() -> usize {
        <D as Digest>::output_size()
    }

    /// One-shot convenience over the streaming interface.
    pub fn hash_data(data: &[u8]) -> Vec<u8> {
        D::digest(data).to_vec()
    }
}

impl<D: Digest> Default for Hasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-1 over `data`, as used for object identity and index checksums.
pub fn sha1_hash(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Lowercase hex rendering of a digest.
pub fn to_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}

/// Decode `hex_str` into `out`, which must be exactly half its length.
///
/// `out` is never left half-written: on any failure it is zero-filled.
pub fn parse_hex(hex_str: &str, out: &mut [u8]) -> Result<()> {
    out.fill(0);
    if hex_str.len() != out.len() * 2 {
        return Err(Error::InvalidBufferLength(hex_str.len()));
    }
    let bytes = hex_str.as_bytes();
    let mut decoded = vec![0u8; out.len()];
    for (i, slot) in decoded.iter_mut().enumerate() {
        let hi = hex_value(bytes[i * 2])?;
        let lo = hex_value(bytes[i * 2 + 1])?;
        *slot = hi << 4 | lo;
    }
    out.copy_from_slice(&decoded);
    Ok(())
}

fn hex_value(byte: u8) -> Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(Error::InvalidHexCharacter(byte as char)),
    }
}
