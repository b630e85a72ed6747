//! Fixed-width binary object identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::hash;

/// Raw digest length of an identifier, in bytes.
pub const RAW_LEN: usize = 20;

/// Length of the hex rendering.
pub const HEX_LEN: usize = RAW_LEN * 2;

/// A 20-byte SHA-1 object name. Two identifiers are equal iff their byte
/// arrays are equal; ordering is plain byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; RAW_LEN]);

impl ObjectId {
    /// Parse from exactly 40 hex characters. Uppercase input is tolerated;
    /// output is always lowercase.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HEX_LEN {
            return Err(Error::InvalidHexLength(hex_str.len()));
        }
        let mut raw = [0u8; RAW_LEN];
        hash::parse_hex(hex_str, &mut raw)?;
        Ok(Self(raw))
    }

    /// Wrap a 20-byte slice; any other length is `InvalidBufferLength`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RAW_LEN {
            return Err(Error::InvalidBufferLength(bytes.len()));
        }
        let mut raw = [0u8; RAW_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    pub const fn from_array(raw: [u8; RAW_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hash::to_hex(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}
