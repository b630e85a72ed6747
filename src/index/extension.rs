//! Index extension framing: 4-byte signature, big-endian size, payload.
//!
//! Only the sparse-directory marker is understood. Unknown extensions whose
//! signature starts with an ASCII uppercase letter are optional by Git's
//! convention, so they are carried opaquely and written back verbatim;
//! anything else is mandatory and must abort the read.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const SPARSE_DIR_SIGNATURE: [u8; 4] = *b"sdir";

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extension {
    /// `sdir`: the index contains sparse-directory entries. No payload.
    SparseDirectories,
    /// A tolerated extension we do not interpret.
    Unknown { signature: [u8; 4], payload: Vec<u8> },
}

impl Extension {
    pub fn signature(&self) -> [u8; 4] {
        match self {
            Extension::SparseDirectories => SPARSE_DIR_SIGNATURE,
            Extension::Unknown { signature, .. } => *signature,
        }
    }

    /// Parse one extension from the front of `data`, returning it with the
    /// number of bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_LEN {
            return Err(Error::UnexpectedEndOfFile);
        }
        let signature = [data[0], data[1], data[2], data[3]];
        let size = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
        if data.len() < HEADER_LEN + size {
            return Err(Error::UnexpectedEndOfFile);
        }
        let payload = &data[HEADER_LEN..HEADER_LEN + size];

        let extension = match &signature {
            b"sdir" => {
                if !payload.is_empty() {
                    return Err(Error::InvalidFormat);
                }
                Extension::SparseDirectories
            }
            _ if signature[0].is_ascii_uppercase() => Extension::Unknown {
                signature,
                payload: payload.to_vec(),
            },
            _ => {
                return Err(Error::UnknownExtension(
                    String::from_utf8_lossy(&signature).into_owned(),
                ))
            }
        };
        Ok((extension, HEADER_LEN + size))
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Extension::SparseDirectories => {
                out.extend_from_slice(&SPARSE_DIR_SIGNATURE);
                out.extend_from_slice(&0u32.to_be_bytes());
            }
            Extension::Unknown { signature, payload } => {
                out.extend_from_slice(signature);
                out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                out.extend_from_slice(payload);
            }
        }
    }
}
