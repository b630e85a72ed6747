//! Loose-object framing.
//!
//! The encoded form is `"<type> <decimal-length>\0<payload>"`. Object
//! identity is SHA-1 over this frame, not over the payload alone, so both
//! sides of the codec live next to each other here.

use std::fmt;

use crate::errors::{Error, Result};
use crate::hash::sha1_hash;
use crate::objects::{ObjectId, ObjectType};

/// Optional verification performed during [`decode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeOpts {
    /// Require this kind, or fail with `TypeMismatch`.
    pub expected_type: Option<ObjectType>,
    /// Recompute SHA-1 over the whole frame and require this identifier.
    pub expected_id: Option<ObjectId>,
    /// Keep an unrecognised type tag instead of failing with `UnknownType`.
    pub allow_unknown_type: bool,
}

/// A type tag as found in an encoded header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Known(ObjectType),
    Unknown(String),
}

impl TypeTag {
    pub fn name(&self) -> &str {
        match self {
            TypeTag::Known(typ) => typ.name(),
            TypeTag::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a successful [`decode`]: the payload slice plus its header.
#[derive(Debug)]
pub struct DecodedObject<'a> {
    pub typ: TypeTag,
    pub len: usize,
    pub data: &'a [u8],
}

/// Frame a payload as `"<type> <len>\0<payload>"`.
pub fn encode(typ: ObjectType, payload: &[u8]) -> Vec<u8> {
    let header = format!("{} {}\0", typ.name(), payload.len());
    let mut data = Vec::with_capacity(header.len() + payload.len());
    data.extend_from_slice(header.as_bytes());
    data.extend_from_slice(payload);
    data
}

/// Identifier of a payload: SHA-1 over its encoded frame.
pub fn object_id(typ: ObjectType, payload: &[u8]) -> ObjectId {
    ObjectId::from_array(sha1_hash(&encode(typ, payload)))
}

/// Split and verify an encoded frame.
pub fn decode<'a>(data: &'a [u8], opts: &DecodeOpts) -> Result<DecodedObject<'a>> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::MissingHeader)?;
    let header = &data[..nul];
    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or(Error::MalformedHeader)?;

    let type_bytes = &header[..space];
    let len_bytes = &header[space + 1..];
    let content = &data[nul + 1..];

    if let Some(expected) = opts.expected_id {
        let computed = ObjectId::from_array(sha1_hash(data));
        if computed != expected {
            return Err(Error::ObjectIdMismatch {
                expected: expected.to_hex(),
                computed: computed.to_hex(),
            });
        }
    }

    let type_str = std::str::from_utf8(type_bytes).map_err(|_| Error::MalformedHeader)?;
    let typ = match ObjectType::from_name(type_str) {
        Some(known) => TypeTag::Known(known),
        None if opts.allow_unknown_type => TypeTag::Unknown(type_str.to_string()),
        None => return Err(Error::UnknownType(type_str.to_string())),
    };

    if let Some(expected) = opts.expected_type {
        if typ != TypeTag::Known(expected) {
            return Err(Error::TypeMismatch {
                expected: expected.name().to_string(),
                found: typ.name().to_string(),
            });
        }
    }

    let len: usize = std::str::from_utf8(len_bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::BadLength)?;
    if len != content.len() {
        return Err(Error::LengthMismatch);
    }

    Ok(DecodedObject {
        typ,
        len,
        data: content,
    })
}
