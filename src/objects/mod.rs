//! The object model: four structured kinds behind one tagged union.
//!
//! Each kind owns its serialize/deserialize pair; [`Object`] dispatches over
//! them so the store and the operations layer never match on kinds
//! themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub mod blob;
pub mod commit;
pub mod id;
pub mod mode;
pub mod signature;
pub mod tag;
pub mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use id::ObjectId;
pub use mode::FileMode;
pub use signature::{Identity, Signature, Time};
pub use tag::Tag;
pub use tree::{Tree, TreeEntry};

/// The four object kinds. The text tags are exactly the names that appear
/// in encoded headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Blob,
    Commit,
    Tag,
    Tree,
}

impl ObjectType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blob" => Some(ObjectType::Blob),
            "commit" => Some(ObjectType::Commit),
            "tag" => Some(ObjectType::Tag),
            "tree" => Some(ObjectType::Tree),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
            ObjectType::Tree => "tree",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::InvalidType(s.to_string()))
    }
}

/// One object of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Object {
    Blob(Blob),
    Commit(Commit),
    Tag(Tag),
    Tree(Tree),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Blob(_) => ObjectType::Blob,
            Object::Commit(_) => ObjectType::Commit,
            Object::Tag(_) => ObjectType::Tag,
            Object::Tree(_) => ObjectType::Tree,
        }
    }

    /// The canonical payload bytes of this object.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Object::Blob(blob) => blob.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
            Object::Tree(tree) => tree.serialize(),
        }
    }

    /// Parse payload bytes through the canonical parser for `typ`.
    pub fn deserialize(typ: ObjectType, data: &[u8]) -> Result<Self> {
        match typ {
            ObjectType::Blob => Ok(Object::Blob(Blob::deserialize(data))),
            ObjectType::Commit => Ok(Object::Commit(Commit::deserialize(data)?)),
            ObjectType::Tag => Ok(Object::Tag(Tag::deserialize(data)?)),
            ObjectType::Tree => Ok(Object::Tree(Tree::deserialize(data)?)),
        }
    }

    /// Human-oriented rendering: trees become one `<mode> <type> <id>\t<name>`
    /// line per entry, everything else prints its payload verbatim.
    pub fn format(&self) -> Vec<u8> {
        match self {
            Object::Tree(tree) => {
                let mut out = Vec::new();
                for entry in &tree.entries {
                    out.extend_from_slice(
                        format!(
                            "{:06o} {} {}\t",
                            entry.mode.as_raw(),
                            entry.mode.object_type(),
                            entry.id
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(&entry.name);
                    out.push(b'\n');
                }
                out
            }
            other => other.serialize(),
        }
    }
}
