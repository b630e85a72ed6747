//! Tree objects: ordered directory listings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::objects::id::{self, ObjectId};
use crate::objects::mode::FileMode;

/// One `(mode, name, id)` row of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub mode: FileMode,
    /// NUL-free file name, kept as raw bytes.
    pub name: Vec<u8>,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl Into<Vec<u8>>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    /// Git's tree order: an entry sorts by its name with `/` appended when
    /// it names a subtree, so `lib-a` comes before the directory `lib`.
    /// Entries with equal keys order shorter name first.
    pub fn order(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        let common = a.name.len().min(b.name.len());
        a.name[..common]
            .cmp(&b.name[..common])
            .then_with(|| {
                let a_next = a.name.get(common).copied().or_else(|| a.mode.is_tree().then_some(b'/'));
                let b_next = b.name.get(common).copied().or_else(|| b.mode.is_tree().then_some(b'/'));
                a_next.cmp(&b_next)
            })
            .then_with(|| a.name.len().cmp(&b.name.len()))
    }
}

/// An ordered list of entries. Serialization always emits sorted output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }

    /// Concatenated `"<octal-mode> <name>\0<20-byte-id>"` rows in tree order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut sorted: Vec<&TreeEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| TreeEntry::order(a, b));

        let mut data = Vec::new();
        for entry in sorted {
            data.extend_from_slice(entry.mode.as_octal().as_bytes());
            data.push(b' ');
            data.extend_from_slice(&entry.name);
            data.push(0);
            data.extend_from_slice(entry.id.as_bytes());
        }
        data
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let space = data[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or(Error::InvalidFormat)?;
            let mode = FileMode::from_octal(&data[pos..pos + space])?;
            pos += space + 1;

            let nul = data[pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(Error::InvalidFormat)?;
            let name = data[pos..pos + nul].to_vec();
            if name.is_empty() {
                return Err(Error::InvalidFormat);
            }
            pos += nul + 1;

            if pos + id::RAW_LEN > data.len() {
                return Err(Error::UnexpectedEndOfFile);
            }
            let id = ObjectId::from_bytes(&data[pos..pos + id::RAW_LEN])?;
            pos += id::RAW_LEN;

            entries.push(TreeEntry { mode, name, id });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
