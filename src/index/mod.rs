//! The index ("staging area") container.
//!
//! File layout: a 12-byte header (`DIRC`, version, entry count), the
//! entries, the extensions, then a checksum over everything preceding it.
//! The writer reproduces a parsed file byte for byte, checksum included.

use std::marker::PhantomData;

use log::debug;
use sha1::{Digest, Sha1};

use crate::errors::{Error, Result};
use crate::hash::Hasher;

pub mod entry;
pub mod extension;

pub use entry::{EntryKind, EntryMode, IndexEntry, MergeStage};
pub use extension::Extension;

pub const SIGNATURE: [u8; 4] = *b"DIRC";

const HEADER_LEN: usize = 12;

/// A parsed index file. Generic over the hash algorithm used for the
/// trailing checksum; SHA-1 matches Git's on-disk format.
#[derive(Debug, Clone)]
pub struct Index<D: Digest = Sha1> {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
    pub extensions: Vec<Extension>,
    sparse: bool,
    _hash: PhantomData<D>,
}

impl<D: Digest> Index<D> {
    /// An empty index for `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            entries: Vec::new(),
            extensions: Vec::new(),
            sparse: false,
            _hash: PhantomData,
        }
    }

    /// Whether an `sdir` extension marked this index as containing
    /// sparse-directory entries.
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Parse a complete index file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let digest_len = Hasher::<D>::digest_len();
        if data.len() < HEADER_LEN + digest_len {
            return Err(Error::UnexpectedEndOfFile);
        }
        if data[..4] != SIGNATURE {
            return Err(Error::InvalidSignature);
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if !(2..=4).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        let entry_count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let trailer_start = data.len() - digest_len;
        let body = &data[..trailer_start];

        let mut entries = Vec::with_capacity(entry_count.min(u16::MAX as u32) as usize);
        let mut pos = HEADER_LEN;
        for _ in 0..entry_count {
            let (entry, consumed) = IndexEntry::parse(&body[pos..], version)?;
            pos += consumed;
            entries.push(entry);
        }

        let mut extensions = Vec::new();
        let mut sparse = false;
        while pos < trailer_start {
            let (extension, consumed) = Extension::parse(&body[pos..])?;
            pos += consumed;
            if extension == Extension::SparseDirectories {
                sparse = true;
            }
            extensions.push(extension);
        }
        if pos != trailer_start {
            return Err(Error::InvalidFormat);
        }

        let computed = Hasher::<D>::hash_data(body);
        if computed != data[trailer_start..] {
            return Err(Error::InvalidChecksum);
        }

        debug!(
            "parsed index v{version}: {} entries, {} extensions",
            entries.len(),
            extensions.len()
        );
        Ok(Self {
            version,
            entries,
            extensions,
            sparse,
            _hash: PhantomData,
        })
    }

    /// Serialize to the on-disk form, recomputing the trailing checksum.
    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&SIGNATURE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in &self.entries {
            entry.write(self.version, &mut out);
        }
        for extension in &self.extensions {
            extension.write(&mut out);
        }

        let checksum = Hasher::<D>::hash_data(&out);
        out.extend_from_slice(&checksum);
        out
    }

    /// Restore the sort invariant: ascending path bytes, stage breaking
    /// ties.
    pub fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| IndexEntry::order(a, b));
    }

    /// Whether `path` is tracked (at any stage).
    pub fn contains(&self, path: &[u8]) -> bool {
        self.entries
            .binary_search_by(|entry| entry.path.as_slice().cmp(path))
            .is_ok()
    }

    /// Whether some tracked entry lives under the directory `prefix`.
    /// With `tracked_only`, conflicted entries (stage > 0) are ignored.
    pub fn contains_prefix(&self, prefix: &[u8], tracked_only: bool) -> bool {
        let mut needle = prefix.to_vec();
        needle.push(b'/');
        self.entries.iter().any(|entry| {
            entry.path.starts_with(&needle)
                && (!tracked_only || entry.stage == MergeStage::None)
        })
    }
}

impl<D: Digest> Default for Index<D> {
    fn default() -> Self {
        Self::new(2)
    }
}

// Manual impls keep the digest parameter free of comparison bounds.
impl<D: Digest> PartialEq for Index<D> {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.entries == other.entries
            && self.extensions == other.extensions
            && self.sparse == other.sparse
    }
}

impl<D: Digest> Eq for Index<D> {}

#[cfg(test)]
mod tests {
    use crate::objects::ObjectId;

    use super::*;

    fn sample_id() -> ObjectId {
        ObjectId::from_hex("0123456789abcdeffedcba98765432100f1e2d3c").unwrap()
    }

    fn sample_index(version: u32) -> Index {
        let mut index = Index::new(version);
        let mut entry = IndexEntry::new("test.txt", sample_id(), EntryMode::regular(false));
        entry.file_size = 2;
        entry.assume_valid = true;
        index.entries.push(entry);
        index
    }

    #[test]
    fn test_single_entry_file_is_104_bytes() {
        // 12-byte header + 72-byte entry + 20-byte trailer.
        let bytes = sample_index(2).write();
        assert_eq!(bytes.len(), 104);
        assert_eq!(&bytes[..4], b"DIRC");
    }

    #[test]
    fn test_round_trip_including_checksum() {
        for version in [2, 3, 4] {
            let mut index = sample_index(version);
            let mut conflicted =
                IndexEntry::new("z-conflict", sample_id(), EntryMode::regular(true));
            conflicted.stage = MergeStage::Ours;
            index.entries.push(conflicted);
            index.extensions.push(Extension::Unknown {
                signature: *b"TREE",
                payload: b"opaque".to_vec(),
            });

            let bytes = index.write();
            let parsed = Index::<Sha1>::parse(&bytes).unwrap();
            assert_eq!(parsed, index);
            assert_eq!(parsed.write(), bytes, "version {version} round trip");
        }
    }

    #[test]
    fn test_parsed_entry_fields() {
        let bytes = sample_index(2).write();
        let parsed = Index::<Sha1>::parse(&bytes).unwrap();
        let entry = &parsed.entries[0];
        assert_eq!(entry.path, b"test.txt");
        assert_eq!(entry.file_size, 2);
        assert_eq!(entry.mode.bits(), 0o100644 as u16);
        assert_eq!(entry.id, sample_id());
        assert!(entry.assume_valid);
        assert_eq!(entry.stage, MergeStage::None);
    }

    #[test]
    fn test_entry_padding_multiple_of_eight() {
        for version in [2, 3] {
            let bytes = sample_index(version).write();
            let entry_section = bytes.len() - HEADER_LEN - 20;
            assert_eq!(entry_section % 8, 0, "version {version}");
        }
        // Version 4 ends each entry at its NUL terminator.
        let bytes = sample_index(4).write();
        assert_eq!(bytes.len(), HEADER_LEN + 62 + 8 + 1 + 20);
    }

    #[test]
    fn test_checksum_corruption_detected() {
        let mut bytes = sample_index(2).write();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            Index::<Sha1>::parse(&bytes),
            Err(Error::InvalidChecksum)
        ));
    }

    #[test]
    fn test_body_corruption_detected() {
        let mut bytes = sample_index(2).write();
        bytes[40] ^= 0xff;
        assert!(matches!(
            Index::<Sha1>::parse(&bytes),
            Err(Error::InvalidChecksum)
        ));
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = sample_index(2).write();
        bytes[0] = b'X';
        assert!(matches!(
            Index::<Sha1>::parse(&bytes),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut index = sample_index(2);
        index.version = 5;
        let bytes = index.write();
        assert!(matches!(
            Index::<Sha1>::parse(&bytes),
            Err(Error::UnsupportedVersion(5))
        ));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = sample_index(2).write();
        assert!(matches!(
            Index::<Sha1>::parse(&bytes[..8]),
            Err(Error::UnexpectedEndOfFile)
        ));
        // Cutting into the entry leaves the trailer start inside it.
        assert!(Index::<Sha1>::parse(&bytes[..50]).is_err());
    }

    #[test]
    fn test_sparse_marker() {
        let mut index = sample_index(2);
        index.extensions.push(Extension::SparseDirectories);
        let parsed = Index::<Sha1>::parse(&index.write()).unwrap();
        assert!(parsed.is_sparse());
        assert!(!sample_index(2).is_sparse());
    }

    #[test]
    fn test_mandatory_extension_aborts() {
        let mut index = sample_index(2);
        index.extensions.push(Extension::Unknown {
            signature: *b"link",
            payload: Vec::new(),
        });
        assert!(matches!(
            Index::<Sha1>::parse(&index.write()),
            Err(Error::UnknownExtension(_))
        ));
    }

    #[test]
    fn test_lookup_helpers() {
        let mut index = sample_index(2);
        index
            .entries
            .push(IndexEntry::new("lib/a.c", sample_id(), EntryMode::regular(false)));
        index
            .entries
            .push(IndexEntry::new("lib/b.c", sample_id(), EntryMode::regular(false)));
        index.sort_entries();

        assert!(index.contains(b"test.txt"));
        assert!(index.contains(b"lib/a.c"));
        assert!(!index.contains(b"lib"));
        assert!(index.contains_prefix(b"lib", true));
        assert!(!index.contains_prefix(b"li", true));
        assert!(!index.contains_prefix(b"test.txt", true));
    }

    #[test]
    fn test_contains_prefix_tracked_only() {
        let mut index = Index::<Sha1>::new(2);
        let mut conflicted =
            IndexEntry::new("dir/file", sample_id(), EntryMode::regular(false));
        conflicted.stage = MergeStage::Theirs;
        index.entries.push(conflicted);

        assert!(index.contains_prefix(b"dir", false));
        assert!(!index.contains_prefix(b"dir", true));
    }

    #[test]
    fn test_sort_restores_invariant() {
        let mut index = Index::<Sha1>::new(2);
        index
            .entries
            .push(IndexEntry::new("b", sample_id(), EntryMode::regular(false)));
        index
            .entries
            .push(IndexEntry::new("a", sample_id(), EntryMode::regular(false)));
        index.sort_entries();
        assert_eq!(index.entries[0].path, b"a");
    }
}
