//! Per-file index entry, bit-exact with Git index versions 2, 3 and 4.
//!
//! On-disk layout (big-endian throughout): a 62-byte fixed prefix of stat
//! data, hash and flags; two optional extended-flag bytes (version >= 3);
//! then the NUL-terminated path. Versions 2 and 3 pad each entry with NULs
//! to a multiple of eight bytes; version 4 ends at the terminator.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::objects::id::{self, ObjectId};

/// Size of the fixed-width portion preceding the path.
pub const ENTRY_FIXED_LEN: usize = 62;

/// Largest path length representable in the 12-bit name field; longer
/// names store this escape value and are read until NUL.
pub const NAME_LEN_MAX: u16 = 0xFFF;

const FLAG_ASSUME_VALID: u16 = 1 << 15;
const FLAG_EXTENDED: u16 = 1 << 14;
const STAGE_SHIFT: u16 = 12;

const EXT_FLAG_SKIP_WORKTREE: u16 = 1 << 14;
const EXT_FLAG_INTENT_TO_ADD: u16 = 1 << 13;

/// Conflict stage of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStage {
    #[default]
    None,
    Base,
    Ours,
    Theirs,
}

impl MergeStage {
    pub fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => MergeStage::None,
            1 => MergeStage::Base,
            2 => MergeStage::Ours,
            _ => MergeStage::Theirs,
        }
    }

    pub fn as_bits(self) -> u16 {
        match self {
            MergeStage::None => 0,
            MergeStage::Base => 1,
            MergeStage::Ours => 2,
            MergeStage::Theirs => 3,
        }
    }
}

/// The 4-bit object kind stored in an entry's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Regular,
    Symlink,
    Gitlink,
    /// Sparse-directory entry: the mode encodes a directory and the hash
    /// references a tree.
    Directory,
}

impl EntryKind {
    fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0b1000 => Some(EntryKind::Regular),
            0b1010 => Some(EntryKind::Symlink),
            0b1110 => Some(EntryKind::Gitlink),
            0b0100 => Some(EntryKind::Directory),
            _ => None,
        }
    }

    fn as_bits(self) -> u16 {
        match self {
            EntryKind::Regular => 0b1000,
            EntryKind::Symlink => 0b1010,
            EntryKind::Gitlink => 0b1110,
            EntryKind::Directory => 0b0100,
        }
    }
}

/// An entry's 16-bit mode: 4-bit kind, 3 zero bits, 9-bit permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMode(u16);

impl EntryMode {
    pub fn new(kind: EntryKind, permissions: u16) -> Self {
        Self(kind.as_bits() << 12 | permissions & 0o777)
    }

    pub fn regular(executable: bool) -> Self {
        Self::new(EntryKind::Regular, if executable { 0o755 } else { 0o644 })
    }

    pub fn from_bits(bits: u16) -> Result<Self> {
        EntryKind::from_bits(bits >> 12).ok_or(Error::InvalidFormat)?;
        if bits & 0o7000 != 0 {
            return Err(Error::InvalidFormat);
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn kind(self) -> EntryKind {
        EntryKind::from_bits(self.0 >> 12).expect("validated on construction")
    }

    pub fn permissions(self) -> u16 {
        self.0 & 0o777
    }

    pub fn is_executable(self) -> bool {
        self.kind() == EntryKind::Regular && self.permissions() & 0o100 != 0
    }

    pub fn is_sparse_directory(self) -> bool {
        self.kind() == EntryKind::Directory
    }
}

/// One staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Status-change time as a nanosecond tick since the epoch.
    pub ctime_ns: u64,
    /// Content-change time as a nanosecond tick since the epoch.
    pub mtime_ns: u64,
    pub device: u32,
    pub inode: u32,
    pub uid: u32,
    pub gid: u32,
    pub file_size: u32,
    pub mode: EntryMode,
    pub id: ObjectId,
    pub assume_valid: bool,
    /// The raw extended-flag bit, preserved so files whose entries carry it
    /// without any extended flag set still round-trip byte-for-byte.
    pub extended: bool,
    pub stage: MergeStage,
    pub skip_worktree: bool,
    pub intent_to_add: bool,
    /// Relative path, NUL-free bytes.
    pub path: Vec<u8>,
}

impl IndexEntry {
    /// A minimal entry for `path` with zeroed stat fields.
    pub fn new(path: impl Into<Vec<u8>>, id: ObjectId, mode: EntryMode) -> Self {
        Self {
            ctime_ns: 0,
            mtime_ns: 0,
            device: 0,
            inode: 0,
            uid: 0,
            gid: 0,
            file_size: 0,
            mode,
            id,
            assume_valid: false,
            extended: false,
            stage: MergeStage::None,
            skip_worktree: false,
            intent_to_add: false,
            path: path.into(),
        }
    }

    /// Capture stat fields from filesystem metadata.
    #[cfg(unix)]
    pub fn from_metadata(
        path: impl Into<Vec<u8>>,
        id: ObjectId,
        mode: EntryMode,
        meta: &std::fs::Metadata,
    ) -> Self {
        use std::os::unix::fs::MetadataExt;

        let mut entry = Self::new(path, id, mode);
        entry.ctime_ns = join_time(meta.ctime(), meta.ctime_nsec());
        entry.mtime_ns = join_time(meta.mtime(), meta.mtime_nsec());
        entry.device = meta.dev() as u32;
        entry.inode = meta.ino() as u32;
        entry.uid = meta.uid();
        entry.gid = meta.gid();
        entry.file_size = meta.len() as u32;
        entry
    }

    pub fn ctime(&self) -> (u32, u32) {
        split_time(self.ctime_ns)
    }

    pub fn mtime(&self) -> (u32, u32) {
        split_time(self.mtime_ns)
    }

    /// Index order: path as unsigned bytes, then stage.
    pub fn order(a: &IndexEntry, b: &IndexEntry) -> Ordering {
        a.path
            .cmp(&b.path)
            .then_with(|| a.stage.as_bits().cmp(&b.stage.as_bits()))
    }

    /// Parse one entry from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn parse(data: &[u8], version: u32) -> Result<(Self, usize)> {
        if data.len() < ENTRY_FIXED_LEN {
            return Err(Error::UnexpectedEndOfFile);
        }

        let ctime_sec = read_u32(data, 0);
        let ctime_nsec = read_u32(data, 4);
        let mtime_sec = read_u32(data, 8);
        let mtime_nsec = read_u32(data, 12);
        let device = read_u32(data, 16);
        let inode = read_u32(data, 20);
        let mode = EntryMode::from_bits(read_u32(data, 24) as u16)?;
        let uid = read_u32(data, 28);
        let gid = read_u32(data, 32);
        let file_size = read_u32(data, 36);
        let id = ObjectId::from_bytes(&data[40..40 + id::RAW_LEN])?;
        let flags = read_u16(data, 60);

        let assume_valid = flags & FLAG_ASSUME_VALID != 0;
        let extended = flags & FLAG_EXTENDED != 0;
        let stage = MergeStage::from_bits(flags >> STAGE_SHIFT);
        let name_len = flags & NAME_LEN_MAX;

        let mut offset = ENTRY_FIXED_LEN;
        let mut skip_worktree = false;
        let mut intent_to_add = false;
        if extended {
            if version < 3 {
                return Err(Error::InvalidFormat);
            }
            if data.len() < offset + 2 {
                return Err(Error::UnexpectedEndOfFile);
            }
            let ext_flags = read_u16(data, offset);
            skip_worktree = ext_flags & EXT_FLAG_SKIP_WORKTREE != 0;
            intent_to_add = ext_flags & EXT_FLAG_INTENT_TO_ADD != 0;
            offset += 2;
        }

        let path = if name_len < NAME_LEN_MAX {
            let end = offset + name_len as usize;
            if data.len() <= end {
                return Err(Error::UnexpectedEndOfFile);
            }
            if data[end] != 0 {
                return Err(Error::InvalidFormat);
            }
            data[offset..end].to_vec()
        } else {
            let nul = data[offset..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(Error::UnexpectedEndOfFile)?;
            data[offset..offset + nul].to_vec()
        };

        let consumed = entry_len_on_disk(offset, path.len(), version);
        if data.len() < consumed {
            return Err(Error::UnexpectedEndOfFile);
        }
        // Everything between the path and the entry boundary must be NUL.
        if data[offset + path.len()..consumed].iter().any(|&b| b != 0) {
            return Err(Error::InvalidFormat);
        }

        Ok((
            Self {
                ctime_ns: join_time(ctime_sec as i64, ctime_nsec as i64),
                mtime_ns: join_time(mtime_sec as i64, mtime_nsec as i64),
                device,
                inode,
                uid,
                gid,
                file_size,
                mode,
                id,
                assume_valid,
                extended,
                stage,
                skip_worktree,
                intent_to_add,
                path,
            },
            consumed,
        ))
    }

    /// Append the on-disk form of this entry for `version` to `out`.
    pub fn write(&self, version: u32, out: &mut Vec<u8>) {
        let (ctime_sec, ctime_nsec) = self.ctime();
        let (mtime_sec, mtime_nsec) = self.mtime();
        out.extend_from_slice(&ctime_sec.to_be_bytes());
        out.extend_from_slice(&ctime_nsec.to_be_bytes());
        out.extend_from_slice(&mtime_sec.to_be_bytes());
        out.extend_from_slice(&mtime_nsec.to_be_bytes());
        out.extend_from_slice(&self.device.to_be_bytes());
        out.extend_from_slice(&self.inode.to_be_bytes());
        out.extend_from_slice(&u32::from(self.mode.bits()).to_be_bytes());
        out.extend_from_slice(&self.uid.to_be_bytes());
        out.extend_from_slice(&self.gid.to_be_bytes());
        out.extend_from_slice(&self.file_size.to_be_bytes());
        out.extend_from_slice(self.id.as_bytes());

        let extended =
            version >= 3 && (self.extended || self.skip_worktree || self.intent_to_add);
        let name_len = (self.path.len() as u64).min(NAME_LEN_MAX as u64) as u16;
        let mut flags = name_len;
        if self.assume_valid {
            flags |= FLAG_ASSUME_VALID;
        }
        if extended {
            flags |= FLAG_EXTENDED;
        }
        flags |= self.stage.as_bits() << STAGE_SHIFT;
        out.extend_from_slice(&flags.to_be_bytes());

        let mut offset = ENTRY_FIXED_LEN;
        if extended {
            let mut ext_flags = 0u16;
            if self.skip_worktree {
                ext_flags |= EXT_FLAG_SKIP_WORKTREE;
            }
            if self.intent_to_add {
                ext_flags |= EXT_FLAG_INTENT_TO_ADD;
            }
            out.extend_from_slice(&ext_flags.to_be_bytes());
            offset += 2;
        }

        out.extend_from_slice(&self.path);
        let total = entry_len_on_disk(offset, self.path.len(), version);
        let padding = total - offset - self.path.len();
        out.extend_from_slice(&vec![0u8; padding]);
    }
}

/// Total on-disk entry length: versions 2 and 3 pad with one to eight NULs
/// up to a multiple of eight, version 4 appends a single terminator.
fn entry_len_on_disk(fixed_len: usize, path_len: usize, version: u32) -> usize {
    let unpadded = fixed_len + path_len;
    if version >= 4 {
        unpadded + 1
    } else {
        unpadded + (8 - unpadded % 8)
    }
}

fn join_time(sec: i64, nsec: i64) -> u64 {
    sec.max(0) as u64 * 1_000_000_000 + nsec.max(0) as u64
}

fn split_time(ns: u64) -> (u32, u32) {
    ((ns / 1_000_000_000) as u32, (ns % 1_000_000_000) as u32)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}
