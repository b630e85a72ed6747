//! File listings over the index and the worktree: tracked, others,
//! deleted, modified, unmerged and killed sets.

use std::fs::{self, Metadata};
use std::path::Path;

use log::debug;
use sha1::Digest;

use crate::errors::{Error, Result};
use crate::index::entry::EntryKind;
use crate::index::{EntryMode, Index, IndexEntry, MergeStage};
use crate::objects::ObjectId;
use crate::repository::Repository;

/// Which sets to list. With nothing set, `cached` is the default;
/// `unmerged` implies `stage_info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListOptions {
    pub cached: bool,
    pub others: bool,
    pub deleted: bool,
    pub modified: bool,
    pub unmerged: bool,
    pub killed: bool,
    pub stage_info: bool,
}

/// One listed path. The optional fields are populated for tracked entries
/// when stage information was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: Vec<u8>,
    pub id: Option<ObjectId>,
    pub mode: Option<EntryMode>,
    pub stage: Option<MergeStage>,
}

impl ListedFile {
    fn path_only(path: Vec<u8>) -> Self {
        Self {
            path,
            id: None,
            mode: None,
            stage: None,
        }
    }

    fn tracked(entry: &IndexEntry, stage_info: bool) -> Self {
        Self {
            path: entry.path.clone(),
            id: stage_info.then_some(entry.id),
            mode: stage_info.then_some(entry.mode),
            stage: stage_info.then_some(entry.stage),
        }
    }
}

pub fn ls_files<D: Digest>(repo: &Repository<D>, options: ListOptions) -> Result<Vec<ListedFile>> {
    let mut options = options;
    if options.unmerged {
        options.stage_info = true;
    }
    if !(options.cached
        || options.others
        || options.deleted
        || options.modified
        || options.unmerged
        || options.killed)
    {
        options.cached = true;
    }

    // A repository without an index file simply stages nothing.
    let index = match repo.load_index() {
        Ok(index) => index,
        Err(err) if err.is_not_found() => Index::new(2),
        Err(err) => return Err(err),
    };
    debug!("listing over {} index entries", index.entries.len());

    let mut listing = Vec::new();

    if options.cached || options.deleted || options.modified || options.stage_info {
        let worktree = if options.deleted || options.modified {
            Some(repo.worktree().ok_or(Error::MissingWorktree)?)
        } else {
            None
        };

        for entry in &index.entries {
            if let Some(worktree) = worktree {
                let on_disk = worktree.join(bytes_to_path(&entry.path));
                match fs::symlink_metadata(&on_disk) {
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        if options.deleted && !entry.skip_worktree && !entry.assume_valid {
                            listing.push(ListedFile::tracked(entry, options.stage_info));
                        }
                    }
                    Err(err) => return Err(err.into()),
                    Ok(meta) => {
                        if options.modified && entry_changed(entry, &meta) {
                            listing.push(ListedFile::tracked(entry, options.stage_info));
                        }
                    }
                }
            } else if (options.cached || options.stage_info)
                && (!options.unmerged || entry.stage != MergeStage::None)
            {
                listing.push(ListedFile::tracked(entry, options.stage_info));
            }
        }
    }

    if options.others || options.killed {
        let worktree = repo.worktree().ok_or(Error::MissingWorktree)?;
        let mut on_disk = Vec::new();
        walk_worktree(worktree, worktree, &mut on_disk)?;

        let mut others = Vec::new();
        let mut killed = Vec::new();
        for path in on_disk {
            if index.contains(&path) {
                continue;
            }
            if options.others {
                others.push(path.clone());
            }
            if options.killed && conflicts_with_tracked(&index, &path) {
                killed.push(path);
            }
        }
        others.sort();
        killed.sort();

        listing.extend(others.into_iter().map(ListedFile::path_only));
        listing.extend(killed.into_iter().map(ListedFile::path_only));
    }

    Ok(listing)
}

/// Depth-first worktree walk collecting file paths relative to `root`,
/// as raw bytes. Entries named `.git` are skipped at every level.
fn walk_worktree(root: &Path, dir: &Path, out: &mut Vec<Vec<u8>>) -> Result<()> {
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if dir_entry.file_name() == ".git" {
            continue;
        }
        let path = dir_entry.path();
        if dir_entry.file_type()?.is_dir() {
            walk_worktree(root, &path, out)?;
        } else {
            let rel = path.strip_prefix(root).map_err(|_| Error::InvalidFormat)?;
            out.push(path_to_bytes(rel));
        }
    }
    Ok(())
}

/// An untracked path is "killed" when materialising tracked content would
/// first require removing it: either it sits where a tracked entry needs a
/// directory, or one of its ancestor directories is a tracked file.
fn conflicts_with_tracked<D: Digest>(index: &Index<D>, path: &[u8]) -> bool {
    if index.contains_prefix(path, true) {
        return true;
    }
    for (i, &b) in path.iter().enumerate() {
        if b == b'/' && index.contains(&path[..i]) {
            return true;
        }
    }
    false
}

/// The change-detection policy for `modified`: compare times, size and
/// mode; inode and device are recorded but not consulted.
fn entry_changed(entry: &IndexEntry, meta: &Metadata) -> bool {
    if entry.assume_valid || entry.skip_worktree {
        return false;
    }

    let type_matches = match entry.mode.kind() {
        EntryKind::Regular => meta.is_file(),
        EntryKind::Symlink => meta.file_type().is_symlink(),
        EntryKind::Gitlink | EntryKind::Directory => meta.is_dir(),
    };
    if !type_matches {
        return true;
    }
    // Directory-ish entries carry no meaningful stat cache.
    if matches!(entry.mode.kind(), EntryKind::Gitlink | EntryKind::Directory) {
        return false;
    }

    if entry.mode.kind() == EntryKind::Regular
        && entry.mode.is_executable() != on_disk_executable(meta)
    {
        return true;
    }
    if meta.len() as u32 != entry.file_size {
        return true;
    }

    let (mtime, ctime) = on_disk_times(meta);
    mtime != entry.mtime_ns || ctime != entry.ctime_ns
}

#[cfg(unix)]
fn on_disk_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o100 != 0
}

#[cfg(unix)]
fn on_disk_times(meta: &Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    let join = |sec: i64, nsec: i64| sec.max(0) as u64 * 1_000_000_000 + nsec.max(0) as u64;
    (
        join(meta.mtime(), meta.mtime_nsec()),
        join(meta.ctime(), meta.ctime_nsec()),
    )
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> &Path {
    use std::os::unix::ffi::OsStrExt;
    Path::new(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}
