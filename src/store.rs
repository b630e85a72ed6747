//! Filesystem-backed loose-object store.
//!
//! Objects are keyed by their full hex name, sharded as
//! `<objects_dir>/<xx>/<remaining-hex>`, and stored zlib-deflated. Writes
//! are committed by renaming an exclusively-created temporary into place,
//! so readers never observe a partial object and racing writers of the
//! same name both succeed.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{Error, Result};
use crate::utils::compression::{self, MAX_FILE_SIZE};

const TMP_PREFIX: &str = "tmp_obj_";
const TMP_RAND_LEN: usize = 6;

pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.objects_dir
    }

    /// Create the store skeleton (`info/` and `pack/`). Idempotent.
    pub fn setup(&self) -> Result<()> {
        fs::create_dir_all(self.objects_dir.join("info"))?;
        fs::create_dir_all(self.objects_dir.join("pack"))?;
        Ok(())
    }

    /// Whether an object with this name is already on disk.
    pub fn contains(&self, name: &str) -> bool {
        match self.object_path(name) {
            Ok(path) => path.exists(),
            Err(_) => false,
        }
    }

    /// Read and inflate the object named `name`. A missing object surfaces
    /// the filesystem's not-found error.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.object_path(name)?;
        let file = File::open(&path)?;
        compression::inflate_from(BufReader::new(file))
    }

    /// Deflate `data` and commit it under `name`.
    ///
    /// The store is content-addressed, so a pre-existing target means the
    /// content is already present and the write is a silent no-op; likewise
    /// a rename lost to a concurrent writer of the same name.
    pub fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        if data.len() as u64 > MAX_FILE_SIZE {
            return Err(Error::ObjectTooLarge(data.len() as u64));
        }

        let path = self.object_path(name)?;
        if path.exists() {
            debug!("object {name} already present, skipping write");
            return Ok(());
        }

        let shard = path.parent().ok_or(Error::InvalidFormat)?;
        fs::create_dir_all(shard)?;

        // Exclusive-create temporary in the destination directory so the
        // final rename never crosses a filesystem boundary.
        let tmp = tempfile::Builder::new()
            .prefix(TMP_PREFIX)
            .rand_bytes(TMP_RAND_LEN)
            .tempfile_in(shard)?;
        let tmp = compression::deflate_to(data, tmp)?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                debug!("wrote object {name}");
                Ok(())
            }
            Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("lost write race for object {name}, content identical");
                Ok(())
            }
            Err(err) => Err(Error::Io(err.error)),
        }
    }

    /// Shard a full hex name into its on-disk path: the first two
    /// characters form the directory, the remainder the file name.
    fn object_path(&self, name: &str) -> Result<PathBuf> {
        if name.len() < 3 || !name.is_ascii() {
            return Err(Error::InvalidHexLength(name.len()));
        }
        let (dir, file) = name.split_at(2);
        Ok(self.objects_dir.join(dir).join(file))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    const SAMPLE_NAME: &str = "4b4f223d5c2b7c88abd487b3eaf5de2000755cc3";
    const SAMPLE_FRAME: &[u8] = b"blob 15\0sample content\n";

    fn fresh_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        store.setup().unwrap();
        (dir, store)
    }

    #[test]
    fn test_setup_creates_skeleton_idempotently() {
        let (_dir, store) = fresh_store();
        assert!(store.path().join("info").is_dir());
        assert!(store.path().join("pack").is_dir());
        store.setup().unwrap();
    }

    #[test]
    fn test_write_shards_by_name() {
        let (_dir, store) = fresh_store();
        store.write(SAMPLE_NAME, SAMPLE_FRAME).unwrap();
        assert!(store
            .path()
            .join("4b")
            .join("4f223d5c2b7c88abd487b3eaf5de2000755cc3")
            .is_file());
        assert!(store.contains(SAMPLE_NAME));
    }

    #[test]
    fn test_read_write_round_trip() {
        let (_dir, store) = fresh_store();
        store.write(SAMPLE_NAME, SAMPLE_FRAME).unwrap();
        assert_eq!(store.read(SAMPLE_NAME).unwrap(), SAMPLE_FRAME);
    }

    #[test]
    fn test_write_is_idempotent() {
        let (_dir, store) = fresh_store();
        store.write(SAMPLE_NAME, SAMPLE_FRAME).unwrap();
        store.write(SAMPLE_NAME, SAMPLE_FRAME).unwrap();

        let shard = store.path().join("4b");
        let files: Vec<_> = fs::read_dir(&shard).unwrap().collect();
        assert_eq!(files.len(), 1, "no stray temporaries should remain");
        assert_eq!(store.read(SAMPLE_NAME).unwrap(), SAMPLE_FRAME);
    }

    #[test]
    fn test_missing_object_surfaces_not_found() {
        let (_dir, store) = fresh_store();
        let err = store.read(SAMPLE_NAME).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stored_bytes_are_zlib_deflated() {
        let (_dir, store) = fresh_store();
        store.write(SAMPLE_NAME, SAMPLE_FRAME).unwrap();
        let raw = fs::read(
            store
                .path()
                .join("4b")
                .join("4f223d5c2b7c88abd487b3eaf5de2000755cc3"),
        )
        .unwrap();
        assert_ne!(raw, SAMPLE_FRAME);
        assert_eq!(raw[0], 0x78);
        assert_eq!(
            compression::inflate_from(&raw[..]).unwrap(),
            SAMPLE_FRAME
        );
    }

    #[test]
    fn test_rejects_unshardable_name() {
        let (_dir, store) = fresh_store();
        assert!(matches!(
            store.write("ab", SAMPLE_FRAME),
            Err(Error::InvalidHexLength(2))
        ));
    }
}
