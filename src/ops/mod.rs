//! Object-level operations tying the codec to the store.

use std::io::Read;

use log::debug;

use crate::codec::{self, DecodeOpts};
use crate::errors::{Error, Result};
use crate::objects::{Object, ObjectId, ObjectType};
use crate::store::ObjectStore;
use crate::utils::compression;

pub mod ls_files;

pub use ls_files::{ls_files, ListOptions, ListedFile};

/// Hash `reader`'s content as an object of type `type_name`, optionally
/// validating it through the canonical parser and persisting it. Returns
/// the hex object name.
pub fn hash_object<R: Read>(
    store: &ObjectStore,
    reader: R,
    type_name: &str,
    check_format: bool,
    persist: bool,
) -> Result<String> {
    let data = compression::read_capped(reader)?;
    let typ = ObjectType::from_name(type_name)
        .ok_or_else(|| Error::InvalidType(type_name.to_string()))?;

    if check_format {
        Object::deserialize(typ, &data)?;
    }

    let encoded = codec::encode(typ, &data);
    let name = codec::object_id(typ, &data).to_hex();
    debug!("hashed {} bytes as {} {name}", data.len(), typ);

    if persist {
        store.write(&name, &encoded)?;
    }
    Ok(name)
}

/// Read and fully decode the object named `name`, optionally requiring a
/// kind.
pub fn read_object(
    store: &ObjectStore,
    name: &str,
    expected_type: Option<ObjectType>,
) -> Result<Object> {
    ObjectId::from_hex(name)?;
    let encoded = store.read(name)?;
    if encoded.is_empty() {
        return Err(Error::InvalidObject);
    }
    let decoded = codec::decode(
        &encoded,
        &DecodeOpts {
            expected_type,
            ..Default::default()
        },
    )?;
    match decoded.typ {
        codec::TypeTag::Known(typ) => Object::deserialize(typ, decoded.data),
        codec::TypeTag::Unknown(tag) => Err(Error::UnknownType(tag)),
    }
}

/// Read only the header of the object named `name`: its type tag and
/// payload length. With `allow_unknown_type`, an unrecognised tag is
/// returned rather than rejected.
pub fn read_type_and_size(
    store: &ObjectStore,
    name: &str,
    allow_unknown_type: bool,
) -> Result<(String, usize)> {
    ObjectId::from_hex(name)?;
    let encoded = store.read(name)?;
    if encoded.is_empty() {
        return Err(Error::InvalidObject);
    }
    let decoded = codec::decode(
        &encoded,
        &DecodeOpts {
            allow_unknown_type,
            ..Default::default()
        },
    )?;
    Ok((decoded.typ.name().to_string(), decoded.len))
}

/// Read the raw (inflated but still framed) bytes of the object named
/// `name`.
pub fn read_encoded_data(store: &ObjectStore, name: &str) -> Result<Vec<u8>> {
    ObjectId::from_hex(name)?;
    store.read(name)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::objects::Blob;

    use super::*;

    const SAMPLE_NAME: &str = "4b4f223d5c2b7c88abd487b3eaf5de2000755cc3";

    fn fresh_store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        store.setup().unwrap();
        (dir, store)
    }

    #[test]
    fn test_hash_object_without_persist() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, false).unwrap();
        assert_eq!(name, SAMPLE_NAME);
        assert!(!store.contains(&name));
    }

    #[test]
    fn test_hash_object_persists() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, true).unwrap();
        assert!(store.contains(&name));
        assert_eq!(store.read(&name).unwrap(), b"blob 15\0sample content\n");
    }

    #[test]
    fn test_hash_object_rejects_unknown_type() {
        let (_dir, store) = fresh_store();
        assert!(matches!(
            hash_object(&store, &b"x"[..], "blobby", false, false),
            Err(Error::InvalidType(t)) if t == "blobby"
        ));
    }

    #[test]
    fn test_hash_object_format_check() {
        let (_dir, store) = fresh_store();
        // Not a valid commit payload.
        let result = hash_object(&store, &b"junk"[..], "commit", true, false);
        assert!(matches!(result, Err(Error::InvalidCommitFormat)));
        // Without the check the bytes hash fine.
        assert!(hash_object(&store, &b"junk"[..], "commit", false, false).is_ok());
    }

    #[test]
    fn test_read_object_round_trip() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, true).unwrap();
        let object = read_object(&store, &name, None).unwrap();
        assert_eq!(object, Object::Blob(Blob::new(b"sample content\n".to_vec())));
    }

    #[test]
    fn test_read_object_type_expectation() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, true).unwrap();
        assert!(read_object(&store, &name, Some(ObjectType::Blob)).is_ok());
        assert!(matches!(
            read_object(&store, &name, Some(ObjectType::Tree)),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_read_object_validates_name() {
        let (_dir, store) = fresh_store();
        assert!(matches!(
            read_object(&store, "abc", None),
            Err(Error::InvalidHexLength(3))
        ));
        let bad = "g".repeat(40);
        assert!(matches!(
            read_object(&store, &bad, None),
            Err(Error::InvalidHexCharacter('g'))
        ));
    }

    #[test]
    fn test_read_object_missing() {
        let (_dir, store) = fresh_store();
        assert!(read_object(&store, SAMPLE_NAME, None)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_read_type_and_size() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, true).unwrap();
        assert_eq!(
            read_type_and_size(&store, &name, false).unwrap(),
            ("blob".to_string(), 15)
        );
    }

    #[test]
    fn test_read_type_and_size_unknown_tag() {
        let (_dir, store) = fresh_store();
        // Plant a frame with a tag the codec does not know.
        let name = "00".repeat(20);
        store.write(&name, b"wibble 3\0abc").unwrap();

        assert!(matches!(
            read_type_and_size(&store, &name, false),
            Err(Error::UnknownType(_))
        ));
        assert_eq!(
            read_type_and_size(&store, &name, true).unwrap(),
            ("wibble".to_string(), 3)
        );
    }

    #[test]
    fn test_read_encoded_data() {
        let (_dir, store) = fresh_store();
        let name = hash_object(&store, &b"sample content\n"[..], "blob", true, true).unwrap();
        assert_eq!(
            read_encoded_data(&store, &name).unwrap(),
            b"blob 15\0sample content\n"
        );
    }

    #[test]
    fn test_empty_store_file_is_invalid_object() {
        let (_dir, store) = fresh_store();
        let name = "11".repeat(20);
        store.write(&name, b"").unwrap();
        assert!(matches!(
            read_object(&store, &name, None),
            Err(Error::InvalidObject)
        ));
    }
}
