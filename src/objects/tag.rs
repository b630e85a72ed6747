//! Annotated tag objects.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::objects::id::ObjectId;
use crate::objects::signature::Signature;
use crate::objects::ObjectType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub object_id: ObjectId,
    pub object_type: ObjectType,
    /// Tag name, kept as raw bytes.
    pub name: Vec<u8>,
    pub tagger: Signature,
    pub message: Vec<u8>,
}

impl Tag {
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"object ");
        data.extend_from_slice(self.object_id.to_hex().as_bytes());
        data.push(b'\n');

        data.extend_from_slice(b"type ");
        data.extend_from_slice(self.object_type.name().as_bytes());
        data.push(b'\n');

        data.extend_from_slice(b"tag ");
        data.extend_from_slice(&self.name);
        data.push(b'\n');

        data.extend_from_slice(b"tagger ");
        data.extend_from_slice(self.tagger.to_string().as_bytes());
        data.push(b'\n');

        data.push(b'\n');
        data.extend_from_slice(&self.message);
        data
    }

    /// All four headers (`object`, `type`, `tag`, `tagger`) are required.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut object_id = None;
        let mut object_type = None;
        let mut name = None;
        let mut tagger = None;
        let mut message = Vec::new();

        let mut pos = 0;
        while pos < data.len() {
            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];

            if line.is_empty() {
                if line_end < data.len() {
                    message = data[line_end + 1..].to_vec();
                }
                break;
            }

            if let Some(value) = header_value(line, b"object") {
                let text =
                    std::str::from_utf8(value).map_err(|_| Error::InvalidTagFormat)?;
                object_id = Some(ObjectId::from_hex(text).map_err(|_| Error::InvalidTagFormat)?);
            } else if let Some(value) = header_value(line, b"type") {
                let text =
                    std::str::from_utf8(value).map_err(|_| Error::InvalidTagFormat)?;
                object_type = Some(ObjectType::from_name(text).ok_or(Error::InvalidTagFormat)?);
            } else if let Some(value) = header_value(line, b"tag") {
                name = Some(value.to_vec());
            } else if let Some(value) = header_value(line, b"tagger") {
                tagger = Some(Signature::parse(value).ok_or(Error::InvalidTagFormat)?);
            }

            pos = line_end + 1;
        }

        Ok(Self {
            object_id: object_id.ok_or(Error::InvalidTagFormat)?,
            object_type: object_type.ok_or(Error::InvalidTagFormat)?,
            name: name.ok_or(Error::InvalidTagFormat)?,
            tagger: tagger.ok_or(Error::InvalidTagFormat)?,
            message,
        })
    }
}

fn header_value<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    line.strip_prefix(key)?.strip_prefix(b" ")
}

#[cfg(test)]
mod tests {
    use crate::objects::signature::{Identity, Time};

    use super::*;

    fn sample() -> Tag {
        Tag {
            object_id: ObjectId::from_hex("1234567890abcdef1234567890abcdef12345678").unwrap(),
            object_type: ObjectType::Commit,
            name: b"test-tag".to_vec(),
            tagger: Signature::new(
                Identity::new("Test Author", "author@example.com"),
                Time::new(1640995200, 120),
            ),
            message: b"Test tag message".to_vec(),
        }
    }

    #[test]
    fn test_serialized_form() {
        let text = String::from_utf8(sample().serialize()).unwrap();
        assert_eq!(
            text,
            "object 1234567890abcdef1234567890abcdef12345678\n\
             type commit\n\
             tag test-tag\n\
             tagger Test Author <author@example.com> 1640995200 +0200\n\
             \n\
             Test tag message"
        );
    }

    #[test]
    fn test_round_trip() {
        let tag = sample();
        assert_eq!(Tag::deserialize(&tag.serialize()).unwrap(), tag);
    }

    #[test]
    fn test_all_headers_required() {
        for skip in ["object", "type", "tag", "tagger"] {
            let full = String::from_utf8(sample().serialize()).unwrap();
            let without: String = full
                .lines()
                .filter(|line| !line.starts_with(&format!("{skip} ")))
                .collect::<Vec<_>>()
                .join("\n");
            assert!(
                matches!(Tag::deserialize(without.as_bytes()), Err(Error::InvalidTagFormat)),
                "tag without {skip} header should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_target_type_rejected() {
        let data = b"object 1234567890abcdef1234567890abcdef12345678\n\
                     type branch\n\
                     tag t\n\
                     tagger A <a@b> 1 +0000\n\nm";
        assert!(matches!(
            Tag::deserialize(data),
            Err(Error::InvalidTagFormat)
        ));
    }
}
