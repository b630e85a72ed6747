//! Commit objects.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::objects::id::ObjectId;
use crate::objects::signature::Signature;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Message bytes, carried verbatim.
    pub message: Vec<u8>,
}

impl Commit {
    /// Headers in fixed order, a blank line, then the message.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree ");
        data.extend_from_slice(self.tree.to_hex().as_bytes());
        data.push(b'\n');

        for parent in &self.parents {
            data.extend_from_slice(b"parent ");
            data.extend_from_slice(parent.to_hex().as_bytes());
            data.push(b'\n');
        }

        data.extend_from_slice(b"author ");
        data.extend_from_slice(self.author.to_string().as_bytes());
        data.push(b'\n');

        data.extend_from_slice(b"committer ");
        data.extend_from_slice(self.committer.to_string().as_bytes());
        data.push(b'\n');

        data.push(b'\n');
        data.extend_from_slice(&self.message);
        data
    }

    /// Read header lines until the first empty line; the rest is the
    /// message, byte for byte. `gpgsig` headers and their space-prefixed
    /// continuation lines are skipped. `tree`, `author` and `committer`
    /// are required.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
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
                // Header/message separator; the message is the remainder.
                if line_end < data.len() {
                    message = data[line_end + 1..].to_vec();
                }
                break;
            }

            if let Some(value) = header_value(line, b"tree") {
                tree = Some(parse_id(value)?);
            } else if let Some(value) = header_value(line, b"parent") {
                parents.push(parse_id(value)?);
            } else if let Some(value) = header_value(line, b"author") {
                author = Some(Signature::parse(value).ok_or(Error::InvalidCommitFormat)?);
            } else if let Some(value) = header_value(line, b"committer") {
                committer = Some(Signature::parse(value).ok_or(Error::InvalidCommitFormat)?);
            }
            // Anything else - gpgsig, its continuation lines, unrecognised
            // headers - is skipped.

            pos = line_end + 1;
        }

        Ok(Self {
            tree: tree.ok_or(Error::InvalidCommitFormat)?,
            parents,
            author: author.ok_or(Error::InvalidCommitFormat)?,
            committer: committer.ok_or(Error::InvalidCommitFormat)?,
            message,
        })
    }
}

fn header_value<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    line.strip_prefix(key)?.strip_prefix(b" ")
}

fn parse_id(value: &[u8]) -> Result<ObjectId> {
    let text = std::str::from_utf8(value).map_err(|_| Error::InvalidCommitFormat)?;
    ObjectId::from_hex(text).map_err(|_| Error::InvalidCommitFormat)
}
