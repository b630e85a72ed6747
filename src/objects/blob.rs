//! Blob objects: opaque byte vectors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub content: Vec<u8>,
}

impl Blob {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Serialization is the identity function.
    pub fn serialize(&self) -> Vec<u8> {
        self.content.clone()
    }

    pub fn deserialize(data: &[u8]) -> Self {
        Self {
            content: data.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
