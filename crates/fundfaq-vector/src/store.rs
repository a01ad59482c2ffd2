use fundfaq_core::types::Chunk;
use fundfaq_core::Result;

use crate::flat::Fingerprint;

/// Row-aligned chunk list persisted as `documents.json`. Row `i` of the
/// index and entry `i` here describe the same chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore { documents: Vec<Chunk> }

impl DocumentStore {
    pub fn new(documents: Vec<Chunk>) -> Self { Self { documents } }

    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn get(&self, row: usize) -> Option<&Chunk> { self.documents.get(row) }
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> { self.documents.iter() }

    /// Pretty-printed JSON array; non-ASCII text is written as-is.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.documents)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self { documents: serde_json::from_slice(bytes)? })
    }
}

/// blake3 digest of the serialized document store, recorded in the index header.
pub fn fingerprint(document_bytes: &[u8]) -> Fingerprint {
    *blake3::hash(document_bytes).as_bytes()
}
