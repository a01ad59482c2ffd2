use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use fundfaq_core::types::Hit;
use fundfaq_core::{Error, Result};

use crate::flat::FlatL2Index;
use crate::store::{fingerprint, DocumentStore};
use crate::writer::write_atomic;

pub const INDEX_FILE: &str = "vectors.index";
pub const DOCUMENTS_FILE: &str = "documents.json";

/// Locations of the two artifacts inside a storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub index: PathBuf,
    pub documents: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self { index: dir.join(INDEX_FILE), documents: dir.join(DOCUMENTS_FILE), dir }
    }

    pub fn exist(&self) -> bool { self.index.is_file() && self.documents.is_file() }
}

/// The paired index and document store. Constructing one guarantees
/// `index.len() == documents.len()`.
#[derive(Debug, Clone)]
pub struct KnowledgeBase { index: FlatL2Index, documents: DocumentStore }

impl KnowledgeBase {
    pub fn new(index: FlatL2Index, documents: DocumentStore) -> Result<Self> {
        if index.len() != documents.len() {
            return Err(Error::Misaligned { index_rows: index.len(), documents: documents.len() });
        }
        Ok(Self { index, documents })
    }

    /// Load both artifacts from `dir`, verifying they were written together.
    pub fn open(dir: &Path) -> Result<Self> {
        let paths = ArtifactPaths::new(dir);
        if !paths.exist() {
            return Err(Error::VectorStoreMissing { dir: dir.to_path_buf() });
        }
        let doc_bytes = fs::read(&paths.documents)?;
        let (index, recorded) = FlatL2Index::from_bytes(&fs::read(&paths.index)?)?;
        let documents = DocumentStore::from_json_bytes(&doc_bytes)?;
        if index.len() != documents.len() {
            return Err(Error::Misaligned { index_rows: index.len(), documents: documents.len() });
        }
        if fingerprint(&doc_bytes) != recorded {
            warn!(dir = %dir.display(), "documents.json does not match the index it was built with");
            return Err(Error::FingerprintMismatch);
        }
        info!(dir = %dir.display(), rows = index.len(), embedder = index.embedder_id(), "loaded knowledge base");
        Self::new(index, documents)
    }

    /// Persist to `dir`: the document store first, then the index that records its fingerprint.
    pub fn save(&self, dir: &Path) -> Result<ArtifactPaths> {
        let paths = ArtifactPaths::new(dir);
        let doc_bytes = self.documents.to_json_bytes()?;
        let index_bytes = self.index.to_bytes(&fingerprint(&doc_bytes));
        write_atomic(dir, DOCUMENTS_FILE, &doc_bytes)?;
        write_atomic(dir, INDEX_FILE, &index_bytes)?;
        Ok(paths)
    }

    pub fn len(&self) -> usize { self.index.len() }
    pub fn is_empty(&self) -> bool { self.index.is_empty() }
    pub fn dim(&self) -> usize { self.index.dim() }
    pub fn embedder_id(&self) -> &str { self.index.embedder_id() }
    pub fn index(&self) -> &FlatL2Index { &self.index }
    pub fn documents(&self) -> &DocumentStore { &self.documents }

    /// Nearest chunks to `query`, padding slots removed. Ranks are the 1-based
    /// positions in the index's distance order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        let neighbors = self.index.search(query, k)?;
        let mut hits = Vec::with_capacity(k.min(self.index.len()));
        for (pos, n) in neighbors.enumerate() {
            // padding only trails the real rows
            let Some(row) = n.row else { break };
            let chunk = self.documents.get(row).ok_or(Error::Misaligned {
                index_rows: self.index.len(),
                documents: self.documents.len(),
            })?;
            hits.push(Hit { rank: pos + 1, distance: n.distance, text: chunk.text.clone(), metadata: chunk.metadata.clone() });
        }
        Ok(hits)
    }
}
