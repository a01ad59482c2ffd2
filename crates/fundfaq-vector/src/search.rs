use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use fundfaq_core::traits::Embedder;
use fundfaq_core::types::Hit;
use fundfaq_core::{Error, Result};

use crate::knowledge_base::KnowledgeBase;

/// Embeds a question with the same function the index was built with and
/// returns the nearest chunks.
pub struct Retriever {
    kb: Arc<KnowledgeBase>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(kb: Arc<KnowledgeBase>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if embedder.dim() != kb.dim() {
            return Err(Error::DimensionMismatch { expected: kb.dim(), actual: embedder.dim() });
        }
        if embedder.id() != kb.embedder_id() {
            return Err(Error::EmbedderMismatch { index: kb.embedder_id().to_string(), runtime: embedder.id().to_string() });
        }
        Ok(Self { kb, embedder })
    }

    pub fn open(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::new(Arc::new(KnowledgeBase::open(dir)?), embedder)
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase { &self.kb }

    /// Up to `top_k` hits, closest first. Fewer when the index is smaller.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Hit>> {
        if top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".into()));
        }
        let q = self.embedder.embed_one(query)?;
        let hits = self.kb.search(&q, top_k)?;
        debug!(top_k, returned = hits.len(), "retrieved");
        Ok(hits)
    }
}
