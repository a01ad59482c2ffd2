use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use fundfaq_core::traits::Embedder;
use fundfaq_core::types::Chunk;
use fundfaq_core::{Error, Result};

use crate::flat::FlatL2Index;
use crate::knowledge_base::{ArtifactPaths, KnowledgeBase};
use crate::store::DocumentStore;

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub chunks: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub paths: ArtifactPaths,
}

/// Embeds chunks in batches and lays them into a flat index, row `i` for chunk `i`.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    progress: bool,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, batch_size: DEFAULT_BATCH_SIZE, progress: false }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Draw a progress bar on stderr while embedding.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(&self, chunks: Vec<Chunk>) -> Result<KnowledgeBase> {
        if chunks.is_empty() { return Err(Error::NoChunks); }
        let dim = self.embedder.dim();
        let mut index = FlatL2Index::new(dim, self.embedder.id());

        let pb = if self.progress { ProgressBar::new(chunks.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!("embedder returned {} vectors for {} texts", vectors.len(), batch.len())));
            }
            for v in &vectors { index.add(v)?; }
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("embedded");
        info!(rows = index.len(), dim, embedder = self.embedder.id(), "built flat index");

        KnowledgeBase::new(index, DocumentStore::new(chunks))
    }

    /// Build and persist to `dir`. Nothing is written when there are no chunks
    /// or embedding fails.
    pub fn build_and_save(&self, chunks: Vec<Chunk>, dir: &Path) -> Result<BuildReport> {
        let kb = self.build(chunks)?;
        let paths = kb.save(dir)?;
        info!(index = %paths.index.display(), documents = %paths.documents.display(), "saved vector store");
        Ok(BuildReport { chunks: kb.len(), dim: kb.dim(), embedder_id: kb.embedder_id().to_string(), paths })
    }
}
