//! Embedding functions shared by the index builder and the retriever.
//!
//! Two implementations of [`Embedder`]: the all-MiniLM-L6-v2 sentence
//! transformer on candle, and a deterministic hashing embedder that needs no
//! model files (development, CI and tests).

use std::sync::Arc;

use tracing::info;

use fundfaq_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use fundfaq_core::traits::Embedder;
use fundfaq_core::{Error, Result};

pub mod device;
pub mod hashing;
pub mod minilm;
pub mod pool;
pub mod tokenize;

pub use hashing::HashingEmbedder;
pub use minilm::{MiniLmEmbedder, MINILM_DIM, MINILM_ID};
pub use pool::masked_mean_l2;

/// Build the embedder named by the settings.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Hashing => {
            info!(dim = settings.hashing_dim, "using hashing embedder");
            Ok(Arc::new(HashingEmbedder::new(settings.hashing_dim)))
        }
        EmbeddingBackend::Minilm => {
            let model_dir = settings.model_dir.as_deref().map(expand_path);
            let model = MiniLmEmbedder::load(model_dir.as_deref())
                .map_err(|e| Error::Embedding(format!("{e:#}")))?;
            Ok(Arc::new(model))
        }
    }
}
