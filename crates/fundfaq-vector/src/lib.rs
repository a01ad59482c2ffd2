//! Vector store for the FAQ corpus: a flat L2 index paired row-for-row with
//! a JSON document store, plus the builder and retriever over them.

pub mod flat;
pub mod index_build;
pub mod knowledge_base;
pub mod search;
pub mod store;
pub mod writer;

pub use flat::{FlatL2Index, Neighbor};
pub use index_build::{BuildReport, IndexBuilder};
pub use knowledge_base::{ArtifactPaths, KnowledgeBase, DOCUMENTS_FILE, INDEX_FILE};
pub use search::Retriever;
pub use store::DocumentStore;
