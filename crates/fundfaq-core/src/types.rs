//! Domain types shared by the extractor, the vector store and the composers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which family of fact a chunk carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    SchemeOverview,
    SchemeAttribute,
    SchemeDocument,
    Guide,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SchemeOverview => "scheme_overview",
            Self::SchemeAttribute => "scheme_attribute",
            Self::SchemeDocument => "scheme_document",
            Self::Guide => "guide",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Citation metadata stored next to every chunk.
///
/// `url` is optional only so that a hand-edited or foreign document store can
/// still be read; the extractor never emits a chunk without one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ChunkMetadata {
    pub fn new(kind: ChunkKind, url: impl Into<String>) -> Self {
        Self { kind, field: None, guide_key: None, label: None, scheme: None, url: Some(url.into()) }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_guide(mut self, guide_key: impl Into<String>, label: impl Into<String>) -> Self {
        self.guide_key = Some(guide_key.into());
        self.label = Some(label.into());
        self
    }

    /// The citation URL, if present and non-blank.
    pub fn citation_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// An atomic, independently citable fact. Also the row type of the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// One ranked retrieval result. `rank` is 1-based; smaller `distance` is closer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    pub rank: usize,
    pub distance: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Hit {
    pub fn url(&self) -> Option<&str> {
        self.metadata.citation_url()
    }
}
