use serde::Serialize;
use tracing::{info, instrument};

use fundfaq_core::config::{ComposerMode, Settings};
use fundfaq_core::traits::AnswerComposer;
use fundfaq_core::types::Hit;
use fundfaq_core::Result;
use fundfaq_embed::load_embedder;
use fundfaq_vector::Retriever;

use crate::extractive::ExtractiveComposer;
use crate::gemini::GeminiGenerator;
use crate::generative::GenerativeComposer;

/// The answer to one question, with the hits it was composed from.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub question: String,
    pub answer: String,
    /// URL of the top hit, `None` when nothing was retrieved.
    pub source: Option<String>,
    pub hits: Vec<Hit>,
}

/// Retrieve, then compose. Read-only once built, so one instance can serve
/// concurrent callers.
pub struct FaqService {
    retriever: Retriever,
    composer: Box<dyn AnswerComposer>,
    top_k: usize,
}

impl FaqService {
    pub fn new(retriever: Retriever, composer: Box<dyn AnswerComposer>, top_k: usize) -> Self {
        Self { retriever, composer, top_k }
    }

    /// Load the embedder and vector store named by `settings` and pick the composer.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let vector_dir = settings.data.vector_path();
        let embedder = load_embedder(&settings.embedding)?;
        let retriever = Retriever::open(&vector_dir, embedder)?;
        let composer: Box<dyn AnswerComposer> = match settings.composer.mode {
            ComposerMode::Extractive => Box::new(ExtractiveComposer),
            ComposerMode::Generative => Box::new(GenerativeComposer::new(GeminiGenerator::from_settings(&settings.composer)?)),
        };
        info!(dir = %vector_dir.display(), composer = composer.name(), top_k = settings.retrieval.top_k, "faq service ready");
        Ok(Self::new(retriever, composer, settings.retrieval.top_k))
    }

    pub fn top_k(&self) -> usize { self.top_k }
    pub fn composer_name(&self) -> &'static str { self.composer.name() }

    pub fn answer(&self, question: &str) -> Result<QueryOutcome> {
        self.answer_with(question, self.top_k)
    }

    #[instrument(skip(self), fields(composer = self.composer.name()))]
    pub fn answer_with(&self, question: &str, top_k: usize) -> Result<QueryOutcome> {
        let hits = self.retriever.retrieve(question, top_k)?;
        let answer = self.composer.compose(question, &hits)?;
        let source = hits.first().and_then(Hit::url).map(str::to_string);
        Ok(QueryOutcome { question: question.to_string(), answer, source, hits })
    }
}
