use fundfaq_core::traits::AnswerComposer;
use fundfaq_core::types::Hit;
use fundfaq_core::Result;

pub const NO_SNIPPET: &str = "I could not find a factual snippet for that question.";
pub const MISSING_SOURCE: &str = "I found information but the source URL is missing.";

/// Returns the top hit verbatim with its citation. Never blends hits and
/// never answers without a URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveComposer;

impl AnswerComposer for ExtractiveComposer {
    fn name(&self) -> &'static str { "extractive" }

    fn compose(&self, _question: &str, hits: &[Hit]) -> Result<String> {
        let Some(top) = hits.first() else { return Ok(NO_SNIPPET.to_string()) };
        Ok(match top.url() {
            Some(url) => format!("Answer: {}\n\nSource: {}", top.text, url),
            None => MISSING_SOURCE.to_string(),
        })
    }
}
