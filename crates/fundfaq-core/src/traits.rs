use crate::error::Result;
use crate::types::Hit;

/// A fixed text-to-vector function shared by index build and query time.
///
/// `id` names the function and its version; an index built with one id must
/// never be searched with vectors from another.
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::Embedding("embedder returned no vector".into()))
    }
}

/// Turns ranked hits into a single cited answer string.
pub trait AnswerComposer: Send + Sync {
    fn name(&self) -> &'static str;
    fn compose(&self, question: &str, hits: &[Hit]) -> Result<String>;
}
