//! Answer composition and the end-to-end query pipeline.
//!
//! [`ExtractiveComposer`] is the default and needs no network.
//! [`GenerativeComposer`] rewrites snippets through a [`TextGenerator`];
//! [`GeminiGenerator`] is the provided one.

pub mod extractive;
pub mod gemini;
pub mod generative;
pub mod service;

pub use extractive::{ExtractiveComposer, MISSING_SOURCE, NO_SNIPPET};
pub use gemini::GeminiGenerator;
pub use generative::{build_prompt, GenerativeComposer, TextGenerator};
pub use service::{FaqService, QueryOutcome};
