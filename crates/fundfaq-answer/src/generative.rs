use regex::Regex;
use tracing::debug;

use fundfaq_core::traits::AnswerComposer;
use fundfaq_core::types::Hit;
use fundfaq_core::{Error, Result};

use crate::extractive::{MISSING_SOURCE, NO_SNIPPET};

/// A remote or local text model that completes a single prompt.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

const INSTRUCTIONS: &str = "You are a mutual fund FAQ assistant. Answer the user's question using only the provided snippets. Every answer must:
1. Contain only verified facts from the snippets.
2. Include exactly one explicit citation link to the most relevant source URL.
3. Avoid investment advice, recommendations, or opinions.
4. If the question cannot be answered from the snippets, say so and mention that only facts are provided.
";

/// Numbered snippets with their source URL; snippets lacking a URL are left out.
pub fn build_prompt(question: &str, hits: &[Hit]) -> String {
    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.url().map(|url| format!("Snippet {} (source: {}):\n{}", i + 1, url, h.text)))
        .collect();
    let context = if blocks.is_empty() { "No snippets available.".to_string() } else { blocks.join("\n\n") };
    format!("{INSTRUCTIONS}\n\nSnippets:\n{context}\n\nUser question: {question}\nAnswer:")
}

/// Rewrites the retrieved snippets into prose through a [`TextGenerator`],
/// keeping exactly one citation to a supplied URL.
pub struct GenerativeComposer<G> {
    generator: G,
    link_re: Regex,
}

impl<G: TextGenerator> GenerativeComposer<G> {
    pub fn new(generator: G) -> Self {
        let link_re = Regex::new(r#"https?://[^\s<>()\[\]"']+"#).expect("link regex should compile");
        Self { generator, link_re }
    }

    /// Links in `reply` as byte ranges, with sentence punctuation trimmed off the end.
    fn links<'r>(&self, reply: &'r str) -> Vec<(usize, usize, &'r str)> {
        self.link_re
            .find_iter(reply)
            .map(|m| {
                let link = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
                (m.start(), m.start() + link.len(), link)
            })
            .collect()
    }

    /// Leaves `reply` alone when it holds exactly one link and that link was
    /// supplied. Otherwise every link is removed and a single `Source:` line is
    /// appended, preferring a supplied URL the reply already named.
    fn cite_once(&self, reply: &str, urls: &[&str]) -> String {
        let links = self.links(reply);
        if let [(_, _, only)] = links.as_slice() {
            if urls.contains(only) {
                return reply.to_string();
            }
        }
        let source = links.iter().map(|(_, _, l)| *l).find(|l| urls.contains(l)).unwrap_or(urls[0]);

        let mut body = String::with_capacity(reply.len());
        let mut last = 0;
        for (start, end, _) in &links {
            body.push_str(&reply[last..*start]);
            last = *end;
        }
        body.push_str(&reply[last..]);
        let body = tidy(&body);
        if body.is_empty() { format!("Source: {source}") } else { format!("{body}\n\nSource: {source}") }
    }
}

/// Drops brackets emptied by link removal and collapses the leftover spacing.
fn tidy(text: &str) -> String {
    let text = text.replace("()", "").replace("[]", "").replace("<>", "");
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .replace(" .", ".")
        .replace(" ,", ",")
        .trim()
        .to_string()
}

impl<G: TextGenerator> AnswerComposer for GenerativeComposer<G> {
    fn name(&self) -> &'static str { "generative" }

    fn compose(&self, question: &str, hits: &[Hit]) -> Result<String> {
        if hits.is_empty() { return Ok(NO_SNIPPET.to_string()); }
        let urls: Vec<&str> = hits.iter().filter_map(Hit::url).collect();
        if urls.is_empty() { return Ok(MISSING_SOURCE.to_string()); }

        let prompt = build_prompt(question, hits);
        debug!(snippets = urls.len(), prompt_len = prompt.len(), "requesting generation");
        let reply = self.generator.generate(&prompt)?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::Generation("model returned an empty answer".into()));
        }
        Ok(self.cite_once(reply, &urls))
    }
}
