use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fundfaq_core::config::ComposerSettings;
use fundfaq_core::{Error, Result};

use crate::generative::TextGenerator;

const CHAT_PATH: &str = "/chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Gemini through Google's OpenAI-compatible chat-completions endpoint.
///
/// Uses the blocking reqwest client; call it from a thread that may block
/// (the server runs queries on the blocking pool).
pub struct GeminiGenerator {
    api_key: String,
    url: String,
    model: String,
    timeout: Duration,
}

impl GeminiGenerator {
    pub fn from_settings(settings: &ComposerSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{} is not set. Create a Gemini API key and export {}=<key> before using the generative composer.",
                settings.api_key_env, settings.api_key_env
            )));
        }
        Ok(Self {
            api_key,
            url: format!("{}{}", settings.endpoint.trim_end_matches('/'), CHAT_PATH),
            model: settings.model.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }

    pub fn url(&self) -> &str { &self.url }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Generation(format!("http client: {e}")))?;
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: 0.0,
        };
        debug!(url = %self.url, model = %self.model, "calling chat completions");
        let resp = client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Generation(format!("{} request failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            warn!(%status, "generation request rejected");
            return Err(Error::Generation(format!("{status}: {text}")));
        }
        let parsed: ChatResponse = resp.json().map_err(|e| Error::Generation(format!("bad response body: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Generation("response contained no choices".into()))
    }
}
