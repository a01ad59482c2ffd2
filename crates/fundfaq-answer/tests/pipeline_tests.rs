use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use fundfaq_answer::{
    build_prompt, ExtractiveComposer, FaqService, GenerativeComposer, TextGenerator, MISSING_SOURCE, NO_SNIPPET,
};
use fundfaq_core::config::{EmbeddingBackend, Settings};
use fundfaq_core::extract::collect_chunks;
use fundfaq_core::source::Corpus;
use fundfaq_core::traits::{AnswerComposer, Embedder};
use fundfaq_core::types::{ChunkKind, ChunkMetadata, Hit};
use fundfaq_core::Error;
use fundfaq_embed::HashingEmbedder;
use fundfaq_vector::{IndexBuilder, Retriever};

const VALUE_URL: &str = "https://groww.in/mutual-funds/jm-basic-fund-direct-growth";
const GUIDE_URL: &str = "https://groww.in/blog/how-to-get-capital-gains-statement-for-mutual-fund-investments";

fn write_json(dir: &Path, name: &str, value: serde_json::Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// Writes a two-record corpus and builds the vector store; returns the store dir.
fn build_store(root: &Path) -> PathBuf {
    let (schemes, guides) = (root.join("schemes"), root.join("guides"));
    write_json(
        &schemes,
        "jm-value.json",
        json!({
            "scheme_name": "JM Value Fund",
            "source_url": VALUE_URL,
            "metadata": {"category": "Equity", "sub_category": "Value", "fund_house": "JM Financial Mutual Fund"},
            "attributes": {
                "expense_ratio": {"value": 0.98, "display": "0.98%", "source_url": VALUE_URL},
                "exit_load": {"value": "Exit load of 1% if redeemed within 30 days", "source_url": VALUE_URL}
            }
        }),
    );
    write_json(
        &guides,
        "capital-gains.json",
        json!({
            "guide_key": "capital_gains_statement",
            "source_url": GUIDE_URL,
            "methods": [
                {"label": "Download statement on the Groww app", "steps": ["Open the Groww app.", "Go to Reports and download the capital gains statement."]}
            ]
        }),
    );
    let chunks = collect_chunks(&Corpus::load(&schemes, &guides).unwrap()).unwrap();
    let store = root.join("vector_store");
    IndexBuilder::new(Arc::new(HashingEmbedder::new(384))).build_and_save(chunks, &store).unwrap();
    store
}

fn extractive_service(store: &Path) -> FaqService {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
    FaqService::new(Retriever::open(store, embedder).unwrap(), Box::new(ExtractiveComposer), 3)
}

fn hit(rank: usize, text: &str, url: Option<&str>) -> Hit {
    let mut metadata = ChunkMetadata::new(ChunkKind::SchemeAttribute, "");
    metadata.url = url.map(str::to_string);
    Hit { rank, distance: 0.1 * rank as f32, text: text.into(), metadata }
}

/// Replays a canned reply and records every prompt it was given.
struct ScriptedGenerator {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    fn new(reply: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (Self { reply: reply.into(), prompts: prompts.clone() }, prompts)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> fundfaq_core::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

#[test]
fn expense_ratio_question_is_answered_with_citation() {
    let tmp = TempDir::new().unwrap();
    let service = extractive_service(&build_store(tmp.path()));

    let outcome = service.answer("What is the expense ratio of JM Value Fund?").unwrap();
    assert!(outcome.answer.starts_with("Answer: JM Value Fund - Expense Ratio: 0.98%"), "{}", outcome.answer);
    assert!(outcome.answer.ends_with(&format!("\n\nSource: {VALUE_URL}")));
    assert_eq!(outcome.source.as_deref(), Some(VALUE_URL));
    assert_eq!(outcome.hits.len(), 3);
    assert_eq!(outcome.hits[0].rank, 1);
}

#[test]
fn capital_gains_question_cites_the_guide() {
    let tmp = TempDir::new().unwrap();
    let service = extractive_service(&build_store(tmp.path()));

    let outcome = service.answer("How do I download my capital gains statement on Groww?").unwrap();
    assert_eq!(outcome.source.as_deref(), Some(GUIDE_URL));
    assert!(outcome.answer.contains("Download statement on the Groww app"), "{}", outcome.answer);
}

#[test]
fn custom_top_k_limits_hits() {
    let tmp = TempDir::new().unwrap();
    let service = extractive_service(&build_store(tmp.path()));
    assert_eq!(service.answer_with("exit load", 1).unwrap().hits.len(), 1);
}

#[test]
fn outcome_serializes_question_and_hit_metadata() {
    let tmp = TempDir::new().unwrap();
    let outcome = extractive_service(&build_store(tmp.path())).answer("exit load").unwrap();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["question"], "exit load");
    assert!(value["hits"][0]["metadata"]["url"].is_string());
}

#[test]
fn service_from_settings_without_store_reports_missing_store() {
    let tmp = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hashing;
    settings.data.vector_dir = tmp.path().join("nowhere").to_string_lossy().into_owned();

    match FaqService::from_settings(&settings) {
        Err(err) => assert!(err.is_store_missing(), "{err:?}"),
        Ok(_) => panic!("expected a missing store"),
    }
}

#[test]
fn service_from_settings_uses_configured_store() {
    let tmp = TempDir::new().unwrap();
    let store = build_store(tmp.path());
    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hashing;
    settings.data.vector_dir = store.to_string_lossy().into_owned();
    settings.retrieval.top_k = 2;

    let service = FaqService::from_settings(&settings).unwrap();
    assert_eq!(service.composer_name(), "extractive");
    assert_eq!(service.answer("exit load").unwrap().hits.len(), 2);
}

#[test]
fn prompt_numbers_snippets_and_skips_uncited_ones() {
    let hits = [hit(1, "first fact", Some("https://a.test")), hit(2, "no url", None), hit(3, "third fact", Some("https://c.test"))];
    let prompt = build_prompt("What is it?", &hits);
    assert!(prompt.contains("Snippet 1 (source: https://a.test):\nfirst fact"));
    assert!(prompt.contains("Snippet 3 (source: https://c.test):\nthird fact"));
    assert!(!prompt.contains("no url"));
    assert!(prompt.contains("exactly one explicit citation link"));
    assert!(prompt.ends_with("User question: What is it?\nAnswer:"));

    assert!(build_prompt("q", &[hit(1, "x", None)]).contains("No snippets available."));
}

#[test]
fn generated_reply_citing_a_snippet_is_kept() {
    let (generator, prompts) = ScriptedGenerator::new("  The expense ratio is 0.98% (https://a.test).  ");
    let composer = GenerativeComposer::new(generator);
    let answer = composer.compose("q", &[hit(1, "Expense Ratio: 0.98%.", Some("https://a.test"))]).unwrap();
    assert_eq!(answer, "The expense ratio is 0.98% (https://a.test).");
    assert_eq!(prompts.lock().unwrap().len(), 1);
}

#[test]
fn generated_reply_without_citation_gets_top_source() {
    let (generator, _) = ScriptedGenerator::new("The expense ratio is 0.98%.");
    let composer = GenerativeComposer::new(generator);
    let hits = [hit(1, "Expense Ratio: 0.98%.", Some("https://a.test")), hit(2, "other", Some("https://b.test"))];
    assert_eq!(composer.compose("q", &hits).unwrap(), "The expense ratio is 0.98%.\n\nSource: https://a.test");
}

fn link_count(answer: &str) -> usize {
    answer.matches("https://").count()
}

#[test]
fn reply_citing_two_snippets_keeps_only_one_link() {
    let (generator, _) = ScriptedGenerator::new("See https://a.test and https://b.test for the ratio.");
    let composer = GenerativeComposer::new(generator);
    let hits = [hit(1, "Expense Ratio: 0.98%.", Some("https://a.test")), hit(2, "other", Some("https://b.test"))];

    let answer = composer.compose("q", &hits).unwrap();
    assert_eq!(answer, "See and for the ratio.\n\nSource: https://a.test");
    assert_eq!(link_count(&answer), 1);
}

#[test]
fn invented_link_is_replaced_by_a_supplied_one() {
    let (generator, _) = ScriptedGenerator::new("Per https://made-up.test it is 2%.");
    let composer = GenerativeComposer::new(generator);
    let hits = [hit(1, "Expense Ratio: 0.98%.", Some("https://a.test"))];

    let answer = composer.compose("q", &hits).unwrap();
    assert_eq!(answer, "Per it is 2%.\n\nSource: https://a.test");
    assert!(!answer.contains("made-up"));
}

#[test]
fn supplied_link_named_in_reply_is_preferred_as_source() {
    let (generator, _) = ScriptedGenerator::new("It is 1% (https://made-up.test), see https://b.test.");
    let composer = GenerativeComposer::new(generator);
    let hits = [hit(1, "first", Some("https://a.test")), hit(2, "exit load 1%", Some("https://b.test"))];

    let answer = composer.compose("q", &hits).unwrap();
    assert_eq!(answer, "It is 1%, see.\n\nSource: https://b.test");
    assert_eq!(link_count(&answer), 1);
}

#[test]
fn generator_is_not_called_without_hits() {
    let (generator, prompts) = ScriptedGenerator::new("should not be used");
    let composer = GenerativeComposer::new(generator);
    assert_eq!(composer.compose("q", &[]).unwrap(), NO_SNIPPET);
    assert_eq!(composer.compose("q", &[hit(1, "x", None)]).unwrap(), MISSING_SOURCE);
    assert!(prompts.lock().unwrap().is_empty());
}

#[test]
fn empty_generation_is_an_error() {
    let (generator, _) = ScriptedGenerator::new("   ");
    let composer = GenerativeComposer::new(generator);
    let err = composer.compose("q", &[hit(1, "x", Some("https://a.test"))]).unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[test]
fn generative_composer_plugs_into_the_service() {
    let tmp = TempDir::new().unwrap();
    let store = build_store(tmp.path());
    let (generator, prompts) = ScriptedGenerator::new("It is 0.98%.");
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
    let service = FaqService::new(Retriever::open(&store, embedder).unwrap(), Box::new(GenerativeComposer::new(generator)), 3);

    let outcome = service.answer("What is the expense ratio of JM Value Fund?").unwrap();
    assert_eq!(outcome.answer, format!("It is 0.98%.\n\nSource: {VALUE_URL}"));
    assert_eq!(service.composer_name(), "generative");
    assert!(prompts.lock().unwrap()[0].contains("Expense Ratio: 0.98%"));
}

#[test]
fn statement_download_question_cites_the_guide_url() {
    let tmp = TempDir::new().unwrap();
    let service = extractive_service(&build_store(tmp.path()));

    let outcome = service.answer("How to download mutual fund statement from Groww?").unwrap();
    assert!(outcome.answer.contains(GUIDE_URL), "{}", outcome.answer);
    assert_eq!(outcome.hits[0].metadata.kind, ChunkKind::Guide);
}

#[test]
fn repeated_queries_return_identical_hits() {
    let tmp = TempDir::new().unwrap();
    let service = extractive_service(&build_store(tmp.path()));
    let first = service.answer("exit load of JM Value Fund").unwrap();
    let second = service.answer("exit load of JM Value Fund").unwrap();
    assert_eq!(first.hits, second.hits);
    assert_eq!(first.answer, second.answer);
}
