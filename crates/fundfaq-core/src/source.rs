//! Structured fact records produced by the scraping step, and their loader.
//!
//! Two record families exist: one JSON file per scheme under the schemes
//! directory and one JSON file per how-to guide under the guides directory.
//! Loading is all-or-nothing: the first malformed file aborts with
//! [`Error::MalformedSource`] naming it.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct SchemeRecord {
    pub scheme_name: String,
    pub source_url: String,
    pub metadata: SchemeMetadata,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub documents: Vec<LinkedDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemeMetadata {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub fund_house: Option<String>,
    pub plan_type: Option<String>,
    pub scheme_type: Option<String>,
    pub objective: Option<String>,
}

/// A regulatory filing or similar document linked from a scheme page.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuideRecord {
    pub guide_key: String,
    pub source_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub methods: Vec<GuideMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuideMethod {
    pub label: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// The two shapes a scheme attribute takes in the source data.
///
/// Scrapers emit either a bare scalar (`"expense_ratio": "0.98%"`) or an
/// object carrying a raw `value`, a formatted `display` and an optional
/// per-attribute `source_url`. Every other key of the object is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute<'a> {
    Scalar(&'a Value),
    Detailed {
        value: Option<&'a Value>,
        display: Option<&'a str>,
        source_url: Option<&'a str>,
    },
}

impl<'a> From<&'a Value> for Attribute<'a> {
    fn from(raw: &'a Value) -> Self {
        match raw {
            Value::Object(map) => Attribute::Detailed {
                value: map.get("value").filter(|v| !v.is_null()),
                display: map.get("display").and_then(Value::as_str),
                source_url: map.get("source_url").and_then(Value::as_str),
            },
            other => Attribute::Scalar(other),
        }
    }
}

impl Attribute<'_> {
    /// The human-readable value for this attribute, or `None` when the
    /// attribute carries nothing worth stating.
    ///
    /// Detailed attributes prefer a textual `value`, then `display`, then a
    /// non-textual `value` rendered as text.
    pub fn resolve(&self) -> Option<String> {
        match *self {
            Attribute::Scalar(value) => render_value(value),
            Attribute::Detailed { value, display, .. } => {
                if let Some(text) = value.and_then(Value::as_str).and_then(non_blank) {
                    return Some(text.to_string());
                }
                if let Some(text) = display.and_then(non_blank) {
                    return Some(text.to_string());
                }
                value.filter(|v| !v.is_string()).and_then(render_value)
            }
        }
    }

    pub fn source_override(&self) -> Option<&str> {
        match *self {
            Attribute::Scalar(_) => None,
            Attribute::Detailed { source_url, .. } => source_url.and_then(non_blank),
        }
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_blank(s).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

pub(crate) fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// All source records, in the deterministic order chunks are emitted.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub schemes: Vec<SchemeRecord>,
    pub guides: Vec<GuideRecord>,
}

impl Corpus {
    /// Load every `*.json` record from the two directories. A directory that
    /// does not exist contributes no records; an entry that cannot be read
    /// fails the load.
    pub fn load(schemes_dir: &Path, guides_dir: &Path) -> Result<Self> {
        let mut schemes = Vec::new();
        for path in list_json_files(schemes_dir)? {
            let record: SchemeRecord = read_record(&path)?;
            validate_scheme(&path, &record)?;
            debug!(path = %path.display(), scheme = %record.scheme_name, "loaded scheme record");
            schemes.push(record);
        }
        let mut guides = Vec::new();
        for path in list_json_files(guides_dir)? {
            let record: GuideRecord = read_record(&path)?;
            validate_guide(&path, &record)?;
            debug!(path = %path.display(), guide = %record.guide_key, "loaded guide record");
            guides.push(record);
        }
        info!(schemes = schemes.len(), guides = guides.len(), "loaded source corpus");
        Ok(Self { schemes, guides })
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty() && self.guides.is_empty()
    }
}

fn read_record<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| Error::malformed(path, e.to_string()))
}

fn validate_scheme(path: &Path, record: &SchemeRecord) -> Result<()> {
    if non_blank(&record.scheme_name).is_none() {
        return Err(Error::malformed(path, "scheme_name is empty"));
    }
    if non_blank(&record.source_url).is_none() {
        return Err(Error::malformed(path, "source_url is empty"));
    }
    Ok(())
}

fn validate_guide(path: &Path, record: &GuideRecord) -> Result<()> {
    if non_blank(&record.guide_key).is_none() {
        return Err(Error::malformed(path, "guide_key is empty"));
    }
    if non_blank(&record.source_url).is_none() {
        return Err(Error::malformed(path, "source_url is empty"));
    }
    Ok(())
}

fn list_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::malformed(path, e.to_string())
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
