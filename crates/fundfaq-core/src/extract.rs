//! Chunk extraction: source records in, citable `(text, metadata)` chunks out.
//!
//! Every emitted chunk carries a non-empty citation URL. Records are validated
//! at load time, so extraction itself cannot fail; the only fatal condition
//! here is an empty result, reported by [`collect_chunks`].

use std::iter;

use crate::error::{Error, Result};
use crate::source::{non_blank, Attribute, Corpus, GuideRecord, SchemeRecord};
use crate::types::{Chunk, ChunkKind, ChunkMetadata};

const UNSPECIFIED: &str = "unspecified";

impl Corpus {
    /// Lazy chunk sequence: all schemes (in load order), then all guides.
    /// Calling it again replays the identical sequence.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        self.schemes
            .iter()
            .flat_map(scheme_chunks)
            .chain(self.guides.iter().flat_map(guide_chunks))
    }
}

/// Materialize the corpus' chunks, failing when there are none.
pub fn collect_chunks(corpus: &Corpus) -> Result<Vec<Chunk>> {
    let chunks: Vec<Chunk> = corpus.chunks().collect();
    if chunks.is_empty() {
        return Err(Error::NoChunks);
    }
    Ok(chunks)
}

/// One overview chunk, then one chunk per stated attribute, then one per linked document.
pub fn scheme_chunks(record: &SchemeRecord) -> impl Iterator<Item = Chunk> + '_ {
    let scheme = record.scheme_name.trim();
    let scheme_url = record.source_url.trim();

    let overview = {
        let meta = &record.metadata;
        let text = format!(
            "{scheme} is a {} scheme in the {} category offered by {}. Data source: {scheme_url}",
            meta.category.as_deref().and_then(non_blank).unwrap_or(UNSPECIFIED),
            meta.sub_category.as_deref().and_then(non_blank).unwrap_or(UNSPECIFIED),
            meta.fund_house.as_deref().and_then(non_blank).unwrap_or(UNSPECIFIED),
        );
        Chunk::new(text, ChunkMetadata::new(ChunkKind::SchemeOverview, scheme_url).with_scheme(scheme))
    };

    let attributes = record.attributes.iter().filter_map(move |(field, raw)| {
        let attribute = Attribute::from(raw);
        let description = attribute.resolve()?;
        let url = attribute.source_override().unwrap_or(scheme_url);
        let text = format!("{scheme} - {}: {description}. Source: {url}", field_label(field));
        Some(Chunk::new(
            text,
            ChunkMetadata::new(ChunkKind::SchemeAttribute, url).with_field(field.as_str()).with_scheme(scheme),
        ))
    });

    let documents = record.documents.iter().map(move |doc| {
        let url = doc.url.as_deref().and_then(non_blank).unwrap_or(scheme_url);
        let text = format!("{scheme} has a {} document at {url}.", doc.doc_type.trim());
        Chunk::new(text, ChunkMetadata::new(ChunkKind::SchemeDocument, url).with_scheme(scheme))
    });

    iter::once(overview).chain(attributes).chain(documents)
}

/// One chunk per method: the label followed by its steps as prose.
pub fn guide_chunks(record: &GuideRecord) -> impl Iterator<Item = Chunk> + '_ {
    let url = record.source_url.trim();
    let guide_key = record.guide_key.trim();
    record.methods.iter().map(move |method| {
        let label = method.label.trim();
        let steps = method.steps.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
        Chunk::new(
            format!("{label}: {steps} Source: {url}"),
            ChunkMetadata::new(ChunkKind::Guide, url).with_guide(guide_key, label),
        )
    })
}

/// `minimum_sip_investment` -> `Minimum Sip Investment`, `nav_1y` -> `Nav 1Y`.
/// A letter is capitalised whenever it does not follow another letter.
pub fn field_label(field: &str) -> String {
    field
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut out = String::with_capacity(word.len());
            let mut after_letter = false;
            for c in word.chars() {
                if after_letter { out.extend(c.to_lowercase()) } else { out.extend(c.to_uppercase()) }
                after_letter = c.is_alphabetic();
            }
            out
        })
        .collect::<Vec<String>>()
        .join(" ")
}
