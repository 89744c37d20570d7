pub mod fields;
pub mod narratives;
pub mod provisions;
pub mod records;
pub mod scan;
pub mod segments;
pub mod sources;

use std::collections::HashSet;
use std::path::Path;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ExtractError;
use crate::model::{Document, Record, SourceMap};
use crate::stats::Stats;
use provisions::DecisionWindow;
use segments::{Span, SLUG_MARKER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub window: DecisionWindow,
    pub records_marker: String,
    pub narratives_marker: String,
    pub sources_marker: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            window: DecisionWindow::default(),
            records_marker: "export const towns:".to_string(),
            narratives_marker: "export const narrativeCities:".to_string(),
            sources_marker: "const SOURCES".to_string(),
        }
    }
}

/// A parsed document plus the aggregates derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    #[serde(flatten)]
    pub document: Document,
    pub stats: Stats,
}

#[cfg(feature = "rayon")]
fn build_records(spans: &[Span<'_>], sources: &SourceMap, window: DecisionWindow) -> Vec<Record> {
    spans
        .par_iter()
        .map(|span| records::build(span, sources, window))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn build_records(spans: &[Span<'_>], sources: &SourceMap, window: DecisionWindow) -> Vec<Record> {
    spans
        .iter()
        .map(|span| records::build(span, sources, window))
        .collect()
}

/// Single pass over the raw text: source map, records, narratives.
/// A missing marker yields an empty collection, never an error.
pub fn extract_document(content: &str, opts: &ExtractOptions) -> Document {
    let markers = [
        opts.sources_marker.as_str(),
        opts.records_marker.as_str(),
        opts.narratives_marker.as_str(),
    ];

    let sources = match segments::region(content, &opts.sources_marker, &markers) {
        Some(region) => sources::extract(region),
        None => {
            warn!(marker = %opts.sources_marker, "source map not found");
            SourceMap::new()
        }
    };

    let records = match segments::region(content, &opts.records_marker, &markers) {
        Some(region) => {
            let spans = segments::segment(segments::array_body(region), &SLUG_MARKER);
            build_records(&spans, &sources, opts.window)
        }
        None => {
            warn!(marker = %opts.records_marker, "record collection not found");
            Vec::new()
        }
    };

    let mut seen = HashSet::new();
    for r in &records {
        if !seen.insert(r.slug.as_str()) {
            warn!(slug = %r.slug, "duplicate slug, both records kept");
        }
    }

    let narratives = match segments::region(content, &opts.narratives_marker, &markers) {
        Some(region) => narratives::extract(segments::array_body(region)),
        None => {
            warn!(marker = %opts.narratives_marker, "narrative collection not found");
            Vec::new()
        }
    };

    Document {
        records,
        narratives,
        sources,
    }
}

pub fn run(content: &str, opts: &ExtractOptions) -> Extraction {
    let document = extract_document(content, opts);
    let stats = Stats::compute(&document.records, &document.narratives);
    stats.log_summary();
    Extraction { document, stats }
}

/// Read `path` and extract it. Failing to read the file is the only error.
pub fn load(path: &Path, opts: &ExtractOptions) -> Result<Extraction, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = content.len(), "loaded source document");
    Ok(run(&content, opts))
}
