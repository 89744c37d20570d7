use std::sync::LazyLock;

use regex::Regex;

use crate::parser::{fields, scan};

/// Every record starts at its `slug: '…'` field.
pub static SLUG_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&fields::string_pattern("slug")).unwrap());

static ARRAY_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"=\s*\[").unwrap());

/// One record's slice of a collection region, marker to next marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    pub key: String,
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// The text introduced by `marker`, ending where the next of `others` begins
/// (or at end of input). `None` when the marker is absent.
pub fn region<'a>(content: &'a str, marker: &str, others: &[&str]) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }
    let start = content.find(marker)?;
    let body_from = start + marker.len();
    let end = others
        .iter()
        .filter(|m| !m.is_empty() && *m != &marker)
        .filter_map(|m| content[body_from..].find(m).map(|p| body_from + p))
        .min()
        .unwrap_or(content.len());
    Some(&content[start..end])
}

/// Trim a collection region to its `= [ … ]` array literal when that array
/// closes; otherwise the region is returned unchanged.
pub fn array_body(region: &str) -> &str {
    match scan::find_block(region, &ARRAY_OPEN) {
        Some((_, Some(end))) => &region[..end],
        _ => region,
    }
}

/// Split `region` into one span per `marker` occurrence, in document order.
///
/// Span *i* runs from the *i*-th marker to the start of the next one, the last
/// span to the end of the region. The marker's first capture group becomes
/// the span key. No markers means no spans.
pub fn segment<'a>(region: &'a str, marker: &Regex) -> Vec<Span<'a>> {
    let hits: Vec<(usize, String)> = marker
        .captures_iter(region)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps
                .get(1)
                .map(|m| fields::unescape(m.as_str()))
                .unwrap_or_default();
            Some((whole.start(), key))
        })
        .collect();

    let mut spans = Vec::with_capacity(hits.len());
    for (i, (start, key)) in hits.iter().enumerate() {
        let end = hits.get(i + 1).map_or(region.len(), |(next, _)| *next);
        spans.push(Span {
            key: key.clone(),
            start: *start,
            end,
            text: &region[*start..end],
        });
    }
    spans
}
