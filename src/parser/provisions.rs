use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Citation, ComplianceStatus, Provision, SourceMap};
use crate::parser::fields::{self, LinkValue, QUOTED};
use crate::parser::scan;

/// `{ id: '…', provision: '…', category: '…', status: '…'` in that order.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\{{\s*id\s*:\s*{q}\s*,\s*provision\s*:\s*{q}\s*,\s*category\s*:\s*{q}\s*,\s*status\s*:\s*{q}",
        q = QUOTED
    ))
    .unwrap()
});
static CITATIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcitations\s*:\s*\[").unwrap());
static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\{{\s*label\s*:\s*{q}\s*,\s*url\s*:\s*(?:{q}|SOURCES\.(\w+))",
        q = QUOTED
    ))
    .unwrap()
});

/// How far past a provision header the decision lookup may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionScope {
    /// The provision's own `{ … }` object; lookahead only if it never closes.
    Balanced,
    /// Up to the next provision, or `lookahead_chars` for the last one.
    #[default]
    Lookahead,
}

impl DecisionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionScope::Balanced => "balanced",
            DecisionScope::Lookahead => "lookahead",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionWindow {
    pub scope: DecisionScope,
    pub lookahead_chars: usize,
}

impl Default for DecisionWindow {
    fn default() -> Self {
        DecisionWindow {
            scope: DecisionScope::Lookahead,
            lookahead_chars: 500,
        }
    }
}

/// All provisions inside `span`, in document order.
pub fn extract(span: &str, sources: &SourceMap, window: DecisionWindow) -> Vec<Provision> {
    let headers: Vec<Captures> = HEADER_RE.captures_iter(span).collect();
    let mut provisions = Vec::with_capacity(headers.len());

    for (i, caps) in headers.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let next = headers
            .get(i + 1)
            .and_then(|c| c.get(0))
            .map(|m| m.start());
        let body = body(span, whole.start(), whole.end(), next, window);

        let group = |n: usize| {
            caps.get(n)
                .map(|m| fields::unescape(m.as_str()))
                .unwrap_or_default()
        };

        provisions.push(Provision::new(
            group(1),
            group(2),
            group(3),
            ComplianceStatus::parse(&group(4)),
            fields::string(body, "stateLaw"),
            fields::string(body, "localBylaw"),
            fields::string(body, "impact"),
            fields::optional_string(body, "agDecision"),
            citations(body, sources),
        ));
    }
    provisions
}

/// Text between a provision's header and its boundary.
fn body(
    span: &str,
    open: usize,
    header_end: usize,
    next: Option<usize>,
    window: DecisionWindow,
) -> &str {
    if window.scope == DecisionScope::Balanced {
        match scan::block_end(span, open) {
            Some(end) if next.map_or(true, |n| end <= n) => return &span[header_end..end],
            _ => debug!(offset = open, "provision object not closed, using lookahead window"),
        }
    }
    let end = next.unwrap_or_else(|| scan::advance_chars(span, header_end, window.lookahead_chars));
    &span[header_end..end]
}

fn citations(body: &str, sources: &SourceMap) -> Vec<Citation> {
    let list = match scan::find_block(body, &CITATIONS_RE) {
        Some((open, Some(end))) => &body[open..end],
        Some((open, None)) => &body[open..],
        None => return Vec::new(),
    };
    CITATION_RE
        .captures_iter(list)
        .map(|caps| {
            let label = caps
                .get(1)
                .map(|m| fields::unescape(m.as_str()))
                .unwrap_or_default();
            let url = match (caps.get(2), caps.get(3)) {
                (Some(literal), _) => LinkValue::Literal(fields::unescape(literal.as_str())),
                (None, Some(key)) => LinkValue::Source(key.as_str().to_string()),
                (None, None) => LinkValue::Literal(String::new()),
            };
            Citation {
                label,
                url: url.resolve(sources),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Tier;

    const SPAN: &str = r#"slug: 'leicester',
    provisions: [
      {
        id: 'lei-01',
        provision: 'Bedroom Limit on ADUs',
        category: 'Dimensional & Parking',
        status: 'inconsistent',
        stateLaw: '760 CMR 71.05 — size is governed by square footage only.',
        localBylaw: 'Leicester limited ADUs to a maximum of 2 bedrooms.',
        impact: 'The AG disapproved this bedroom limit.',
        agDecision:
          'AG disapproved May 2025 — bedroom limits not authorized.',
        citations: [
          { label: '760 CMR 71.05', url: SOURCES.cmr71 },
          { label: 'Town page', url: 'https://example.org/leicester' },
        ],
      },
      {
        id: 'lei-04',
        provision: 'ADU Size Limits',
        category: 'Dimensional & Parking',
        status: 'compliant',
        impact: 'Consistent with state law.',
        citations: [],
      },
    ],
    notes: { agDecision: 'stray text after the provisions list' },
"#;

    const BALANCED: DecisionWindow = DecisionWindow {
        scope: DecisionScope::Balanced,
        lookahead_chars: 500,
    };

    fn sources() -> SourceMap {
        let mut map = SourceMap::new();
        map.insert(
            "cmr71".into(),
            Citation {
                label: "760 CMR 71.00".into(),
                url: "https://www.mass.gov/doc/760-cmr-7100".into(),
            },
        );
        map
    }

    #[test]
    fn headers_and_fields() {
        let found = extract(SPAN, &sources(), DecisionWindow::default());
        assert_eq!(found.len(), 2);
        let first = &found[0];
        assert_eq!(first.id, "lei-01");
        assert_eq!(first.label, "Bedroom Limit on ADUs");
        assert_eq!(first.status, ComplianceStatus::Inconsistent);
        assert!(first.state_law.contains('\u{2014}'));
        assert_eq!(first.local_bylaw, "Leicester limited ADUs to a maximum of 2 bedrooms.");
        assert_eq!(
            first.decision.as_deref(),
            Some("AG disapproved May 2025 \u{2014} bedroom limits not authorized.")
        );
        assert_eq!(first.tier, Tier::Disapproved);
        assert_eq!(first.citations.len(), 2);
        assert_eq!(first.citations[0].url, "https://www.mass.gov/doc/760-cmr-7100");
        assert_eq!(first.citations[1].url, "https://example.org/leicester");
    }

    #[test]
    fn balanced_scope_stops_at_object_close() {
        let found = extract(SPAN, &sources(), BALANCED);
        let last = &found[1];
        assert!(!last.has_decision);
        assert_eq!(last.tier, Tier::Consistent);
        assert_eq!(last.state_law, "");
        assert!(last.citations.is_empty());
    }

    #[test]
    fn lookahead_scope_can_overreach() {
        let found = extract(SPAN, &sources(), DecisionWindow::default());
        assert!(found[0].has_decision);
        assert!(found[1].has_decision, "last provision picks up trailing text");

        let short = DecisionWindow {
            scope: DecisionScope::Lookahead,
            lookahead_chars: 40,
        };
        let found = extract(SPAN, &sources(), short);
        assert!(!found[1].has_decision);
    }

    #[test]
    fn unclosed_object_falls_back_to_window() {
        let span = "{ id: 'x-1', provision: 'Setback', category: 'Dimensional & Parking', status: 'review', agDecision: 'AG disapproved'";
        let found = extract(span, &SourceMap::new(), BALANCED);
        assert_eq!(found.len(), 1);
        assert!(found[0].has_decision);
        assert_eq!(found[0].status, ComplianceStatus::Review);
        assert_eq!(found[0].tier, Tier::Disapproved);
    }

    #[test]
    fn default_window_is_lookahead() {
        let window = DecisionWindow::default();
        assert_eq!(window.scope, DecisionScope::Lookahead);
        assert_eq!(window.lookahead_chars, 500);

        // decision sits inside the object but past the 500-char window
        let span = format!(
            "{{ id: 'sou-01', provision: 'Owner-Occupancy', category: 'Use & Occupancy', status: 'inconsistent', localBylaw: '{}', agDecision: 'AG disapproved' }}",
            "x".repeat(600)
        );
        let lookahead = DecisionWindow {
            scope: DecisionScope::Lookahead,
            lookahead_chars: 500,
        };
        let by_default = extract(&span, &SourceMap::new(), window);
        assert_eq!(by_default, extract(&span, &SourceMap::new(), lookahead));
        assert!(!by_default[0].has_decision);
        assert_eq!(by_default[0].tier, Tier::Inconsistent);

        let balanced = extract(&span, &SourceMap::new(), BALANCED);
        assert!(balanced[0].has_decision);
        assert_eq!(balanced[0].tier, Tier::Disapproved);
    }

    #[test]
    fn zero_provisions() {
        assert!(extract("slug: 'x', provisions: []", &SourceMap::new(), DecisionWindow::default()).is_empty());
    }
}
