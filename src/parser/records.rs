use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::model::{ComplianceStatus, MunicipalityType, Record, SourceMap};
use crate::parser::fields;
use crate::parser::provisions::{self, DecisionWindow};
use crate::parser::scan;
use crate::parser::segments::Span;

static PROVISIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bprovisions\s*:\s*\[").unwrap());

/// Split a record span into its own fields and its provisions list, so
/// record-level lookups never see provision text.
fn split_provisions(text: &str) -> (Cow<'_, str>, &str) {
    match scan::find_block(text, &PROVISIONS_RE) {
        Some((open, Some(end))) => {
            let head = format!("{}{}", &text[..open], &text[end..]);
            (Cow::Owned(head), &text[open..end])
        }
        Some((open, None)) => (Cow::Borrowed(&text[..open]), &text[open..]),
        None => (Cow::Borrowed(text), text),
    }
}

/// Assemble one record from its span.
pub fn build(span: &Span<'_>, sources: &SourceMap, window: DecisionWindow) -> Record {
    let (head, list) = split_provisions(span.text);
    let head = head.as_ref();

    let provisions = provisions::extract(list, sources, window);
    let mut seen = HashSet::new();
    for p in &provisions {
        if !seen.insert(p.id.as_str()) {
            warn!(slug = %span.key, id = %p.id, "duplicate provision id");
        }
        if p.status == ComplianceStatus::Unrecorded {
            debug!(slug = %span.key, id = %p.id, "provision status not recognised");
        }
    }

    let permits = fields::permits(head);
    if !permits.is_reconciled() {
        debug!(slug = %span.key, ?permits, "permit counts do not reconcile");
    }

    let name = fields::optional_string(head, "name").unwrap_or_else(|| span.key.clone());
    debug!(
        slug = %span.key,
        start = span.start,
        end = span.end,
        provisions = provisions.len(),
        "record built"
    );

    Record {
        slug: span.key.clone(),
        name,
        county: fields::string(head, "county"),
        population: fields::integer(head, "population"),
        municipality_type: fields::tag(head, "municipalityType", MunicipalityType::parse),
        last_reviewed: fields::string(head, "lastReviewed"),
        bylaw_last_updated: fields::string(head, "bylawLastUpdated"),
        bylaw_retrieved_at: fields::string(head, "bylawRetrievedAt"),
        bylaw_version_date: fields::string(head, "bylawVersionDate"),
        bylaw_source: fields::string(head, "bylawSource"),
        bylaw_source_title: fields::string(head, "bylawSourceTitle"),
        bylaw_source_url: fields::link(head, "bylawSourceUrl").map(|l| l.resolve(sources)),
        ag_disapprovals: fields::count(head, "agDisapprovals"),
        ag_decision_date: fields::optional_string(head, "agDecisionDate"),
        ag_decision_url: fields::link(head, "agDecisionUrl").map(|l| l.resolve(sources)),
        resistance_tag: fields::optional_string(head, "resistanceTag"),
        is_exempt: fields::flag(head, "isExempt"),
        permits,
        bottom_line: fields::string(head, "bottomLine"),
        provisions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Tier;
    use crate::parser::segments::{segment, SLUG_MARKER};

    const TOWNS: &str = r#"
  {
    slug: 'plymouth',
    name: 'Plymouth',
    county: 'Plymouth',
    population: 61217,
    lastReviewed: '2026-02-15',
    agDisapprovals: 0,
    permits: { submitted: 42, approved: 34, denied: 8, pending: 0, approvalRate: 81 },
    bottomLine: 'Line one.\nLine two with Plymouth\'s rules.',
    provisions: [
      {
        id: 'ply-01',
        provision: 'Owner-Occupancy Requirement',
        category: 'Use & Occupancy',
        status: 'inconsistent',
        citations: [],
      },
    ],
    bylawSourceTitle: 'Zoning Bylaw',
  },
  {
    slug: 'hopedale',
    provisions: [],
  },
"#;

    fn spans() -> Vec<Span<'static>> {
        segment(TOWNS, &SLUG_MARKER)
    }

    #[test]
    fn full_record() {
        let spans = spans();
        let r = build(&spans[0], &SourceMap::new(), DecisionWindow::default());
        assert_eq!(r.slug, "plymouth");
        assert_eq!(r.name, "Plymouth");
        assert_eq!(r.population, 61217);
        assert_eq!(r.municipality_type, MunicipalityType::Town);
        assert_eq!(r.permits.denied, 8);
        assert_eq!(r.bottom_line, "Line one.\nLine two with Plymouth's rules.");
        assert_eq!(r.bylaw_source_title, "Zoning Bylaw", "fields after the provisions list are kept");
        assert_eq!(r.ag_decision_date, None);
        assert_eq!(r.provisions.len(), 1);
        assert_eq!(r.provisions[0].tier, Tier::Inconsistent);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let spans = spans();
        let r = build(&spans[1], &SourceMap::new(), DecisionWindow::default());
        assert_eq!(r.slug, "hopedale");
        assert_eq!(r.name, "hopedale");
        assert_eq!(r.county, "");
        assert_eq!(r.population, 0);
        assert_eq!(r.bottom_line, "");
        assert_eq!(r.ag_disapprovals, 0);
        assert!(!r.is_exempt);
        assert!(r.provisions.is_empty());
    }

    #[test]
    fn provision_fields_do_not_leak_into_record() {
        let text = "slug: 'x', provisions: [ { id: 'x-1', provision: 'P', category: 'C', status: 'review', impact: 'i', name: 'inner' } ],";
        let span = Span {
            key: "x".into(),
            start: 0,
            end: text.len(),
            text,
        };
        let r = build(&span, &SourceMap::new(), DecisionWindow::default());
        assert_eq!(r.name, "x");
        assert_eq!(r.provisions.len(), 1);
    }
}
