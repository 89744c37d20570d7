use crate::model::{NarrativeRecord, NarrativeTag};
use crate::parser::fields;
use crate::parser::segments::{segment, SLUG_MARKER};

/// Narrative records in `region`, one per slug marker.
pub fn extract(region: &str) -> Vec<NarrativeRecord> {
    segment(region, &SLUG_MARKER)
        .into_iter()
        .map(|span| {
            let text = span.text;
            NarrativeRecord {
                name: fields::optional_string(text, "name").unwrap_or_else(|| span.key.clone()),
                county: fields::string(text, "county"),
                population: fields::integer(text, "population"),
                last_reviewed: fields::string(text, "lastReviewed"),
                permits: fields::permits(text),
                tag: fields::tag(text, "tag", NarrativeTag::parse),
                title: fields::string(text, "title"),
                summary: fields::string(text, "summary"),
                body: fields::string(text, "body"),
                slug: span.key,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_fields() {
        let region = r#"export const narrativeCities: NarrativeCityProfile[] = [
  {
    slug: 'lowell',
    name: 'Lowell',
    county: 'Middlesex',
    population: 115554,
    permits: { submitted: 26, approved: 26, denied: 0, pending: 0, approvalRate: 100 },
    tag: 'no-ordinance',
    title: 'Lowell: No Local Ordinance',
    summary: 'Council defeated ADU ordinance 7-4.',
    body: 'Lowell’s City Council defeated a proposal.\n\nThe result is striking.',
  },
  {
    slug: 'medford',
    tag: 'something-new',
  },
];"#;
        let found = extract(region);
        assert_eq!(found.len(), 2);
        let lowell = &found[0];
        assert_eq!(lowell.slug, "lowell");
        assert_eq!(lowell.tag, NarrativeTag::NoOrdinance);
        assert_eq!(lowell.permits.approval_rate, 100);
        assert_eq!(lowell.body, "Lowell\u{2019}s City Council defeated a proposal.\n\nThe result is striking.");

        let medford = &found[1];
        assert_eq!(medford.name, "medford");
        assert_eq!(medford.tag, NarrativeTag::Unspecified);
        assert_eq!(medford.summary, "");
        assert_eq!(medford.permits.submitted, 0);
    }
}
