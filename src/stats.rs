use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use crate::classify::{StatusCounts, Tier};
use crate::model::{ComplianceStatus, NarrativeRecord, Record};
use crate::utils::percent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub disapproved: usize,
    pub inconsistent: usize,
    pub review: usize,
    pub consistent: usize,
}

impl TierCounts {
    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Disapproved => self.disapproved,
            Tier::Inconsistent => self.inconsistent,
            Tier::Review => self.review,
            Tier::Consistent => self.consistent,
        }
    }

    fn bump(&mut self, tier: Tier) {
        match tier {
            Tier::Disapproved => self.disapproved += 1,
            Tier::Inconsistent => self.inconsistent += 1,
            Tier::Review => self.review += 1,
            Tier::Consistent => self.consistent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.disapproved + self.inconsistent + self.review + self.consistent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frequency {
    pub value: String,
    pub count: usize,
}

/// Aggregates over the whole record collection. Recomputed from records on
/// demand, never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_records: usize,
    pub total_provisions: usize,
    pub tiers: TierCounts,
    pub by_status: StatusCounts,
    /// Provisions marked inconsistent that no formal decision has covered.
    pub statutory_conflict: usize,
    /// Sum of the per-record disapproval counts as published.
    pub total_ag_disapprovals: u64,
    pub towns_tracked: usize,
    pub cities_tracked: usize,
    pub narratives: usize,
    pub records_with_disapprovals: Vec<String>,
    pub records_with_inconsistencies: Vec<String>,
    pub provision_frequency: Vec<Frequency>,
    pub category_frequency: Vec<Frequency>,
}

impl Stats {
    pub fn compute(records: &[Record], narratives: &[NarrativeRecord]) -> Self {
        let mut tiers = TierCounts::default();
        let mut by_status = StatusCounts::default();
        for record in records {
            for p in &record.provisions {
                tiers.bump(p.tier);
            }
            let counts = StatusCounts::of(&record.provisions);
            by_status.inconsistent += counts.inconsistent;
            by_status.review += counts.review;
            by_status.compliant += counts.compliant;
        }

        let inconsistent = || {
            records
                .iter()
                .flat_map(|r| &r.provisions)
                .filter(|p| p.status == ComplianceStatus::Inconsistent)
        };

        Stats {
            total_records: records.len(),
            total_provisions: records.iter().map(|r| r.provisions.len()).sum(),
            tiers,
            by_status,
            statutory_conflict: by_status.inconsistent.saturating_sub(tiers.disapproved),
            total_ag_disapprovals: records.iter().map(|r| u64::from(r.ag_disapprovals)).sum(),
            towns_tracked: records.iter().filter(|r| !r.is_city()).count(),
            cities_tracked: records.iter().filter(|r| r.is_city()).count(),
            narratives: narratives.len(),
            records_with_disapprovals: records
                .iter()
                .filter(|r| r.ag_disapprovals > 0)
                .map(|r| r.slug.clone())
                .collect(),
            records_with_inconsistencies: records
                .iter()
                .filter(|r| r.has_inconsistency())
                .map(|r| r.slug.clone())
                .collect(),
            provision_frequency: rank(inconsistent().map(|p| p.label.as_str())),
            category_frequency: rank(inconsistent().map(|p| p.category.as_str())),
        }
    }

    pub fn log_summary(&self) {
        info!(
            records = self.total_records,
            provisions = self.total_provisions,
            disapproved = self.tiers.disapproved,
            inconsistent = self.tiers.inconsistent,
            review = self.tiers.review,
            consistent = self.tiers.consistent,
            narratives = self.narratives,
            "extraction complete"
        );
    }
}

/// Count occurrences, most frequent first; ties keep first-seen order.
fn rank<'a>(values: impl Iterator<Item = &'a str>) -> Vec<Frequency> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match index.get(value) {
            Some(&i) => seen[i].1 += 1,
            None => {
                index.insert(value, seen.len());
                seen.push((value, 1));
            }
        }
    }
    seen.into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .map(|(value, count)| Frequency {
            value: value.to_string(),
            count,
        })
        .collect()
}

pub fn render_markdown(stats: &Stats, top: usize) -> String {
    let mut out = String::new();
    let total = stats.total_provisions;

    out.push_str("## Compliance Stats\n");
    out.push_str(&format!(
        "- Communities tracked: {} ({} towns, {} cities)\n- Narrative cases: {}\n- Provisions analysed: {}\n",
        stats.total_records, stats.towns_tracked, stats.cities_tracked, stats.narratives, total
    ));
    out.push_str(&format!(
        "- AG disapprovals (published): {}\n- Statutory conflicts: {}\n",
        stats.total_ag_disapprovals, stats.statutory_conflict
    ));

    out.push_str("\n### Provisions by tier\n");
    for tier in Tier::ALL {
        let count = stats.tiers.get(tier);
        out.push_str(&format!(
            "- {}: {} ({:.1}%)\n",
            tier.label(),
            count,
            percent(count, total)
        ));
    }

    out.push_str("\n### Communities\n");
    out.push_str(&format!(
        "- With AG disapprovals: {}\n- With inconsistent provisions: {}\n",
        display_list(&stats.records_with_disapprovals),
        display_list(&stats.records_with_inconsistencies)
    ));

    out.push_str("\n### Most common inconsistent provisions\n");
    for f in stats.provision_frequency.iter().take(top) {
        out.push_str(&format!("- {}: {}\n", f.value, f.count));
    }

    out.push_str("\n### Inconsistent provisions by category\n");
    for f in &stats.category_frequency {
        out.push_str(&format!("- {}: {}\n", f.value, f.count));
    }

    out
}

fn display_list(slugs: &[String]) -> String {
    if slugs.is_empty() {
        "none".to_string()
    } else {
        format!("{} ({})", slugs.len(), slugs.iter().join(", "))
    }
}
