use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::{self, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MunicipalityType {
    #[default]
    Town,
    City,
}

impl MunicipalityType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "city" => MunicipalityType::City,
            _ => MunicipalityType::Town,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MunicipalityType::Town => "town",
            MunicipalityType::City => "city",
        }
    }

    /// Word used for the local rule text: towns adopt bylaws, cities ordinances.
    pub fn rule_word(&self) -> &'static str {
        match self {
            MunicipalityType::Town => "bylaw",
            MunicipalityType::City => "ordinance",
        }
    }
}

/// Self-assessed status of a provision. Anything unrecognised (or missing)
/// lands in `Unrecorded` and is treated like `Compliant` by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Compliant,
    Inconsistent,
    Review,
    Unrecorded,
}

impl ComplianceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "compliant" => ComplianceStatus::Compliant,
            "inconsistent" => ComplianceStatus::Inconsistent,
            "review" => ComplianceStatus::Review,
            _ => ComplianceStatus::Unrecorded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarrativeTag {
    AdministrativeFriction,
    NoOrdinance,
    Stalled,
    #[default]
    Unspecified,
}

impl NarrativeTag {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "administrative-friction" => NarrativeTag::AdministrativeFriction,
            "no-ordinance" => NarrativeTag::NoOrdinance,
            "stalled" => NarrativeTag::Stalled,
            _ => NarrativeTag::Unspecified,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NarrativeTag::AdministrativeFriction => "Administrative Friction",
            NarrativeTag::NoOrdinance => "No Local Ordinance",
            NarrativeTag::Stalled => "Stalled",
            NarrativeTag::Unspecified => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub label: String,
    pub url: String,
}

/// Keyed citation sources. Ordered so serialized output is stable.
pub type SourceMap = BTreeMap<String, Citation>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermitSummary {
    pub submitted: u32,
    pub approved: u32,
    pub denied: u32,
    pub pending: u32,
    /// Percentage, 0-100, as published. Not recomputed.
    pub approval_rate: u32,
}

impl PermitSummary {
    /// Advisory only: the published figures are not guaranteed to add up.
    pub fn is_reconciled(&self) -> bool {
        let decided = self
            .approved
            .saturating_add(self.denied)
            .saturating_add(self.pending);
        self.submitted >= decided && self.approval_rate <= 100
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provision {
    pub id: String,
    pub label: String,
    pub category: String,
    pub status: ComplianceStatus,
    pub state_law: String,
    pub local_bylaw: String,
    pub impact: String,
    pub decision: Option<String>,
    pub has_decision: bool,
    pub citations: Vec<Citation>,
    pub tier: Tier,
}

impl Provision {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: String,
        label: String,
        category: String,
        status: ComplianceStatus,
        state_law: String,
        local_bylaw: String,
        impact: String,
        decision: Option<String>,
        citations: Vec<Citation>,
    ) -> Self {
        let has_decision = decision.is_some();
        Provision {
            id,
            label,
            category,
            status,
            state_law,
            local_bylaw,
            impact,
            decision,
            has_decision,
            citations,
            tier: classify::classify(status, has_decision),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub slug: String,
    pub name: String,
    pub county: String,
    pub population: u64,
    pub municipality_type: MunicipalityType,
    pub last_reviewed: String,
    pub bylaw_last_updated: String,
    pub bylaw_retrieved_at: String,
    pub bylaw_version_date: String,
    pub bylaw_source: String,
    pub bylaw_source_title: String,
    pub bylaw_source_url: Option<String>,
    pub ag_disapprovals: u32,
    pub ag_decision_date: Option<String>,
    pub ag_decision_url: Option<String>,
    pub resistance_tag: Option<String>,
    pub is_exempt: bool,
    pub permits: PermitSummary,
    pub bottom_line: String,
    pub provisions: Vec<Provision>,
}

impl Record {
    pub fn is_city(&self) -> bool {
        self.municipality_type == MunicipalityType::City
    }

    pub fn has_inconsistency(&self) -> bool {
        self.provisions
            .iter()
            .any(|p| p.status == ComplianceStatus::Inconsistent)
    }

    /// Published bottom line, or a sentence synthesised from the provisions.
    pub fn bottom_line_or_generated(&self) -> String {
        if self.bottom_line.trim().is_empty() {
            classify::generated_bottom_line(self)
        } else {
            self.bottom_line.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRecord {
    pub slug: String,
    pub name: String,
    pub county: String,
    pub population: u64,
    pub last_reviewed: String,
    pub permits: PermitSummary,
    pub tag: NarrativeTag,
    pub title: String,
    pub summary: String,
    pub body: String,
}

/// Everything pulled out of one source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub records: Vec<Record>,
    pub narratives: Vec<NarrativeRecord>,
    pub sources: SourceMap,
}

impl Document {
    pub fn find(&self, slug: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.slug == slug)
    }

    pub fn provision_count(&self) -> usize {
        self.records.iter().map(|r| r.provisions.len()).sum()
    }
}
