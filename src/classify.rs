use serde::Serialize;

use crate::model::{ComplianceStatus, Provision, Record};

/// Confidence tier of a provision, ordered by severity (`Disapproved` is the maximum).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tier {
    #[serde(rename = "consistent")]
    Consistent,
    #[serde(rename = "ambiguous")]
    Review,
    #[serde(rename = "statutory_conflict")]
    Inconsistent,
    #[serde(rename = "ag_disapproved")]
    Disapproved,
}

impl Tier {
    /// Most severe first.
    pub const ALL: [Tier; 4] = [
        Tier::Disapproved,
        Tier::Inconsistent,
        Tier::Review,
        Tier::Consistent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Disapproved => "AG Disapproved",
            Tier::Inconsistent => "Appears Inconsistent",
            Tier::Review => "Needs Review",
            Tier::Consistent => "Consistent",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Tier::Disapproved => "ag_disapproved",
            Tier::Inconsistent => "statutory_conflict",
            Tier::Review => "ambiguous",
            Tier::Consistent => "consistent",
        }
    }
}

/// A formal decision outranks whatever status the provision was given.
pub fn classify(status: ComplianceStatus, has_decision: bool) -> Tier {
    if has_decision {
        return Tier::Disapproved;
    }
    match status {
        ComplianceStatus::Inconsistent => Tier::Inconsistent,
        ComplianceStatus::Review => Tier::Review,
        ComplianceStatus::Compliant | ComplianceStatus::Unrecorded => Tier::Consistent,
    }
}

/// Per-record counts by raw status (no decision escalation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub inconsistent: usize,
    pub review: usize,
    pub compliant: usize,
}

impl StatusCounts {
    pub fn of(provisions: &[Provision]) -> Self {
        let mut counts = StatusCounts::default();
        for p in provisions {
            match p.status {
                ComplianceStatus::Inconsistent => counts.inconsistent += 1,
                ComplianceStatus::Review => counts.review += 1,
                ComplianceStatus::Compliant => counts.compliant += 1,
                ComplianceStatus::Unrecorded => {}
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Severe,
    Warning,
    Good,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: String,
    pub tone: BadgeTone,
}

impl StatusBadge {
    fn new(label: impl Into<String>, tone: BadgeTone) -> Self {
        StatusBadge {
            label: label.into(),
            tone,
        }
    }
}

/// Headline badge for a record. Precedence: legislative challenge, AG
/// disapprovals, then the city or town view of its provisions.
pub fn status_badge(record: &Record) -> StatusBadge {
    if record.resistance_tag.as_deref() == Some("legislative-challenge") {
        return StatusBadge::new("LEGISLATIVE CHALLENGE", BadgeTone::Neutral);
    }
    if record.ag_disapprovals > 0 {
        let plural = if record.ag_disapprovals > 1 { "S" } else { "" };
        return StatusBadge::new(
            format!("{} AG DISAPPROVAL{}", record.ag_disapprovals, plural),
            BadgeTone::Severe,
        );
    }
    let counts = StatusCounts::of(&record.provisions);
    match (record.is_city(), counts.inconsistent > 0) {
        (true, true) => StatusBadge::new("ADU PULSE IDENTIFIED", BadgeTone::Warning),
        (true, false) => StatusBadge::new("CONSISTENT", BadgeTone::Good),
        (false, true) => StatusBadge::new("NOT UPDATED", BadgeTone::Warning),
        (false, false) => StatusBadge::new("UPDATED", BadgeTone::Good),
    }
}

pub fn generated_bottom_line(record: &Record) -> String {
    let counts = StatusCounts::of(&record.provisions);
    let rule_word = record.municipality_type.rule_word();

    if counts.inconsistent == 0 && counts.review == 0 {
        return format!(
            "{}'s ADU {} appears fully consistent with Chapter 150 and 760 CMR 71.00. No inconsistencies identified.",
            record.name, rule_word
        );
    }

    let mut parts: Vec<String> = Vec::new();
    if counts.inconsistent > 0 {
        let n = counts.inconsistent;
        parts.push(format!(
            "{} has {} provision{} that appear{} inconsistent with G.L. c. 40A §3 and {} subject to statutory override under Chapter 150",
            record.name,
            n,
            if n > 1 { "s" } else { "" },
            if n == 1 { "s" } else { "" },
            if n == 1 { "is" } else { "are" },
        ));
    }
    if record.ag_disapprovals > 0 {
        let n = record.ag_disapprovals;
        parts.push(format!(
            "{} ha{} been formally disapproved by the Attorney General",
            n,
            if n > 1 { "ve" } else { "s" }
        ));
    }
    if counts.review > 0 {
        let n = counts.review;
        parts.push(format!(
            "{} additional provision{} {} in a legal grey area that may face future challenges",
            n,
            if n > 1 { "s" } else { "" },
            if n > 1 { "are" } else { "is" },
        ));
    }

    format!("{}.", parts.join(". "))
}
