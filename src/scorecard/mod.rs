mod document;
mod engine;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::PageKind;
use crate::methodology::CriterionCategory;

pub use document::{ParsedCriterion, ParsedScorecard, parse_document, render_document};
pub use engine::{EVIDENCE_PENALTY_POINTS, ScorecardEngine};

/// Health of a produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Ok,
    /// Produced from a failed fetch; scores are floor values.
    Degraded,
    /// Produced after a terminal gateway failure; scores are midpoints.
    Error,
}

impl ArtifactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCriterion {
    pub id: String,
    pub name: String,
    pub category: CriterionCategory,
    pub weight_pct: u32,
    pub score: f64,
    pub evidence: String,
    /// Filled at scale midpoint because the model omitted the criterion.
    #[serde(default)]
    pub imputed: bool,
    /// High score capped to the threshold by the evidence policy.
    #[serde(default)]
    pub capped: bool,
}

/// One gating rule or quality penalty that fired on this scorecard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub id: String,
    pub penalty: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub complexity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scorecard {
    pub url: String,
    pub url_slug: String,
    pub persona: String,
    pub audited_at: String,
    pub kind: PageKind,
    /// Tier name (onsite) or channel name (offsite).
    pub unit_name: String,
    pub status: ArtifactStatus,
    /// Weighted mean of criterion scores before adjustments.
    pub weighted_score: f64,
    /// Score after gating rules and penalties, floored at scale.min.
    pub final_score: f64,
    pub descriptor_label: String,
    pub scored_criteria: Vec<ScoredCriterion>,
    pub gating_rules_applied: Vec<AppliedAdjustment>,
    pub quality_penalties_applied: Vec<AppliedAdjustment>,
    pub brand_consistency_check: BTreeMap<String, String>,
    pub recommendations: Vec<Recommendation>,
    pub diagnostics: Vec<String>,
}

impl Scorecard {
    /// Total points subtracted by every recorded adjustment.
    pub fn adjustment_total(&self) -> f64 {
        self.gating_rules_applied
            .iter()
            .chain(self.quality_penalties_applied.iter())
            .map(|adjustment| adjustment.penalty)
            .sum()
    }
}

/// Structured payload the gateway's scorecard contract guarantees.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorecardPayload {
    pub criteria: Vec<PayloadCriterion>,
    #[serde(default)]
    pub recommendations: Vec<PayloadRecommendation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadCriterion {
    pub criterion_name: String,
    pub score: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadRecommendation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub complexity: Option<String>,
}
