mod document;
mod engine;
#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::scorecard::ArtifactStatus;

pub use document::{ParsedExperience, parse_document, render_document};
pub use engine::ExperienceEngine;

/// Machine-readable marker written into every section after a terminal
/// gateway failure.
pub const GATEWAY_ERROR_MARKER: &str = "[error: llm-gateway-terminal]";
/// Marker for pages that could not be fetched.
pub const NOT_FOUND_MARKER: &str = "[error: page-not-found]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    EffectiveCopy,
    IneffectiveCopy,
}

impl FindingKind {
    /// Human label used in the findings table.
    pub fn label(self) -> &'static str {
        match self {
            Self::EffectiveCopy => "Effective Copy",
            Self::IneffectiveCopy => "Ineffective Copy",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Effective Copy" => Some(Self::EffectiveCopy),
            "Ineffective Copy" => Some(Self::IneffectiveCopy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub example_text: String,
    pub strategic_analysis: String,
}

/// The five fixed narrative sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceSections {
    pub first_impression: String,
    pub language_tone: String,
    pub information_gaps: String,
    pub trust_credibility: String,
    pub business_impact: String,
}

impl ExperienceSections {
    pub fn error(marker: &str) -> Self {
        Self {
            first_impression: marker.to_string(),
            language_tone: marker.to_string(),
            information_gaps: marker.to_string(),
            trust_credibility: marker.to_string(),
            business_impact: marker.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceReport {
    pub url: String,
    pub url_slug: String,
    pub persona: String,
    pub audited_at: String,
    pub status: ArtifactStatus,
    pub findings: Vec<Finding>,
    pub sections: ExperienceSections,
}

/// Structured payload the gateway's experience contract guarantees.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperiencePayload {
    pub findings: Vec<PayloadFinding>,
    pub sections: PayloadSections,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub example_text: String,
    pub strategic_analysis: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadSections {
    pub first_impression: String,
    pub language_tone: String,
    pub information_gaps: String,
    pub trust_credibility: String,
    pub business_impact: String,
}
