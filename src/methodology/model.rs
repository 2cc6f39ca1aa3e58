use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scoring category a criterion belongs to. Onsite tiers use brand and
/// performance; offsite channels use authenticity and sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionCategory {
    Brand,
    Performance,
    Authenticity,
    Sentiment,
}

impl CriterionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Performance => "performance",
            Self::Authenticity => "authenticity",
            Self::Sentiment => "sentiment",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub description: String,
    pub weight_pct: u32,
    pub category: CriterionCategory,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl Criterion {
    /// Display name; derived from the id when the document omits one.
    pub fn display_name(&self, id: &str) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => id
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub weight_in_onsite: f64,
    pub brand_percentage: u32,
    pub performance_percentage: u32,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub criteria: BTreeMap<String, Criterion>,
}

impl Tier {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsiteChannel {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub weight_in_offsite: f64,
    pub authenticity_percentage: u32,
    pub sentiment_percentage: u32,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub criteria: BTreeMap<String, Criterion>,
}

impl OffsiteChannel {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreScale {
    pub min: f64,
    pub max: f64,
}

impl ScoreScale {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn clamp(&self, score: f64) -> f64 {
        score.clamp(self.min, self.max)
    }
}

/// One descriptor band over `[min, max)`; the topmost band is closed above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorBand {
    pub min: f64,
    pub max: f64,
    pub label: String,
    pub status: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    pub scale: ScoreScale,
    pub descriptors: BTreeMap<String, DescriptorBand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calculation {
    pub formula: String,
    pub onsite_weight: f64,
    pub offsite_weight: f64,
    #[serde(default)]
    pub crisis_multipliers: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingRule {
    pub trigger: String,
    pub penalty: f64,
    pub severity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityPenalty {
    pub points: f64,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl QualityPenalty {
    /// The document may carry `example` or `examples`; both count.
    pub fn all_examples(&self) -> impl Iterator<Item = &str> {
        self.example
            .as_deref()
            .into_iter()
            .chain(self.examples.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandMessaging {
    #[serde(default)]
    pub taglines: Vec<String>,
    #[serde(default)]
    pub regional_narratives: BTreeMap<String, String>,
    #[serde(default)]
    pub sub_narratives: Vec<String>,
    #[serde(default)]
    pub value_propositions: Vec<String>,
    #[serde(default)]
    pub approved_ctas: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Methodology {
    #[serde(default)]
    pub metadata: Metadata,
    pub scoring: Scoring,
    pub calculation: Calculation,
    pub onsite_tiers: Vec<Tier>,
    #[serde(default)]
    pub offsite_channels: Vec<OffsiteChannel>,
    #[serde(default)]
    pub gating_rules: BTreeMap<String, GatingRule>,
    #[serde(default)]
    pub quality_penalties: BTreeMap<String, QualityPenalty>,
    #[serde(default)]
    pub brand_messaging: BrandMessaging,
    /// Domain suffixes treated as the audited company's own web estate.
    #[serde(default)]
    pub onsite_domains: Vec<String>,
}

/// One parsed classification trigger, evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerRule {
    Contains(String),
    StartsWith(String),
    Keyword(String),
}

impl TriggerRule {
    /// Trigger grammar: `contains X`, `starts with X`, or a bare keyword.
    pub fn parse(raw: &str) -> TriggerRule {
        let trimmed = raw.trim();
        if let Some(rest) = trimmed.strip_prefix("contains ") {
            TriggerRule::Contains(rest.trim().to_string())
        } else if let Some(rest) = trimmed.strip_prefix("starts with ") {
            TriggerRule::StartsWith(rest.trim().to_string())
        } else {
            TriggerRule::Keyword(trimmed.to_string())
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        let url_lower = url.to_ascii_lowercase();
        match self {
            TriggerRule::Contains(needle) => url_lower.contains(&needle.to_ascii_lowercase()),
            TriggerRule::StartsWith(prefix) => url_lower.starts_with(&prefix.to_ascii_lowercase()),
            TriggerRule::Keyword(keyword) => url_lower.contains(&keyword.to_ascii_lowercase()),
        }
    }
}

/// Trigger sets per onsite tier and offsite channel, in methodology order.
#[derive(Debug, Clone)]
pub struct ClassificationTriggers {
    pub onsite: Vec<(String, Vec<TriggerRule>)>,
    pub offsite: Vec<(String, Vec<TriggerRule>)>,
}
