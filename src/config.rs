use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default character budget for page text in scorecard prompts.
pub const DEFAULT_TRUNCATION_SCORECARD: usize = 8_000;
/// Experience prompts carry more page text than scorecard prompts.
pub const DEFAULT_TRUNCATION_EXPERIENCE: usize = 12_000;
/// Evidence length required to keep a score at or above the high threshold.
pub const DEFAULT_EVIDENCE_MIN_HIGH: usize = 40;
/// Evidence length required for a score at or below the low threshold.
pub const DEFAULT_EVIDENCE_MIN_LOW: usize = 25;
pub const DEFAULT_HIGH_SCORE_THRESHOLD: f64 = 8.0;
pub const DEFAULT_LOW_SCORE_THRESHOLD: f64 = 3.0;
/// Business value applied to tiers absent from `impact_business_value`.
pub const DEFAULT_BUSINESS_VALUE: f64 = 0.5;
/// Degraded/total ratio above which a run is a failure rather than partial.
pub const DEFAULT_MAX_DEGRADED_RATIO: f64 = 0.5;
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_GATEWAY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_GATEWAY_BACKOFF_BASE_MS: u64 = 500;
pub const DEFAULT_GATEWAY_JITTER_MS: u64 = 250;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Run configuration. Every field has a documented default; a YAML config
/// file overrides defaults and CLI flags override the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub model_provider: String,
    pub concurrency: usize,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub content_truncation_scorecard: usize,
    pub content_truncation_experience: usize,
    pub evidence_min_length_high: usize,
    pub evidence_min_length_low: usize,
    pub high_score_threshold: f64,
    pub low_score_threshold: f64,
    /// Tier/channel label -> business value multiplier for impact scores.
    pub impact_business_value: BTreeMap<String, f64>,
    /// Criterion ids contributing to the trust gap.
    pub trust_criteria_set: Vec<String>,
    /// Overrides methodology `calculation.onsite_weight` when set.
    pub onsite_weight: Option<f64>,
    /// Overrides methodology `calculation.offsite_weight` when set.
    pub offsite_weight: Option<f64>,
    /// Overrides methodology `calculation.crisis_multipliers` when non-empty.
    pub crisis_multipliers: BTreeMap<String, f64>,
    pub gateway_max_attempts: u32,
    pub gateway_backoff_base_ms: u64,
    pub gateway_jitter_ms: u64,
    pub request_timeout_secs: u64,
    pub max_degraded_ratio: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        let mut impact_business_value = BTreeMap::new();
        impact_business_value.insert("tier_1".to_string(), 1.5);
        impact_business_value.insert("tier_2".to_string(), 1.2);
        impact_business_value.insert("tier_3".to_string(), 1.0);
        impact_business_value.insert("owned".to_string(), 0.8);
        impact_business_value.insert("influenced".to_string(), 0.8);
        impact_business_value.insert("independent".to_string(), 0.8);

        Self {
            model_provider: "openai".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            cache_dir: PathBuf::from(".cache/brandaudit"),
            output_dir: PathBuf::from("audit_outputs"),
            content_truncation_scorecard: DEFAULT_TRUNCATION_SCORECARD,
            content_truncation_experience: DEFAULT_TRUNCATION_EXPERIENCE,
            evidence_min_length_high: DEFAULT_EVIDENCE_MIN_HIGH,
            evidence_min_length_low: DEFAULT_EVIDENCE_MIN_LOW,
            high_score_threshold: DEFAULT_HIGH_SCORE_THRESHOLD,
            low_score_threshold: DEFAULT_LOW_SCORE_THRESHOLD,
            impact_business_value,
            trust_criteria_set: vec![
                "trust_signals".to_string(),
                "credibility_markers".to_string(),
                "transparency".to_string(),
            ],
            onsite_weight: None,
            offsite_weight: None,
            crisis_multipliers: BTreeMap::new(),
            gateway_max_attempts: DEFAULT_GATEWAY_MAX_ATTEMPTS,
            gateway_backoff_base_ms: DEFAULT_GATEWAY_BACKOFF_BASE_MS,
            gateway_jitter_ms: DEFAULT_GATEWAY_JITTER_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_degraded_ratio: DEFAULT_MAX_DEGRADED_RATIO,
        }
    }
}

impl AuditConfig {
    /// Load configuration, layering an optional YAML file over defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file: {}", path.display()))?;
                let parsed: AuditConfig = serde_yaml::from_str(&raw)
                    .with_context(|| format!("failed to parse config file: {}", path.display()))?;
                info!(path = %path.display(), "loaded run configuration");
                parsed
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if self.gateway_max_attempts == 0 {
            bail!("gateway_max_attempts must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.max_degraded_ratio) {
            bail!(
                "max_degraded_ratio must be within [0, 1], got {}",
                self.max_degraded_ratio
            );
        }
        if self.high_score_threshold <= self.low_score_threshold {
            bail!(
                "high_score_threshold ({}) must exceed low_score_threshold ({})",
                self.high_score_threshold,
                self.low_score_threshold
            );
        }
        for (kind, factor) in &self.crisis_multipliers {
            if !(*factor > 0.0 && *factor <= 1.0) {
                bail!("crisis multiplier {kind} must be in (0, 1], got {factor}");
            }
        }
        Ok(())
    }

    pub fn business_value_for(&self, unit_name: &str) -> f64 {
        self.impact_business_value
            .get(unit_name)
            .copied()
            .unwrap_or(DEFAULT_BUSINESS_VALUE)
    }
}
