mod load;
mod model;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

pub use model::{
    BrandMessaging, Calculation, ClassificationTriggers, Criterion, CriterionCategory,
    DescriptorBand, GatingRule, Metadata, Methodology, OffsiteChannel, QualityPenalty, ScoreScale,
    Scoring, Tier, TriggerRule,
};

/// Weight returned when a criterion is missing from the methodology.
pub const FALLBACK_CRITERION_WEIGHT: u32 = 15;

#[derive(Debug, Error)]
pub enum MethodologyError {
    #[error("failed to read methodology file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse methodology file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("{unit}: criterion weights sum to {total}, expected 100")]
    CriterionWeightSum { unit: String, total: u32 },

    #[error("{unit}: category percentages sum to {total}, expected 100")]
    CategoryMixSum { unit: String, total: u32 },

    #[error("descriptor bands do not partition the scale: {0}")]
    DescriptorCoverage(String),

    #[error("crisis multiplier {kind} must be in (0, 1], got {factor}")]
    CrisisMultiplier { kind: String, factor: f64 },

    #[error("{unit}: {field} must be within [0, 1], got {value}")]
    UnitWeightRange {
        unit: String,
        field: &'static str,
        value: f64,
    },

    #[error("onsite_weight + offsite_weight must equal 1.0, got {0}")]
    CalculationWeights(f64),

    #[error("duplicate tier/channel name: {0}")]
    DuplicateUnit(String),

    #[error("methodology declares no onsite tiers")]
    NoTiers,

    #[error("unknown tier/channel: {0}")]
    UnknownUnit(String),

    #[error("unknown criterion {criterion} in {unit}")]
    UnknownCriterion { unit: String, criterion: String },
}

impl Methodology {
    /// Declared weight of a criterion in a tier/channel. An unknown unit is a
    /// hard error; an unknown criterion inside a known unit emits a fallback
    /// diagnostic and returns [`FALLBACK_CRITERION_WEIGHT`].
    pub fn weight_of(&self, criterion_id: &str, unit_name: &str) -> Result<u32, MethodologyError> {
        let criteria = self
            .unit_criteria(unit_name)
            .ok_or_else(|| MethodologyError::UnknownUnit(unit_name.to_string()))?;

        match criteria.get(criterion_id) {
            Some(criterion) => Ok(criterion.weight_pct),
            None => {
                warn!(
                    criterion = criterion_id,
                    unit = unit_name,
                    fallback = FALLBACK_CRITERION_WEIGHT,
                    "criterion missing from methodology, using fallback weight"
                );
                Ok(FALLBACK_CRITERION_WEIGHT)
            }
        }
    }

    /// Typed criterion lookup; unlike [`weight_of`] a miss is an error.
    pub fn criterion(
        &self,
        unit_name: &str,
        criterion_id: &str,
    ) -> Result<&Criterion, MethodologyError> {
        let criteria = self
            .unit_criteria(unit_name)
            .ok_or_else(|| MethodologyError::UnknownUnit(unit_name.to_string()))?;
        criteria
            .get(criterion_id)
            .ok_or_else(|| MethodologyError::UnknownCriterion {
                unit: unit_name.to_string(),
                criterion: criterion_id.to_string(),
            })
    }

    /// Descriptor band for a score; total on `[scale.min, scale.max]`.
    /// A score exactly on a band boundary takes the upper band.
    pub fn descriptor_for(&self, score: f64) -> &DescriptorBand {
        let clamped = self.scoring.scale.clamp(score);
        let mut bands: Vec<&DescriptorBand> = self.scoring.descriptors.values().collect();
        bands.sort_by(|a, b| a.min.total_cmp(&b.min));

        let mut selected = bands[0];
        for band in bands {
            if clamped >= band.min {
                selected = band;
            }
        }
        selected
    }

    pub fn classification_triggers(&self) -> ClassificationTriggers {
        ClassificationTriggers {
            onsite: self
                .onsite_tiers
                .iter()
                .map(|tier| {
                    (
                        tier.name.clone(),
                        tier.triggers.iter().map(|raw| TriggerRule::parse(raw)).collect(),
                    )
                })
                .collect(),
            offsite: self
                .offsite_channels
                .iter()
                .map(|channel| {
                    (
                        channel.name.clone(),
                        channel
                            .triggers
                            .iter()
                            .map(|raw| TriggerRule::parse(raw))
                            .collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.onsite_tiers.iter().find(|tier| tier.name == name)
    }

    pub fn channel(&self, name: &str) -> Option<&OffsiteChannel> {
        self.offsite_channels.iter().find(|channel| channel.name == name)
    }

    pub fn unit_criteria(&self, unit_name: &str) -> Option<&BTreeMap<String, Criterion>> {
        if let Some(tier) = self.tier(unit_name) {
            return Some(&tier.criteria);
        }
        self.channel(unit_name).map(|channel| &channel.criteria)
    }

    /// Onsite weight of a tier, or offsite weight of a channel; 0 when the
    /// unit is unknown (callers only hit this after classification).
    pub fn unit_weight(&self, unit_name: &str) -> f64 {
        if let Some(tier) = self.tier(unit_name) {
            return tier.weight_in_onsite;
        }
        self.channel(unit_name)
            .map(|channel| channel.weight_in_offsite)
            .unwrap_or(0.0)
    }

    pub fn unit_label(&self, unit_name: &str) -> String {
        if let Some(tier) = self.tier(unit_name) {
            return tier.label().to_string();
        }
        if let Some(channel) = self.channel(unit_name) {
            return channel.label().to_string();
        }
        unit_name.to_string()
    }

    pub fn scale(&self) -> ScoreScale {
        self.scoring.scale
    }
}
