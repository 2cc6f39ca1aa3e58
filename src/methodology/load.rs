use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::{Methodology, MethodologyError};

const WEIGHT_EPSILON: f64 = 1e-6;

impl Methodology {
    /// Load and validate a methodology document. Invariant violations are
    /// fatal; a run never starts against a methodology that fails here.
    pub fn load(path: &Path) -> Result<Methodology, MethodologyError> {
        let raw = fs::read_to_string(path).map_err(|source| MethodologyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, &path.display().to_string())
    }

    pub fn from_yaml(raw: &str, origin: &str) -> Result<Methodology, MethodologyError> {
        let methodology: Methodology =
            serde_yaml::from_str(raw).map_err(|source| MethodologyError::Parse {
                path: origin.to_string(),
                source,
            })?;
        methodology.validate()?;
        Ok(methodology)
    }

    pub fn validate(&self) -> Result<(), MethodologyError> {
        if self.onsite_tiers.is_empty() {
            return Err(MethodologyError::NoTiers);
        }

        let mut unit_names = BTreeSet::new();
        for tier in &self.onsite_tiers {
            if !unit_names.insert(tier.name.clone()) {
                return Err(MethodologyError::DuplicateUnit(tier.name.clone()));
            }

            if !(0.0..=1.0).contains(&tier.weight_in_onsite) {
                return Err(MethodologyError::UnitWeightRange {
                    unit: tier.name.clone(),
                    field: "weight_in_onsite",
                    value: tier.weight_in_onsite,
                });
            }

            let mix = tier.brand_percentage + tier.performance_percentage;
            if mix != 100 {
                return Err(MethodologyError::CategoryMixSum {
                    unit: tier.name.clone(),
                    total: mix,
                });
            }

            validate_criterion_weights(&tier.name, tier.criteria.values().map(|c| c.weight_pct))?;
        }

        for channel in &self.offsite_channels {
            if !unit_names.insert(channel.name.clone()) {
                return Err(MethodologyError::DuplicateUnit(channel.name.clone()));
            }

            if !(0.0..=1.0).contains(&channel.weight_in_offsite) {
                return Err(MethodologyError::UnitWeightRange {
                    unit: channel.name.clone(),
                    field: "weight_in_offsite",
                    value: channel.weight_in_offsite,
                });
            }

            let mix = channel.authenticity_percentage + channel.sentiment_percentage;
            if mix != 100 {
                return Err(MethodologyError::CategoryMixSum {
                    unit: channel.name.clone(),
                    total: mix,
                });
            }

            validate_criterion_weights(
                &channel.name,
                channel.criteria.values().map(|c| c.weight_pct),
            )?;
        }

        self.validate_descriptors()?;

        let calc_total = self.calculation.onsite_weight + self.calculation.offsite_weight;
        if (calc_total - 1.0).abs() > WEIGHT_EPSILON {
            return Err(MethodologyError::CalculationWeights(calc_total));
        }

        for (kind, factor) in &self.calculation.crisis_multipliers {
            if !(*factor > 0.0 && *factor <= 1.0) {
                return Err(MethodologyError::CrisisMultiplier {
                    kind: kind.clone(),
                    factor: *factor,
                });
            }
        }

        Ok(())
    }

    /// Descriptor bands must partition `[scale.min, scale.max]` without gaps
    /// or overlap: consecutive bands meet exactly at their shared boundary.
    fn validate_descriptors(&self) -> Result<(), MethodologyError> {
        if self.scoring.descriptors.is_empty() {
            return Err(MethodologyError::DescriptorCoverage(
                "no descriptor bands declared".to_string(),
            ));
        }

        let mut bands: Vec<_> = self.scoring.descriptors.values().collect();
        bands.sort_by(|a, b| a.min.total_cmp(&b.min));

        let scale = self.scoring.scale;
        if (bands[0].min - scale.min).abs() > WEIGHT_EPSILON {
            return Err(MethodologyError::DescriptorCoverage(format!(
                "lowest band starts at {}, scale starts at {}",
                bands[0].min, scale.min
            )));
        }

        for window in bands.windows(2) {
            let (lower, upper) = (window[0], window[1]);
            if (lower.max - upper.min).abs() > WEIGHT_EPSILON {
                return Err(MethodologyError::DescriptorCoverage(format!(
                    "band '{}' ends at {} but band '{}' starts at {}",
                    lower.label, lower.max, upper.label, upper.min
                )));
            }
        }

        let top = bands[bands.len() - 1];
        if (top.max - scale.max).abs() > WEIGHT_EPSILON {
            return Err(MethodologyError::DescriptorCoverage(format!(
                "highest band ends at {}, scale ends at {}",
                top.max, scale.max
            )));
        }

        Ok(())
    }
}

fn validate_criterion_weights(
    unit: &str,
    weights: impl Iterator<Item = u32>,
) -> Result<(), MethodologyError> {
    let total: u32 = weights.sum();
    if total != 100 {
        return Err(MethodologyError::CriterionWeightSum {
            unit: unit.to_string(),
            total,
        });
    }
    Ok(())
}
