use crate::methodology::Methodology;

/// Neutral stand-in for the positive-sentiment and engagement terms of the
/// brand health index while offsite signal collection is out of scope.
pub const NEUTRAL_OFFSITE_SIGNAL: f64 = 5.0;

/// Impact threshold of the quick-win rule.
pub const QUICK_WIN_IMPACT_THRESHOLD: f64 = 7.0;

/// Tolerance for the page-score vs criteria-mean validation diagnostic.
pub const SCORE_MEAN_TOLERANCE: f64 = 0.05;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `impact = (scale.max − score) × (weight/100) × business_value × 10`,
/// rounded to two decimals.
pub fn impact_score(score: f64, weight_pct: u32, business_value: f64, scale_max: f64) -> f64 {
    round2((scale_max - score) * (f64::from(weight_pct) / 100.0) * business_value * 10.0)
}

pub fn tier_weighted_score(score: f64, tier_weight: f64) -> f64 {
    round2(score * tier_weight)
}

/// Normalized shortfall over the designated trust criteria; 0 when the
/// page carries none of them.
pub fn trust_gap(trust_scores: &[f64], scale_max: f64) -> f64 {
    if trust_scores.is_empty() || scale_max == 0.0 {
        return 0.0;
    }
    let mean = trust_scores.iter().sum::<f64>() / trust_scores.len() as f64;
    round2((scale_max - mean) / scale_max)
}

/// `0.60·hygiene + 0.25·positive_sentiment + 0.15·engagement`; the offsite
/// terms fall back to [`NEUTRAL_OFFSITE_SIGNAL`] when no signals exist.
pub fn brand_health_index(
    hygiene_score: f64,
    positive_sentiment_pct: Option<f64>,
    engagement_rate: Option<f64>,
) -> f64 {
    let sentiment = positive_sentiment_pct.unwrap_or(NEUTRAL_OFFSITE_SIGNAL);
    let engagement = engagement_rate.unwrap_or(NEUTRAL_OFFSITE_SIGNAL);
    round2(0.60 * hygiene_score + 0.25 * sentiment + 0.15 * engagement)
}

/// Quick win: implementable at low or medium complexity with an impact
/// score at or above the threshold.
pub fn quick_win(complexity: &str, impact: f64) -> bool {
    matches!(complexity, "Low" | "Medium") && impact >= QUICK_WIN_IMPACT_THRESHOLD
}

pub fn descriptor_label(methodology: &Methodology, score: f64) -> String {
    methodology.descriptor_for(score).label.clone()
}
