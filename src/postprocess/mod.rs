pub mod metrics;
mod tables;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::classify;
use crate::config::AuditConfig;
use crate::experience::{self, ParsedExperience};
use crate::methodology::Methodology;
use crate::scorecard::{self, ParsedScorecard};
use crate::util::{page_id_for_slug, persona_slug, url_slug};

use metrics::{
    SCORE_MEAN_TOLERANCE, brand_health_index, descriptor_label, impact_score, quick_win, round2,
    tier_weighted_score, trust_gap,
};
pub use tables::{load_dataset, write_dataset};

pub const SCORECARD_SUFFIX: &str = "_hygiene_scorecard.md";
pub const EXPERIENCE_SUFFIX: &str = "_experience_report.md";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesRow {
    pub page_id: String,
    pub url: String,
    pub slug: String,
    pub persona: String,
    pub tier: String,
    pub final_score: f64,
    pub brand_health_index: f64,
    pub trust_gap: f64,
    pub audited_ts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaScoreRow {
    pub page_id: String,
    pub criterion_id: String,
    pub criterion_name: String,
    pub score: f64,
    pub evidence: String,
    pub weight_pct: u32,
    pub tier: String,
    pub descriptor: String,
    pub impact_score: f64,
    pub tier_weighted_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub page_id: String,
    pub recommendation: String,
    pub strategic_impact: String,
    pub complexity: String,
    pub urgency: String,
    pub resources: String,
    pub impact_score: f64,
    pub quick_win_flag: bool,
    pub owner: String,
    pub target_date: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceRow {
    pub page_id: String,
    pub persona_id: String,
    pub first_impression: String,
    pub language_tone_feedback: String,
    pub information_gaps: String,
    pub trust_credibility_assessment: String,
    pub business_impact_analysis: String,
    pub effective_copy_examples: String,
    pub ineffective_copy_examples: String,
}

/// The four normalized tables for one persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaDataset {
    pub pages: Vec<PagesRow>,
    pub criteria_scores: Vec<CriteriaScoreRow>,
    pub recommendations: Vec<RecommendationRow>,
    pub experience: Vec<ExperienceRow>,
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

/// Parse one persona's persisted artifacts into the normalized tables.
/// Fails only when no scorecard documents exist; everything downstream is
/// diagnostics, not errors.
pub fn build_dataset(
    persona_dir: &Path,
    methodology: &Methodology,
    config: &AuditConfig,
) -> Result<PersonaDataset> {
    let mut artifacts = collect_artifacts(persona_dir)?;
    if artifacts.is_empty() {
        bail!(
            "no scorecard documents found under {}",
            persona_dir.display()
        );
    }
    // Deterministic page order regardless of directory iteration order.
    artifacts.sort_by(|a, b| a.0.url.cmp(&b.0.url));

    let scale = methodology.scale();
    let mut dataset = PersonaDataset::default();

    for (card, report) in &artifacts {
        let slug = url_slug(&card.url);
        let page_id = page_id_for_slug(&slug);
        let classification = classify(&card.url, methodology);
        let tier = classification.unit_name.clone();
        let tier_weight = methodology.unit_weight(&tier);
        let business_value = config.business_value_for(&tier);

        let mut page_impacts = Vec::with_capacity(card.criteria.len());
        let mut trust_scores = Vec::new();

        for criterion in &card.criteria {
            let weight_pct = methodology
                .weight_of(&criterion.id, &tier)
                .unwrap_or_else(|_| {
                    warn!(tier = %tier, criterion = %criterion.id, "criterion weight lookup failed");
                    crate::methodology::FALLBACK_CRITERION_WEIGHT
                });

            let impact = impact_score(criterion.score, weight_pct, business_value, scale.max);
            page_impacts.push(impact);

            if config.trust_criteria_set.contains(&criterion.id) {
                trust_scores.push(criterion.score);
            }

            let criterion_name = methodology
                .criterion(&tier, &criterion.id)
                .map(|c| c.display_name(&criterion.id))
                .unwrap_or_else(|_| criterion.id.clone());

            validate_evidence(&mut dataset.diagnostics, config, &card.url, criterion);

            dataset.criteria_scores.push(CriteriaScoreRow {
                page_id: page_id.clone(),
                criterion_id: criterion.id.clone(),
                criterion_name,
                score: criterion.score,
                evidence: criterion.evidence.clone(),
                weight_pct,
                tier: tier.clone(),
                descriptor: descriptor_label(methodology, criterion.score),
                impact_score: impact,
                tier_weighted_score: tier_weighted_score(criterion.score, tier_weight),
            });
        }

        validate_page_score(&mut dataset.diagnostics, methodology, card, &tier);

        dataset.pages.push(PagesRow {
            page_id: page_id.clone(),
            url: card.url.clone(),
            slug: slug.clone(),
            persona: card.persona.clone(),
            tier: tier.clone(),
            final_score: card.final_score,
            brand_health_index: brand_health_index(card.final_score, None, None),
            trust_gap: trust_gap(&trust_scores, scale.max),
            audited_ts: card.audited_at.clone(),
        });

        let max_page_impact = page_impacts.iter().copied().fold(0.0, f64::max);
        for recommendation in &card.recommendations {
            let complexity = recommendation
                .complexity
                .clone()
                .unwrap_or_else(|| "Medium".to_string());
            let urgency = if card.final_score <= config.low_score_threshold {
                "High".to_string()
            } else {
                "Medium".to_string()
            };
            let impact = round2(max_page_impact);

            dataset.recommendations.push(RecommendationRow {
                page_id: page_id.clone(),
                recommendation: recommendation.title.clone(),
                strategic_impact: recommendation.description.clone(),
                quick_win_flag: quick_win(&complexity, impact),
                complexity,
                urgency,
                resources: "TBD".to_string(),
                impact_score: impact,
                owner: "Unassigned".to_string(),
                target_date: String::new(),
                status: "Open".to_string(),
            });
        }

        if let Some(report) = report {
            let effective = join_examples(report, experience::FindingKind::EffectiveCopy);
            let ineffective = join_examples(report, experience::FindingKind::IneffectiveCopy);
            dataset.experience.push(ExperienceRow {
                page_id: page_id.clone(),
                persona_id: persona_slug(&card.persona),
                first_impression: report.sections.first_impression.clone(),
                language_tone_feedback: report.sections.language_tone.clone(),
                information_gaps: report.sections.information_gaps.clone(),
                trust_credibility_assessment: report.sections.trust_credibility.clone(),
                business_impact_analysis: report.sections.business_impact.clone(),
                effective_copy_examples: effective,
                ineffective_copy_examples: ineffective,
            });
        } else {
            dataset
                .diagnostics
                .push(format!("no experience report for {}", card.url));
        }
    }

    info!(
        pages = dataset.pages.len(),
        criteria = dataset.criteria_scores.len(),
        diagnostics = dataset.diagnostics.len(),
        "normalized persona dataset built"
    );

    Ok(dataset)
}

/// Pair every scorecard document in the directory with its experience
/// report, matching on the shared slug prefix.
fn collect_artifacts(
    persona_dir: &Path,
) -> Result<Vec<(ParsedScorecard, Option<ParsedExperience>)>> {
    let entries = fs::read_dir(persona_dir)
        .with_context(|| format!("failed to read {}", persona_dir.display()))?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", persona_dir.display()))?;
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some(slug) = file_name.strip_suffix(SCORECARD_SUFFIX) else {
            continue;
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let card = scorecard::parse_document(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let report_path = persona_dir.join(format!("{slug}{EXPERIENCE_SUFFIX}"));
        let report = if report_path.exists() {
            let raw = fs::read_to_string(&report_path)
                .with_context(|| format!("failed to read {}", report_path.display()))?;
            Some(
                experience::parse_document(&raw)
                    .with_context(|| format!("failed to parse {}", report_path.display()))?,
            )
        } else {
            None
        };

        artifacts.push((card, report));
    }

    Ok(artifacts)
}

/// Evidence length minima apply when a score leaves the mid band.
fn validate_evidence(
    diagnostics: &mut Vec<String>,
    config: &AuditConfig,
    url: &str,
    criterion: &scorecard::ParsedCriterion,
) {
    let evidence_len = criterion.evidence.chars().count();
    if criterion.score >= config.high_score_threshold
        && evidence_len < config.evidence_min_length_high
    {
        diagnostics.push(format!(
            "{url}: high score for {} carries {evidence_len} chars of evidence",
            criterion.id
        ));
    } else if criterion.score <= config.low_score_threshold
        && evidence_len < config.evidence_min_length_low
    {
        diagnostics.push(format!(
            "{url}: low score for {} carries {evidence_len} chars of evidence",
            criterion.id
        ));
    }
}

/// Pre-adjustment page score must match the weighted mean of its criteria.
fn validate_page_score(
    diagnostics: &mut Vec<String>,
    methodology: &Methodology,
    card: &ParsedScorecard,
    tier: &str,
) {
    let mut weight_total = 0.0;
    let mut weighted_sum = 0.0;
    for criterion in &card.criteria {
        let weight = methodology
            .weight_of(&criterion.id, tier)
            .unwrap_or(crate::methodology::FALLBACK_CRITERION_WEIGHT);
        weight_total += f64::from(weight);
        weighted_sum += criterion.score * f64::from(weight);
    }
    if weight_total == 0.0 {
        return;
    }

    let mean = weighted_sum / weight_total;
    if (mean - card.weighted_score).abs() > SCORE_MEAN_TOLERANCE {
        diagnostics.push(format!(
            "{}: weighted score {:.2} disagrees with criteria mean {:.2}",
            card.url, card.weighted_score, mean
        ));
    }
}

fn join_examples(report: &ParsedExperience, kind: experience::FindingKind) -> String {
    report
        .findings
        .iter()
        .filter(|finding| finding.kind == kind)
        .map(|finding| finding.example_text.as_str())
        .collect::<Vec<_>>()
        .join(" || ")
}
