use std::collections::BTreeMap;

use tracing::warn;

use crate::classifier::{Classification, classify};
use crate::config::AuditConfig;
use crate::fetcher::{Fetcher, PageData};
use crate::llm::{Contract, Gateway, LlmRequest, SCORING_TEMPERATURE, SchemaKind};
use crate::methodology::{Criterion, Methodology};
use crate::persona::Persona;
use crate::prompts;
use crate::util::{now_utc_string, url_slug};

use super::{
    AppliedAdjustment, ArtifactStatus, Recommendation, Scorecard, ScorecardPayload,
    ScoredCriterion,
};

/// Points subtracted when a low score lacks the required evidence length.
pub const EVIDENCE_PENALTY_POINTS: f64 = 1.0;

const SCORECARD_MAX_TOKENS: u32 = 1_500;
const SINGLE_SCORE_MAX_TOKENS: u32 = 16;

pub struct ScorecardEngine<'a> {
    methodology: &'a Methodology,
    config: &'a AuditConfig,
    gateway: &'a Gateway,
    fetcher: &'a Fetcher,
}

impl<'a> ScorecardEngine<'a> {
    pub fn new(
        methodology: &'a Methodology,
        config: &'a AuditConfig,
        gateway: &'a Gateway,
        fetcher: &'a Fetcher,
    ) -> Self {
        Self {
            methodology,
            config,
            gateway,
            fetcher,
        }
    }

    /// Produce a scorecard for one URL. Never fails: fetch and gateway
    /// problems degrade the artifact instead.
    pub async fn score(&self, url: &str, persona: &Persona) -> Scorecard {
        let classification = classify(url, self.methodology);
        let page = self.fetcher.fetch(url).await;
        let audited_at = now_utc_string();

        if page.is_404 {
            return self.not_found_scorecard(url, persona, &classification, &audited_at);
        }

        let request = LlmRequest {
            system: prompts::SCORECARD_SYSTEM.to_string(),
            user: prompts::scorecard_user_prompt(
                url,
                persona,
                self.methodology,
                &classification.unit_name,
                &page.raw_text,
                self.config.content_truncation_scorecard,
                &audited_at,
            ),
            model_hint: None,
            max_tokens: SCORECARD_MAX_TOKENS,
            temperature: SCORING_TEMPERATURE,
            contract: Contract::StrictJson {
                schema: SchemaKind::Scorecard,
            },
        };

        let payload = match self.gateway.complete(&request).await {
            Ok(completion) => {
                let value = completion.as_json().cloned().unwrap_or_default();
                match serde_json::from_value::<ScorecardPayload>(value) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(url, error = %err, "scorecard payload deserialization failed");
                        return self.error_scorecard(url, persona, &classification, &audited_at);
                    }
                }
            }
            Err(err) => {
                warn!(url, error = %err, "gateway failed terminally for scorecard");
                return self.error_scorecard(url, persona, &classification, &audited_at);
            }
        };

        self.build_scorecard(url, persona, &classification, &audited_at, &page, payload)
    }

    /// Numeric probe for one criterion; retries ride the gateway policy and
    /// a terminal failure returns the scale midpoint.
    pub async fn score_single(&self, criterion_name: &str, page_text: &str) -> f64 {
        let scale = self.methodology.scale();
        let request = LlmRequest {
            system: prompts::SINGLE_SCORE_SYSTEM.to_string(),
            user: prompts::single_score_user_prompt(
                criterion_name,
                page_text,
                scale.min,
                scale.max,
                self.config.content_truncation_scorecard,
            ),
            model_hint: None,
            max_tokens: SINGLE_SCORE_MAX_TOKENS,
            temperature: SCORING_TEMPERATURE,
            contract: Contract::FloatInRange {
                min: scale.min,
                max: scale.max,
            },
        };

        match self.gateway.complete(&request).await {
            Ok(completion) => completion.as_number().unwrap_or_else(|| scale.midpoint()),
            Err(err) => {
                warn!(criterion = criterion_name, error = %err, "single-score probe failed, using midpoint");
                scale.midpoint()
            }
        }
    }

    fn unit_criteria(&self, unit_name: &str) -> Vec<(String, Criterion)> {
        self.methodology
            .unit_criteria(unit_name)
            .map(|criteria| {
                criteria
                    .iter()
                    .map(|(id, criterion)| (id.clone(), criterion.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn not_found_scorecard(
        &self,
        url: &str,
        persona: &Persona,
        classification: &Classification,
        audited_at: &str,
    ) -> Scorecard {
        let scale = self.methodology.scale();
        let scored_criteria = self
            .unit_criteria(&classification.unit_name)
            .into_iter()
            .map(|(id, criterion)| ScoredCriterion {
                name: criterion.display_name(&id),
                id,
                category: criterion.category,
                weight_pct: criterion.weight_pct,
                score: scale.min,
                evidence: "page not found".to_string(),
                imputed: false,
                capped: false,
            })
            .collect();

        Scorecard {
            url: url.to_string(),
            url_slug: url_slug(url),
            persona: persona.name.clone(),
            audited_at: audited_at.to_string(),
            kind: classification.kind,
            unit_name: classification.unit_name.clone(),
            status: ArtifactStatus::Degraded,
            weighted_score: scale.min,
            final_score: scale.min,
            descriptor_label: self.methodology.descriptor_for(scale.min).label.clone(),
            scored_criteria,
            gating_rules_applied: Vec::new(),
            quality_penalties_applied: Vec::new(),
            brand_consistency_check: BTreeMap::new(),
            recommendations: Vec::new(),
            diagnostics: vec!["page not found".to_string()],
        }
    }

    /// Terminal gateway failure: every criterion sits at the scale midpoint
    /// so downstream aggregation stays neutral rather than punitive.
    fn error_scorecard(
        &self,
        url: &str,
        persona: &Persona,
        classification: &Classification,
        audited_at: &str,
    ) -> Scorecard {
        let scale = self.methodology.scale();
        let midpoint = scale.midpoint();
        let scored_criteria = self
            .unit_criteria(&classification.unit_name)
            .into_iter()
            .map(|(id, criterion)| ScoredCriterion {
                name: criterion.display_name(&id),
                id,
                category: criterion.category,
                weight_pct: criterion.weight_pct,
                score: midpoint,
                evidence: "[error: llm-gateway-terminal]".to_string(),
                imputed: true,
                capped: false,
            })
            .collect();

        Scorecard {
            url: url.to_string(),
            url_slug: url_slug(url),
            persona: persona.name.clone(),
            audited_at: audited_at.to_string(),
            kind: classification.kind,
            unit_name: classification.unit_name.clone(),
            status: ArtifactStatus::Error,
            weighted_score: midpoint,
            final_score: midpoint,
            descriptor_label: self.methodology.descriptor_for(midpoint).label.clone(),
            scored_criteria,
            gating_rules_applied: Vec::new(),
            quality_penalties_applied: Vec::new(),
            brand_consistency_check: BTreeMap::new(),
            recommendations: Vec::new(),
            diagnostics: vec!["gateway failed after retries".to_string()],
        }
    }

    fn build_scorecard(
        &self,
        url: &str,
        persona: &Persona,
        classification: &Classification,
        audited_at: &str,
        page: &PageData,
        payload: ScorecardPayload,
    ) -> Scorecard {
        let scale = self.methodology.scale();
        let unit_criteria = self.unit_criteria(&classification.unit_name);
        let mut diagnostics = Vec::new();
        let ScorecardPayload {
            criteria: payload_criteria,
            recommendations: payload_recommendations,
        } = payload;

        // Index payload entries by normalized name; entries that match no
        // methodology criterion are dropped with a diagnostic.
        let mut by_name: BTreeMap<String, &super::PayloadCriterion> = BTreeMap::new();
        for entry in &payload_criteria {
            by_name.insert(normalize_name(&entry.criterion_name), entry);
        }

        let mut matched_names: Vec<String> = Vec::new();
        let mut scored_criteria = Vec::with_capacity(unit_criteria.len());

        for (id, criterion) in &unit_criteria {
            let display_name = criterion.display_name(id);
            let entry = by_name
                .get(&normalize_name(id))
                .or_else(|| by_name.get(&normalize_name(&display_name)));

            let mut scored = match entry {
                Some(entry) => {
                    matched_names.push(normalize_name(&entry.criterion_name));
                    let mut score = entry.score;
                    if score < scale.min || score > scale.max {
                        diagnostics.push(format!(
                            "score {score} for {id} outside scale, clamped"
                        ));
                        score = scale.clamp(score);
                    }
                    ScoredCriterion {
                        id: id.clone(),
                        name: display_name,
                        category: criterion.category,
                        weight_pct: criterion.weight_pct,
                        score,
                        evidence: entry.evidence.trim().to_string(),
                        imputed: false,
                        capped: false,
                    }
                }
                None => {
                    diagnostics.push(format!("criterion {id} missing from response, imputed"));
                    ScoredCriterion {
                        id: id.clone(),
                        name: display_name,
                        category: criterion.category,
                        weight_pct: criterion.weight_pct,
                        score: scale.midpoint(),
                        evidence: "imputed: criterion absent from model response".to_string(),
                        imputed: true,
                        capped: false,
                    }
                }
            };

            self.apply_evidence_policy(&mut scored, &mut diagnostics);
            scored_criteria.push(scored);
        }

        for entry in &payload_criteria {
            if !matched_names.contains(&normalize_name(&entry.criterion_name)) {
                diagnostics.push(format!(
                    "dropped unknown criterion from response: {}",
                    entry.criterion_name
                ));
            }
        }

        // Low scores lacking evidence are penalized rather than capped.
        let mut quality_penalties_applied = Vec::new();
        for scored in &scored_criteria {
            if !scored.imputed
                && scored.score <= self.config.low_score_threshold
                && scored.evidence.chars().count() < self.config.evidence_min_length_low
            {
                quality_penalties_applied.push(AppliedAdjustment {
                    id: "insufficient_evidence_low".to_string(),
                    penalty: EVIDENCE_PENALTY_POINTS,
                    reason: format!("low score for {} lacks supporting evidence", scored.id),
                });
            }
        }

        let page_text_lower = page.raw_text.to_ascii_lowercase();

        let mut gating_rules_applied = Vec::new();
        for (rule_id, rule) in &self.methodology.gating_rules {
            let trigger_lower = rule.trigger.to_ascii_lowercase();
            if page_text_lower.contains(&trigger_lower) {
                gating_rules_applied.push(AppliedAdjustment {
                    id: rule_id.clone(),
                    penalty: rule.penalty,
                    reason: format!("trigger '{}' found on page ({})", rule.trigger, rule.severity),
                });
            }
        }

        for (penalty_id, penalty) in &self.methodology.quality_penalties {
            if let Some(example) = penalty
                .all_examples()
                .find(|example| page_text_lower.contains(&example.to_ascii_lowercase()))
            {
                quality_penalties_applied.push(AppliedAdjustment {
                    id: penalty_id.clone(),
                    penalty: penalty.points,
                    reason: format!("copy-quality failure: '{example}' present"),
                });
            }
        }

        let weighted_score = weighted_mean(&scored_criteria, scale.min);
        let adjustment_total: f64 = gating_rules_applied
            .iter()
            .chain(quality_penalties_applied.iter())
            .map(|adjustment| adjustment.penalty)
            .sum();
        let final_score = scale.clamp(weighted_score - adjustment_total);

        let recommendations = payload_recommendations
            .into_iter()
            .map(|entry| Recommendation {
                title: entry.title,
                description: entry.description,
                complexity: entry.complexity,
            })
            .collect();

        Scorecard {
            url: url.to_string(),
            url_slug: url_slug(url),
            persona: persona.name.clone(),
            audited_at: audited_at.to_string(),
            kind: classification.kind,
            unit_name: classification.unit_name.clone(),
            status: ArtifactStatus::Ok,
            weighted_score,
            final_score,
            descriptor_label: self.methodology.descriptor_for(final_score).label.clone(),
            scored_criteria,
            gating_rules_applied,
            quality_penalties_applied,
            brand_consistency_check: self.brand_consistency_check(page),
            recommendations,
            diagnostics,
        }
    }

    /// Evidence policy, high side: a score at or above the high threshold
    /// without enough evidence is capped at the threshold.
    fn apply_evidence_policy(&self, scored: &mut ScoredCriterion, diagnostics: &mut Vec<String>) {
        if scored.imputed {
            return;
        }
        if scored.score >= self.config.high_score_threshold
            && scored.evidence.chars().count() < self.config.evidence_min_length_high
        {
            diagnostics.push(format!(
                "high score for {} capped at {}: evidence below {} chars",
                scored.id, self.config.high_score_threshold, self.config.evidence_min_length_high
            ));
            scored.score = self.config.high_score_threshold;
            scored.capped = true;
        }
    }

    /// Deterministic checks against the page's objective signals.
    fn brand_consistency_check(&self, page: &PageData) -> BTreeMap<String, String> {
        let mut checks = BTreeMap::new();

        let tagline = page
            .objective_findings
            .get("tagline_present")
            .map(String::as_str);
        checks.insert(
            "tagline_present".to_string(),
            match tagline {
                Some("true") => "pass".to_string(),
                _ => "no approved tagline found on page".to_string(),
            },
        );

        let placeholder = page
            .objective_findings
            .get("placeholder_text_present")
            .map(String::as_str);
        checks.insert(
            "placeholder_copy".to_string(),
            match placeholder {
                Some("true") => "placeholder copy present".to_string(),
                _ => "pass".to_string(),
            },
        );

        let page_text_lower = page.raw_text.to_ascii_lowercase();
        let cta_found = self
            .methodology
            .brand_messaging
            .approved_ctas
            .iter()
            .any(|cta| page_text_lower.contains(&cta.to_ascii_lowercase()));
        checks.insert(
            "approved_cta".to_string(),
            if cta_found {
                "pass".to_string()
            } else {
                "no approved call to action on page".to_string()
            },
        );

        checks
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// Weighted mean of criterion scores by declared weight.
pub(super) fn weighted_mean(criteria: &[ScoredCriterion], floor: f64) -> f64 {
    let weight_total: f64 = criteria.iter().map(|c| f64::from(c.weight_pct)).sum();
    if weight_total == 0.0 {
        return floor;
    }
    criteria
        .iter()
        .map(|c| c.score * f64::from(c.weight_pct))
        .sum::<f64>()
        / weight_total
}
