mod render;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::experience::ExperienceReport;
use crate::llm::{Contract, Gateway, LlmRequest, NARRATIVE_TEMPERATURE, SchemaKind};
use crate::methodology::{CriterionCategory, Methodology};
use crate::persona::Persona;
use crate::prompts;
use crate::scorecard::Scorecard;

pub use render::render_report;

/// Ranked lists are cut to this many entries.
pub const TOP_K: usize = 10;

const SUMMARY_MAX_TOKENS: u32 = 1_200;

/// Substituted when the executive narrative call fails terminally.
pub const NARRATIVE_PLACEHOLDER: &str = "[error: llm-gateway-terminal] \
Executive narrative unavailable; the statistics and ranked tables below remain valid.";

/// Aggregate statistics for one tier or channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitStatistics {
    pub unit_name: String,
    pub label: String,
    pub page_count: usize,
    pub mean_final_score: f64,
    /// Mean over brand-category criteria (authenticity for offsite units).
    pub mean_brand_score: f64,
    /// Mean over performance-category criteria (sentiment for offsite units).
    pub mean_performance_score: f64,
    /// Mean final score weighted by the unit's methodology weight.
    pub weighted_aggregate: f64,
}

/// One criterion result ranked for the issues/strengths lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCriterion {
    pub url: String,
    pub criterion_id: String,
    pub criterion_name: String,
    pub score: f64,
    pub weight_pct: u32,
    pub rank_value: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveNarrative {
    pub executive_summary: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub key_weaknesses: Vec<String>,
}

impl ExecutiveNarrative {
    pub fn placeholder() -> Self {
        Self {
            executive_summary: NARRATIVE_PLACEHOLDER.to_string(),
            key_strengths: Vec::new(),
            key_weaknesses: Vec::new(),
        }
    }
}

/// Aggregates one persona's scorecards and experience reports into the
/// strategic summary. Runs strictly after every per-URL task has finished.
pub struct StrategicSummarizer<'a> {
    methodology: &'a Methodology,
    persona: &'a Persona,
    scorecards: &'a [Scorecard],
    reports: &'a [ExperienceReport],
}

impl<'a> StrategicSummarizer<'a> {
    pub fn new(
        methodology: &'a Methodology,
        persona: &'a Persona,
        scorecards: &'a [Scorecard],
        reports: &'a [ExperienceReport],
    ) -> Self {
        Self {
            methodology,
            persona,
            scorecards,
            reports,
        }
    }

    /// Per tier/channel statistics, in methodology order; units without
    /// audited pages are omitted.
    pub fn statistics(&self) -> Vec<UnitStatistics> {
        let mut unit_names: Vec<String> = self
            .methodology
            .onsite_tiers
            .iter()
            .map(|tier| tier.name.clone())
            .collect();
        unit_names.extend(
            self.methodology
                .offsite_channels
                .iter()
                .map(|channel| channel.name.clone()),
        );

        let mut statistics = Vec::new();
        for unit_name in unit_names {
            let cards: Vec<&Scorecard> = self
                .scorecards
                .iter()
                .filter(|card| card.unit_name == unit_name)
                .collect();
            if cards.is_empty() {
                continue;
            }

            let mean_final_score = mean(cards.iter().map(|card| card.final_score));
            let mean_brand_score = category_mean(
                &cards,
                &[CriterionCategory::Brand, CriterionCategory::Authenticity],
            );
            let mean_performance_score = category_mean(
                &cards,
                &[CriterionCategory::Performance, CriterionCategory::Sentiment],
            );

            statistics.push(UnitStatistics {
                label: self.methodology.unit_label(&unit_name),
                weighted_aggregate: mean_final_score * self.methodology.unit_weight(&unit_name),
                unit_name,
                page_count: cards.len(),
                mean_final_score,
                mean_brand_score,
                mean_performance_score,
            });
        }

        statistics
    }

    /// Overall score blending the onsite and offsite means with the
    /// methodology's calculation weights. With only one side audited, the
    /// weights renormalize so the score stays on the scoring scale.
    pub fn overall_weighted_score(&self) -> f64 {
        let onsite: Vec<f64> = self
            .scorecards
            .iter()
            .filter(|card| card.kind == crate::classifier::PageKind::Onsite)
            .map(|card| card.final_score)
            .collect();
        let offsite: Vec<f64> = self
            .scorecards
            .iter()
            .filter(|card| card.kind == crate::classifier::PageKind::Offsite)
            .map(|card| card.final_score)
            .collect();

        let onsite_weight = self.methodology.calculation.onsite_weight;
        let offsite_weight = self.methodology.calculation.offsite_weight;

        match (onsite.is_empty(), offsite.is_empty()) {
            (true, true) => 0.0,
            (false, true) => mean(onsite.into_iter()),
            (true, false) => mean(offsite.into_iter()),
            (false, false) => {
                mean(onsite.into_iter()) * onsite_weight
                    + mean(offsite.into_iter()) * offsite_weight
            }
        }
    }

    /// Top-K criteria by `weight_pct × (scale.max − score)`.
    pub fn critical_issues(&self) -> Vec<RankedCriterion> {
        let scale_max = self.methodology.scale().max;
        self.ranked(|score, weight| weight * (scale_max - score))
    }

    /// Top-K criteria by `weight_pct × score`.
    pub fn strengths(&self) -> Vec<RankedCriterion> {
        self.ranked(|score, weight| weight * score)
    }

    fn ranked(&self, rank_value: impl Fn(f64, f64) -> f64) -> Vec<RankedCriterion> {
        let mut entries: Vec<RankedCriterion> = self
            .scorecards
            .iter()
            .flat_map(|card| {
                card.scored_criteria.iter().map(|criterion| RankedCriterion {
                    url: card.url.clone(),
                    criterion_id: criterion.id.clone(),
                    criterion_name: criterion.name.clone(),
                    score: criterion.score,
                    weight_pct: criterion.weight_pct,
                    rank_value: rank_value(criterion.score, f64::from(criterion.weight_pct)),
                    evidence: criterion.evidence.clone(),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.rank_value
                .total_cmp(&a.rank_value)
                .then_with(|| a.url.cmp(&b.url))
                .then_with(|| a.criterion_id.cmp(&b.criterion_id))
        });
        entries.truncate(TOP_K);
        entries
    }

    /// Executive narrative over the compiled corpus; a terminal gateway
    /// failure substitutes the documented placeholder.
    pub async fn executive_narrative(&self, gateway: &Gateway) -> ExecutiveNarrative {
        let request = LlmRequest {
            system: prompts::SUMMARY_SYSTEM.to_string(),
            user: prompts::summary_user_prompt(self.persona, &self.corpus()),
            model_hint: None,
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: NARRATIVE_TEMPERATURE,
            contract: Contract::StrictJson {
                schema: SchemaKind::Summary,
            },
        };

        match gateway.complete(&request).await {
            Ok(completion) => {
                let value = completion.as_json().cloned().unwrap_or_default();
                match serde_json::from_value::<ExecutiveNarrative>(value) {
                    Ok(narrative) => narrative,
                    Err(err) => {
                        warn!(error = %err, "summary payload deserialization failed");
                        ExecutiveNarrative::placeholder()
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "gateway failed terminally for executive narrative");
                ExecutiveNarrative::placeholder()
            }
        }
    }

    /// Compiled corpus handed to the narrative call: one block per page
    /// with its score, descriptor and strongest findings.
    fn corpus(&self) -> String {
        let mut corpus = String::new();
        for card in self.scorecards {
            corpus.push_str(&format!(
                "Page: {} ({}, {:.2}/{} {})\n",
                card.url,
                card.unit_name,
                card.final_score,
                self.methodology.scale().max,
                card.descriptor_label
            ));
            for criterion in &card.scored_criteria {
                corpus.push_str(&format!(
                    "  - {}: {:.1} — {}\n",
                    criterion.id, criterion.score, criterion.evidence
                ));
            }
        }
        for report in self.reports {
            corpus.push_str(&format!(
                "Experience ({}): {} / {}\n",
                report.url, report.sections.first_impression, report.sections.business_impact
            ));
        }
        corpus
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

fn category_mean(cards: &[&Scorecard], categories: &[CriterionCategory]) -> f64 {
    mean(
        cards
            .iter()
            .flat_map(|card| card.scored_criteria.iter())
            .filter(|criterion| categories.contains(&criterion.category))
            .map(|criterion| criterion.score),
    )
}
