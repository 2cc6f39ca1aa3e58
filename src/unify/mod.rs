
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuditConfig;
use crate::postprocess::{self, PersonaDataset};
use crate::util::{ensure_directory, now_utc_string, persona_slug, write_json_pretty};

/// One row of the unified long-form dataset: the stable column set, one row
/// per `(persona_id, page_id, criterion_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRow {
    pub persona_id: String,
    pub page_id: String,
    pub url_slug: String,
    pub url: String,
    pub tier: String,
    pub criterion_id: String,
    pub criterion_code: String,
    pub raw_score: f64,
    pub final_score: f64,
    pub descriptor: String,
    pub rationale: String,
    pub first_impression: String,
    pub language_tone_feedback: String,
    pub information_gaps: String,
    pub trust_credibility_assessment: String,
    pub business_impact_analysis: String,
    pub effective_copy_examples: String,
    pub ineffective_copy_examples: String,
    pub overall_sentiment: String,
    pub engagement_level: String,
    pub conversion_likelihood: String,
    pub slug: String,
    pub audited_ts: String,
    pub quick_win_flag: bool,
    pub critical_issue_flag: bool,
    pub success_flag: bool,
    pub sentiment_numeric: f64,
    pub engagement_numeric: f64,
    pub conversion_numeric: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub generated_at: String,
    pub row_count: usize,
    pub persona_count: usize,
    pub page_count: usize,
    pub mean_score_by_persona: BTreeMap<String, f64>,
    pub mean_score_by_tier: BTreeMap<String, f64>,
    pub mean_score_by_criterion: BTreeMap<String, f64>,
}

/// Merge every persona's normalized tables into the unified dataset.
/// Pure over its inputs; the filesystem wrapper lives in [`run_unify`].
pub fn merge_datasets(
    datasets: &[PersonaDataset],
    config: &AuditConfig,
) -> (Vec<UnifiedRow>, Vec<String>) {
    let mut rows = Vec::new();
    let mut diagnostics = Vec::new();
    let mut seen_keys = BTreeSet::new();

    for dataset in datasets {
        let pages: BTreeMap<&str, &postprocess::PagesRow> = dataset
            .pages
            .iter()
            .map(|page| (page.page_id.as_str(), page))
            .collect();
        let experience: BTreeMap<&str, &postprocess::ExperienceRow> = dataset
            .experience
            .iter()
            .map(|row| (row.page_id.as_str(), row))
            .collect();

        // A page is a quick win when any of its recommendations is one.
        let mut quick_win_pages = BTreeSet::new();
        for recommendation in &dataset.recommendations {
            if recommendation.quick_win_flag {
                quick_win_pages.insert(recommendation.page_id.as_str());
            }
        }

        for score in &dataset.criteria_scores {
            let Some(page) = pages.get(score.page_id.as_str()) else {
                diagnostics.push(format!(
                    "criteria row for unknown page {} skipped",
                    score.page_id
                ));
                continue;
            };

            let persona_id = persona_slug(&page.persona);
            let key = (
                persona_id.clone(),
                score.page_id.clone(),
                score.criterion_id.clone(),
            );
            if !seen_keys.insert(key) {
                diagnostics.push(format!(
                    "duplicate row for ({persona_id}, {}, {}) dropped",
                    score.page_id, score.criterion_id
                ));
                continue;
            }

            let report = experience.get(score.page_id.as_str()).copied();
            let (sentiment, engagement, conversion) = page_levels(page.final_score, config);

            rows.push(UnifiedRow {
                persona_id,
                page_id: score.page_id.clone(),
                url_slug: page.slug.clone(),
                url: page.url.clone(),
                tier: score.tier.clone(),
                criterion_id: score.criterion_id.clone(),
                criterion_code: score.criterion_id.to_ascii_uppercase(),
                raw_score: score.score,
                final_score: page.final_score,
                descriptor: score.descriptor.clone(),
                rationale: score.evidence.clone(),
                first_impression: field(report, |r| &r.first_impression),
                language_tone_feedback: field(report, |r| &r.language_tone_feedback),
                information_gaps: field(report, |r| &r.information_gaps),
                trust_credibility_assessment: field(report, |r| &r.trust_credibility_assessment),
                business_impact_analysis: field(report, |r| &r.business_impact_analysis),
                effective_copy_examples: field(report, |r| &r.effective_copy_examples),
                ineffective_copy_examples: field(report, |r| &r.ineffective_copy_examples),
                overall_sentiment: sentiment.to_string(),
                engagement_level: engagement.to_string(),
                conversion_likelihood: conversion.to_string(),
                slug: page.slug.clone(),
                audited_ts: page.audited_ts.clone(),
                quick_win_flag: quick_win_pages.contains(score.page_id.as_str()),
                critical_issue_flag: score.score <= config.low_score_threshold,
                success_flag: score.score >= config.high_score_threshold,
                sentiment_numeric: sentiment_numeric(sentiment),
                engagement_numeric: level_numeric(engagement),
                conversion_numeric: level_numeric(conversion),
                avg_score: 0.0,
            });
        }
    }

    rows.sort_by(|a, b| {
        a.persona_id
            .cmp(&b.persona_id)
            .then_with(|| a.page_id.cmp(&b.page_id))
            .then_with(|| a.criterion_id.cmp(&b.criterion_id))
    });

    fill_avg_scores(&mut rows);

    (rows, diagnostics)
}

/// `avg_score` is the mean of `raw_score` over all rows sharing a page_id.
fn fill_avg_scores(rows: &mut [UnifiedRow]) {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in rows.iter() {
        let entry = sums.entry(row.page_id.clone()).or_insert((0.0, 0));
        entry.0 += row.raw_score;
        entry.1 += 1;
    }

    for row in rows.iter_mut() {
        let (sum, count) = sums[&row.page_id];
        row.avg_score = (sum / count as f64 * 100.0).round() / 100.0;
    }
}

pub fn summary_stats(rows: &[UnifiedRow]) -> SummaryStats {
    SummaryStats {
        generated_at: now_utc_string(),
        row_count: rows.len(),
        persona_count: rows
            .iter()
            .map(|row| row.persona_id.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        page_count: rows
            .iter()
            .map(|row| row.page_id.as_str())
            .collect::<BTreeSet<_>>()
            .len(),
        mean_score_by_persona: grouped_mean(rows, |row| row.persona_id.clone()),
        mean_score_by_tier: grouped_mean(rows, |row| row.tier.clone()),
        mean_score_by_criterion: grouped_mean(rows, |row| row.criterion_id.clone()),
    }
}

fn grouped_mean(rows: &[UnifiedRow], key: impl Fn(&UnifiedRow) -> String) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = sums.entry(key(row)).or_insert((0.0, 0));
        entry.0 += row.raw_score;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(group, (sum, count))| (group, (sum / count as f64 * 100.0).round() / 100.0))
        .collect()
}

/// Sentiment/engagement/conversion levels derived from the page's final
/// score against the configured thresholds.
fn page_levels(final_score: f64, config: &AuditConfig) -> (&'static str, &'static str, &'static str) {
    if final_score >= config.high_score_threshold {
        ("Positive", "High", "High")
    } else if final_score <= config.low_score_threshold {
        ("Negative", "Low", "Low")
    } else {
        ("Neutral", "Medium", "Medium")
    }
}

fn sentiment_numeric(level: &str) -> f64 {
    match level {
        "Positive" => 1.0,
        "Negative" => -1.0,
        _ => 0.0,
    }
}

fn level_numeric(level: &str) -> f64 {
    match level {
        "High" => 1.0,
        "Medium" => 0.5,
        _ => 0.0,
    }
}

fn field<'a>(
    report: Option<&'a postprocess::ExperienceRow>,
    pick: impl Fn(&'a postprocess::ExperienceRow) -> &'a String,
) -> String {
    report.map(|row| pick(row).clone()).unwrap_or_default()
}

/// Filesystem entry point: load every persona's tables under `output_dir`,
/// merge them, and write the unified dataset plus summary stats.
pub fn run_unify(output_dir: &Path, config: &AuditConfig) -> Result<SummaryStats> {
    let mut datasets = Vec::new();
    let entries = fs::read_dir(output_dir)
        .with_context(|| format!("failed to read {}", output_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", output_dir.display()))?;
        let path = entry.path();
        if !path.is_dir() || !path.join("tables").join("pages.json").exists() {
            continue;
        }

        match postprocess::load_dataset(&path) {
            Ok(dataset) => {
                info!(persona_dir = %path.display(), pages = dataset.pages.len(), "loaded persona tables");
                datasets.push(dataset);
            }
            Err(err) => {
                warn!(persona_dir = %path.display(), error = %err, "skipping unreadable persona tables");
            }
        }
    }

    if datasets.is_empty() {
        bail!(
            "no persona tables found under {}; run postprocess first",
            output_dir.display()
        );
    }

    let (rows, diagnostics) = merge_datasets(&datasets, config);
    for diagnostic in &diagnostics {
        warn!(diagnostic, "unification diagnostic");
    }

    let stats = summary_stats(&rows);
    let unified_dir = output_dir.join("unified");
    ensure_directory(&unified_dir)?;

    write_json_pretty(&unified_dir.join("unified_dataset.json"), &rows)?;
    write_unified_csv(&unified_dir.join("unified_dataset.csv"), &rows)?;
    write_json_pretty(&unified_dir.join("summary_stats.json"), &stats)?;

    info!(
        rows = stats.row_count,
        personas = stats.persona_count,
        pages = stats.page_count,
        "unified dataset written"
    );

    Ok(stats)
}

fn write_unified_csv(path: &Path, rows: &[UnifiedRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to serialize row into {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
