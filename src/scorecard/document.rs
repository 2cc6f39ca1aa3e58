use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use super::{AppliedAdjustment, Recommendation, Scorecard};

/// Render a scorecard into its Markdown document. The document is a stable
/// protocol: header prefixes, the table shape and the section titles are
/// load-bearing for [`parse_document`].
pub fn render_document(scorecard: &Scorecard, scale_max: f64) -> String {
    let mut doc = String::new();

    doc.push_str("# Brand Hygiene Scorecard\n\n");
    doc.push_str(&format!("URL: {}\n", scorecard.url));
    doc.push_str(&format!("Persona: {}\n", scorecard.persona));
    doc.push_str(&format!("Audited: {}\n", scorecard.audited_at));
    doc.push_str(&format!("Tier/Channel: {}\n", scorecard.unit_name));
    doc.push_str(&format!("Status: {}\n", scorecard.status.as_str()));
    doc.push_str(&format!(
        "Weighted Score: {:.2}/{}\n",
        scorecard.weighted_score, scale_max
    ));
    doc.push_str(&format!(
        "Final Score: {:.2}/{}\n",
        scorecard.final_score, scale_max
    ));
    doc.push_str(&format!("Descriptor: {}\n\n", scorecard.descriptor_label));

    doc.push_str("| Criterion | Score/");
    doc.push_str(&format!("{scale_max}"));
    doc.push_str(" | Rationale |\n");
    doc.push_str("|---|---|---|\n");
    for criterion in &scorecard.scored_criteria {
        doc.push_str(&format!(
            "| {} | {:.2}/{} | {} |\n",
            criterion.id,
            criterion.score,
            scale_max,
            table_safe(&criterion.evidence)
        ));
    }
    doc.push('\n');

    if !scorecard.gating_rules_applied.is_empty() || !scorecard.quality_penalties_applied.is_empty()
    {
        doc.push_str("## Applied Adjustments\n\n");
        for adjustment in &scorecard.gating_rules_applied {
            doc.push_str(&format!(
                "- gating {}: -{:.2} ({})\n",
                adjustment.id,
                adjustment.penalty,
                table_safe(&adjustment.reason)
            ));
        }
        for adjustment in &scorecard.quality_penalties_applied {
            doc.push_str(&format!(
                "- quality {}: -{:.2} ({})\n",
                adjustment.id,
                adjustment.penalty,
                table_safe(&adjustment.reason)
            ));
        }
        doc.push_str(&format!("- total: -{:.2}\n", scorecard.adjustment_total()));
        doc.push('\n');
    }

    if !scorecard.brand_consistency_check.is_empty() {
        doc.push_str("## Brand Consistency\n\n");
        for (check, observation) in &scorecard.brand_consistency_check {
            doc.push_str(&format!("- {check}: {}\n", table_safe(observation)));
        }
        doc.push('\n');
    }

    if !scorecard.recommendations.is_empty() {
        doc.push_str("## Priority Recommendations\n\n");
        for (index, recommendation) in scorecard.recommendations.iter().enumerate() {
            let complexity_suffix = recommendation
                .complexity
                .as_deref()
                .map(|complexity| format!(" [complexity: {complexity}]"))
                .unwrap_or_default();
            doc.push_str(&format!(
                "{}. **{}** - {}{}\n",
                index + 1,
                table_safe(&recommendation.title),
                table_safe(&recommendation.description),
                complexity_suffix
            ));
        }
        doc.push('\n');
    }

    if !scorecard.diagnostics.is_empty() {
        doc.push_str("## Diagnostics\n\n");
        for diagnostic in &scorecard.diagnostics {
            doc.push_str(&format!("- {}\n", table_safe(diagnostic)));
        }
        doc.push('\n');
    }

    doc
}

/// Scorecard fields recovered from a persisted document.
#[derive(Debug, Clone)]
pub struct ParsedScorecard {
    pub url: String,
    pub persona: String,
    pub audited_at: String,
    pub unit_name: String,
    pub status: String,
    pub weighted_score: f64,
    pub final_score: f64,
    pub scale_max: f64,
    pub criteria: Vec<ParsedCriterion>,
    pub adjustments: Vec<AppliedAdjustment>,
    pub brand_consistency: BTreeMap<String, String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone)]
pub struct ParsedCriterion {
    pub id: String,
    pub score: f64,
    pub evidence: String,
}

fn score_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)\s*/\s*([0-9]+(?:\.[0-9]+)?)$").unwrap())
}

fn adjustment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^- (gating|quality) (\S+): -([0-9]+(?:\.[0-9]+)?) \((.*)\)$").unwrap()
    })
}

fn recommendation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+\.\s+\*\*(.+?)\*\*\s*-\s*(.*?)(?:\s*\[complexity:\s*(\w+)\])?$").unwrap()
    })
}

/// Parse a persisted scorecard document. Tolerant to blank lines and
/// surrounding prose, strict about header prefixes and the table shape.
pub fn parse_document(raw: &str) -> Result<ParsedScorecard> {
    let mut url = None;
    let mut persona = None;
    let mut audited_at = None;
    let mut unit_name = None;
    let mut status = None;
    let mut weighted_score = None;
    let mut final_score = None;
    let mut scale_max = None;
    let mut criteria = Vec::new();
    let mut adjustments = Vec::new();
    let mut brand_consistency = BTreeMap::new();
    let mut recommendations = Vec::new();

    #[derive(PartialEq)]
    enum Section {
        Header,
        Adjustments,
        BrandConsistency,
        Recommendations,
        Other,
    }
    let mut section = Section::Header;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(title) = trimmed.strip_prefix("## ") {
            section = match title.trim() {
                "Applied Adjustments" => Section::Adjustments,
                "Brand Consistency" => Section::BrandConsistency,
                "Priority Recommendations" => Section::Recommendations,
                _ => Section::Other,
            };
            continue;
        }

        if let Some(value) = trimmed.strip_prefix("URL:") {
            url = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Persona:") {
            persona = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Audited:") {
            audited_at = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Tier/Channel:") {
            unit_name = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Status:") {
            status = Some(value.trim().to_string());
        } else if let Some(value) = trimmed.strip_prefix("Weighted Score:") {
            weighted_score = Some(parse_score_fraction(value)?.0);
        } else if let Some(value) = trimmed.strip_prefix("Final Score:") {
            let (score, max) = parse_score_fraction(value)?;
            final_score = Some(score);
            scale_max = Some(max);
        } else if trimmed.starts_with('|') && section == Section::Header {
            if let Some(parsed) = parse_criterion_row(trimmed)? {
                criteria.push(parsed);
            }
        } else if section == Section::Adjustments {
            if let Some(captures) = adjustment_re().captures(trimmed) {
                adjustments.push(AppliedAdjustment {
                    id: captures[2].to_string(),
                    penalty: captures[3].parse().context("invalid adjustment penalty")?,
                    reason: captures[4].to_string(),
                });
            }
        } else if section == Section::BrandConsistency {
            if let Some(rest) = trimmed.strip_prefix("- ") {
                if let Some((check, observation)) = rest.split_once(':') {
                    brand_consistency
                        .insert(check.trim().to_string(), observation.trim().to_string());
                }
            }
        } else if section == Section::Recommendations {
            if let Some(captures) = recommendation_re().captures(trimmed) {
                recommendations.push(Recommendation {
                    title: captures[1].to_string(),
                    description: captures[2].trim().to_string(),
                    complexity: captures.get(3).map(|m| m.as_str().to_string()),
                });
            }
        }
    }

    Ok(ParsedScorecard {
        url: url.context("scorecard document missing 'URL:' header")?,
        persona: persona.context("scorecard document missing 'Persona:' header")?,
        audited_at: audited_at.context("scorecard document missing 'Audited:' header")?,
        unit_name: unit_name.context("scorecard document missing 'Tier/Channel:' header")?,
        status: status.unwrap_or_else(|| "ok".to_string()),
        weighted_score: weighted_score
            .or(final_score)
            .context("scorecard document missing scores")?,
        final_score: final_score.context("scorecard document missing 'Final Score:' header")?,
        scale_max: scale_max.unwrap_or(10.0),
        criteria,
        adjustments,
        brand_consistency,
        recommendations,
    })
}

fn parse_score_fraction(value: &str) -> Result<(f64, f64)> {
    let captures = score_line_re()
        .captures(value.trim())
        .with_context(|| format!("malformed score fraction: {value}"))?;
    Ok((
        captures[1].parse().context("invalid score")?,
        captures[2].parse().context("invalid scale max")?,
    ))
}

/// One `| id | score/max | evidence |` row; separator and header rows
/// return `None`.
fn parse_criterion_row(line: &str) -> Result<Option<ParsedCriterion>> {
    let cells: Vec<&str> = line
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .collect();

    if cells.len() != 3 {
        return Ok(None);
    }

    let id = cells[0];
    if id.is_empty() || id == "Criterion" || id.chars().all(|ch| ch == '-' || ch == ' ') {
        return Ok(None);
    }

    let Some(captures) = score_line_re().captures(cells[1]) else {
        // Header row with "Score/10" or decoration; not a data row.
        return Ok(None);
    };

    let score: f64 = captures[1]
        .parse()
        .with_context(|| format!("invalid criterion score in row: {line}"))?;

    Ok(Some(ParsedCriterion {
        id: id.to_string(),
        score,
        evidence: cells[2].to_string(),
    }))
}

/// Keep cell content from breaking the table: pipes and newlines collapse.
fn table_safe(text: &str) -> String {
    text.replace('|', "/").replace(['\n', '\r'], " ")
}
