use crate::persona::Persona;

use super::{ExecutiveNarrative, RankedCriterion, UnitStatistics};

/// Render `Strategic_Summary.md`. Deterministic for fixed inputs: the
/// narrative is the only model-derived block and arrives pre-computed.
#[allow(clippy::too_many_arguments)]
pub fn render_report(
    persona: &Persona,
    overall_score: f64,
    statistics: &[UnitStatistics],
    critical_issues: &[RankedCriterion],
    strengths: &[RankedCriterion],
    narrative: &ExecutiveNarrative,
    audited_at: &str,
) -> String {
    let mut doc = String::new();

    doc.push_str("# Strategic Summary\n\n");
    doc.push_str(&format!("Persona: {}\n", persona.name));
    doc.push_str(&format!("Audited: {audited_at}\n"));
    doc.push_str(&format!("Overall Weighted Score: {overall_score:.2}\n\n"));

    doc.push_str("## Executive Summary\n\n");
    doc.push_str(&narrative.executive_summary);
    doc.push_str("\n\n");

    if !narrative.key_strengths.is_empty() {
        doc.push_str("Key strengths:\n");
        for strength in &narrative.key_strengths {
            doc.push_str(&format!("- {strength}\n"));
        }
        doc.push('\n');
    }
    if !narrative.key_weaknesses.is_empty() {
        doc.push_str("Key weaknesses:\n");
        for weakness in &narrative.key_weaknesses {
            doc.push_str(&format!("- {weakness}\n"));
        }
        doc.push('\n');
    }

    doc.push_str("## Tier & Channel Statistics\n\n");
    doc.push_str("| Tier/Channel | Pages | Mean Score | Brand | Performance | Weighted |\n");
    doc.push_str("|---|---|---|---|---|---|\n");
    for stat in statistics {
        doc.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
            stat.label,
            stat.page_count,
            stat.mean_final_score,
            stat.mean_brand_score,
            stat.mean_performance_score,
            stat.weighted_aggregate
        ));
    }
    doc.push('\n');

    doc.push_str("## Critical Issues\n\n");
    doc.push_str("| Rank | Criterion | URL | Score | Weight | Severity |\n");
    doc.push_str("|---|---|---|---|---|---|\n");
    for (index, issue) in critical_issues.iter().enumerate() {
        doc.push_str(&format!(
            "| {} | {} | {} | {:.2} | {}% | {:.1} |\n",
            index + 1,
            issue.criterion_id,
            issue.url,
            issue.score,
            issue.weight_pct,
            issue.rank_value
        ));
    }
    doc.push('\n');

    doc.push_str("## Strengths\n\n");
    doc.push_str("| Rank | Criterion | URL | Score | Weight | Value |\n");
    doc.push_str("|---|---|---|---|---|---|\n");
    for (index, strength) in strengths.iter().enumerate() {
        doc.push_str(&format!(
            "| {} | {} | {} | {:.2} | {}% | {:.1} |\n",
            index + 1,
            strength.criterion_id,
            strength.url,
            strength.score,
            strength.weight_pct,
            strength.rank_value
        ));
    }
    doc.push('\n');

    doc
}
