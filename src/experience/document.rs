use anyhow::{Context, Result};

use super::{ExperienceReport, ExperienceSections, Finding, FindingKind};

/// Section prefixes are a stable protocol shared with the post-processor.
const SECTION_PREFIXES: [(&str, SectionSlot); 5] = [
    ("First Impression:", SectionSlot::FirstImpression),
    ("Language & Tone:", SectionSlot::LanguageTone),
    ("Gaps in Information:", SectionSlot::InformationGaps),
    ("Trust and Credibility:", SectionSlot::TrustCredibility),
    ("Business Impact & Next Steps:", SectionSlot::BusinessImpact),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionSlot {
    FirstImpression,
    LanguageTone,
    InformationGaps,
    TrustCredibility,
    BusinessImpact,
}

/// Render an experience report into its Markdown document.
pub fn render_document(report: &ExperienceReport) -> String {
    let mut doc = String::new();

    doc.push_str("# Persona Experience Report\n\n");
    doc.push_str(&format!("URL: {}\n", report.url));
    doc.push_str(&format!("Persona: {}\n", report.persona));
    doc.push_str(&format!("Audited: {}\n", report.audited_at));
    doc.push_str(&format!("Status: {}\n\n", report.status.as_str()));

    doc.push_str("| Finding | Example from Text | Strategic Analysis |\n");
    doc.push_str("|---|---|---|\n");
    for finding in &report.findings {
        doc.push_str(&format!(
            "| {} | {} | {} |\n",
            finding.kind.label(),
            table_safe(&finding.example_text),
            table_safe(&finding.strategic_analysis)
        ));
    }
    doc.push('\n');

    doc.push_str(&format!(
        "First Impression: {}\n\n",
        single_line(&report.sections.first_impression)
    ));
    doc.push_str(&format!(
        "Language & Tone: {}\n\n",
        single_line(&report.sections.language_tone)
    ));
    doc.push_str(&format!(
        "Gaps in Information: {}\n\n",
        single_line(&report.sections.information_gaps)
    ));
    doc.push_str(&format!(
        "Trust and Credibility: {}\n\n",
        single_line(&report.sections.trust_credibility)
    ));
    doc.push_str(&format!(
        "Business Impact & Next Steps: {}\n",
        single_line(&report.sections.business_impact)
    ));

    doc
}

/// Experience fields recovered from a persisted document.
#[derive(Debug, Clone)]
pub struct ParsedExperience {
    pub url: String,
    pub persona: String,
    pub audited_at: String,
    pub status: String,
    pub findings: Vec<Finding>,
    pub sections: ExperienceSections,
}

/// Parse a persisted experience document. Tolerant to blank lines and
/// surrounding prose, strict about the table shape and section prefixes.
/// Section text may continue over following lines until the next prefix.
pub fn parse_document(raw: &str) -> Result<ParsedExperience> {
    let mut url = None;
    let mut persona = None;
    let mut audited_at = None;
    let mut status = None;
    let mut findings = Vec::new();
    let mut sections = ExperienceSections::default();
    let mut active_slot: Option<SectionSlot> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some((prefix, slot)) = SECTION_PREFIXES
            .iter()
            .find(|(prefix, _)| trimmed.starts_with(prefix))
        {
            let value = trimmed[prefix.len()..].trim().to_string();
            *section_mut(&mut sections, *slot) = value;
            active_slot = Some(*slot);
            continue;
        }

        if let Some(value) = trimmed.strip_prefix("URL:") {
            url = Some(value.trim().to_string());
            active_slot = None;
        } else if let Some(value) = trimmed.strip_prefix("Persona:") {
            persona = Some(value.trim().to_string());
            active_slot = None;
        } else if let Some(value) = trimmed.strip_prefix("Audited:") {
            audited_at = Some(value.trim().to_string());
            active_slot = None;
        } else if let Some(value) = trimmed.strip_prefix("Status:") {
            status = Some(value.trim().to_string());
            active_slot = None;
        } else if trimmed.starts_with('|') {
            if let Some(finding) = parse_finding_row(trimmed) {
                findings.push(finding);
            }
            active_slot = None;
        } else if trimmed.starts_with('#') {
            active_slot = None;
        } else if let Some(slot) = active_slot {
            // Continuation of the active narrative section.
            let target = section_mut(&mut sections, slot);
            if !target.is_empty() {
                target.push(' ');
            }
            target.push_str(trimmed);
        }
    }

    Ok(ParsedExperience {
        url: url.context("experience document missing 'URL:' header")?,
        persona: persona.context("experience document missing 'Persona:' header")?,
        audited_at: audited_at.context("experience document missing 'Audited:' header")?,
        status: status.unwrap_or_else(|| "ok".to_string()),
        findings,
        sections,
    })
}

fn section_mut(sections: &mut ExperienceSections, slot: SectionSlot) -> &mut String {
    match slot {
        SectionSlot::FirstImpression => &mut sections.first_impression,
        SectionSlot::LanguageTone => &mut sections.language_tone,
        SectionSlot::InformationGaps => &mut sections.information_gaps,
        SectionSlot::TrustCredibility => &mut sections.trust_credibility,
        SectionSlot::BusinessImpact => &mut sections.business_impact,
    }
}

fn parse_finding_row(line: &str) -> Option<Finding> {
    let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
    if cells.len() != 3 {
        return None;
    }

    let kind = FindingKind::from_label(cells[0])?;
    Some(Finding {
        kind,
        example_text: cells[1].to_string(),
        strategic_analysis: cells[2].to_string(),
    })
}

fn table_safe(text: &str) -> String {
    text.replace('|', "/").replace(['\n', '\r'], " ")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
