//! Prompt templates keyed by artifact kind. Persona attributes are injected
//! through the enumerated placeholders only; page content is truncated by
//! the caller before substitution.

use crate::methodology::{BrandMessaging, Criterion, Methodology};
use crate::persona::Persona;
use crate::util::truncate_chars;

/// System prompt shared by scoring calls.
pub const SCORECARD_SYSTEM: &str = "You are a digital brand auditor. You evaluate one web page \
against a fixed set of criteria, strictly from the perspective of the persona described in the \
request. You answer with a single JSON object and nothing else. The object has a \"criteria\" \
array whose entries are {\"criterion_name\": string, \"score\": number, \"evidence\": string} — \
one entry per requested criterion, scores on the given scale, evidence quoting or closely \
paraphrasing the page. An optional \"recommendations\" array may hold \
{\"title\": string, \"description\": string, \"complexity\": \"Low\"|\"Medium\"|\"High\"} items.";

/// System prompt shared by experience-report calls.
pub const EXPERIENCE_SYSTEM: &str = "You are a digital brand auditor narrating how one web page \
reads to the persona described in the request. You answer with a single JSON object and nothing \
else: {\"findings\": [{\"type\": \"effective_copy\"|\"ineffective_copy\", \"example_text\": string, \
\"strategic_analysis\": string}], \"sections\": {\"first_impression\": string, \"language_tone\": \
string, \"information_gaps\": string, \"trust_credibility\": string, \"business_impact\": string}}. \
Quote example_text verbatim from the page.";

/// System prompt for the executive summary call.
pub const SUMMARY_SYSTEM: &str = "You are a brand strategy consultant writing for an executive \
audience. You answer with a single JSON object and nothing else: {\"executive_summary\": string, \
\"key_strengths\": [string], \"key_weaknesses\": [string]}.";

/// System prompt for single-criterion numeric probes.
pub const SINGLE_SCORE_SYSTEM: &str = "You score one criterion for one web page. Respond with a \
single number on the requested scale and nothing else.";

/// Persona block built from enumerated placeholders; every template that
/// mentions the persona embeds exactly this rendering.
pub fn persona_block(persona: &Persona) -> String {
    let mut block = String::new();
    block.push_str(&format!("Persona: {}\n", persona.name));
    block.push_str(&format!("Role: {}\n", persona.role));
    block.push_str(&format!("Industry: {}\n", persona.industry));
    block.push_str(&format!("Geographic scope: {}\n", persona.geographic_scope));
    if !persona.goal_statement.is_empty() {
        block.push_str(&format!("Goal: {}\n", persona.goal_statement));
    }
    if !persona.priorities.is_empty() {
        block.push_str("Priorities:\n");
        for priority in &persona.priorities {
            block.push_str(&format!("- {priority}\n"));
        }
    }
    if !persona.pain_points.is_empty() {
        block.push_str("Pain points:\n");
        for pain_point in &persona.pain_points {
            block.push_str(&format!("- {pain_point}\n"));
        }
    }
    if !persona.decision_factors.is_empty() {
        block.push_str(&format!(
            "Decision factors: {}\n",
            persona.decision_factors.join("; ")
        ));
    }
    block.push_str(&format!("Organization: {}\n", persona.organization_type));
    block.push_str(&format!(
        "Communication style: {}\n",
        persona.communication_style
    ));
    block
}

fn brand_messaging_block(messaging: &BrandMessaging) -> String {
    let mut block = String::new();
    if !messaging.taglines.is_empty() {
        block.push_str(&format!("Approved taglines: {}\n", messaging.taglines.join("; ")));
    }
    if !messaging.value_propositions.is_empty() {
        block.push_str(&format!(
            "Value propositions: {}\n",
            messaging.value_propositions.join("; ")
        ));
    }
    if !messaging.sub_narratives.is_empty() {
        block.push_str(&format!(
            "Sub-narratives: {}\n",
            messaging.sub_narratives.join("; ")
        ));
    }
    if !messaging.approved_ctas.is_empty() {
        block.push_str(&format!(
            "Approved calls to action: {}\n",
            messaging.approved_ctas.join("; ")
        ));
    }
    for (region, narrative) in &messaging.regional_narratives {
        block.push_str(&format!("Regional narrative ({region}): {narrative}\n"));
    }
    block
}

fn criteria_block<'a>(criteria: impl Iterator<Item = (&'a String, &'a Criterion)>) -> String {
    let mut block = String::new();
    for (id, criterion) in criteria {
        block.push_str(&format!(
            "- {} (weight {}%, category {}): {}\n",
            id,
            criterion.weight_pct,
            criterion.category.as_str(),
            criterion.description
        ));
        for requirement in &criterion.requirements {
            block.push_str(&format!("  * {requirement}\n"));
        }
    }
    block
}

/// User prompt for a scorecard call.
pub fn scorecard_user_prompt(
    url: &str,
    persona: &Persona,
    methodology: &Methodology,
    unit_name: &str,
    page_text: &str,
    truncation: usize,
    audited_at: &str,
) -> String {
    let criteria = methodology
        .unit_criteria(unit_name)
        .map(criteria_block_for_unit)
        .unwrap_or_default();
    let scale = methodology.scale();

    format!(
        "Audit timestamp: {audited_at}\nURL: {url}\nContent classification: {unit}\n\n\
{persona}\nScore the page against each criterion on a {min}-{max} scale.\n\
Criteria:\n{criteria}\nBrand messaging reference:\n{messaging}\n\
Page content (truncated):\n---\n{content}\n---",
        audited_at = audited_at,
        url = url,
        unit = methodology.unit_label(unit_name),
        persona = persona_block(persona),
        min = scale.min,
        max = scale.max,
        criteria = criteria,
        messaging = brand_messaging_block(&methodology.brand_messaging),
        content = truncate_chars(page_text, truncation),
    )
}

fn criteria_block_for_unit(
    criteria: &std::collections::BTreeMap<String, Criterion>,
) -> String {
    criteria_block(criteria.iter())
}

/// User prompt for an experience-report call.
pub fn experience_user_prompt(
    url: &str,
    persona: &Persona,
    methodology: &Methodology,
    page_text: &str,
    truncation: usize,
    audited_at: &str,
) -> String {
    format!(
        "Audit timestamp: {audited_at}\nURL: {url}\n\n{persona}\n\
Narrate the page experience for this persona: what works, what fails, and why it matters \
commercially. Include at least one effective_copy and one ineffective_copy finding when the \
page offers any copy at all.\nBrand messaging reference:\n{messaging}\n\
Page content (truncated):\n---\n{content}\n---",
        audited_at = audited_at,
        url = url,
        persona = persona_block(persona),
        messaging = brand_messaging_block(&methodology.brand_messaging),
        content = truncate_chars(page_text, truncation),
    )
}

/// User prompt for the executive summary call over a compiled corpus.
pub fn summary_user_prompt(persona: &Persona, corpus: &str) -> String {
    format!(
        "{persona}\nBelow are the audited pages with their scores and strongest findings. \
Write the executive narrative for this persona.\n\n{corpus}",
        persona = persona_block(persona),
        corpus = corpus,
    )
}

/// User prompt for a single-criterion numeric probe.
pub fn single_score_user_prompt(
    criterion_name: &str,
    page_text: &str,
    scale_min: f64,
    scale_max: f64,
    truncation: usize,
) -> String {
    format!(
        "Criterion: {criterion_name}\nScale: {scale_min} to {scale_max}\n\
Page content (truncated):\n---\n{content}\n---\nScore:",
        content = truncate_chars(page_text, truncation),
    )
}
