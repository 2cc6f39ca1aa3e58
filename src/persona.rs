use serde::{Deserialize, Serialize};

use crate::util::persona_slug;

pub const DEFAULT_NAME: &str = "Unnamed Persona";
pub const DEFAULT_FIELD: &str = "Unspecified";
pub const DEFAULT_COMMUNICATION_STYLE: &str = "Professional and concise";

/// A named buyer persona parsed from a semi-structured brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role: String,
    pub industry: String,
    pub geographic_scope: String,
    pub priorities: Vec<String>,
    pub pain_points: Vec<String>,
    pub communication_style: String,
    pub organization_type: String,
    pub decision_factors: Vec<String>,
    pub goal_statement: String,
}

impl Persona {
    pub fn id(&self) -> String {
        persona_slug(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Priorities,
    PainPoints,
    DecisionFactors,
    GoalStatement,
}

/// Parse a persona brief. Tolerant: unknown sections are ignored, missing
/// fields get neutral defaults, and well-formed text never fails.
pub fn parse(text: &str) -> Persona {
    let mut persona = Persona {
        name: DEFAULT_NAME.to_string(),
        role: DEFAULT_FIELD.to_string(),
        industry: DEFAULT_FIELD.to_string(),
        geographic_scope: DEFAULT_FIELD.to_string(),
        priorities: Vec::new(),
        pain_points: Vec::new(),
        communication_style: DEFAULT_COMMUNICATION_STYLE.to_string(),
        organization_type: DEFAULT_FIELD.to_string(),
        decision_factors: Vec::new(),
        goal_statement: String::new(),
    };

    let mut section = Section::None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(value) = heading_value(trimmed, "persona brief:") {
            if !value.is_empty() {
                persona.name = value;
            }
            section = Section::None;
        } else if let Some(value) = heading_value(trimmed, "role:") {
            if !value.is_empty() {
                persona.role = normalize_role(&value);
            }
            section = Section::None;
        } else if let Some(value) = heading_value(trimmed, "industry:") {
            if !value.is_empty() {
                persona.industry = normalize_industry(&value);
            }
            section = Section::None;
        } else if let Some(value) = heading_value(trimmed, "geographic scope:") {
            if !value.is_empty() {
                persona.geographic_scope = normalize_geography(&value);
            }
            section = Section::None;
        } else if let Some(value) = heading_value(trimmed, "communication style:") {
            if !value.is_empty() {
                persona.communication_style = value;
            }
            section = Section::None;
        } else if let Some(value) = heading_value(trimmed, "organization:") {
            if !value.is_empty() {
                persona.organization_type = value;
            }
            section = Section::None;
        } else if heading_value(trimmed, "key responsibilities:").is_some() {
            section = Section::Priorities;
        } else if heading_value(trimmed, "user goal statement:").is_some() {
            if let Some(value) = heading_value(trimmed, "user goal statement:") {
                if !value.is_empty() {
                    persona.goal_statement = value;
                }
            }
            section = Section::GoalStatement;
        } else if heading_value(trimmed, "pain points and challenges").is_some()
            || heading_value(trimmed, "frustrations:").is_some()
        {
            section = Section::PainPoints;
        } else if heading_value(trimmed, "decision factors:").is_some() {
            section = Section::DecisionFactors;
        } else if is_heading(trimmed) {
            // Unrecognized heading: skip its body.
            section = Section::None;
        } else {
            let item = strip_bullet(trimmed);
            if item.is_empty() {
                continue;
            }
            match section {
                Section::Priorities => persona.priorities.push(item),
                Section::PainPoints => persona.pain_points.push(item),
                Section::DecisionFactors => persona.decision_factors.push(item),
                Section::GoalStatement => {
                    if persona.goal_statement.is_empty() {
                        persona.goal_statement = item;
                    } else {
                        persona.goal_statement.push(' ');
                        persona.goal_statement.push_str(&item);
                    }
                }
                Section::None => {}
            }
        }
    }

    persona
}

/// Case-insensitive heading match; returns the trimmed remainder of the line.
fn heading_value(line: &str, heading: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    if lower.starts_with(heading) {
        Some(line[heading.len()..].trim().to_string())
    } else {
        None
    }
}

/// A short line ending in a colon reads as a section heading.
fn is_heading(line: &str) -> bool {
    line.ends_with(':') && line.len() <= 60 && !line.starts_with('-') && !line.starts_with('*')
}

fn strip_bullet(line: &str) -> String {
    let without_marker = line
        .trim_start_matches(['-', '*', '•'])
        .trim_start();

    // Numbered list markers: "1." / "2)" prefixes.
    let without_number = match without_marker.split_once(['.', ')']) {
        Some((prefix, rest)) if prefix.chars().all(|ch| ch.is_ascii_digit()) && !prefix.is_empty() => {
            rest.trim_start()
        }
        _ => without_marker,
    };

    without_number.trim().to_string()
}

fn normalize_role(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let mapped = [
        (["cio", "cto", "it director", "head of it"].as_slice(), "IT Leadership"),
        (["cfo", "finance director", "head of finance"].as_slice(), "Finance Leadership"),
        (["cmo", "marketing director", "head of marketing"].as_slice(), "Marketing Leadership"),
        (["procurement", "category manager", "buyer"].as_slice(), "Procurement"),
        (["engineer", "architect", "technical lead"].as_slice(), "Engineering"),
    ];

    for (needles, normalized) in mapped {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return normalized.to_string();
        }
    }
    raw.trim().to_string()
}

fn normalize_industry(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    let mapped = [
        (["construction", "infrastructure", "built environment"].as_slice(), "Infrastructure & Construction"),
        (["energy", "utilities", "power"].as_slice(), "Energy & Utilities"),
        (["manufactur"].as_slice(), "Manufacturing"),
        (["government", "public sector"].as_slice(), "Public Sector"),
        (["health"].as_slice(), "Healthcare"),
    ];

    for (needles, normalized) in mapped {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return normalized.to_string();
        }
    }
    raw.trim().to_string()
}

fn normalize_geography(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("emea") {
        return "EMEA".to_string();
    }
    if lower.contains("apac") || lower.contains("asia") {
        return "APAC".to_string();
    }
    if lower.contains("north america") || lower.contains("united states") || lower.contains("usa") {
        return "North America".to_string();
    }
    if lower.contains("united kingdom") || lower == "uk" || lower.contains("britain") {
        return "United Kingdom".to_string();
    }
    if lower.contains("global") || lower.contains("worldwide") || lower.contains("international") {
        return "Global".to_string();
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIEF: &str = "\
Persona Brief: Sarah the Infrastructure Director
Role: IT Director, Group Technology
Industry: construction and infrastructure
Geographic Scope: EMEA-wide remit

Key Responsibilities:
- Consolidate the regional data-centre estate
- Keep operational technology audits clean
* Sponsor the cloud migration programme

User Goal Statement:
Find a partner who can evidence delivery at scale.

Pain Points and Challenges:
1. Vendors who talk platforms but cannot name reference projects
2) Glossy sites with no technical depth

Budget Authority:
- Ignored section, not part of the model

Frustrations:
- Press releases instead of documentation
";

    #[test]
    fn parses_recognized_headings() {
        let persona = parse(BRIEF);
        assert_eq!(persona.name, "Sarah the Infrastructure Director");
        assert_eq!(persona.role, "IT Leadership");
        assert_eq!(persona.industry, "Infrastructure & Construction");
        assert_eq!(persona.geographic_scope, "EMEA");
    }

    #[test]
    fn collects_list_sections_with_mixed_markers() {
        let persona = parse(BRIEF);
        assert_eq!(persona.priorities.len(), 3);
        assert_eq!(persona.priorities[0], "Consolidate the regional data-centre estate");
        assert_eq!(persona.priorities[2], "Sponsor the cloud migration programme");
        // "Pain Points and Challenges" plus "Frustrations:" feed one list.
        assert_eq!(persona.pain_points.len(), 3);
        assert_eq!(persona.pain_points[2], "Press releases instead of documentation");
    }

    #[test]
    fn goal_statement_joins_following_lines() {
        let persona = parse(BRIEF);
        assert_eq!(
            persona.goal_statement,
            "Find a partner who can evidence delivery at scale."
        );
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let persona = parse(BRIEF);
        assert!(
            persona
                .priorities
                .iter()
                .chain(persona.pain_points.iter())
                .all(|item| !item.contains("Ignored section"))
        );
    }

    #[test]
    fn missing_fields_get_neutral_defaults() {
        let persona = parse("Role: Quantum Dreamer\n");
        assert_eq!(persona.name, DEFAULT_NAME);
        assert_eq!(persona.role, "Quantum Dreamer");
        assert_eq!(persona.industry, DEFAULT_FIELD);
        assert_eq!(persona.communication_style, DEFAULT_COMMUNICATION_STYLE);
        assert!(persona.priorities.is_empty());
        assert!(persona.pain_points.is_empty());
    }

    #[test]
    fn persona_id_is_a_stable_slug() {
        let persona = parse(BRIEF);
        assert_eq!(persona.id(), "sarah_the_infrastructure_director");
    }

    #[test]
    fn empty_input_never_fails() {
        let persona = parse("");
        assert_eq!(persona.name, DEFAULT_NAME);
    }
}
