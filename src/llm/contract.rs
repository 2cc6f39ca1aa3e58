use serde_json::Value;

use super::Completion;

/// Structured payload shapes the gateway can enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Scorecard,
    Experience,
    Summary,
}

/// Declarative response contract carried on every request.
#[derive(Debug, Clone, PartialEq)]
pub enum Contract {
    FreeText,
    FloatInRange { min: f64, max: f64 },
    StrictJson { schema: SchemaKind },
}

impl Contract {
    /// Enforce the contract against a raw provider response. A violation is
    /// reported as a string so the gateway can treat it as retryable.
    pub fn enforce(&self, raw: &str) -> Result<Completion, String> {
        match self {
            Contract::FreeText => Ok(Completion::Text(raw.to_string())),
            Contract::FloatInRange { min, max } => {
                let value = parse_first_float(raw)
                    .ok_or_else(|| format!("no numeric value in response: {raw:.40}"))?;
                if value < *min || value > *max {
                    return Err(format!("value {value} outside [{min}, {max}]"));
                }
                Ok(Completion::Number(value))
            }
            Contract::StrictJson { schema } => {
                let payload = extract_json_payload(raw)
                    .ok_or_else(|| "no JSON object in response".to_string())?;
                let value: Value = serde_json::from_str(payload)
                    .map_err(|err| format!("malformed JSON payload: {err}"))?;
                validate_payload(*schema, &value)?;
                Ok(Completion::Json(value))
            }
        }
    }
}

/// First float-looking token in the response.
fn parse_first_float(raw: &str) -> Option<f64> {
    raw.split(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-'))
        .filter(|token| !token.is_empty() && *token != "-" && *token != ".")
        .find_map(|token| token.trim_matches('.').parse::<f64>().ok())
}

/// Pull the JSON body out of a response that may wrap it in markdown fences
/// or surrounding prose. The structured payload is authoritative; prose is
/// discarded.
pub fn extract_json_payload(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();

    if let Some(fence_start) = trimmed.find("```") {
        let after_fence = &trimmed[fence_start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(fence_end) = body.find("```") {
            let fenced = body[..fence_end].trim();
            if !fenced.is_empty() {
                return Some(fenced);
            }
        }
    }

    let object_start = trimmed.find('{');
    let array_start = trimmed.find('[');
    let start = match (object_start, array_start) {
        (Some(obj), Some(arr)) => obj.min(arr),
        (Some(obj), None) => obj,
        (None, Some(arr)) => arr,
        (None, None) => return None,
    };

    let close = if trimmed.as_bytes()[start] == b'{' { '}' } else { ']' };
    let end = trimmed.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// Structural validation per schema kind. Engines deserialize into typed
/// records afterwards; this guards the retry loop.
pub fn validate_payload(schema: SchemaKind, value: &Value) -> Result<(), String> {
    match schema {
        SchemaKind::Scorecard => validate_scorecard(value),
        SchemaKind::Experience => validate_experience(value),
        SchemaKind::Summary => validate_summary(value),
    }
}

fn validate_scorecard(value: &Value) -> Result<(), String> {
    let criteria = value
        .get("criteria")
        .and_then(Value::as_array)
        .ok_or("scorecard payload missing 'criteria' array")?;

    if criteria.is_empty() {
        return Err("scorecard payload has an empty 'criteria' array".to_string());
    }

    for (index, entry) in criteria.iter().enumerate() {
        if entry.get("criterion_name").and_then(Value::as_str).is_none() {
            return Err(format!("criteria[{index}] missing 'criterion_name'"));
        }
        if entry.get("score").and_then(Value::as_f64).is_none() {
            return Err(format!("criteria[{index}] missing numeric 'score'"));
        }
        if entry.get("evidence").and_then(Value::as_str).is_none() {
            return Err(format!("criteria[{index}] missing 'evidence'"));
        }
    }

    Ok(())
}

const EXPERIENCE_SECTIONS: [&str; 5] = [
    "first_impression",
    "language_tone",
    "information_gaps",
    "trust_credibility",
    "business_impact",
];

fn validate_experience(value: &Value) -> Result<(), String> {
    let findings = value
        .get("findings")
        .and_then(Value::as_array)
        .ok_or("experience payload missing 'findings' array")?;

    for (index, finding) in findings.iter().enumerate() {
        let kind = finding
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("findings[{index}] missing 'type'"))?;
        if kind != "effective_copy" && kind != "ineffective_copy" {
            return Err(format!("findings[{index}] has unknown type '{kind}'"));
        }
        if finding.get("example_text").and_then(Value::as_str).is_none() {
            return Err(format!("findings[{index}] missing 'example_text'"));
        }
        if finding
            .get("strategic_analysis")
            .and_then(Value::as_str)
            .is_none()
        {
            return Err(format!("findings[{index}] missing 'strategic_analysis'"));
        }
    }

    let sections = value
        .get("sections")
        .and_then(Value::as_object)
        .ok_or("experience payload missing 'sections' object")?;
    for key in EXPERIENCE_SECTIONS {
        if !sections.get(key).map(Value::is_string).unwrap_or(false) {
            return Err(format!("experience sections missing '{key}'"));
        }
    }

    Ok(())
}

fn validate_summary(value: &Value) -> Result<(), String> {
    if value
        .get("executive_summary")
        .and_then(Value::as_str)
        .is_none()
    {
        return Err("summary payload missing 'executive_summary'".to_string());
    }
    for key in ["key_strengths", "key_weaknesses"] {
        let entries = value
            .get(key)
            .and_then(Value::as_array)
            .ok_or_else(|| format!("summary payload missing '{key}' array"))?;
        if entries.iter().any(|entry| !entry.is_string()) {
            return Err(format!("summary '{key}' must contain only strings"));
        }
    }
    Ok(())
}
