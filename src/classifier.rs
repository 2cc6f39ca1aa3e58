use serde::{Deserialize, Serialize};

use crate::methodology::Methodology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Onsite,
    Offsite,
}

/// Result of classifying a URL against the methodology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: PageKind,
    /// Tier name (onsite) or channel name (offsite).
    pub unit_name: String,
    /// True when no trigger matched and a heuristic fallback was used.
    pub fallback: bool,
}

/// Map a URL to its tier or channel. Deterministic and total: triggers are
/// evaluated in methodology order, the first match wins, and every URL that
/// matches nothing falls back by heuristic.
pub fn classify(url: &str, methodology: &Methodology) -> Classification {
    let kind = if is_onsite(url, &methodology.onsite_domains) {
        PageKind::Onsite
    } else {
        PageKind::Offsite
    };

    let triggers = methodology.classification_triggers();
    let candidates = match kind {
        PageKind::Onsite => &triggers.onsite,
        PageKind::Offsite => &triggers.offsite,
    };

    for (unit_name, rules) in candidates {
        if rules.iter().any(|rule| rule.matches(url)) {
            return Classification {
                kind,
                unit_name: unit_name.clone(),
                fallback: false,
            };
        }
    }

    let unit_name = match kind {
        PageKind::Onsite => onsite_fallback(url, methodology),
        PageKind::Offsite => offsite_fallback(methodology),
    };

    Classification {
        kind,
        unit_name,
        fallback: true,
    }
}

fn is_onsite(url: &str, onsite_domains: &[String]) -> bool {
    let host = host_of(url);
    onsite_domains.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

fn host_of(url: &str) -> String {
    let without_scheme = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split('@')
        .next_back()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

const TIER_3_KEYWORDS: [&str; 5] = ["blog", "news", "press", "case", "white"];
const TIER_2_KEYWORDS: [&str; 4] = ["service", "solution", "industry", "what-we-do"];

/// Untriggered onsite URLs route by path keyword: editorial content to the
/// third tier, offer pages to the second, everything else to the first.
fn onsite_fallback(url: &str, methodology: &Methodology) -> String {
    let url_lower = url.to_ascii_lowercase();

    let tier_index = if TIER_3_KEYWORDS.iter().any(|kw| url_lower.contains(kw)) {
        2
    } else if TIER_2_KEYWORDS.iter().any(|kw| url_lower.contains(kw)) {
        1
    } else {
        0
    };

    methodology
        .onsite_tiers
        .get(tier_index)
        .or_else(|| methodology.onsite_tiers.first())
        .map(|tier| tier.name.clone())
        .unwrap_or_else(|| "tier_1".to_string())
}

/// Untriggered offsite URLs are third-party mentions: they land on the
/// `independent` channel when one is declared, else the first channel.
fn offsite_fallback(methodology: &Methodology) -> String {
    if methodology.channel("independent").is_some() {
        return "independent".to_string();
    }
    methodology
        .offsite_channels
        .first()
        .map(|channel| channel.name.clone())
        .unwrap_or_else(|| "independent".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methodology::testing::sample_methodology;

    #[test]
    fn trigger_match_classifies_services_page() {
        let methodology = sample_methodology();
        let result = classify("https://acme.example/services/cloud", &methodology);
        assert_eq!(result.kind, PageKind::Onsite);
        assert_eq!(result.unit_name, "tier_2");
        assert!(!result.fallback);
    }

    #[test]
    fn blog_url_falls_back_to_tier_3() {
        let methodology = sample_methodology();
        let result = classify("https://acme.example/blog/post-1", &methodology);
        assert_eq!(result.kind, PageKind::Onsite);
        assert_eq!(result.unit_name, "tier_3");
        assert!(result.fallback);
    }

    #[test]
    fn solution_url_falls_back_to_tier_2() {
        let methodology = sample_methodology();
        let result = classify("https://acme.example/solutions-overview", &methodology);
        assert_eq!(result.unit_name, "tier_2");
        assert!(result.fallback);
    }

    #[test]
    fn unmatched_onsite_url_falls_back_to_tier_1() {
        let methodology = sample_methodology();
        let result = classify("https://acme.example/contact", &methodology);
        assert_eq!(result.unit_name, "tier_1");
        assert!(result.fallback);
    }

    #[test]
    fn unmatched_offsite_url_falls_back_to_independent() {
        let methodology = sample_methodology();
        let result = classify("https://external.example/mentions/acme", &methodology);
        assert_eq!(result.kind, PageKind::Offsite);
        assert_eq!(result.unit_name, "independent");
        assert!(result.fallback);
    }

    #[test]
    fn offsite_trigger_match_wins_over_fallback() {
        let methodology = sample_methodology();
        let result = classify("https://www.linkedin.com/company/acme", &methodology);
        assert_eq!(result.kind, PageKind::Offsite);
        assert_eq!(result.unit_name, "owned");
        assert!(!result.fallback);
    }

    #[test]
    fn subdomains_of_onsite_domains_stay_onsite() {
        let methodology = sample_methodology();
        let result = classify("https://careers.acme.example/jobs", &methodology);
        assert_eq!(result.kind, PageKind::Onsite);
    }

    #[test]
    fn first_matching_trigger_wins_ties() {
        let methodology = sample_methodology();
        // Matches both tier_1 "about-us" and nothing else; declaration order
        // keeps it on tier_1 even though the keyword also appears later.
        let result = classify("https://acme.example/about-us/services-history", &methodology);
        assert_eq!(result.unit_name, "tier_1");
    }

    #[test]
    fn classification_is_deterministic() {
        let methodology = sample_methodology();
        let url = "https://acme.example/resources/whitepaper";
        let first = classify(url, &methodology);
        let second = classify(url, &methodology);
        assert_eq!(first, second);
    }
}
