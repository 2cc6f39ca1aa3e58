use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::AuditConfig;
use crate::fetcher::{Fetcher, PageCache, PageData};
use crate::llm::testing::ScriptedProvider;
use crate::llm::{Gateway, RetryPolicy};
use crate::methodology::Methodology;
use crate::methodology::testing::sample_methodology;
use crate::persona::{self, Persona};
use crate::scorecard::ArtifactStatus;

use super::*;

const PAGE_URL: &str = "https://acme.example/about-us";
const PAGE_HTML: &str = "<html><body><h1>About Acme</h1>\
<p>Engineering a better tomorrow across three continents.</p></body></html>";

const EXPERIENCE_PAYLOAD: &str = r#"{
  "findings": [
    {"type": "effective_copy",
     "example_text": "Engineering a better tomorrow",
     "strategic_analysis": "The tagline lands immediately and matches the approved messaging."},
    {"type": "ineffective_copy",
     "example_text": "across three continents",
     "strategic_analysis": "Geography without project names reads as filler to a technical buyer."}
  ],
  "sections": {
    "first_impression": "Confident corporate story, light on proof.",
    "language_tone": "Polished but generic in places.",
    "information_gaps": "No delivery references or certifications.",
    "trust_credibility": "Tagline consistency helps; missing evidence hurts.",
    "business_impact": "A skeptical director will keep searching for proof."
  }
}"#;

struct Harness {
    _dir: TempDir,
    cache_dir: PathBuf,
    methodology: Methodology,
    config: AuditConfig,
    fetcher: Fetcher,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().to_path_buf();
        let methodology = sample_methodology();
        let fetcher = Fetcher::new(
            &cache_dir,
            methodology.brand_messaging.taglines.clone(),
            Duration::from_secs(5),
        );
        Self {
            _dir: dir,
            cache_dir,
            methodology,
            config: AuditConfig::default(),
            fetcher,
        }
    }

    fn seed_page(&self, url: &str, html: &str) {
        let page = self.fetcher.page_from_html(url, html);
        PageCache::new(&self.cache_dir).store(url, &page).unwrap();
    }

    fn gateway(&self, provider: ScriptedProvider) -> Gateway {
        Gateway::new(
            Arc::new(provider),
            RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(1),
                jitter: Duration::ZERO,
            },
        )
    }
}

fn test_persona() -> Persona {
    persona::parse("Persona Brief: Sarah the Infrastructure Director\nRole: IT Director\n")
}

#[tokio::test]
async fn narrate_builds_typed_report() {
    let harness = Harness::new();
    harness.seed_page(PAGE_URL, PAGE_HTML);
    let gateway = harness.gateway(ScriptedProvider::replying(EXPERIENCE_PAYLOAD));
    let engine =
        ExperienceEngine::new(&harness.methodology, &harness.config, &gateway, &harness.fetcher);

    let report = engine.narrate(PAGE_URL, &test_persona()).await;

    assert_eq!(report.status, ArtifactStatus::Ok);
    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.findings[0].kind, FindingKind::EffectiveCopy);
    assert_eq!(report.findings[1].kind, FindingKind::IneffectiveCopy);
    assert_eq!(
        report.sections.first_impression,
        "Confident corporate story, light on proof."
    );
}

#[tokio::test]
async fn terminal_gateway_failure_yields_marker_sections_and_no_findings() {
    let harness = Harness::new();
    harness.seed_page(PAGE_URL, PAGE_HTML);
    let gateway = harness.gateway(ScriptedProvider::always_terminal());
    let engine =
        ExperienceEngine::new(&harness.methodology, &harness.config, &gateway, &harness.fetcher);

    let report = engine.narrate(PAGE_URL, &test_persona()).await;

    assert_eq!(report.status, ArtifactStatus::Error);
    assert!(report.findings.is_empty());
    assert_eq!(report.sections.first_impression, GATEWAY_ERROR_MARKER);
    assert_eq!(report.sections.business_impact, GATEWAY_ERROR_MARKER);
}

#[tokio::test]
async fn missing_page_yields_not_found_marker() {
    let url = "https://acme.example/gone";
    let harness = Harness::new();
    PageCache::new(&harness.cache_dir)
        .store(url, &PageData::not_found(url))
        .unwrap();
    let gateway = harness.gateway(ScriptedProvider::replying("unused"));
    let engine =
        ExperienceEngine::new(&harness.methodology, &harness.config, &gateway, &harness.fetcher);

    let report = engine.narrate(url, &test_persona()).await;

    assert_eq!(report.status, ArtifactStatus::Degraded);
    assert!(report.findings.is_empty());
    assert_eq!(report.sections.trust_credibility, NOT_FOUND_MARKER);
}

#[tokio::test]
async fn rendered_document_round_trips_findings_and_sections() {
    let harness = Harness::new();
    harness.seed_page(PAGE_URL, PAGE_HTML);
    let gateway = harness.gateway(ScriptedProvider::replying(EXPERIENCE_PAYLOAD));
    let engine =
        ExperienceEngine::new(&harness.methodology, &harness.config, &gateway, &harness.fetcher);

    let report = engine.narrate(PAGE_URL, &test_persona()).await;
    let document = render_document(&report);
    let parsed = parse_document(&document).unwrap();

    assert_eq!(parsed.url, report.url);
    assert_eq!(parsed.persona, report.persona);
    assert_eq!(parsed.status, "ok");
    assert_eq!(parsed.findings.len(), report.findings.len());
    for (parsed_finding, original) in parsed.findings.iter().zip(&report.findings) {
        assert_eq!(parsed_finding.kind, original.kind);
        assert_eq!(parsed_finding.example_text, original.example_text);
        assert_eq!(parsed_finding.strategic_analysis, original.strategic_analysis);
    }
    assert_eq!(parsed.sections.language_tone, report.sections.language_tone);
    assert_eq!(parsed.sections.business_impact, report.sections.business_impact);
}

#[test]
fn parser_joins_multi_line_sections_and_ignores_prose() {
    let document = "\
# Persona Experience Report

URL: https://acme.example/about-us
Persona: Sarah
Audited: 2026-08-05T00:00:00Z
Status: ok

| Finding | Example from Text | Strategic Analysis |
|---|---|---|
| Effective Copy | a quote | it works |

First Impression: Strong open
that continues on a second line.

Language & Tone: Fine.

Gaps in Information: None noted.

Trust and Credibility: Adequate.

Business Impact & Next Steps: Ship it.
";
    let parsed = parse_document(document).unwrap();
    assert_eq!(
        parsed.sections.first_impression,
        "Strong open that continues on a second line."
    );
    assert_eq!(parsed.findings.len(), 1);
    assert_eq!(parsed.findings[0].kind, FindingKind::EffectiveCopy);
}

#[test]
fn parser_requires_url_header() {
    assert!(parse_document("Persona: X\nAudited: t\n").is_err());
}
