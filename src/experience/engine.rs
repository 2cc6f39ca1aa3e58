use tracing::warn;

use crate::config::AuditConfig;
use crate::fetcher::Fetcher;
use crate::llm::{Contract, Gateway, LlmRequest, NARRATIVE_TEMPERATURE, SchemaKind};
use crate::methodology::Methodology;
use crate::persona::Persona;
use crate::prompts;
use crate::scorecard::ArtifactStatus;
use crate::util::{now_utc_string, url_slug};

use super::{
    ExperiencePayload, ExperienceReport, ExperienceSections, Finding, FindingKind,
    GATEWAY_ERROR_MARKER, NOT_FOUND_MARKER,
};

const EXPERIENCE_MAX_TOKENS: u32 = 2_000;

pub struct ExperienceEngine<'a> {
    methodology: &'a Methodology,
    config: &'a AuditConfig,
    gateway: &'a Gateway,
    fetcher: &'a Fetcher,
}

impl<'a> ExperienceEngine<'a> {
    pub fn new(
        methodology: &'a Methodology,
        config: &'a AuditConfig,
        gateway: &'a Gateway,
        fetcher: &'a Fetcher,
    ) -> Self {
        Self {
            methodology,
            config,
            gateway,
            fetcher,
        }
    }

    /// Produce the qualitative experience report for one URL. Never fails:
    /// fetch and gateway problems yield marker sections instead.
    pub async fn narrate(&self, url: &str, persona: &Persona) -> ExperienceReport {
        let audited_at = now_utc_string();
        let page = self.fetcher.fetch(url).await;

        if page.is_404 {
            return self.marker_report(
                url,
                persona,
                &audited_at,
                ArtifactStatus::Degraded,
                NOT_FOUND_MARKER,
            );
        }

        let request = LlmRequest {
            system: prompts::EXPERIENCE_SYSTEM.to_string(),
            user: prompts::experience_user_prompt(
                url,
                persona,
                self.methodology,
                &page.raw_text,
                self.config.content_truncation_experience,
                &audited_at,
            ),
            model_hint: None,
            max_tokens: EXPERIENCE_MAX_TOKENS,
            temperature: NARRATIVE_TEMPERATURE,
            contract: Contract::StrictJson {
                schema: SchemaKind::Experience,
            },
        };

        let payload = match self.gateway.complete(&request).await {
            Ok(completion) => {
                let value = completion.as_json().cloned().unwrap_or_default();
                match serde_json::from_value::<ExperiencePayload>(value) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(url, error = %err, "experience payload deserialization failed");
                        return self.marker_report(
                            url,
                            persona,
                            &audited_at,
                            ArtifactStatus::Error,
                            GATEWAY_ERROR_MARKER,
                        );
                    }
                }
            }
            Err(err) => {
                warn!(url, error = %err, "gateway failed terminally for experience report");
                return self.marker_report(
                    url,
                    persona,
                    &audited_at,
                    ArtifactStatus::Error,
                    GATEWAY_ERROR_MARKER,
                );
            }
        };

        let findings = payload
            .findings
            .into_iter()
            .filter_map(|finding| {
                let kind = match finding.kind.as_str() {
                    "effective_copy" => FindingKind::EffectiveCopy,
                    "ineffective_copy" => FindingKind::IneffectiveCopy,
                    other => {
                        warn!(url, kind = other, "dropping finding with unknown type");
                        return None;
                    }
                };
                Some(Finding {
                    kind,
                    example_text: finding.example_text.trim().to_string(),
                    strategic_analysis: finding.strategic_analysis.trim().to_string(),
                })
            })
            .collect();

        ExperienceReport {
            url: url.to_string(),
            url_slug: url_slug(url),
            persona: persona.name.clone(),
            audited_at,
            status: ArtifactStatus::Ok,
            findings,
            sections: ExperienceSections {
                first_impression: payload.sections.first_impression,
                language_tone: payload.sections.language_tone,
                information_gaps: payload.sections.information_gaps,
                trust_credibility: payload.sections.trust_credibility,
                business_impact: payload.sections.business_impact,
            },
        }
    }

    fn marker_report(
        &self,
        url: &str,
        persona: &Persona,
        audited_at: &str,
        status: ArtifactStatus,
        marker: &str,
    ) -> ExperienceReport {
        ExperienceReport {
            url: url.to_string(),
            url_slug: url_slug(url),
            persona: persona.name.clone(),
            audited_at: audited_at.to_string(),
            status,
            findings: Vec::new(),
            sections: ExperienceSections::error(marker),
        }
    }
}
