use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::config::AuditConfig;
use crate::experience::{self, ExperienceEngine, ExperienceReport};
use crate::fetcher::Fetcher;
use crate::llm::{Gateway, RetryPolicy, providers};
use crate::methodology::Methodology;
use crate::model::{RunCounts, RunManifest, RunPaths, RunStatus};
use crate::persona::{self, Persona};
use crate::postprocess::{self, EXPERIENCE_SUFFIX, SCORECARD_SUFFIX};
use crate::scorecard::{self, ArtifactStatus, Scorecard, ScorecardEngine};
use crate::summary::{StrategicSummarizer, render_report};
use crate::util::{
    ensure_directory, now_utc_string, parse_url_list, url_slug, utc_compact_string,
    write_json_pretty, write_text_file,
};

pub fn run(args: RunArgs) -> Result<i32> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: RunArgs) -> Result<i32> {
    let mut config = AuditConfig::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model_provider = model.as_str().to_string();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency.max(1);
    }
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = cache_dir.clone();
    }

    let methodology = apply_calculation_overrides(Methodology::load(&args.methodology)?, &config)?;
    let personas = load_personas(&args)?;
    let urls = load_urls(&args)?;

    info!(
        personas = personas.len(),
        urls = urls.len(),
        provider = %config.model_provider,
        concurrency = config.concurrency,
        "starting audit run"
    );

    let provider = providers::provider_for(
        &config.model_provider,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let gateway = Gateway::new(
        Arc::from(provider),
        RetryPolicy {
            max_attempts: config.gateway_max_attempts,
            backoff_base: Duration::from_millis(config.gateway_backoff_base_ms),
            jitter: Duration::from_millis(config.gateway_jitter_ms),
        },
    );
    let fetcher = Fetcher::new(
        &config.cache_dir,
        methodology.brand_messaging.taglines.clone(),
        Duration::from_secs(config.request_timeout_secs),
    );

    // Cooperative stop: queued URL tasks check the flag before starting;
    // in-flight network calls end at their timeout boundary.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("stop requested, cancelling queued URL tasks");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut worst = RunStatus::Success;
    for persona in &personas {
        let status = audit_persona(
            &methodology,
            &config,
            &gateway,
            &fetcher,
            persona,
            &urls,
            &args,
            &stop,
        )
        .await?;
        if severity(status) > severity(worst) {
            worst = status;
        }
    }

    info!(status = worst.as_str(), "audit run finished");
    Ok(worst.exit_code())
}

struct UrlOutcome {
    url: String,
    skipped: bool,
    write_failed: bool,
    scorecard: Option<Scorecard>,
    report: Option<ExperienceReport>,
}

impl UrlOutcome {
    fn skipped(url: &str) -> Self {
        Self {
            url: url.to_string(),
            skipped: true,
            write_failed: false,
            scorecard: None,
            report: None,
        }
    }

    fn degraded(&self) -> bool {
        self.write_failed
            || self
                .scorecard
                .as_ref()
                .map(|card| card.status != ArtifactStatus::Ok)
                .unwrap_or(true)
            || self
                .report
                .as_ref()
                .map(|report| report.status != ArtifactStatus::Ok)
                .unwrap_or(true)
    }
}

#[allow(clippy::too_many_arguments)]
async fn audit_persona(
    methodology: &Methodology,
    config: &AuditConfig,
    gateway: &Gateway,
    fetcher: &Fetcher,
    persona: &Persona,
    urls: &[String],
    args: &RunArgs,
    stop: &Arc<AtomicBool>,
) -> Result<RunStatus> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}-{}", persona.id(), utc_compact_string(started_ts));
    let persona_dir = config.output_dir.join(persona.id());
    ensure_directory(&persona_dir)?;

    info!(persona = %persona.name, run_id = %run_id, "auditing persona");

    let scorecard_engine = ScorecardEngine::new(methodology, config, gateway, fetcher);
    let experience_engine = ExperienceEngine::new(methodology, config, gateway, fetcher);
    let scale_max = methodology.scale().max;

    // Each URL is an independent task; both documents are written before
    // the URL counts as done. No ordering guarantees across URLs.
    let outcomes: Vec<UrlOutcome> = futures::stream::iter(urls.iter().map(|url| {
        let scorecard_engine = &scorecard_engine;
        let experience_engine = &experience_engine;
        let persona_dir = &persona_dir;
        let stop = Arc::clone(stop);
        async move {
            if stop.load(Ordering::SeqCst) {
                return UrlOutcome::skipped(url);
            }

            let card = scorecard_engine.score(url, persona).await;
            let report = experience_engine.narrate(url, persona).await;

            let slug = url_slug(url);
            let written = write_text_file(
                &persona_dir.join(format!("{slug}{SCORECARD_SUFFIX}")),
                &scorecard::render_document(&card, scale_max),
            )
            .and_then(|()| {
                write_text_file(
                    &persona_dir.join(format!("{slug}{EXPERIENCE_SUFFIX}")),
                    &experience::render_document(&report),
                )
            });

            let write_failed = match written {
                Ok(()) => false,
                Err(err) => {
                    error!(url, error = %err, "failed to persist artifacts");
                    true
                }
            };

            UrlOutcome {
                url: url.clone(),
                skipped: false,
                write_failed,
                scorecard: Some(card),
                report: Some(report),
            }
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    let scorecards: Vec<Scorecard> = outcomes
        .iter()
        .filter_map(|outcome| outcome.scorecard.clone())
        .collect();
    let reports: Vec<ExperienceReport> = outcomes
        .iter()
        .filter_map(|outcome| outcome.report.clone())
        .collect();

    // Summarizer and post-processor run strictly after the URL tasks.
    if !scorecards.is_empty() {
        let summarizer = StrategicSummarizer::new(methodology, persona, &scorecards, &reports);
        let narrative = summarizer.executive_narrative(gateway).await;
        let report = render_report(
            persona,
            summarizer.overall_weighted_score(),
            &summarizer.statistics(),
            &summarizer.critical_issues(),
            &summarizer.strengths(),
            &narrative,
            &now_utc_string(),
        );
        write_text_file(&persona_dir.join("Strategic_Summary.md"), &report)?;

        match postprocess::build_dataset(&persona_dir, methodology, config) {
            Ok(dataset) => postprocess::write_dataset(&dataset, &persona_dir)?,
            Err(err) => warn!(persona = %persona.name, error = %err, "post-processing failed"),
        }
    }

    let counts = build_counts(urls.len(), &outcomes, fetcher, gateway);
    let status = run_status(&counts, config);

    let manifest = RunManifest {
        manifest_version: RunManifest::VERSION,
        run_id: run_id.clone(),
        persona: persona.name.clone(),
        status,
        started_at,
        updated_at: now_utc_string(),
        model_provider: config.model_provider.clone(),
        paths: RunPaths {
            output_dir: config.output_dir.display().to_string(),
            cache_dir: config.cache_dir.display().to_string(),
            methodology_path: args.methodology.display().to_string(),
            persona_dir: persona_dir.display().to_string(),
        },
        counts,
        warnings: outcomes
            .iter()
            .filter(|outcome| outcome.skipped)
            .map(|outcome| format!("skipped after stop signal: {}", outcome.url))
            .collect(),
    };

    let manifest_path = config.output_dir.join("manifests").join(format!(
        "run_{}_{}.json",
        persona.id(),
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        persona = %persona.name,
        status = status.as_str(),
        path = %manifest_path.display(),
        "run manifest written"
    );

    Ok(status)
}

fn build_counts(
    urls_total: usize,
    outcomes: &[UrlOutcome],
    fetcher: &Fetcher,
    gateway: &Gateway,
) -> RunCounts {
    let (cache_hits, cache_misses) = fetcher.cache_stats();
    let mut counts = RunCounts {
        urls_total,
        fetch_cache_hits: cache_hits,
        fetch_cache_misses: cache_misses,
        gateway_retries: gateway.retry_count(),
        ..RunCounts::default()
    };

    for outcome in outcomes {
        if outcome.skipped {
            continue;
        }
        if !outcome.write_failed {
            counts.urls_completed += 1;
            counts.scorecards_written += 1;
            counts.experience_reports_written += 1;
        }
        if outcome.degraded() {
            counts.urls_degraded += 1;
        }
        if let Some(card) = &outcome.scorecard {
            if card.status == ArtifactStatus::Degraded {
                counts.pages_not_found += 1;
            }
            counts.gating_rules_applied += card.gating_rules_applied.len();
            counts.quality_penalties_applied += card.quality_penalties_applied.len();
        }
    }

    counts
}

/// End-of-run status from the degraded-artifact ratio. Skipped URLs make a
/// run partial at best; a run that produced nothing is a failure.
fn run_status(counts: &RunCounts, config: &AuditConfig) -> RunStatus {
    if counts.urls_total == 0 || counts.urls_completed == 0 {
        return RunStatus::Failure;
    }

    let attempted = counts.urls_completed.max(1);
    let ratio = counts.urls_degraded as f64 / attempted as f64;
    if ratio > config.max_degraded_ratio {
        return RunStatus::Failure;
    }

    let skipped = counts.urls_total - counts.urls_completed;
    if counts.urls_degraded > 0 || skipped > 0 {
        RunStatus::Partial
    } else {
        RunStatus::Success
    }
}

/// Configuration may override the methodology's calculation weights and
/// crisis multipliers; the combined document must still validate.
fn apply_calculation_overrides(
    mut methodology: Methodology,
    config: &AuditConfig,
) -> Result<Methodology> {
    if let Some(weight) = config.onsite_weight {
        methodology.calculation.onsite_weight = weight;
    }
    if let Some(weight) = config.offsite_weight {
        methodology.calculation.offsite_weight = weight;
    }
    if !config.crisis_multipliers.is_empty() {
        methodology.calculation.crisis_multipliers = config.crisis_multipliers.clone();
    }
    methodology.validate()?;
    Ok(methodology)
}

fn severity(status: RunStatus) -> u8 {
    match status {
        RunStatus::Success => 0,
        RunStatus::Partial => 1,
        RunStatus::Failure => 2,
    }
}

fn load_personas(args: &RunArgs) -> Result<Vec<Persona>> {
    if args.all_personas {
        let entries = fs::read_dir(&args.personas_dir)
            .with_context(|| format!("failed to read {}", args.personas_dir.display()))?;

        let mut personas = Vec::new();
        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            personas.push(load_persona_file(&path)?);
        }

        if personas.is_empty() {
            bail!(
                "--all-personas found no persona briefs in {}",
                args.personas_dir.display()
            );
        }
        Ok(personas)
    } else {
        let path = args
            .persona
            .as_ref()
            .context("either --persona <file> or --all-personas is required")?;
        Ok(vec![load_persona_file(path)?])
    }
}

fn load_persona_file(path: &Path) -> Result<Persona> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read persona brief: {}", path.display()))?;
    let parsed = persona::parse(&raw);
    info!(persona = %parsed.name, path = %path.display(), "loaded persona brief");
    Ok(parsed)
}

fn load_urls(args: &RunArgs) -> Result<Vec<String>> {
    let mut urls = Vec::new();

    if let Some(path) = &args.urls {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read URL list: {}", path.display()))?;
        urls.extend(parse_url_list(&raw));
    }
    if let Some(url) = &args.url {
        let trimmed = url.trim().to_string();
        if !urls.contains(&trimmed) {
            urls.push(trimmed);
        }
    }

    if urls.is_empty() {
        bail!("no URLs to audit: pass --urls <file> or --url <u>");
    }
    Ok(urls)
}
