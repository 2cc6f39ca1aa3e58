use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::config::AuditConfig;
use crate::model::RunManifest;
use crate::postprocess::SCORECARD_SUFFIX;

pub fn run(args: StatusArgs) -> Result<i32> {
    let mut config = AuditConfig::load(args.config.as_deref())?;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    info!(output_dir = %config.output_dir.display(), "status requested");

    report_latest_manifest(&config.output_dir.join("manifests"));
    report_persona_directories(&config.output_dir)?;
    report_unified(&config.output_dir.join("unified"));

    Ok(0)
}

fn report_latest_manifest(manifest_dir: &Path) {
    let Ok(entries) = fs::read_dir(manifest_dir) else {
        warn!(path = %manifest_dir.display(), "no run manifests found");
        return;
    };

    let mut manifest_paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false)
        })
        .collect();
    manifest_paths.sort();

    let Some(latest) = manifest_paths.last() else {
        warn!(path = %manifest_dir.display(), "no run manifests found");
        return;
    };

    match read_manifest(latest) {
        Ok(manifest) => info!(
            run_id = %manifest.run_id,
            persona = %manifest.persona,
            status = manifest.status.as_str(),
            started_at = %manifest.started_at,
            urls_total = manifest.counts.urls_total,
            urls_completed = manifest.counts.urls_completed,
            urls_degraded = manifest.counts.urls_degraded,
            gateway_retries = manifest.counts.gateway_retries,
            warnings = manifest.warnings.len(),
            "latest run manifest"
        ),
        Err(err) => warn!(path = %latest.display(), error = %err, "unreadable run manifest"),
    }
}

fn read_manifest(path: &Path) -> Result<RunManifest> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn report_persona_directories(output_dir: &Path) -> Result<()> {
    let Ok(entries) = fs::read_dir(output_dir) else {
        warn!(path = %output_dir.display(), "output directory missing");
        return Ok(());
    };

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", output_dir.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name == "manifests" || name == "unified" {
            continue;
        }

        let scorecards = count_matching(&path, SCORECARD_SUFFIX);
        let has_summary = path.join("Strategic_Summary.md").exists();
        let has_tables = path.join("tables").join("pages.json").exists();

        info!(
            persona_dir = %name,
            scorecards,
            strategic_summary = has_summary,
            tables = has_tables,
            "persona artifacts"
        );
    }

    Ok(())
}

fn count_matching(dir: &Path, suffix: &str) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .ends_with(suffix)
                })
                .count()
        })
        .unwrap_or(0)
}

fn report_unified(unified_dir: &Path) {
    let dataset = unified_dir.join("unified_dataset.json");
    if dataset.exists() {
        info!(path = %dataset.display(), "unified dataset present");
    } else {
        warn!(path = %dataset.display(), "unified dataset missing");
    }
}
