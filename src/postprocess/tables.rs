use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::util::{ensure_directory, write_json_pretty};

use super::PersonaDataset;

const TABLE_NAMES: [&str; 4] = ["pages", "criteria_scores", "recommendations", "experience"];

/// Persist the four normalized tables as both columnar (JSON) and tabular
/// (CSV) serializations under `<persona_dir>/tables/`.
pub fn write_dataset(dataset: &PersonaDataset, persona_dir: &Path) -> Result<()> {
    let tables_dir = persona_dir.join("tables");
    ensure_directory(&tables_dir)?;

    write_table(&tables_dir, "pages", &dataset.pages)?;
    write_table(&tables_dir, "criteria_scores", &dataset.criteria_scores)?;
    write_table(&tables_dir, "recommendations", &dataset.recommendations)?;
    write_table(&tables_dir, "experience", &dataset.experience)?;

    if !dataset.diagnostics.is_empty() {
        write_json_pretty(&tables_dir.join("diagnostics.json"), &dataset.diagnostics)?;
    }

    info!(dir = %tables_dir.display(), "normalized tables written");
    Ok(())
}

fn write_table<T: Serialize>(tables_dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    write_json_pretty(&tables_dir.join(format!("{name}.json")), &rows)?;

    let csv_path = tables_dir.join(format!("{name}.csv"));
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("failed to create {}", csv_path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to serialize row into {}", csv_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", csv_path.display()))?;

    Ok(())
}

/// Load a persona's tables back from their JSON serialization.
pub fn load_dataset(persona_dir: &Path) -> Result<PersonaDataset> {
    let tables_dir = persona_dir.join("tables");
    for name in TABLE_NAMES {
        let path = tables_dir.join(format!("{name}.json"));
        if !path.exists() {
            anyhow::bail!("missing normalized table: {}", path.display());
        }
    }

    Ok(PersonaDataset {
        pages: load_table(&tables_dir, "pages")?,
        criteria_scores: load_table(&tables_dir, "criteria_scores")?,
        recommendations: load_table(&tables_dir, "recommendations")?,
        experience: load_table(&tables_dir, "experience")?,
        diagnostics: Vec::new(),
    })
}

fn load_table<T: DeserializeOwned>(tables_dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = tables_dir.join(format!("{name}.json"));
    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
