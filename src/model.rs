use serde::{Deserialize, Serialize};

/// Outcome of an audit run, derived from the degraded-artifact ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Partial,
    Failure,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failure => "failure",
        }
    }

    /// CLI exit code contract: 0 success, 2 runtime failure, 3 partial.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Partial => 3,
            Self::Failure => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPaths {
    pub output_dir: String,
    pub cache_dir: String,
    pub methodology_path: String,
    pub persona_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounts {
    pub urls_total: usize,
    pub urls_completed: usize,
    pub urls_degraded: usize,
    pub pages_not_found: usize,
    pub scorecards_written: usize,
    pub experience_reports_written: usize,
    pub gating_rules_applied: usize,
    pub quality_penalties_applied: usize,
    pub fetch_cache_hits: usize,
    pub fetch_cache_misses: usize,
    pub gateway_retries: usize,
}

/// Per-persona audit run manifest, persisted under `<output>/manifests/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub persona: String,
    pub status: RunStatus,
    pub started_at: String,
    pub updated_at: String,
    pub model_provider: String,
    pub paths: RunPaths,
    pub counts: RunCounts,
    pub warnings: Vec<String>,
}

impl RunManifest {
    pub const VERSION: u32 = 1;
}
