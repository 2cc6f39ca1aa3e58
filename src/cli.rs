use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "brandaudit",
    version,
    about = "Persona-driven digital brand presence auditing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit URLs for one persona (or every persona brief in a directory).
    Run(RunArgs),
    /// Rebuild a persona's normalized tables from its persisted artifacts.
    Postprocess(PostprocessArgs),
    /// Merge every persona's tables into the unified dataset.
    Unify(UnifyArgs),
    /// Report run manifests and artifact counts.
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModelProvider {
    Openai,
    Anthropic,
}

impl ModelProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Newline-delimited URL list; lines starting with '#' are comments.
    #[arg(long)]
    pub urls: Option<PathBuf>,

    /// Audit a single URL instead of a list file.
    #[arg(long)]
    pub url: Option<String>,

    /// Persona brief to audit as.
    #[arg(long)]
    pub persona: Option<PathBuf>,

    /// Audit every persona brief found in the personas directory.
    #[arg(long, default_value_t = false)]
    pub all_personas: bool,

    /// Directory of persona briefs used with --all-personas.
    #[arg(long, default_value = "personas")]
    pub personas_dir: PathBuf,

    #[arg(long, default_value = "methodology.yaml")]
    pub methodology: PathBuf,

    /// Run configuration file (YAML); flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub model: Option<ModelProvider>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PostprocessArgs {
    /// Persona name or directory slug under the output directory.
    pub persona: String,

    #[arg(long, default_value = "methodology.yaml")]
    pub methodology: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UnifyArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}
