use anyhow::Result;
use tracing::info;

use crate::cli::UnifyArgs;
use crate::config::AuditConfig;
use crate::unify::run_unify;

pub fn run(args: UnifyArgs) -> Result<i32> {
    let mut config = AuditConfig::load(args.config.as_deref())?;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    let stats = run_unify(&config.output_dir, &config)?;

    info!(
        rows = stats.row_count,
        personas = stats.persona_count,
        pages = stats.page_count,
        "unification completed"
    );

    Ok(0)
}
