use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::PostprocessArgs;
use crate::config::AuditConfig;
use crate::methodology::Methodology;
use crate::postprocess::{build_dataset, write_dataset};
use crate::util::persona_slug;

pub fn run(args: PostprocessArgs) -> Result<i32> {
    let mut config = AuditConfig::load(args.config.as_deref())?;
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    let methodology = Methodology::load(&args.methodology)?;

    // Accept the persona's display name or its directory slug.
    let persona_dir = config.output_dir.join(persona_slug(&args.persona));
    if !persona_dir.is_dir() {
        bail!(
            "no artifacts for persona '{}' under {}",
            args.persona,
            config.output_dir.display()
        );
    }

    let dataset = build_dataset(&persona_dir, &methodology, &config)?;
    for diagnostic in &dataset.diagnostics {
        warn!(diagnostic, "post-processing diagnostic");
    }
    write_dataset(&dataset, &persona_dir)?;

    info!(
        persona = %args.persona,
        pages = dataset.pages.len(),
        criteria = dataset.criteria_scores.len(),
        recommendations = dataset.recommendations.len(),
        "post-processing completed"
    );

    Ok(0)
}
