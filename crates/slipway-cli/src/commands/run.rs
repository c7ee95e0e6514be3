use std::path::Path;
use std::time::Duration;

use slipway_core::{RegistryCredentials, SlipwayConfig, git};
use slipway_docker::DockerClient;
use slipway_pipeline::smoke::HttpProbe;
use slipway_pipeline::trigger::{self, TriggerDecision};
use slipway_pipeline::{Pipeline, RunContext};

/// Execute the full pipeline for the given checkout.
pub async fn run(context: &Path, allow_dirty: bool) -> anyhow::Result<()> {
    let config = SlipwayConfig::load_with_env(context)?;

    // Trigger gate: pushes to other branches do not start the pipeline.
    let branch = git::current_branch(context)?;
    tracing::debug!(%branch, "resolved checkout branch");
    if let TriggerDecision::Skip { branch } = trigger::evaluate(&branch, &config.pipeline.branch) {
        println!(
            "Skipping: branch {branch:?} does not trigger the pipeline (configured: {:?})",
            config.pipeline.branch
        );
        return Ok(());
    }

    // The tag embeds the commit hash, so refuse uncommitted changes unless
    // --allow-dirty: a dirty tree would publish bits the tag does not name.
    if !allow_dirty && git::is_dirty(context)? {
        anyhow::bail!(
            "uncommitted changes detected.\n\
             Commit your changes, or use `slipway run --allow-dirty` to run anyway."
        );
    }

    let credentials = RegistryCredentials::from_env()?;
    let ctx = RunContext {
        project_dir: context.to_path_buf(),
        short_hash: git::short_head(context)?,
    };

    let probe = HttpProbe::new(Duration::from_millis(config.smoke.request_timeout_ms))?;
    let pipeline = Pipeline::new(DockerClient::new(), probe, config, credentials);

    println!("Running pipeline for {}...", ctx.short_hash);
    let report = match pipeline.run(&ctx).await {
        Ok(report) => report,
        Err(e) => return Err(super::report_failure(e)),
    };

    for step in &report.steps {
        println!("  {step}");
    }
    println!();
    println!("Published: {}", report.image);

    Ok(())
}
