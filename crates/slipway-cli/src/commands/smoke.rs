use std::path::Path;
use std::time::Duration;

use slipway_core::{RegistryCredentials, SlipwayConfig, git};
use slipway_docker::DockerClient;
use slipway_pipeline::smoke::HttpProbe;
use slipway_pipeline::{Pipeline, RunContext};

/// Build for the test platform and smoke-test the result. Never publishes.
pub async fn smoke(context: &Path) -> anyhow::Result<()> {
    let config = SlipwayConfig::load_with_env(context)?;
    let credentials = RegistryCredentials::from_env()?;
    let ctx = RunContext {
        project_dir: context.to_path_buf(),
        short_hash: git::short_head(context)?,
    };

    let probe = HttpProbe::new(Duration::from_millis(config.smoke.request_timeout_ms))?;
    let pipeline = Pipeline::new(DockerClient::new(), probe, config, credentials);

    let report = match pipeline.smoke_only(&ctx).await {
        Ok(report) => report,
        Err(e) => return Err(super::report_failure(e)),
    };

    for step in &report.steps {
        println!("  {step}");
    }
    println!();
    println!("Smoke test passed: {}", report.image);

    Ok(())
}
