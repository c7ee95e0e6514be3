use std::path::Path;

use slipway_core::SlipwayConfig;
use slipway_docker::{CheckResult, DockerClient};

pub async fn doctor() -> anyhow::Result<()> {
    let config = SlipwayConfig::load_with_env(Path::new("."));
    let publish_platforms = config
        .map(|c| c.platforms.publish)
        .unwrap_or_else(|_| slipway_core::PlatformConfig::default().publish);

    let client = DockerClient::new();
    let mut report = client.doctor(&publish_platforms).await;

    // Config file check; absence is fine, the defaults and env vars cover it
    if Path::new("slipway.toml").exists() {
        report.config_file = CheckResult::ok("Found");
    } else {
        report.config_file = CheckResult::ok("Not found (defaults in effect)");
    }

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}
