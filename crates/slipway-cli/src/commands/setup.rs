use std::path::PathBuf;

use slipway_core::SlipwayConfig;
use slipway_docker::DockerClient;

/// Prepare the build host: QEMU emulation handlers for the publish
/// architectures and a multi-platform buildx builder.
pub async fn setup() -> anyhow::Result<()> {
    let config = SlipwayConfig::load_with_env(&PathBuf::from("."))?;
    let client = DockerClient::new();

    println!("Installing emulation handlers...");
    client.install_emulation(&config.platforms.publish).await?;

    println!("Preparing buildx builder {:?}...", super::BUILDER_NAME);
    client.ensure_builder(super::BUILDER_NAME).await?;

    println!();
    println!("Build host ready.");

    Ok(())
}
