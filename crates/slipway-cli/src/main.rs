mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "slipway", about = "Build, smoke-test, and publish multi-arch Docker images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the build host: emulation handlers and a buildx builder
    Setup,
    /// Print the build tag derived from the current checkout
    Tag,
    /// Build for the test platform and smoke-test the result
    Smoke {
        /// Build context directory
        #[arg(long, default_value = ".")]
        context: PathBuf,
    },
    /// Run the full pipeline: build, smoke-test, publish on success
    Run {
        /// Build context directory
        #[arg(long, default_value = ".")]
        context: PathBuf,
        /// Allow running with uncommitted changes
        #[arg(long)]
        allow_dirty: bool,
    },
    /// Check docker, buildx, and emulation readiness
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Setup => commands::setup().await?,
        Commands::Tag => commands::tag().await?,
        Commands::Smoke { context } => commands::smoke(&context).await?,
        Commands::Run {
            context,
            allow_dirty,
        } => commands::run(&context, allow_dirty).await?,
        Commands::Doctor => commands::doctor().await?,
    }

    Ok(())
}
