use std::path::PathBuf;

use slipway_core::{BuildTag, ImageRef, RegistryCredentials, SlipwayConfig};
use slipway_docker::client::{BuildError, ContainerError, RegistryError};
use slipway_docker::{DockerCli, DockerClient};

use crate::smoke::{HealthProbe, SmokeOutcome, wait_for_ready};

/// Run-level lifecycle. Terminal states are `Done` and `Failed`; every stage
/// failure halts the run, there are no retries at any transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    CheckedOut,
    BuiltTest,
    Testing,
    TestOk,
    TestFail,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Identity of the checkout a run operates on, resolved by the caller and
/// passed in by value.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub project_dir: PathBuf,
    pub short_hash: String,
}

/// Result of a pipeline run that reached a non-failed terminal stage.
#[derive(Debug)]
pub struct RunReport {
    pub image: ImageRef,
    pub state: RunState,
    pub steps: Vec<String>,
    pub published: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("setup failed: {reason}")]
    Setup { reason: String },

    #[error("test build failed")]
    Build { source: BuildError },

    #[error("smoke test could not manage the container")]
    Container { source: ContainerError },

    #[error("smoke test failed: {reason}")]
    Smoke {
        reason: String,
        container_logs: Option<String>,
    },

    #[error("registry login failed")]
    Login { source: RegistryError },

    #[error("publish failed")]
    Publish { source: BuildError },

    #[error("registry logout failed")]
    Logout { source: RegistryError },
}

/// The pipeline: versioned test build, smoke test, and a publish stage gated
/// on the smoke outcome.
pub struct Pipeline<C: DockerCli, P: HealthProbe> {
    client: DockerClient<C>,
    probe: P,
    config: SlipwayConfig,
    credentials: RegistryCredentials,
}

impl<C: DockerCli, P: HealthProbe> Pipeline<C, P> {
    pub fn new(
        client: DockerClient<C>,
        probe: P,
        config: SlipwayConfig,
        credentials: RegistryCredentials,
    ) -> Self {
        Self {
            client,
            probe,
            config,
            credentials,
        }
    }

    /// Run the full pipeline: test build → smoke test → conditional publish.
    ///
    /// The publish stage executes iff the smoke outcome is healthy; on an
    /// unhealthy outcome the run fails without any registry interaction.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunReport, PipelineError> {
        let mut steps = Vec::new();
        let mut state = RunState::Init;

        let (image, outcome) = self.build_and_smoke(ctx, &mut steps, &mut state).await?;

        // Publish gate: only a recorded healthy outcome reaches the push.
        let report = match outcome {
            SmokeOutcome::Healthy(report) => report,
            SmokeOutcome::Unhealthy {
                reason,
                container_logs,
            } => {
                advance(&mut state, RunState::TestFail);
                advance(&mut state, RunState::Failed);
                return Err(PipelineError::Smoke {
                    reason,
                    container_logs,
                });
            }
        };
        advance(&mut state, RunState::TestOk);
        steps.push(format!(
            "Smoke test passed after {} attempt(s) (HTTP {})",
            report.attempts, report.status
        ));

        advance(&mut state, RunState::Publishing);
        let registry = &self.config.pipeline.registry;
        let image_arg = image.qualified(registry);

        self.client
            .login(registry, &self.credentials)
            .await
            .map_err(|e| PipelineError::Login { source: e })?;

        self.client
            .build_push(&ctx.project_dir, &image_arg, &self.config.platforms.publish)
            .await
            .map_err(|e| PipelineError::Publish { source: e })?;
        steps.push(format!(
            "Pushed {} for {}",
            image_arg,
            self.config.platforms.publish.join(",")
        ));

        self.client
            .logout(registry)
            .await
            .map_err(|e| PipelineError::Logout { source: e })?;
        steps.push("Registry credentials cleared".to_owned());

        advance(&mut state, RunState::Done);
        Ok(RunReport {
            image,
            state,
            steps,
            published: true,
        })
    }

    /// Test build and smoke test only. Never touches the registry.
    pub async fn smoke_only(&self, ctx: &RunContext) -> Result<RunReport, PipelineError> {
        let mut steps = Vec::new();
        let mut state = RunState::Init;

        let (image, outcome) = self.build_and_smoke(ctx, &mut steps, &mut state).await?;

        match outcome {
            SmokeOutcome::Healthy(report) => {
                advance(&mut state, RunState::TestOk);
                steps.push(format!(
                    "Smoke test passed after {} attempt(s) (HTTP {})",
                    report.attempts, report.status
                ));
                Ok(RunReport {
                    image,
                    state,
                    steps,
                    published: false,
                })
            }
            SmokeOutcome::Unhealthy {
                reason,
                container_logs,
            } => {
                advance(&mut state, RunState::TestFail);
                advance(&mut state, RunState::Failed);
                Err(PipelineError::Smoke {
                    reason,
                    container_logs,
                })
            }
        }
    }

    /// Shared front half of both modes: validate the checkout, derive the
    /// tag once, build for the test platform, and smoke-test the result.
    async fn build_and_smoke(
        &self,
        ctx: &RunContext,
        steps: &mut Vec<String>,
        state: &mut RunState,
    ) -> Result<(ImageRef, SmokeOutcome), PipelineError> {
        let image_name = self
            .config
            .image
            .name
            .as_deref()
            .ok_or_else(|| PipelineError::Setup {
                reason: "image name not set — set [image].name in slipway.toml or IMAGE_NAME"
                    .to_owned(),
            })?;

        if !ctx.project_dir.join("Dockerfile").exists() {
            return Err(PipelineError::Setup {
                reason: format!("no Dockerfile in {}", ctx.project_dir.display()),
            });
        }
        advance(state, RunState::CheckedOut);

        // One tag per run; the test build and the publish build use the same
        // reference so the tag identifies the checkout both came from.
        let tag = BuildTag::for_today(&ctx.short_hash);
        let image = ImageRef::new(&self.credentials.username, image_name, tag);
        let image_arg = image.qualified(&self.config.pipeline.registry);
        steps.push(format!("Derived tag {}", image.tag()));

        self.client
            .build_load(&ctx.project_dir, &image_arg, &self.config.platforms.test)
            .await
            .map_err(|e| PipelineError::Build { source: e })?;
        advance(state, RunState::BuiltTest);
        steps.push(format!(
            "Built {} for {}",
            image_arg, self.config.platforms.test
        ));

        advance(state, RunState::Testing);
        let container = format!("slipway-smoke-{}", ctx.short_hash);
        let port = self.config.app.port;
        self.client
            .run_detached(&image_arg, &container, port)
            .await
            .map_err(|e| PipelineError::Container { source: e })?;

        let url = format!("http://127.0.0.1:{port}/");
        let mut outcome = wait_for_ready(&self.probe, &url, &self.config.smoke).await;

        // Collect logs before teardown so a crashed container can still be
        // diagnosed.
        if let SmokeOutcome::Unhealthy { container_logs, .. } = &mut outcome {
            *container_logs = self.client.container_logs(&container).await.ok();
        }

        let removed = self.client.remove_container(&container).await;
        match &outcome {
            SmokeOutcome::Healthy(_) => {
                removed.map_err(|e| PipelineError::Container { source: e })?;
            }
            SmokeOutcome::Unhealthy { .. } => {
                // The smoke failure is the primary error; a teardown failure
                // must not mask it.
                if let Err(e) = removed {
                    tracing::warn!(container = %container, error = %e, "failed to remove smoke container");
                }
            }
        }

        Ok((image, outcome))
    }
}

fn advance(state: &mut RunState, next: RunState) {
    tracing::debug!(from = ?*state, to = ?next, "pipeline state");
    *state = next;
}
