use crate::docker::DockerError;
use crate::executor::{DockerCli, SystemDocker};
use slipway_core::RegistryCredentials;
use std::path::Path;

/// Name of the binfmt installer image used to register cross-architecture
/// emulation handlers on the build host.
const BINFMT_IMAGE: &str = "tonistiigi/binfmt";

/// Docker operations client, parameterized over the CLI seam for testability.
pub struct DockerClient<C: DockerCli = SystemDocker> {
    cli: C,
}

impl DockerClient<SystemDocker> {
    pub fn new() -> Self {
        Self { cli: SystemDocker }
    }
}

impl Default for DockerClient<SystemDocker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DockerCli> DockerClient<C> {
    pub fn with_cli(cli: C) -> Self {
        Self { cli }
    }

    // ── Environment preparation ──

    /// Register QEMU emulation handlers for every non-native architecture in
    /// the publish set.
    pub async fn install_emulation(&self, platforms: &[String]) -> Result<(), SetupError> {
        let archs = platforms
            .iter()
            .filter_map(|p| p.strip_prefix("linux/"))
            .map(|arch| arch.split('/').next().unwrap_or(arch))
            .collect::<Vec<_>>()
            .join(",");

        self.cli
            .passthrough(&args([
                "run",
                "--privileged",
                "--rm",
                BINFMT_IMAGE,
                "--install",
                &archs,
            ]))
            .await
            .map_err(|e| SetupError::Emulation { source: e })
    }

    /// Ensure a multi-platform buildx builder exists and is the current one,
    /// creating it if needed.
    pub async fn ensure_builder(&self, name: &str) -> Result<(), SetupError> {
        let exists = self
            .cli
            .capture(&args(["buildx", "inspect", name]))
            .await
            .is_ok();

        if !exists {
            self.cli
                .capture(&args([
                    "buildx",
                    "create",
                    "--name",
                    name,
                    "--driver",
                    "docker-container",
                    "--bootstrap",
                ]))
                .await
                .map_err(|e| SetupError::Builder { source: e })?;
        }

        self.cli
            .capture(&args(["buildx", "use", name]))
            .await
            .map_err(|e| SetupError::Builder { source: e })?;

        Ok(())
    }

    // ── Builds ──

    /// Build for the single test platform and load the result into the local
    /// image store. Nothing is pushed.
    pub async fn build_load(
        &self,
        context: &Path,
        image: &str,
        platform: &str,
    ) -> Result<(), BuildError> {
        let context = context_str(context)?;

        self.cli
            .passthrough(&args([
                "buildx", "build", "--platform", platform, "-t", image, "--load", context,
            ]))
            .await
            .map_err(|e| BuildError::Load { source: e })
    }

    /// Build for the full platform set and push the multi-platform manifest
    /// to the registry.
    pub async fn build_push(
        &self,
        context: &Path,
        image: &str,
        platforms: &[String],
    ) -> Result<(), BuildError> {
        let context = context_str(context)?;
        let platform_list = platforms.join(",");

        self.cli
            .passthrough(&args([
                "buildx",
                "build",
                "--platform",
                &platform_list,
                "-t",
                image,
                "--push",
                context,
            ]))
            .await
            .map_err(|e| BuildError::Push { source: e })
    }

    // ── Container lifecycle ──

    /// Start a detached container with the app port published. Returns the
    /// container id.
    ///
    /// No `--rm`: the container must outlive a crash so its logs can still
    /// be collected before teardown.
    pub async fn run_detached(
        &self,
        image: &str,
        name: &str,
        port: u16,
    ) -> Result<String, ContainerError> {
        let publish = format!("{port}:{port}");

        let output = self
            .cli
            .capture(&args([
                "run", "-d", "--name", name, "-p", &publish, image,
            ]))
            .await
            .map_err(|e| ContainerError::Start { source: e })?;

        Ok(output.trim().to_owned())
    }

    /// Force-remove a container. Used for teardown on both the healthy and
    /// the failed smoke path.
    pub async fn remove_container(&self, name: &str) -> Result<(), ContainerError> {
        self.cli
            .capture(&args(["rm", "-f", name]))
            .await
            .map_err(|e| ContainerError::Remove { source: e })?;

        Ok(())
    }

    pub async fn container_logs(&self, name: &str) -> Result<String, ContainerError> {
        self.cli
            .capture(&args(["logs", name]))
            .await
            .map_err(|e| ContainerError::Logs { source: e })
    }

    // ── Registry auth ──

    /// Authenticate against the registry. The token goes through stdin so it
    /// never appears in argv or process listings.
    pub async fn login(
        &self,
        registry: &str,
        credentials: &RegistryCredentials,
    ) -> Result<(), RegistryError> {
        self.cli
            .authenticate(
                &args([
                    "login",
                    registry,
                    "--username",
                    &credentials.username,
                    "--password-stdin",
                ]),
                credentials.expose_token().as_bytes(),
            )
            .await
            .map_err(|e| RegistryError::Login { source: e })
    }

    /// Clear registry authentication from the local docker config.
    pub async fn logout(&self, registry: &str) -> Result<(), RegistryError> {
        self.cli
            .capture(&args(["logout", registry]))
            .await
            .map_err(|e| RegistryError::Logout { source: e })?;

        Ok(())
    }

    // ── Doctor ──

    /// Run all diagnostic checks without early return.
    /// Returns a report with pass/fail for each check item.
    pub async fn doctor(&self, publish_platforms: &[String]) -> DoctorReport {
        let mut report = DoctorReport::default();

        // 1. docker CLI
        match self.cli.capture(&args(["--version"])).await {
            Ok(v) => {
                // Parse "Docker version X.Y.Z, build abc" down to the version
                let version = v
                    .trim()
                    .strip_prefix("Docker version ")
                    .and_then(|rest| rest.split(',').next())
                    .unwrap_or(v.trim());
                report.docker = CheckResult::ok(version);
            }
            Err(e) => {
                report.docker = CheckResult::fail(&e.to_string());
                return report;
            }
        }

        // 2. Daemon reachable
        match self
            .cli
            .capture(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(v) if !v.trim().is_empty() => report.daemon = CheckResult::ok(v.trim()),
            Ok(_) => {
                report.daemon = CheckResult::fail("daemon not reachable");
                return report;
            }
            Err(DockerError::DaemonDown { .. }) => {
                report.daemon = CheckResult::fail("daemon not running");
                return report;
            }
            Err(e) => {
                report.daemon = CheckResult::fail(&e.to_string());
                return report;
            }
        }

        // 3. buildx plugin
        match self.cli.capture(&args(["buildx", "version"])).await {
            Ok(v) => report.buildx = CheckResult::ok(v.trim()),
            Err(DockerError::BuildxMissing { .. }) => {
                report.buildx = CheckResult::fail("buildx plugin not installed");
                return report;
            }
            Err(e) => {
                report.buildx = CheckResult::fail(&e.to_string());
                return report;
            }
        }

        // 4. Current builder and its supported platforms
        let inspect = self.cli.capture(&args(["buildx", "inspect"])).await;
        let supported = match &inspect {
            Ok(out) => {
                let name = out
                    .lines()
                    .find_map(|line| line.strip_prefix("Name:"))
                    .map(|n| n.trim().to_owned())
                    .unwrap_or_else(|| "default".to_owned());
                report.builder = CheckResult::ok(&name);
                builder_platforms(out)
            }
            Err(_) => {
                report.builder = CheckResult::fail("no usable builder — run: slipway setup");
                Vec::new()
            }
        };

        // 5. Emulation coverage for the publish set
        for platform in publish_platforms {
            let covered = supported.iter().any(|s| s == platform);
            report.emulation.push(PlatformCheck {
                platform: platform.clone(),
                result: if covered {
                    CheckResult::ok("Supported")
                } else {
                    CheckResult::fail("Not supported — run: slipway setup")
                },
            });
        }

        report
    }
}

/// Extract the supported platform list from `docker buildx inspect` output.
fn builder_platforms(inspect_output: &str) -> Vec<String> {
    inspect_output
        .lines()
        .find_map(|line| line.strip_prefix("Platforms:"))
        .map(|list| {
            list.split(',')
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn context_str(context: &Path) -> Result<&str, BuildError> {
    context
        .to_str()
        .ok_or_else(|| BuildError::InvalidPath(context.to_path_buf()))
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub daemon: CheckResult,
    pub buildx: CheckResult,
    pub builder: CheckResult,
    pub emulation: Vec<PlatformCheck>,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.docker.passed
            && self.daemon.passed
            && self.buildx.passed
            && self.builder.passed
            && self.config_file.passed
            && self.emulation.iter().all(|p| p.result.passed)
    }
}

impl std::fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}] docker: {}", self.docker.icon(), self.docker.detail)?;
        writeln!(f, "[{}] daemon: {}", self.daemon.icon(), self.daemon.detail)?;
        writeln!(f, "[{}] buildx: {}", self.buildx.icon(), self.buildx.detail)?;
        writeln!(
            f,
            "[{}] builder: {}",
            self.builder.icon(),
            self.builder.detail
        )?;
        for check in &self.emulation {
            writeln!(
                f,
                "[{}] platform {}: {}",
                check.result.icon(),
                check.platform,
                check.result.detail
            )?;
        }
        write!(
            f,
            "[{}] slipway.toml: {}",
            self.config_file.icon(),
            self.config_file.detail
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformCheck {
    pub platform: String,
    pub result: CheckResult,
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to install emulation layer")]
    Emulation { source: DockerError },

    #[error("failed to prepare buildx builder")]
    Builder { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build context path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("test-platform build failed")]
    Load { source: DockerError },

    #[error("multi-platform build/push failed")]
    Push { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("failed to start container")]
    Start { source: DockerError },

    #[error("failed to remove container")]
    Remove { source: DockerError },

    #[error("failed to read container logs")]
    Logs { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry login failed")]
    Login { source: DockerError },

    #[error("registry logout failed")]
    Logout { source: DockerError },
}
