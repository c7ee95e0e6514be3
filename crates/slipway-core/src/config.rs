use serde::{Deserialize, Serialize};

/// slipway.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlipwayConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub platforms: PlatformConfig,
    #[serde(default)]
    pub smoke: SmokeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Branch the pipeline runs for (defaults to main)
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Container registry host
    #[serde(default = "default_registry")]
    pub registry: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image name (e.g. "hello-axum"); required before a run can start
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the payload application listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Single reference platform used for the smoke-tested build
    #[serde(default = "default_test_platform")]
    pub test: String,
    /// Full target set used for the published build
    #[serde(default = "default_publish_platforms")]
    pub publish: Vec<String>,
}

/// Readiness-poll policy for the smoke test.
///
/// The container gets `grace_period_ms` to start, then up to `max_attempts`
/// health checks with exponential backoff (`base_delay_ms * 2^attempt`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeConfig {
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            registry: default_registry(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            test: default_test_platform(),
            publish: default_publish_platforms(),
        }
    }
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SlipwayConfig {
    /// Load from slipway.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join("slipway.toml");
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigRead {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigInvalid {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!("no slipway.toml found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load slipway.toml and apply the process-environment overrides.
    pub fn load_with_env(project_dir: &std::path::Path) -> crate::Result<Self> {
        let mut config = Self::load(project_dir)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply the `IMAGE_NAME` / `DOCKER_REGISTRY` / `APP_PORT` overrides.
    ///
    /// The lookup is injected so tests can override without touching
    /// process-global environment state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<()> {
        if let Some(name) = lookup("IMAGE_NAME") {
            self.image.name = Some(name);
        }
        if let Some(registry) = lookup("DOCKER_REGISTRY") {
            self.pipeline.registry = registry;
        }
        if let Some(port) = lookup("APP_PORT") {
            self.app.port = port
                .parse()
                .map_err(|_| crate::Error::InvalidPort { value: port })?;
        }
        Ok(())
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_registry() -> String {
    "docker.io".to_owned()
}

fn default_port() -> u16 {
    5000
}

fn default_test_platform() -> String {
    "linux/amd64".to_owned()
}

fn default_publish_platforms() -> Vec<String> {
    vec!["linux/amd64".to_owned(), "linux/arm64".to_owned()]
}

fn default_grace_period_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_request_timeout_ms() -> u64 {
    2000
}
