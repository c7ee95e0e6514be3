use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not read {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a valid slipway.toml")]
    ConfigInvalid {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid APP_PORT value {value:?} — expected a port number")]
    InvalidPort { value: String },

    #[error("environment variable {var} is not set")]
    MissingSecret { var: &'static str },

    // ── Git checkout identification ──
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },

    #[error("git failed: {detail}")]
    GitFailed { detail: String },
}
