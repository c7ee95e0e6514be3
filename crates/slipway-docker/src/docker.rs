use std::process::{ExitStatus, Output};

/// Failure modes of a `docker` invocation.
///
/// Non-zero exits from captured commands are classified by the wording docker
/// prints to stderr, so callers can tell a stopped daemon or a missing buildx
/// plugin apart from an ordinary command failure.
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker CLI is not on PATH — install: https://docs.docker.com/get-docker/")]
    CliMissing { source: std::io::Error },

    #[error("could not launch docker {command}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    #[error("docker daemon is not reachable — is it running?")]
    DaemonDown { stderr: String },

    #[error("this docker installation has no buildx plugin")]
    BuildxMissing { stderr: String },

    #[error("docker {command} failed ({status}): {stderr}")]
    ExitFailure {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Failure of a command whose streams were inherited; its stderr already
    /// went to the terminal, so there is nothing to embed here.
    #[error("docker {command} failed ({status}), details are in the output above")]
    StreamedFailure { command: String, status: ExitStatus },

    #[error("docker {command} printed output that is not valid UTF-8")]
    NonUtf8 {
        command: String,
        source: std::string::FromUtf8Error,
    },

    #[error("could not feed the secret to docker {command}")]
    SecretPipe {
        command: String,
        source: std::io::Error,
    },
}

/// Classify a non-zero exit from a captured command by its stderr. The match
/// strings mirror what docker itself prints.
pub(crate) fn classify_exit(args: &[String], output: &Output) -> DockerError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();

    if stderr.contains("Cannot connect to the Docker daemon")
        || stderr.contains("Is the docker daemon running")
        || stderr.contains("error during connect")
    {
        DockerError::DaemonDown { stderr }
    } else if stderr.contains("'buildx' is not a docker command") {
        DockerError::BuildxMissing { stderr }
    } else {
        DockerError::ExitFailure {
            command: subcommand(args),
            status: output.status,
            stderr,
        }
    }
}

/// Spawn failures: a missing binary gets its own variant, anything else keeps
/// the io error alongside the command that triggered it.
pub(crate) fn launch_error(args: &[String], source: std::io::Error) -> DockerError {
    if source.kind() == std::io::ErrorKind::NotFound {
        DockerError::CliMissing { source }
    } else {
        DockerError::Launch {
            command: subcommand(args),
            source,
        }
    }
}

/// Leading argv words used to name an invocation in errors: plugin commands
/// keep two words ("buildx build"), plain ones keep one ("run").
pub(crate) fn subcommand(args: &[String]) -> String {
    let words = if args.first().is_some_and(|a| a == "buildx") {
        2
    } else {
        1
    };
    args.iter()
        .take(words)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
