use std::process::Stdio;

use crate::docker::{self, DockerError};

/// Seam between slipway and the `docker` binary.
///
/// Three invocation shapes cover everything the pipeline does: quiet
/// commands whose stdout is the result, the credential hand-off to
/// `docker login`, and long-running buildx builds whose progress belongs on
/// the user's terminal. The client is generic over this trait so tests can
/// script docker's behavior.
#[allow(async_fn_in_trait)]
pub trait DockerCli: Send + Sync {
    /// Run a quiet command and return its stdout. stderr is captured and, on
    /// a non-zero exit, classified into a [`DockerError`].
    async fn capture(&self, args: &[String]) -> Result<String, DockerError>;

    /// Run a command that reads a secret from stdin. The secret bytes are
    /// written to the child's stdin and never enter argv, so they cannot
    /// show up in process listings or logs.
    async fn authenticate(&self, args: &[String], secret: &[u8]) -> Result<(), DockerError>;

    /// Run a command with stdout/stderr inherited. buildx renders its build
    /// progress on stderr, so passing the streams through is what keeps a
    /// multi-minute build observable.
    async fn passthrough(&self, args: &[String]) -> Result<(), DockerError>;
}

/// Executor backed by the `docker` binary on PATH.
pub struct SystemDocker;

impl DockerCli for SystemDocker {
    async fn capture(&self, args: &[String]) -> Result<String, DockerError> {
        let output = tokio::process::Command::new("docker")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| docker::launch_error(args, e))?;

        if !output.status.success() {
            return Err(docker::classify_exit(args, &output));
        }

        String::from_utf8(output.stdout).map_err(|e| DockerError::NonUtf8 {
            command: docker::subcommand(args),
            source: e,
        })
    }

    async fn authenticate(&self, args: &[String], secret: &[u8]) -> Result<(), DockerError> {
        use tokio::io::AsyncWriteExt;

        let mut child = tokio::process::Command::new("docker")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| docker::launch_error(args, e))?;

        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(secret)
                .await
                .map_err(|e| DockerError::SecretPipe {
                    command: docker::subcommand(args),
                    source: e,
                })?;
            // Close the pipe so docker sees EOF and stops reading.
            pipe.shutdown()
                .await
                .map_err(|e| DockerError::SecretPipe {
                    command: docker::subcommand(args),
                    source: e,
                })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| docker::launch_error(args, e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(docker::classify_exit(args, &output))
        }
    }

    async fn passthrough(&self, args: &[String]) -> Result<(), DockerError> {
        let status = tokio::process::Command::new("docker")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| docker::launch_error(args, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(DockerError::StreamedFailure {
                command: docker::subcommand(args),
                status,
            })
        }
    }
}
