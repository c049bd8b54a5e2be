use crate::error::{ContainerError, TransportError};
use crate::transport::{CommandOutput, SshTransport};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Wraps an [`SshTransport`] with `docker exec`/`docker cp` so every call
/// above this layer talks to "the container" rather than "the host" (§4.1
/// layer 2).
pub struct ContainerAdapter {
    transport: Arc<dyn SshTransport>,
    container: String,
}

impl ContainerAdapter {
    pub fn new(transport: Arc<dyn SshTransport>, container: impl Into<String>) -> Self {
        Self {
            transport,
            container: container.into(),
        }
    }

    pub async fn run(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, ContainerError> {
        let wrapped = format!(
            "docker exec -i {} sh -c {}",
            self.container,
            shell_escape(cmd)
        );
        let out = self
            .transport
            .run(&wrapped, stdin, timeout)
            .await
            .map_err(ContainerError::Transport)?;

        if out.exit_code != 0 && String::from_utf8_lossy(&out.stderr).contains("is not running") {
            return Err(ContainerError::NotRunning(self.container.clone()));
        }

        Ok(out)
    }

    /// `docker cp` only operates on host paths, so a copy into the container
    /// round-trips through a host-side temp file.
    pub async fn copy_in(&self, bytes: &[u8], remote_path: &str) -> Result<(), ContainerError> {
        let host_tmp = format!("/tmp/j2o_cp_{}", Uuid::new_v4());
        self.transport
            .copy_in(bytes, &host_tmp)
            .await
            .map_err(ContainerError::Transport)?;

        let cp_cmd = format!("docker cp {host_tmp} {}:{remote_path}", self.container);
        let out = self
            .transport
            .run(&cp_cmd, None, Duration::from_secs(30))
            .await
            .map_err(ContainerError::Transport)?;
        self.cleanup_host_tmp(&host_tmp).await;

        if out.exit_code != 0 {
            return Err(ContainerError::Transport(TransportError::Transfer(
                format!(
                    "docker cp into {} failed: {}",
                    self.container,
                    String::from_utf8_lossy(&out.stderr)
                ),
            )));
        }
        Ok(())
    }

    pub async fn copy_out(&self, remote_path: &str) -> Result<Vec<u8>, ContainerError> {
        let host_tmp = format!("/tmp/j2o_cp_{}", Uuid::new_v4());
        let cp_cmd = format!("docker cp {}:{remote_path} {host_tmp}", self.container);
        let out = self
            .transport
            .run(&cp_cmd, None, Duration::from_secs(30))
            .await
            .map_err(ContainerError::Transport)?;

        if out.exit_code != 0 {
            return Err(ContainerError::Transport(TransportError::Transfer(
                format!(
                    "docker cp from {} failed: {}",
                    self.container,
                    String::from_utf8_lossy(&out.stderr)
                ),
            )));
        }

        let bytes = self
            .transport
            .copy_out(&host_tmp)
            .await
            .map_err(ContainerError::Transport)?;
        self.cleanup_host_tmp(&host_tmp).await;
        Ok(bytes)
    }

    async fn cleanup_host_tmp(&self, path: &str) {
        let _ = self
            .transport
            .run(&format!("rm -f {path}"), None, Duration::from_secs(10))
            .await;
    }

    /// Runs a command inside the container and discards the outcome —
    /// used for best-effort temp-file cleanup after a batch (§4.1 step 7),
    /// where a failed `rm` shouldn't fail the batch that already succeeded.
    pub async fn run_best_effort(&self, cmd: &str) {
        if let Err(err) = self.run(cmd, None, Duration::from_secs(10)).await {
            tracing::debug!(cmd, ?err, "best-effort cleanup command failed");
        }
    }
}

/// Wraps `cmd` in single quotes, escaping embedded single quotes per POSIX
/// shell rules (`'\''`). Used only for the outer `sh -c '<cmd>'` wrapper —
/// `cmd` itself is always an engine-constructed string, never raw Jira data.
fn shell_escape(cmd: &str) -> String {
    format!("'{}'", cmd.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_escape_handles_embedded_quotes() {
        assert_eq!(shell_escape("echo 'hi'"), r"'echo '\''hi'\'''");
    }
}
