use crate::error::TransportError;
use async_trait::async_trait;
use russh::ChannelMsg;
use russh::client::{self, Handle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The result of a single remote command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// SSH transport to the OpenProject host (§4.1 layer 1). Opens and reuses a
/// single connection; every call is serialized behind the inner mutex since
/// a `russh::client::Handle` multiplexes channels over one TCP connection
/// but this crate never needs more than one command in flight per call site
/// — concurrency across batches happens one layer up, guarded by the
/// console session mutex (§5).
#[async_trait]
pub trait SshTransport: Send + Sync {
    async fn run(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, TransportError>;

    async fn copy_in(&self, local_bytes: &[u8], remote_path: &str) -> Result<(), TransportError>;

    async fn copy_out(&self, remote_path: &str) -> Result<Vec<u8>, TransportError>;
}

struct NoopHandler;

impl client::Handler for NoopHandler {
    type Error = russh::Error;
}

/// Connection parameters for [`RusshTransport::connect`] (§6: `openproject.host`,
/// `openproject.user`).
#[derive(Debug, Clone)]
pub struct SshEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
}

pub struct RusshTransport {
    endpoint: SshEndpoint,
    handle: Mutex<Handle<NoopHandler>>,
}

impl RusshTransport {
    pub async fn connect(
        endpoint: SshEndpoint,
        private_key: &russh_keys::key::KeyPair,
    ) -> Result<Self, TransportError> {
        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, (endpoint.host.as_str(), endpoint.port), NoopHandler)
            .await
            .map_err(|source| TransportError::Connect {
                host: endpoint.host.clone(),
                source,
            })?;

        let authenticated = handle
            .authenticate_publickey(endpoint.user.clone(), Arc::new(private_key.clone()))
            .await
            .map_err(|source| TransportError::Connect {
                host: endpoint.host.clone(),
                source,
            })?;

        if !authenticated {
            return Err(TransportError::AuthFailed {
                host: endpoint.host.clone(),
                user: endpoint.user.clone(),
            });
        }

        Ok(Self {
            endpoint,
            handle: Mutex::new(handle),
        })
    }

    async fn exec(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, TransportError> {
        let handle = self.handle.lock().await;
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;

        if let Some(input) = stdin {
            channel
                .data(input)
                .await
                .map_err(|e| TransportError::Command(e.to_string()))?;
        }
        channel
            .eof()
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0;

        let result = tokio::time::timeout(timeout, async {
            while let Some(msg) = channel.wait().await {
                match msg {
                    ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
                    ChannelMsg::ExtendedData { data, .. } => stderr.extend_from_slice(&data),
                    ChannelMsg::ExitStatus { exit_status } => exit_code = exit_status as i32,
                    ChannelMsg::Eof | ChannelMsg::Close => break,
                    _ => {}
                }
            }
        })
        .await;

        if result.is_err() {
            warn!(cmd, timeout = ?timeout, "ssh command timed out");
            return Err(TransportError::Command(format!(
                "command timed out after {timeout:?}: {cmd}"
            )));
        }

        debug!(cmd, exit_code, "ssh command finished");
        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[async_trait]
impl SshTransport for RusshTransport {
    async fn run(
        &self,
        cmd: &str,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<CommandOutput, TransportError> {
        self.exec(cmd, stdin, timeout).await
    }

    /// Writes bytes to a remote path by piping them through `cat` over the
    /// exec channel rather than pulling in a separate SFTP dependency — the
    /// payloads here (scripts, JSON inputs) are small enough that this is
    /// cheaper than standing up an SFTP subsystem.
    async fn copy_in(&self, local_bytes: &[u8], remote_path: &str) -> Result<(), TransportError> {
        let cmd = format!("cat > {remote_path}");
        let output = self.exec(&cmd, Some(local_bytes), Duration::from_secs(30)).await?;
        if output.exit_code != 0 {
            return Err(TransportError::Transfer(format!(
                "copy_in to {remote_path} exited {}: {}",
                output.exit_code,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn copy_out(&self, remote_path: &str) -> Result<Vec<u8>, TransportError> {
        let cmd = format!("cat {remote_path}");
        let output = self.exec(&cmd, None, Duration::from_secs(30)).await?;
        if output.exit_code != 0 {
            return Err(TransportError::Transfer(format!(
                "copy_out of {remote_path} exited {}: {}",
                output.exit_code,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output.stdout)
    }
}
