use crate::container::ContainerAdapter;
use crate::error::ConsoleError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const POLL_START: Duration = Duration::from_millis(50);
const POLL_CAP: Duration = Duration::from_millis(500);
const PANE_SCROLLBACK_LINES: u32 = 4000;

/// A persistent `tmux` session on the remote host running a long-lived
/// Rails console (§4.1 layer 3). Owns framing, prompt detection, and
/// stabilization recovery. Exactly one evaluation may be in flight at a
/// time (§5) — the session's mutex is the single point of serialization.
pub struct ConsoleSession {
    container: ContainerAdapter,
    tmux_session: String,
    prompt: String,
    inflight: Mutex<()>,
}

impl ConsoleSession {
    pub fn new(
        container: ContainerAdapter,
        tmux_session: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            container,
            tmux_session: tmux_session.into(),
            prompt: prompt.into(),
            inflight: Mutex::new(()),
        }
    }

    /// Sends `load '<script_path>'` into the pane and adaptively polls
    /// captured output for `END:<nonce>` (§4.1 step 4-5). On timeout,
    /// attempts one stabilization before surfacing the failure.
    pub async fn evaluate(
        &self,
        load_cmd: &str,
        nonce: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, ConsoleError> {
        let _guard = self.inflight.lock().await;

        self.send_keys(load_cmd).await?;
        match self.poll_for_marker(&format!("END:{nonce}"), timeout).await {
            Ok(bytes) => Ok(bytes),
            Err(ConsoleError::Timeout { .. }) => {
                warn!(nonce, "console evaluation timed out, attempting stabilization");
                self.stabilize().await?;
                self.poll_for_marker(&format!("END:{nonce}"), timeout).await
            }
            Err(other) => Err(other),
        }
    }

    /// Exposes the container adapter for file transfer calls that bypass
    /// the console session entirely (§4.1: `transfer_file_in`/`transfer_file_out`).
    pub fn container(&self) -> &ContainerAdapter {
        &self.container
    }

    /// Sends a no-op keystroke and re-checks for the prompt (§4.1:
    /// "stabilization recovery"). A console that still doesn't show its
    /// prompt after this is surfaced as `ConsoleError::NotReady`.
    pub async fn stabilize(&self) -> Result<(), ConsoleError> {
        self.send_keys("").await?;
        tokio::time::sleep(POLL_START).await;
        let bytes = self.capture_pane().await?;
        if String::from_utf8_lossy(&bytes).contains(&self.prompt) {
            Ok(())
        } else {
            Err(ConsoleError::NotReady(POLL_START))
        }
    }

    /// Verifies the console shows its prompt, without evaluating anything
    /// (§4.1: `health_check()`).
    pub async fn health_check(&self) -> Result<(), ConsoleError> {
        let bytes = self.capture_pane().await?;
        if String::from_utf8_lossy(&bytes).contains(&self.prompt) {
            Ok(())
        } else {
            Err(ConsoleError::NotReady(Duration::ZERO))
        }
    }

    async fn send_keys(&self, input: &str) -> Result<(), ConsoleError> {
        let cmd = format!(
            "tmux send-keys -t {} {} Enter",
            self.tmux_session,
            tmux_literal(input)
        );
        self.container
            .run(&cmd, None, Duration::from_secs(10))
            .await?;
        Ok(())
    }

    async fn capture_pane(&self) -> Result<Vec<u8>, ConsoleError> {
        let cmd = format!(
            "tmux capture-pane -t {} -p -S -{PANE_SCROLLBACK_LINES}",
            self.tmux_session
        );
        let out = self
            .container
            .run(&cmd, None, Duration::from_secs(10))
            .await?;
        Ok(out.stdout)
    }

    async fn poll_for_marker(
        &self,
        marker: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, ConsoleError> {
        let start = Instant::now();
        let mut interval = POLL_START;

        loop {
            let bytes = self.capture_pane().await?;
            if contains_bytes(&bytes, marker.as_bytes()) {
                debug!(marker, elapsed = ?start.elapsed(), "marker detected");
                return Ok(bytes);
            }
            if start.elapsed() >= timeout {
                return Err(ConsoleError::Timeout {
                    timeout,
                    last_captured: bytes,
                });
            }
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(POLL_CAP);
        }
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len().max(1))
        .any(|window| window == needle)
}

/// Quotes `input` as a single `tmux send-keys` literal argument. Empty
/// input becomes `""` so a bare no-op keystroke still parses as one shell
/// word.
fn tmux_literal(input: &str) -> String {
    if input.is_empty() {
        return "\"\"".to_string();
    }
    format!("'{}'", input.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_bytes_finds_marker_anywhere_in_output() {
        let haystack = b"garbage\nEND:abc123\nmore garbage";
        assert!(contains_bytes(haystack, b"END:abc123"));
        assert!(!contains_bytes(haystack, b"END:zzz"));
    }

    #[test]
    fn poll_backoff_never_exceeds_cap() {
        let mut interval = POLL_START;
        for _ in 0..10 {
            interval = (interval * 2).min(POLL_CAP);
        }
        assert_eq!(interval, POLL_CAP);
    }
}
