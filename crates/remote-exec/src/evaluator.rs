use crate::console::ConsoleSession;
use crate::error::{EvaluatorError, ScriptExecutionError};
use model::RemoteResult;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Markers that show up in a Rails console backtrace when the evaluated
/// script raised instead of completing — distinguishes a non-retryable
/// `ScriptExecutionError` from a genuine `ConsoleError::Timeout` (§4.1
/// failure model, §7).
const EXCEPTION_MARKERS: &[&str] = &[
    "ActiveRecord::RecordInvalid",
    "ActiveRecord::StatementInvalid",
    "ActiveRecord::RecordNotUnique",
    "(NoMethodError)",
    "(NameError)",
    "(RuntimeError)",
];

/// The public L1 API (§4.1 "Evaluator client"). Everything above this layer
/// only ever calls `execute`/`transfer_file_in`/`transfer_file_out`/
/// `health_check` — the SSH/container/console layers are private
/// implementation detail reached only through here.
pub struct EvaluatorClient {
    console: ConsoleSession,
    remote_temp_dir: String,
    enable_runner_fallback: bool,
}

impl EvaluatorClient {
    pub fn new(console: ConsoleSession, remote_temp_dir: impl Into<String>) -> Self {
        Self {
            console,
            remote_temp_dir: remote_temp_dir.into(),
            enable_runner_fallback: false,
        }
    }

    /// Enables the one-shot `rails runner` rescue path (§4.1 layer 3b):
    /// when the persistent tmux console can't be brought back to a prompt,
    /// a single script still gets a chance to run through a fresh non-console
    /// invocation instead of failing the whole batch.
    pub fn with_runner_fallback(mut self, enabled: bool) -> Self {
        self.enable_runner_fallback = enabled;
        self
    }

    /// Runs the protocol described in §4.1: fresh nonce, copy script (and
    /// optional input payload) to remote temp files, `load` the script,
    /// adaptively poll for the closing sentinel, read back and parse the
    /// result, then delete both temp files.
    pub async fn execute(
        &self,
        script_text: &str,
        input_payload: Option<&[u8]>,
        input_file_path: Option<&str>,
        result_file_path: &str,
        timeout: Duration,
    ) -> Result<RemoteResult, EvaluatorError> {
        let nonce = Uuid::new_v4().simple().to_string();
        let script_path = format!("{}/j2o_{nonce}.rb", self.remote_temp_dir);

        if let (Some(payload), Some(path)) = (input_payload, input_file_path) {
            self.console
                .health_check()
                .await
                .map_err(EvaluatorError::Console)?;
            self.copy_in(payload, path).await?;
        }

        let framed_source = format!(
            "puts 'BEGIN:{nonce}'\n{script_text}\nputs 'END:{nonce}'\n"
        );
        self.copy_in(framed_source.as_bytes(), &script_path).await?;

        let load_cmd = format!("load '{script_path}'");
        let console_bytes = match self.console.evaluate(&load_cmd, &nonce, timeout).await {
            Ok(bytes) => bytes,
            Err(console_err) if self.enable_runner_fallback => {
                warn!(nonce, "console unusable, rescuing this script with a one-shot runner invocation");
                match self.execute_one_shot(&script_path, timeout).await {
                    Ok(bytes) => bytes,
                    Err(_) => return Err(self.classify_failure(console_err).await),
                }
            }
            Err(console_err) => {
                return Err(self.classify_failure(console_err).await);
            }
        };

        self.cleanup(&script_path, input_file_path).await;

        let result_bytes = self.transfer_file_out_raw(result_file_path).await?;
        self.cleanup(result_file_path, None).await;

        match RemoteResult::from_sentinel_framed(&result_bytes) {
            Ok(result) => {
                info!(
                    nonce,
                    created = result.created_ids().len(),
                    errors = result.errors().len(),
                    "batch evaluated"
                );
                Ok(result)
            }
            Err(_) => match RemoteResult::from_sentinel_framed(&console_bytes) {
                Ok(result) => Ok(result),
                Err(parse_err) => Err(EvaluatorError::ResultParse(parse_err)),
            },
        }
    }

    pub async fn transfer_file_in(
        &self,
        local_bytes: &[u8],
        remote_path: &str,
    ) -> Result<(), EvaluatorError> {
        self.copy_in(local_bytes, remote_path).await
    }

    pub async fn transfer_file_out(&self, remote_path: &str) -> Result<Vec<u8>, EvaluatorError> {
        self.transfer_file_out_raw(remote_path).await
    }

    pub async fn health_check(&self) -> Result<(), EvaluatorError> {
        self.console.health_check().await.map_err(EvaluatorError::Console)
    }

    /// Runs `script_path` through a fresh `rails runner` process instead of
    /// the persistent console (§4.1 layer 3b). The script still carries its
    /// own `BEGIN:`/`END:` sentinels, so the same [`RemoteResult::from_sentinel_framed`]
    /// parser reads its stdout; this path never touches the tmux session and
    /// can't be rescued further on its own failure.
    async fn execute_one_shot(&self, script_path: &str, timeout: Duration) -> Result<Vec<u8>, EvaluatorError> {
        let cmd = format!("bundle exec rails runner {script_path}");
        let out = self
            .console
            .container()
            .run(&cmd, None, timeout)
            .await
            .map_err(EvaluatorError::Container)?;
        if out.exit_code != 0 {
            return Err(EvaluatorError::Script(ScriptExecutionError {
                message: format!("one-shot runner exited {}", out.exit_code),
                console_bytes: out.stderr,
            }));
        }
        Ok(out.stdout)
    }

    async fn copy_in(&self, bytes: &[u8], remote_path: &str) -> Result<(), EvaluatorError> {
        self.console
            .container()
            .copy_in(bytes, remote_path)
            .await
            .map_err(EvaluatorError::Container)
    }

    async fn transfer_file_out_raw(&self, remote_path: &str) -> Result<Vec<u8>, EvaluatorError> {
        self.console
            .container()
            .copy_out(remote_path)
            .await
            .map_err(EvaluatorError::Container)
    }

    async fn cleanup(&self, script_path: &str, input_file_path: Option<&str>) {
        self.console
            .container()
            .run_best_effort(&format!("rm -f {script_path}"))
            .await;
        if let Some(path) = input_file_path {
            self.console
                .container()
                .run_best_effort(&format!("rm -f {path}"))
                .await;
        }
    }

    /// Distinguishes "the evaluator raised" (non-retryable `ScriptExecutionError`)
    /// from a genuine console-readiness failure (§4.1 failure model, §7).
    async fn classify_failure(&self, console_err: crate::error::ConsoleError) -> EvaluatorError {
        if let crate::error::ConsoleError::Timeout { ref last_captured, .. } = console_err
            && let Some(script_err) = detect_script_exception(last_captured)
        {
            warn!(error = %script_err, "evaluator raised inside the console");
            return EvaluatorError::Script(script_err);
        }
        warn!(error = ?console_err, "console evaluation failed");
        EvaluatorError::Console(console_err)
    }
}

/// Inspects raw console bytes for a known ActiveRecord/Ruby exception
/// marker (§4.1 failure model: `ScriptExecutionError` is non-retryable).
pub fn detect_script_exception(console_bytes: &[u8]) -> Option<ScriptExecutionError> {
    let text = String::from_utf8_lossy(console_bytes);
    EXCEPTION_MARKERS
        .iter()
        .find(|marker| text.contains(**marker))
        .map(|marker| ScriptExecutionError {
            message: format!("evaluator raised ({marker})"),
            console_bytes: console_bytes.to_vec(),
        })
}
