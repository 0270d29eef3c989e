// Execution core - validate, resolve credentials, dispatch once, normalize

use super::backend::{CliBackend, DirectBackend};
use super::{
    BridgeConfig, BridgeError, BridgeInitError, ExecutionRequest, ExecutionResult, OutputMode,
    DEFAULT_TIMEOUT_MS,
};
use crate::agent::{run_with_tools, AgentConfig, BrainRef, InferenceError, LoopRequest, Turn};
use crate::auth::{CredentialResolver, CredentialState};
use crate::brain::{BrainError, GeminiCli, GeminiClient, OutputFormat};
use crate::executor::{Executor, SandboxError};
use crate::parser::{reconstruct_text, StreamEvent};
use crate::process::ProcessError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a backend produced before it is shaped by the output mode
struct Answer {
    text: String,
    raw: Option<Value>,
    events: Vec<StreamEvent>,
}

/// Single execution interface over the direct HTTP and CLI backends.
///
/// Never fails across its public boundary: every error becomes `ExecutionResult::Failure`.
pub struct Bridge {
    resolver: CredentialResolver,
    credential_file: String,
    client: GeminiClient,
    cli: GeminiCli,
    executor: Arc<Executor>,
    agent: AgentConfig,
    system_prompt: Option<Arc<str>>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeInitError> {
        let credential_file = config
            .auth
            .credential_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ".env".to_string());

        Ok(Self {
            resolver: CredentialResolver::new(config.auth),
            credential_file,
            client: GeminiClient::new(config.brain)?,
            cli: GeminiCli::new(config.cli),
            executor: Arc::new(Executor::new(config.executor)?),
            agent: config.agent,
            system_prompt: None,
        })
    }

    /// System prompt loaded once by the caller and shared by every request
    pub fn with_system_prompt(mut self, prompt: Option<Arc<str>>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn default_model(&self) -> &str {
        self.client.default_model()
    }

    /// Timeout for callers that do not give one
    pub fn default_timeout_ms(&self) -> i64 {
        i64::try_from(self.client.default_timeout_ms()).unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute_with_cancel(request, None).await
    }

    /// Execute with a cancellation handle; cancelling ends the request with `Cancelled`.
    pub async fn execute_with_cancel(
        &self,
        request: ExecutionRequest,
        cancel: Option<CancellationToken>,
    ) -> ExecutionResult {
        let start = Instant::now();
        let outcome = self.run(&request, cancel.as_ref()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(answer) => {
                info!(
                    duration_ms,
                    text_len = answer.text.len(),
                    events = answer.events.len(),
                    "request succeeded"
                );
                let wants_events =
                    request.output_mode == OutputMode::Streaming || request.tools_enabled;
                ExecutionResult::Success {
                    text: answer.text,
                    raw_structured: if request.output_mode == OutputMode::Structured {
                        answer.raw
                    } else {
                        None
                    },
                    events: wants_events.then_some(answer.events),
                    duration_ms,
                }
            }
            Err(e) => {
                warn!(duration_ms, kind = ?e.kind(), reason = %e, "request failed");
                ExecutionResult::Failure {
                    reason: e.to_string(),
                    kind: e.kind(),
                    exit_code: e.exit_code(),
                    duration_ms,
                }
            }
        }
    }

    async fn run(
        &self,
        request: &ExecutionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Answer, BridgeError> {
        if request.timeout_ms <= 0 {
            return Err(BridgeError::InvalidRequest(format!(
                "timeoutMs must be positive, got {}",
                request.timeout_ms
            )));
        }
        if request.prompt.trim().is_empty() {
            return Err(BridgeError::InvalidRequest("prompt must not be empty".to_string()));
        }
        let timeout = Duration::from_millis(request.timeout_ms as u64);

        let cwd = match &request.working_directory {
            Some(dir) => self.resolve_dir(dir)?,
            None => self.executor.sandbox().root().to_path_buf(),
        };
        let include_dirs = request
            .include_paths
            .iter()
            .map(|p| self.resolve_dir(p))
            .collect::<Result<Vec<_>, _>>()?;

        let model = request
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.client.default_model());

        // Resolved on every request: credential files may change while the service runs.
        let credential = self.resolver.resolve();
        info!(
            credential = credential.kind(),
            model = %model,
            output_mode = ?request.output_mode,
            tools_enabled = request.tools_enabled,
            timeout_ms = request.timeout_ms,
            "executing request"
        );

        let answer = match credential {
            CredentialState::None => {
                return Err(BridgeError::NoCredential {
                    credential_file: self.credential_file.clone(),
                });
            }
            CredentialState::Direct { secret } => {
                let backend = DirectBackend {
                    client: &self.client,
                    secret,
                    model,
                };
                self.drive(&backend, request, timeout, cancel)
                    .await
                    .map_err(|e| match e {
                        InferenceError::Timeout(ms) => {
                            BridgeError::Network(format!("request timed out after {}ms", ms))
                        }
                        InferenceError::Brain(e) => e.into(),
                    })?
            }
            CredentialState::Delegated { account } => {
                debug!(account = %account, "using delegated login");
                let format = if request.tools_enabled || request.output_mode == OutputMode::Streaming
                {
                    OutputFormat::StreamJson
                } else {
                    OutputFormat::Json
                };
                let backend = CliBackend {
                    cli: &self.cli,
                    model,
                    format,
                    include_dirs: &include_dirs,
                    cwd: Some(&cwd),
                    yolo: request.tools_enabled,
                };
                self.drive(&backend, request, timeout, cancel)
                    .await
                    .map_err(|e| match e {
                        InferenceError::Timeout(ms) => BridgeError::ProcessTimeout(ms),
                        InferenceError::Brain(e) => e.into(),
                    })?
            }
        };

        if answer.text.trim().is_empty() {
            return Err(BridgeError::ParseFailure("failed to parse output".to_string()));
        }
        Ok(answer)
    }

    /// Single dispatch, or the tool loop when the request enables tools.
    async fn drive<B: BrainRef>(
        &self,
        backend: &B,
        request: &ExecutionRequest,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Answer, InferenceError> {
        let system = self.system_prompt.as_deref();
        let requested_ms = timeout.as_millis() as u64;

        if request.tools_enabled {
            let outcome = run_with_tools(
                backend,
                self.executor.as_ref(),
                LoopRequest {
                    prompt: &request.prompt,
                    system,
                    timeout,
                    max_tool_rounds: self.agent.max_tool_rounds,
                    cancel,
                },
            )
            .await
            .map_err(|e| as_requested(e, requested_ms))?;
            return Ok(Answer {
                text: outcome.text,
                raw: outcome.raw,
                events: outcome.events,
            });
        }

        let reply = backend
            .dispatch(Turn {
                prompt: &request.prompt,
                system,
                tools: &[],
                exchanges: &[],
                timeout,
                cancel,
            })
            .await
            .map_err(|e| as_requested(InferenceError::Brain(e), requested_ms))?;
        Ok(Answer {
            text: reconstruct_text(&reply.events),
            raw: reply.raw,
            events: reply.events,
        })
    }

    /// Working and include directories must exist inside the workspace.
    fn resolve_dir(&self, dir: &Path) -> Result<PathBuf, BridgeError> {
        let resolved = self
            .executor
            .sandbox()
            .resolve(&dir.to_string_lossy())
            .map_err(|e| match e {
                SandboxError::Outside(_) => BridgeError::ToolSandboxViolation(e.to_string()),
                SandboxError::NotFound(_) => BridgeError::InvalidRequest(e.to_string()),
            })?;
        if !resolved.is_dir() {
            return Err(BridgeError::InvalidRequest(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }
        Ok(resolved)
    }
}

/// Later loop rounds run on what is left of the budget; a timeout reports the caller's limit.
fn as_requested(err: InferenceError, requested_ms: u64) -> InferenceError {
    match err {
        InferenceError::Brain(
            BrainError::Timeout(_) | BrainError::Process(ProcessError::Timeout(_)),
        ) => InferenceError::Timeout(requested_ms),
        other => other,
    }
}
