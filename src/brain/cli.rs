// Gemini CLI backend - argv construction and subprocess dispatch

use super::{BrainError, CliConfig};
use crate::process::{self, locate_cli, ProcessOutput, RunOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Remediation shown when the CLI reports an authentication problem
pub const SIGN_IN_HINT: &str = "run `gemini` once in a terminal to sign in, or set GEMINI_API_KEY";

/// CLI output format flag value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    StreamJson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

/// One CLI call
#[derive(Debug, Clone)]
pub struct CliInvocation<'a> {
    pub model: &'a str,
    pub format: OutputFormat,
    pub include_dirs: &'a [PathBuf],
    /// Let the CLI run its own tools without confirmation
    pub yolo: bool,
    pub prompt: &'a str,
}

/// Build the argument vector. Flags first; the prompt is always the last argument.
pub fn build_args(invocation: &CliInvocation<'_>) -> Vec<String> {
    let mut args = vec![
        "-m".to_string(),
        invocation.model.to_string(),
        "-o".to_string(),
        invocation.format.as_str().to_string(),
    ];

    if !invocation.include_dirs.is_empty() {
        let joined = invocation
            .include_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        args.push("--include-directories".to_string());
        args.push(joined);
    }

    if invocation.yolo {
        args.push("--yolo".to_string());
    }

    args.push(invocation.prompt.to_string());
    args
}

/// Subprocess backend using browser-delegated credentials
#[derive(Debug, Clone)]
pub struct GeminiCli {
    config: CliConfig,
}

impl GeminiCli {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    /// Run the CLI to completion. A non-zero exit becomes `BrainError::CliExit`.
    pub async fn run(
        &self,
        invocation: &CliInvocation<'_>,
        cwd: Option<&Path>,
        timeout: Duration,
        cancel: Option<CancellationToken>,
    ) -> Result<ProcessOutput, BrainError> {
        let spec = locate_cli(&self.config, cwd);
        let args = build_args(invocation);

        info!(
            command = %spec.display(),
            model = %invocation.model,
            format = invocation.format.as_str(),
            yolo = invocation.yolo,
            prompt_len = invocation.prompt.len(),
            "dispatching to gemini CLI"
        );

        let options = RunOptions {
            cwd: cwd.map(Path::to_path_buf),
            timeout: Some(timeout),
            cancel,
            ..Default::default()
        };
        let output = process::run(&spec, &args, options).await?;

        if !output.success() {
            let code = output.exit_code.unwrap_or(-1);
            let mut message = output.stderr.trim().to_string();
            if message.is_empty() {
                message = output.stdout.trim().to_string();
            }
            if looks_like_auth_problem(&message) {
                message = format!("{} ({})", message, SIGN_IN_HINT);
            }
            warn!(exit_code = code, "gemini CLI failed");
            return Err(BrainError::CliExit { code, message });
        }

        Ok(output)
    }
}

fn looks_like_auth_problem(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["authenticat", "login", "credential", "sign in"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_last() {
        let dirs = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        let args = build_args(&CliInvocation {
            model: "gemini-2.5-pro",
            format: OutputFormat::StreamJson,
            include_dirs: &dirs,
            yolo: true,
            prompt: "-m looks like a flag",
        });
        assert_eq!(
            args,
            vec![
                "-m",
                "gemini-2.5-pro",
                "-o",
                "stream-json",
                "--include-directories",
                "/a,/b",
                "--yolo",
                "-m looks like a flag",
            ]
        );
    }

    #[test]
    fn test_minimal_args() {
        let args = build_args(&CliInvocation {
            model: "gemini-2.5-flash",
            format: OutputFormat::Json,
            include_dirs: &[],
            yolo: false,
            prompt: "hi",
        });
        assert_eq!(args, vec!["-m", "gemini-2.5-flash", "-o", "json", "hi"]);
    }

    #[test]
    fn test_auth_detection() {
        assert!(looks_like_auth_problem("Error: not authenticated"));
        assert!(looks_like_auth_problem("Please login first"));
        assert!(!looks_like_auth_problem("quota exceeded"));
    }
}
