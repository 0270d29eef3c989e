// Process module - spawns the external CLI, argv-style, with timeout and cancellation

pub mod error;
pub mod locate;
pub mod runner;

pub use error::ProcessError;
pub use locate::locate_cli;
pub use runner::{run, ProcessOutput, RunOptions};

use std::path::PathBuf;

/// A program plus the fixed arguments that precede per-call arguments.
///
/// A package-runner fallback is `npx` with prefix `["-y", "<package>"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub prefix_args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.prefix_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Human-readable form for logs
    pub fn display(&self) -> String {
        let mut s = self.program.display().to_string();
        for arg in &self.prefix_args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}
