// Executable resolution for the Gemini CLI

use super::CommandSpec;
use crate::brain::CliConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(windows)]
const VENDORED_BIN: &str = "node_modules/.bin/gemini.cmd";
#[cfg(not(windows))]
const VENDORED_BIN: &str = "node_modules/.bin/gemini";

/// Pick the CLI to run: explicit path, then a vendored copy, then the package runner.
pub fn locate_cli(config: &CliConfig, working_dir: Option<&Path>) -> CommandSpec {
    if let Some(path) = config.cli_path.as_ref().filter(|p| p.is_file()) {
        debug!(path = %path.display(), "using configured CLI path");
        return CommandSpec::new(path.clone());
    }

    let candidates = vendored_candidates(config.install_dir.as_deref(), working_dir);
    if let Some(found) = candidates.into_iter().find(|p| p.is_file()) {
        debug!(path = %found.display(), "using vendored CLI");
        return CommandSpec::new(found);
    }

    debug!(
        runner = %config.package_runner,
        package = %config.package,
        "no local CLI found, falling back to package runner"
    );
    CommandSpec::new(&config.package_runner).with_prefix(["-y".to_string(), config.package.clone()])
}

fn vendored_candidates(install_dir: Option<&Path>, working_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(dir) = install_dir {
        out.push(dir.join(VENDORED_BIN));
        if let Some(parent) = dir.parent() {
            out.push(parent.join(VENDORED_BIN));
        }
    }
    if let Some(dir) = working_dir {
        out.push(dir.join(VENDORED_BIN));
    }
    out
}
