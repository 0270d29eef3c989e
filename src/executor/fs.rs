// Filesystem tools: read_file, list_directory, search_text

use crate::brain::ToolDefinition;
use crate::executor::sandbox::Sandbox;
use crate::executor::{ExecutorError, Result, ToolImpl, ToolOutput};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Directory names never descended into by `search_text`
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Longest line echoed in a search hit
const MAX_LINE_CHARS: usize = 200;

fn parse_input<T: for<'de> Deserialize<'de>>(tool: &str, input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| ExecutorError::InvalidInput(tool.to_string(), e.to_string()))
}

fn default_path() -> String {
    ".".to_string()
}

// ---------------------------------------------------------------------------
// read_file

#[derive(Debug, Deserialize)]
struct ReadFileInput {
    path: String,
}

pub struct ReadFileTool {
    sandbox: Arc<Sandbox>,
    description: String,
    max_bytes: usize,
}

impl ReadFileTool {
    pub const NAME: &'static str = "read_file";

    pub fn new(sandbox: Arc<Sandbox>, description: Option<String>, max_bytes: usize) -> Self {
        Self {
            sandbox,
            description: description.unwrap_or_else(|| {
                "Read the contents of a text file inside the workspace. \
                 Paths are relative to the workspace root."
                    .to_string()
            }),
            max_bytes,
        }
    }
}

#[async_trait]
impl ToolImpl for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the workspace root"
                    }
                },
                "required": ["path"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let ReadFileInput { path } = parse_input(Self::NAME, input)?;

        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        if resolved.is_dir() {
            return Ok(ToolOutput::error(format!("'{}' is a directory", path)));
        }

        let bytes = match tokio::fs::read(&resolved).await {
            Ok(b) => b,
            Err(e) => return Ok(ToolOutput::error(format!("Failed to read '{}': {}", path, e))),
        };

        let total = bytes.len();
        let mut content = String::from_utf8_lossy(&bytes[..total.min(self.max_bytes)]).into_owned();
        if total > self.max_bytes {
            content.push_str(&format!(
                "\n[truncated: showing {} of {} bytes]",
                self.max_bytes, total
            ));
        }

        info!(path = %path, bytes = total, "read_file executed");
        Ok(ToolOutput::success(content))
    }
}

// ---------------------------------------------------------------------------
// list_directory

#[derive(Debug, Deserialize)]
struct ListDirectoryInput {
    #[serde(default = "default_path")]
    path: String,
}

pub struct ListDirectoryTool {
    sandbox: Arc<Sandbox>,
    description: String,
}

impl ListDirectoryTool {
    pub const NAME: &'static str = "list_directory";

    pub fn new(sandbox: Arc<Sandbox>, description: Option<String>) -> Self {
        Self {
            sandbox,
            description: description.unwrap_or_else(|| {
                "List the entries of a directory inside the workspace. \
                 Directories are shown with a trailing '/'."
                    .to_string()
            }),
        }
    }
}

#[async_trait]
impl ToolImpl for ListDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory path relative to the workspace root (default '.')"
                    }
                }
            }),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let ListDirectoryInput { path } = parse_input(Self::NAME, input)?;

        let resolved = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        if !resolved.is_dir() {
            return Ok(ToolOutput::error(format!("'{}' is not a directory", path)));
        }

        let mut reader = match tokio::fs::read_dir(&resolved).await {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("Failed to list '{}': {}", path, e))),
        };

        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        info!(path = %path, entries = names.len(), "list_directory executed");
        if names.is_empty() {
            return Ok(ToolOutput::success("(empty directory)"));
        }
        Ok(ToolOutput::success(names.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// search_text

#[derive(Debug, Deserialize)]
struct SearchTextInput {
    pattern: String,
    #[serde(default = "default_path")]
    path: String,
}

pub struct SearchTextTool {
    sandbox: Arc<Sandbox>,
    description: String,
    max_matches: usize,
    max_depth: usize,
}

impl SearchTextTool {
    pub const NAME: &'static str = "search_text";

    pub fn new(
        sandbox: Arc<Sandbox>,
        description: Option<String>,
        max_matches: usize,
        max_depth: usize,
    ) -> Self {
        Self {
            sandbox,
            description: description.unwrap_or_else(|| {
                format!(
                    "Search file contents inside the workspace for a regular expression \
                     (case-insensitive). Returns up to {} matching lines as 'path:line: text'.",
                    max_matches
                )
            }),
            max_matches,
            max_depth,
        }
    }
}

#[async_trait]
impl ToolImpl for SearchTextTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Regular expression to search for; invalid expressions are matched literally"
                    },
                    "path": {
                        "type": "string",
                        "description": "Directory to search, relative to the workspace root (default '.')"
                    }
                },
                "required": ["pattern"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let SearchTextInput { pattern, path } = parse_input(Self::NAME, input)?;

        if pattern.is_empty() {
            return Ok(ToolOutput::error("pattern must not be empty"));
        }

        let start = match self.sandbox.resolve(&path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let regex = match compile_pattern(&pattern) {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid pattern: {}", e))),
        };
        let sandbox = self.sandbox.clone();
        let limits = SearchLimits {
            max_matches: self.max_matches,
            max_depth: self.max_depth,
        };

        let hits = tokio::task::spawn_blocking(move || {
            let mut hits = SearchHits::default();
            search_dir(&sandbox, &start, 0, &regex, limits, &mut hits);
            hits
        })
        .await?;

        info!(
            pattern = %pattern,
            path = %path,
            matches = hits.lines.len(),
            truncated = hits.truncated,
            "search_text executed"
        );

        if hits.lines.is_empty() {
            return Ok(ToolOutput::success(format!("No matches for '{}'", pattern)));
        }
        let mut content = hits.lines.join("\n");
        if hits.truncated {
            content.push_str(&format!("\n[results truncated at {} matches]", limits.max_matches));
        }
        Ok(ToolOutput::success(content))
    }
}

#[derive(Debug, Clone, Copy)]
struct SearchLimits {
    max_matches: usize,
    max_depth: usize,
}

#[derive(Debug, Default)]
struct SearchHits {
    lines: Vec<String>,
    truncated: bool,
}

fn compile_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            debug!(pattern = %pattern, "invalid regex, matching literally");
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
        })
}

/// Depth-limited walk. `depth` is the number of levels below the search root.
fn search_dir(
    sandbox: &Sandbox,
    dir: &Path,
    depth: usize,
    regex: &Regex,
    limits: SearchLimits,
    hits: &mut SearchHits,
) {
    if dir.is_file() {
        search_file(sandbox, dir, regex, limits, hits);
        return;
    }

    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.flatten().map(|e| e.path()).collect(),
        Err(_) => return,
    };
    entries.sort();

    for entry in entries {
        if hits.truncated {
            return;
        }
        // Symlinks are followed only when their target stays inside the workspace.
        let Ok(canonical) = entry.canonicalize() else {
            continue;
        };
        if !sandbox.contains(&canonical) {
            continue;
        }

        if canonical.is_dir() {
            let skipped = entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIPPED_DIRS.contains(&n));
            if !skipped && depth < limits.max_depth {
                search_dir(sandbox, &canonical, depth + 1, regex, limits, hits);
            }
        } else {
            search_file(sandbox, &canonical, regex, limits, hits);
        }
    }
}

fn search_file(
    sandbox: &Sandbox,
    file: &Path,
    regex: &Regex,
    limits: SearchLimits,
    hits: &mut SearchHits,
) {
    // Binary and unreadable files are skipped.
    let Ok(content) = std::fs::read_to_string(file) else {
        return;
    };
    let display = sandbox.relative(file).display().to_string();

    for (index, line) in content.lines().enumerate() {
        if !regex.is_match(line) {
            continue;
        }
        if hits.lines.len() >= limits.max_matches {
            hits.truncated = true;
            return;
        }
        let text: String = line.trim().chars().take(MAX_LINE_CHARS).collect();
        hits.lines.push(format!("{}:{}: {}", display, index + 1, text));
    }
}
