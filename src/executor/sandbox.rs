// Workspace sandbox - canonical-path prefix check shared by every filesystem tool

use crate::executor::{ExecutorError, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a requested path was refused. Rendered in-band to the model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("Access denied: '{0}' resolves outside the workspace root")]
    Outside(String),

    #[error("Path not found: '{0}'")]
    NotFound(String),
}

/// Canonicalized workspace root
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| ExecutorError::InvalidRoot(root.display().to_string(), e))?;
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `requested` against the root, following symlinks, and require the
    /// result to stay under the root.
    pub fn resolve(&self, requested: &str) -> std::result::Result<PathBuf, SandboxError> {
        let input = Path::new(requested);
        let full = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let canonical = full
            .canonicalize()
            .map_err(|_| SandboxError::NotFound(requested.to_string()))?;

        if !self.contains(&canonical) {
            return Err(SandboxError::Outside(requested.to_string()));
        }
        Ok(canonical)
    }

    /// Whether an already-canonical path lies under the root
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }

    /// Root-relative display form of a path inside the sandbox
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("ws");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("secret.txt"), "s3cret").unwrap();
        let sandbox = Sandbox::new(&root).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_relative_inside() {
        let (_dir, sandbox) = setup();
        let resolved = sandbox.resolve("src/main.rs").unwrap();
        assert!(resolved.starts_with(sandbox.root()));
        assert_eq!(sandbox.relative(&resolved), Path::new("src/main.rs"));
    }

    #[test]
    fn test_dot_dot_escape() {
        let (_dir, sandbox) = setup();
        assert_eq!(
            sandbox.resolve("../secret.txt"),
            Err(SandboxError::Outside("../secret.txt".to_string()))
        );
        assert!(matches!(
            sandbox.resolve("src/../../secret.txt"),
            Err(SandboxError::Outside(_))
        ));
    }

    #[test]
    fn test_absolute_outside() {
        let (dir, sandbox) = setup();
        let outside = dir.path().join("secret.txt");
        assert!(matches!(
            sandbox.resolve(outside.to_str().unwrap()),
            Err(SandboxError::Outside(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape() {
        let (dir, sandbox) = setup();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), sandbox.root().join("link"))
            .unwrap();
        assert!(matches!(sandbox.resolve("link"), Err(SandboxError::Outside(_))));
    }

    #[test]
    fn test_missing_path() {
        let (_dir, sandbox) = setup();
        assert!(matches!(sandbox.resolve("nope.txt"), Err(SandboxError::NotFound(_))));
    }

    #[test]
    fn test_sibling_prefix_is_outside() {
        // `/tmp/x/ws-other` must not pass a string prefix check against `/tmp/x/ws`.
        let (dir, sandbox) = setup();
        let sibling = dir.path().join("ws-other");
        fs::create_dir_all(&sibling).unwrap();
        assert!(matches!(
            sandbox.resolve(sibling.to_str().unwrap()),
            Err(SandboxError::Outside(_))
        ));
    }
}
