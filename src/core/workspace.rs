//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory marking a docfill workspace root
pub const MARKER_DIR: &str = ".docfill";

/// Represents a docfill workspace
#[derive(Debug)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .docfill/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(MARKER_DIR).exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }
        Self::create(root)
    }

    /// Initialize even if .docfill/ exists; rewrites the default config
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create(root)
    }

    fn create(root: PathBuf) -> Result<Self, WorkspaceError> {
        let workspace = Self { root };
        for dir in [
            workspace.marker_dir(),
            workspace.templates_dir(),
            workspace.generated_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        }

        std::fs::write(workspace.config_path(), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        Ok(workspace)
    }

    fn default_config() -> &'static str {
        r#"# docfill workspace configuration

# Encodings tried when reading a template as text, in priority order.
# The first one is used when no candidate yields any placeholder.
# encodings: [windows-1251, ascii, utf-8, utf-16, ibm866]

# Legacy 8-bit encoding for byte-level fallback replacement
# fallback_encoding: windows-1251

# lossy: malformed bytes become U+FFFD; strict: skip candidates that hit them
# decode_policy: lossy

# Where generated documents go (relative to the workspace root)
# output_dir: generated

# overwrite | suffix
# on_collision: overwrite
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .docfill configuration directory
    pub fn marker_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.marker_dir().join("config.yaml")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.root.join("generated")
    }

    /// Resolve a template argument: as given if it exists, else under templates/
    pub fn resolve_template(&self, template: &Path) -> PathBuf {
        if template.exists() || template.is_absolute() {
            return template.to_path_buf();
        }
        let candidate = self.templates_dir().join(template);
        if candidate.exists() {
            candidate
        } else {
            template.to_path_buf()
        }
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a docfill workspace (searched from {searched_from:?}). Run 'docfill init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("docfill workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_workspace_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();

        assert!(workspace.marker_dir().is_dir());
        assert!(workspace.config_path().exists());
        assert!(workspace.templates_dir().is_dir());
        assert!(workspace.generated_dir().is_dir());
    }

    #[test]
    fn test_workspace_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
        assert!(Workspace::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_workspace_discover_walks_up() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let workspace = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            workspace.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_workspace_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_template_prefers_templates_dir_for_bare_names() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();
        std::fs::write(workspace.templates_dir().join("act.doc"), b"x").unwrap();

        assert_eq!(
            workspace.resolve_template(Path::new("act.doc")),
            workspace.templates_dir().join("act.doc")
        );
        assert_eq!(
            workspace.resolve_template(Path::new("nope.doc")),
            PathBuf::from("nope.doc")
        );
    }
}
