//! Output destinations for generated documents

use std::path::{Component, Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decides where a generated document is written
pub trait OutputDestination {
    /// Resolve the full output path for `file_name`
    fn resolve(&self, file_name: &str) -> Result<PathBuf, DestinationError>;
}

/// What to do when the output file already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Append " (1)", " (2)", ... before the extension
    Suffix,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Suffix => write!(f, "suffix"),
        }
    }
}

/// Writes into a base directory, created on demand by the generator
#[derive(Debug, Clone)]
pub struct DirectoryDestination {
    base: PathBuf,
    policy: CollisionPolicy,
}

impl DirectoryDestination {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            policy: CollisionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl OutputDestination for DirectoryDestination {
    fn resolve(&self, file_name: &str) -> Result<PathBuf, DestinationError> {
        validate_file_name(file_name)?;
        let candidate = self.base.join(file_name);

        match self.policy {
            CollisionPolicy::Overwrite => Ok(candidate),
            CollisionPolicy::Suffix => {
                if !candidate.exists() {
                    return Ok(candidate);
                }
                let path = Path::new(file_name);
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(file_name);
                let extension = path.extension().and_then(|e| e.to_str());

                (1..=u32::MAX)
                    .map(|n| {
                        let name = match extension {
                            Some(ext) => format!("{} ({}).{}", stem, n, ext),
                            None => format!("{} ({})", stem, n),
                        };
                        self.base.join(name)
                    })
                    .find(|p| !p.exists())
                    .ok_or_else(|| DestinationError::Exhausted(candidate))
            }
        }
    }
}

/// Reject names that would escape the base directory
fn validate_file_name(file_name: &str) -> Result<(), DestinationError> {
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(DestinationError::InvalidFileName(file_name.to_string()));
    }
    let mut components = Path::new(trimmed).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(DestinationError::InvalidFileName(file_name.to_string())),
    }
}

/// Errors raised while resolving an output path
#[derive(Debug, Error, Diagnostic)]
pub enum DestinationError {
    #[error("invalid output file name '{0}'")]
    #[diagnostic(
        code(docfill::output::file_name),
        help("give a plain file name such as contract.doc; use --out-dir to pick the directory")
    )]
    InvalidFileName(String),

    #[error("no free file name next to {0:?}")]
    #[diagnostic(code(docfill::output::exhausted))]
    Exhausted(PathBuf),
}
