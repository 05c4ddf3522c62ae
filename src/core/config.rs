//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::destination::CollisionPolicy;
use crate::core::Workspace;
use crate::engine::encoding::{
    fallback_codec, CandidateSet, DecodePolicy, EncodingError, DEFAULT_FALLBACK, DEFAULT_PRIORITY,
};
use crate::engine::generator::{GenerationError, Generator};

/// docfill configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Encoding candidates in priority order
    pub encodings: Option<Vec<String>>,

    /// Legacy 8-bit encoding for byte fallback
    pub fallback_encoding: Option<String>,

    /// Treatment of malformed bytes during candidate decoding
    pub decode_policy: Option<DecodePolicy>,

    /// Default output directory for generated documents
    pub output_dir: Option<PathBuf>,

    /// Behavior when the output file already exists
    pub on_collision: Option<CollisionPolicy>,
}

impl Config {
    /// Load configuration from all sources, discovering the workspace from `start`
    pub fn load_from(start: &Path) -> Self {
        Self::load_layers(Workspace::discover_from(start).ok().as_ref())
    }

    fn load_layers(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/docfill/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.docfill/config.yaml)
        if let Some(workspace) = workspace {
            if let Some(local) = Self::read_file(&workspace.config_path()) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Ok(encodings) = std::env::var("DOCFILL_ENCODINGS") {
            let labels: Vec<String> = encodings
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !labels.is_empty() {
                config.encodings = Some(labels);
            }
        }
        if let Ok(fallback) = std::env::var("DOCFILL_FALLBACK_ENCODING") {
            config.fallback_encoding = Some(fallback);
        }
        if let Ok(dir) = std::env::var("DOCFILL_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(dir));
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match Self::from_yaml(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
                None
            }
        }
    }

    /// Parse a single config layer
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        if Self::is_blank(contents) {
            return Ok(Config::default());
        }
        serde_yml::from_str(contents)
    }

    /// True when a config file holds nothing but whitespace and comments
    pub fn is_blank(contents: &str) -> bool {
        contents
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'))
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docfill")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.encodings.is_some() {
            self.encodings = other.encodings;
        }
        if other.fallback_encoding.is_some() {
            self.fallback_encoding = other.fallback_encoding;
        }
        if other.decode_policy.is_some() {
            self.decode_policy = other.decode_policy;
        }
        if other.output_dir.is_some() {
            self.output_dir = other.output_dir;
        }
        if other.on_collision.is_some() {
            self.on_collision = other.on_collision;
        }
    }

    /// Effective encoding labels in priority order
    pub fn encoding_labels(&self) -> Vec<String> {
        self.encodings
            .clone()
            .unwrap_or_else(|| DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect())
    }

    pub fn fallback_label(&self) -> &str {
        self.fallback_encoding.as_deref().unwrap_or(DEFAULT_FALLBACK)
    }

    pub fn decode_policy(&self) -> DecodePolicy {
        self.decode_policy.unwrap_or_default()
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.on_collision.unwrap_or_default()
    }

    /// Build the candidate set described by this config
    pub fn candidate_set(&self) -> Result<CandidateSet, EncodingError> {
        let labels = self.encoding_labels();
        CandidateSet::from_labels(labels.as_slice(), self.decode_policy())
    }

    /// Build a generator from this config
    pub fn generator(&self) -> Result<Generator, GenerationError> {
        let candidates = self.candidate_set()?;
        let fallback = fallback_codec(self.fallback_label())?;
        Generator::new(candidates, fallback)
    }

    /// Output directory: explicit config (relative to the workspace root when
    /// inside one), else the workspace generated/ dir, else the current dir
    pub fn output_dir(&self, workspace: Option<&Workspace>) -> PathBuf {
        match (&self.output_dir, workspace) {
            (Some(dir), Some(ws)) if dir.is_relative() => ws.root().join(dir),
            (Some(dir), _) => dir.clone(),
            (None, Some(ws)) => ws.generated_dir(),
            (None, None) => PathBuf::from("."),
        }
    }
}
