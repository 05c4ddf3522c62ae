//! Generation report - what the engine decided and why

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::engine::matcher::MatchReport;
use crate::engine::selector::CandidateAttempt;

/// How a generation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No fields supplied; output is the template unchanged
    Untouched,
    /// Text substitution replaced at least one placeholder
    Text,
    /// Text path replaced nothing, byte fallback replaced at least one
    Degraded,
    /// Neither path replaced anything; output is the template unchanged
    NoReplacements,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Untouched => write!(f, "untouched"),
            Outcome::Text => write!(f, "text"),
            Outcome::Degraded => write!(f, "degraded (byte fallback)"),
            Outcome::NoReplacements => write!(f, "no replacements"),
        }
    }
}

/// Diagnostics for one generation call
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub template: Option<PathBuf>,
    pub template_sha256: String,
    pub generated_at: DateTime<Utc>,
    pub encoding: String,
    /// No candidate yielded placeholders; the primary encoding was used
    pub encoding_fell_back: bool,
    pub attempts: Vec<CandidateAttempt>,
    pub placeholders: Vec<String>,
    #[serde(flatten)]
    pub matching: MatchReport,
    pub text_replacements: usize,
    pub fallback_triggered: bool,
    pub fallback_replacements: usize,
    pub outcome: Outcome,
}

impl GenerationReport {
    pub fn total_replacements(&self) -> usize {
        self.text_replacements + self.fallback_replacements
    }

    /// Fields were supplied but nothing was replaced
    ///
    /// Almost always means the template's syntax or encoding was not
    /// recognized; callers should surface it.
    pub fn is_anomaly(&self) -> bool {
        self.outcome == Outcome::NoReplacements
    }
}

/// Hex SHA-256 of template bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(b"template");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(b"template"));
        assert_ne!(a, fingerprint(b"template2"));
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Outcome::NoReplacements).unwrap(),
            "\"no_replacements\""
        );
    }
}
