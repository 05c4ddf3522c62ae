//! Encoding selection by placeholder yield
//!
//! Every candidate is decoded and scanned. The candidate whose decode yields
//! the most distinct placeholder names wins; ties keep the earlier candidate.
//! All attempts are kept so a misdetection can be diagnosed from the report.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::encoding::{CandidateSet, EncodingCandidate};
use crate::engine::grammar::Grammar;
use crate::engine::inventory::PlaceholderInventory;

/// Result of one candidate decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Decoded { placeholders: usize },
    Skipped { reason: String },
}

/// Audit record for one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateAttempt {
    pub encoding: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl CandidateAttempt {
    /// Inventory size, zero when skipped
    pub fn placeholders(&self) -> usize {
        match self.outcome {
            AttemptOutcome::Decoded { placeholders } => placeholders,
            AttemptOutcome::Skipped { .. } => 0,
        }
    }
}

/// Winning interpretation of the template bytes
#[derive(Debug, Clone)]
pub struct Selection {
    pub candidate: EncodingCandidate,
    pub text: String,
    pub inventory: PlaceholderInventory,
    /// Every candidate tried, in priority order
    pub attempts: Vec<CandidateAttempt>,
    /// True when no candidate yielded placeholders and the primary was used
    pub fell_back: bool,
}

/// Pick the decode of `bytes` exposing the most placeholders
pub fn select(bytes: &[u8], candidates: &CandidateSet, grammar: &Grammar) -> Selection {
    let mut attempts = Vec::with_capacity(candidates.len());
    let mut best: Option<(EncodingCandidate, String, PlaceholderInventory)> = None;

    for candidate in candidates.iter() {
        let text = match candidates.decode(candidate, bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!(encoding = %candidate.label, error = %e, "skipping encoding candidate");
                attempts.push(CandidateAttempt {
                    encoding: candidate.label.clone(),
                    outcome: AttemptOutcome::Skipped {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };

        let inventory = grammar.inventory(&text);
        let count = inventory.len();
        debug!(encoding = %candidate.label, placeholders = count, "decoded encoding candidate");
        attempts.push(CandidateAttempt {
            encoding: candidate.label.clone(),
            outcome: AttemptOutcome::Decoded {
                placeholders: count,
            },
        });

        let current = best.as_ref().map(|(_, _, inv)| inv.len()).unwrap_or(0);
        if count > current {
            best = Some((candidate.clone(), text.into_owned(), inventory));
        }
    }

    match best {
        Some((candidate, text, inventory)) => {
            info!(
                encoding = %candidate.label,
                placeholders = inventory.len(),
                "selected template encoding"
            );
            Selection {
                candidate,
                text,
                inventory,
                attempts,
                fell_back: false,
            }
        }
        None => {
            let primary = candidates.primary().clone();
            warn!(
                encoding = %primary.label,
                "no encoding candidate yielded placeholders, using primary; replacement will rely on byte fallback"
            );
            let text = primary.codec.decode(bytes).text.into_owned();
            Selection {
                candidate: primary,
                text,
                inventory: PlaceholderInventory::new(),
                attempts,
                fell_back: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::encoding::{Codec, DecodePolicy};
    use encoding_rs::{IBM866, UTF_16LE};

    fn grammar() -> Grammar {
        Grammar::new().unwrap()
    }

    fn utf16(text: &str) -> Vec<u8> {
        Codec::Standard(UTF_16LE).encode(text)
    }

    #[test]
    fn test_single_byte_template_picks_primary() {
        let bytes = b"\xD0\xCF\x11\xE0\x00\x00Hello {{Foo}} and <<Bar>>\x00\x01";
        let selection = select(bytes, &CandidateSet::default(), &grammar());

        assert_eq!(selection.candidate.label, "windows-1251");
        assert!(!selection.fell_back);
        assert_eq!(selection.inventory.len(), 2);
        assert_eq!(selection.attempts.len(), 5);
    }

    #[test]
    fn test_utf16_template_picks_utf16() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0];
        bytes.extend(utf16("Dear {{Name}}, order [Order] for $Amount"));
        let selection = select(&bytes, &CandidateSet::default(), &grammar());

        assert_eq!(selection.candidate.label, "utf-16");
        assert_eq!(selection.inventory.len(), 3);
        assert!(selection.inventory.contains("Order"));
    }

    #[test]
    fn test_tie_keeps_earlier_candidate() {
        // Pure ASCII decodes identically under 1251, ascii, utf-8 and 866
        let bytes = b"{{A}} {{B}}";
        let selection = select(bytes, &CandidateSet::default(), &grammar());
        assert_eq!(selection.candidate.label, "windows-1251");

        let reordered = CandidateSet::from_labels(&["ibm866", "utf-8"], DecodePolicy::Lossy).unwrap();
        let selection = select(bytes, &reordered, &grammar());
        assert_eq!(selection.candidate.codec, Codec::Standard(IBM866));
    }

    #[test]
    fn test_equal_count_keeps_earlier_legacy_page() {
        // 0xE0 0xE1 are letters in both 1251 ("аб") and 866 ("рс")
        let bytes = b"$\xE0\xE1";
        let selection = select(bytes, &CandidateSet::default(), &grammar());
        assert_eq!(selection.candidate.label, "windows-1251");
        assert!(selection.inventory.contains("аб"));
    }

    #[test]
    fn test_later_candidate_wins_on_strictly_more() {
        // 0xA4 0xA7 are "¤§" in 1251 but "дз" in 866
        let bytes = b"$\xA4\xA7";
        let selection = select(bytes, &CandidateSet::default(), &grammar());
        assert_eq!(selection.candidate.codec, Codec::Standard(IBM866));
        assert!(selection.inventory.contains("дз"));
        assert_eq!(selection.attempts[0].placeholders(), 0);
    }

    #[test]
    fn test_no_placeholders_falls_back_to_primary() {
        let bytes = b"\x00\x01plain body text\xFF";
        let selection = select(bytes, &CandidateSet::default(), &grammar());

        assert!(selection.fell_back);
        assert_eq!(selection.candidate.label, "windows-1251");
        assert!(selection.inventory.is_empty());
        assert!(selection.text.contains("plain body text"));
        assert!(selection.attempts.iter().all(|a| a.placeholders() == 0));
    }

    #[test]
    fn test_strict_policy_skips_malformed_candidates() {
        let set = CandidateSet::from_labels(&["ascii", "windows-1251"], DecodePolicy::Strict).unwrap();
        let bytes = b"\xC4\xE0\xF2\xE0 {{Date}}";
        let selection = select(bytes, &set, &grammar());

        assert!(matches!(
            selection.attempts[0].outcome,
            AttemptOutcome::Skipped { .. }
        ));
        assert_eq!(selection.candidate.label, "windows-1251");
        assert!(selection.text.starts_with("Дата"));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let mut bytes = b"\x11{{One}}[Two]".to_vec();
        bytes.extend(utf16("$Three"));
        let first = select(&bytes, &CandidateSet::default(), &grammar());
        for _ in 0..5 {
            let again = select(&bytes, &CandidateSet::default(), &grammar());
            assert_eq!(again.candidate, first.candidate);
            assert_eq!(again.inventory, first.inventory);
            assert_eq!(again.attempts, first.attempts);
        }
    }
}
