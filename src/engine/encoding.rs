//! Candidate text encodings tried when reading a binary template as text
//!
//! A legacy word-processor template carries its text runs in whatever code
//! page the authoring machine used. The engine does not sniff; it tries an
//! ordered list of candidates and lets the selector pick the decode that
//! exposes the most placeholders.

use std::borrow::Cow;

use encoding_rs::{EncoderResult, Encoding, IBM866, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1251};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default candidate priority, first entry is also the selector fallback
pub const DEFAULT_PRIORITY: &[&str] = &["windows-1251", "ascii", "utf-8", "utf-16", "ibm866"];

/// Default legacy 8-bit encoding for byte-level fallback replacement
pub const DEFAULT_FALLBACK: &str = "windows-1251";

/// A concrete text codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Strict 7-bit ASCII (bytes above 0x7F are malformed)
    Ascii,
    /// Any encoding known to `encoding_rs`
    Standard(&'static Encoding),
}

/// Text produced by a decode, with a flag for malformed input
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub had_errors: bool,
}

impl Codec {
    /// Resolve a label such as `windows-1251`, `cp866`, `utf-16` or `ascii`
    ///
    /// `ascii` is handled here because WHATWG maps that label to windows-1252;
    /// every other label goes through `encoding_rs`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "ascii" | "us-ascii" | "7bit" => Some(Codec::Ascii),
            other => Encoding::for_label(other.as_bytes()).map(Codec::Standard),
        }
    }

    /// Canonical name of the codec
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Ascii => "ascii",
            Codec::Standard(encoding) => encoding.name(),
        }
    }

    /// True when every character maps to exactly one byte
    pub fn is_single_byte(&self) -> bool {
        match self {
            Codec::Ascii => true,
            Codec::Standard(encoding) => encoding.is_single_byte(),
        }
    }

    /// Decode bytes without BOM sniffing; malformed sequences become U+FFFD
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Decoded<'a> {
        match self {
            Codec::Ascii => {
                if bytes.is_ascii() {
                    // ASCII is a subset of UTF-8, so this borrows
                    return Decoded {
                        text: String::from_utf8_lossy(bytes),
                        had_errors: false,
                    };
                }
                let text: String = bytes
                    .iter()
                    .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                    .collect();
                Decoded {
                    text: Cow::Owned(text),
                    had_errors: true,
                }
            }
            Codec::Standard(encoding) => {
                let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
                Decoded { text, had_errors }
            }
        }
    }

    /// Encode text; characters the codec cannot represent become `?`
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Codec::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Codec::Standard(encoding) if *encoding == UTF_8 => text.as_bytes().to_vec(),
            // encoding_rs only encodes to ASCII-compatible encodings
            Codec::Standard(encoding) if *encoding == UTF_16LE => {
                text.encode_utf16().flat_map(u16::to_le_bytes).collect()
            }
            Codec::Standard(encoding) if *encoding == UTF_16BE => {
                text.encode_utf16().flat_map(u16::to_be_bytes).collect()
            }
            Codec::Standard(encoding) => encode_legacy(encoding, text),
        }
    }
}

fn encode_legacy(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(
        encoder
            .max_buffer_length_from_utf8_without_replacement(text.len())
            .unwrap_or(text.len()),
    );
    let mut remaining = text;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(remaining, &mut out, true);
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => out.reserve(remaining.len().max(16)),
            EncoderResult::Unmappable(_) => out.push(b'?'),
        }
    }
    out
}

/// How the selector treats malformed input for a candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Replace malformed sequences and keep the candidate
    #[default]
    Lossy,
    /// Skip any candidate whose decode reports malformed input
    Strict,
}

impl std::fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodePolicy::Lossy => write!(f, "lossy"),
            DecodePolicy::Strict => write!(f, "strict"),
        }
    }
}

/// One encoding tried by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingCandidate {
    /// Label the candidate was configured with
    pub label: String,
    pub codec: Codec,
}

impl EncodingCandidate {
    pub fn new(label: impl Into<String>, codec: Codec) -> Self {
        Self {
            label: label.into(),
            codec,
        }
    }
}

/// Ordered, non-empty list of encoding candidates
///
/// Built once at startup and passed into the generator.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    candidates: Vec<EncodingCandidate>,
    policy: DecodePolicy,
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self {
            candidates: vec![
                EncodingCandidate::new("windows-1251", Codec::Standard(WINDOWS_1251)),
                EncodingCandidate::new("ascii", Codec::Ascii),
                EncodingCandidate::new("utf-8", Codec::Standard(UTF_8)),
                EncodingCandidate::new("utf-16", Codec::Standard(UTF_16LE)),
                EncodingCandidate::new("ibm866", Codec::Standard(IBM866)),
            ],
            policy: DecodePolicy::Lossy,
        }
    }
}

impl CandidateSet {
    /// Build a candidate set from labels, preserving their order
    pub fn from_labels<S: AsRef<str>>(
        labels: &[S],
        policy: DecodePolicy,
    ) -> Result<Self, EncodingError> {
        if labels.is_empty() {
            return Err(EncodingError::NoCandidates);
        }

        let candidates = labels
            .iter()
            .map(|label| {
                let label = label.as_ref().trim();
                Codec::from_label(label)
                    .map(|codec| EncodingCandidate::new(label, codec))
                    .ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { candidates, policy })
    }

    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// First candidate in priority order
    pub fn primary(&self) -> &EncodingCandidate {
        // Construction rejects empty lists
        &self.candidates[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncodingCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Decode bytes with one candidate, honoring the decode policy
    pub fn decode<'a>(
        &self,
        candidate: &EncodingCandidate,
        bytes: &'a [u8],
    ) -> Result<Cow<'a, str>, EncodingError> {
        let decoded = candidate.codec.decode(bytes);
        if decoded.had_errors && self.policy == DecodePolicy::Strict {
            return Err(EncodingError::Malformed {
                encoding: candidate.label.clone(),
            });
        }
        Ok(decoded.text)
    }
}

/// Resolve the legacy codec used by the byte-level fallback
pub fn fallback_codec(label: &str) -> Result<Codec, EncodingError> {
    let codec =
        Codec::from_label(label).ok_or_else(|| EncodingError::UnknownLabel(label.to_string()))?;
    if !codec.is_single_byte() {
        return Err(EncodingError::NotSingleByte(label.to_string()));
    }
    Ok(codec)
}

/// Errors raised while configuring or applying encodings
#[derive(Debug, Error, Diagnostic)]
pub enum EncodingError {
    #[error("unknown encoding label '{0}'")]
    #[diagnostic(
        code(docfill::config::unknown_encoding),
        help("use a WHATWG label such as windows-1251, ibm866, utf-8, utf-16, or 'ascii'")
    )]
    UnknownLabel(String),

    #[error("the encoding candidate list is empty")]
    #[diagnostic(
        code(docfill::config::no_candidates),
        help("list at least one encoding under 'encodings' in config.yaml")
    )]
    NoCandidates,

    #[error("fallback encoding '{0}' is not a single-byte encoding")]
    #[diagnostic(
        code(docfill::config::fallback_not_single_byte),
        help("byte-level fallback needs a legacy 8-bit code page such as windows-1251")
    )]
    NotSingleByte(String),

    #[error("template bytes are not valid {encoding}")]
    #[diagnostic(code(docfill::encoding::malformed))]
    Malformed { encoding: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_matches_priority_labels() {
        let set = CandidateSet::default();
        let labels: Vec<&str> = set.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, DEFAULT_PRIORITY);

        let from_labels = CandidateSet::from_labels(DEFAULT_PRIORITY, DecodePolicy::Lossy).unwrap();
        let codecs: Vec<Codec> = from_labels.iter().map(|c| c.codec).collect();
        let default_codecs: Vec<Codec> = set.iter().map(|c| c.codec).collect();
        assert_eq!(codecs, default_codecs);
    }

    #[test]
    fn test_label_resolution() {
        assert_eq!(Codec::from_label("ascii"), Some(Codec::Ascii));
        assert_eq!(Codec::from_label("cp1251"), Some(Codec::Standard(WINDOWS_1251)));
        assert_eq!(Codec::from_label(" CP866 "), Some(Codec::Standard(IBM866)));
        assert_eq!(Codec::from_label("utf-16"), Some(Codec::Standard(UTF_16LE)));
        assert_eq!(Codec::from_label("klingon"), None);
    }

    #[test]
    fn test_from_labels_rejects_unknown_and_empty() {
        let err = CandidateSet::from_labels(&["utf-8", "nope"], DecodePolicy::Lossy).unwrap_err();
        assert!(matches!(err, EncodingError::UnknownLabel(ref l) if l == "nope"));

        let empty: [&str; 0] = [];
        let err = CandidateSet::from_labels(&empty, DecodePolicy::Lossy).unwrap_err();
        assert!(matches!(err, EncodingError::NoCandidates));
    }

    #[test]
    fn test_ascii_decode_flags_high_bytes() {
        let decoded = Codec::Ascii.decode(b"ab\xC0c");
        assert!(decoded.had_errors);
        assert_eq!(decoded.text, "ab\u{FFFD}c");

        let clean = Codec::Ascii.decode(b"plain");
        assert!(!clean.had_errors);
        assert_eq!(clean.text, "plain");
    }

    #[test]
    fn test_strict_policy_reports_malformed() {
        let set = CandidateSet::default().with_policy(DecodePolicy::Strict);
        let ascii = EncodingCandidate::new("ascii", Codec::Ascii);
        let err = set.decode(&ascii, b"\xFF{{A}}").unwrap_err();
        assert!(matches!(err, EncodingError::Malformed { .. }));

        let lossy = CandidateSet::default();
        assert_eq!(lossy.decode(&ascii, b"\xFF{{A}}").unwrap(), "\u{FFFD}{{A}}");
    }

    #[test]
    fn test_cyrillic_round_trip_through_1251() {
        let codec = Codec::Standard(WINDOWS_1251);
        let bytes = codec.encode("Договор {{Номер}}");
        assert_eq!(bytes.len(), "Договор {{Номер}}".chars().count());
        assert_eq!(codec.decode(&bytes).text, "Договор {{Номер}}");
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        let codec = Codec::Standard(WINDOWS_1251);
        assert_eq!(codec.encode("a\u{4E2D}b"), b"a?b");
        assert_eq!(Codec::Ascii.encode("Ж1"), b"?1");
    }

    #[test]
    fn test_utf16_encoding_is_little_endian() {
        let codec = Codec::Standard(UTF_16LE);
        assert_eq!(codec.encode("{A"), vec![b'{', 0, b'A', 0]);
        assert_eq!(codec.decode(&[b'{', 0, b'A', 0]).text, "{A");
    }

    #[test]
    fn test_fallback_codec_must_be_single_byte() {
        assert!(fallback_codec("windows-1251").is_ok());
        assert!(matches!(
            fallback_codec("utf-8").unwrap_err(),
            EncodingError::NotSingleByte(_)
        ));
    }
}
