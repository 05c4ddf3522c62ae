//! Byte-level placeholder replacement
//!
//! Used when the text path replaced nothing. Each field's canonical literal
//! forms are encoded with a legacy 8-bit code page and searched for directly
//! in the raw template bytes. Non-matching bytes are copied through as-is;
//! the buffer is never decoded as a whole.

use std::cmp::Reverse;

use tracing::debug;

use crate::engine::encoding::Codec;
use crate::engine::fields::FieldValues;
use crate::engine::grammar::Syntax;

/// Encoded target/replacement pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    pub target: Vec<u8>,
    pub replacement: Vec<u8>,
}

/// Result of the byte-level pass
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub bytes: Vec<u8>,
    /// Total occurrences replaced across all patterns
    pub replacements: usize,
}

/// Encode every canonical literal of every usable field
///
/// Patterns are ordered longest target first, matching the text path.
/// A pattern whose replacement equals its target is dropped.
pub fn byte_patterns(fields: &FieldValues, codec: Codec) -> Vec<BytePattern> {
    let mut patterns: Vec<BytePattern> = Vec::new();
    for (field, value) in fields.usable() {
        let replacement = codec.encode(value);
        for syntax in Syntax::ALL {
            let pattern = BytePattern {
                target: codec.encode(&syntax.literal(field)),
                replacement: replacement.clone(),
            };
            if pattern.target != pattern.replacement && !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
    }
    patterns.sort_by_key(|p| Reverse(p.target.len()));
    patterns
}

/// Replace field placeholders directly in `raw`
pub fn apply(raw: &[u8], fields: &FieldValues, codec: Codec) -> FallbackOutcome {
    let mut current = raw.to_vec();
    let mut scratch = Vec::with_capacity(raw.len());
    let mut replacements = 0;

    for pattern in byte_patterns(fields, codec) {
        let count = replace_into(&current, &pattern.target, &pattern.replacement, &mut scratch);
        if count > 0 {
            debug!(
                target_len = pattern.target.len(),
                occurrences = count,
                "replaced placeholder bytes"
            );
            std::mem::swap(&mut current, &mut scratch);
            replacements += count;
        }
    }

    FallbackOutcome {
        bytes: current,
        replacements,
    }
}

/// Copy `haystack` into `out`, replacing every non-overlapping `needle`
/// left to right. Returns the number of replacements.
///
/// `out` is cleared first and reused as the output buffer.
pub fn replace_into(haystack: &[u8], needle: &[u8], replacement: &[u8], out: &mut Vec<u8>) -> usize {
    out.clear();
    let Some(&first) = needle.first() else {
        out.extend_from_slice(haystack);
        return 0;
    };

    let mut count = 0;
    let mut copied = 0;
    let mut pos = 0;

    while pos + needle.len() <= haystack.len() {
        let Some(offset) = haystack[pos..=haystack.len() - needle.len()]
            .iter()
            .position(|&b| b == first)
        else {
            break;
        };
        let start = pos + offset;
        if haystack[start..].starts_with(needle) {
            out.extend_from_slice(&haystack[copied..start]);
            out.extend_from_slice(replacement);
            pos = start + needle.len();
            copied = pos;
            count += 1;
        } else {
            pos = start + 1;
        }
    }

    out.extend_from_slice(&haystack[copied..]);
    count
}
