//! Generation orchestrator
//!
//! Reads a template, runs selection, matching, text substitution and (if
//! needed) byte fallback, then writes exactly one output file. The source
//! template is never modified.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::destination::{DestinationError, OutputDestination};
use crate::engine::encoding::{CandidateSet, Codec, EncodingError};
use crate::engine::fallback;
use crate::engine::fields::FieldValues;
use crate::engine::grammar::Grammar;
use crate::engine::matcher::{match_fields, MatchReport};
use crate::engine::report::{fingerprint, GenerationReport, Outcome};
use crate::engine::selector::{select, Selection};
use crate::engine::substitution::ReplacementPlan;

/// A generated document, ready for the caller to persist
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub report: GenerationReport,
}

/// Output of an in-memory fill
#[derive(Debug, Clone)]
pub struct Filled {
    pub bytes: Vec<u8>,
    pub report: GenerationReport,
}

/// Stateless placeholder engine
///
/// Holds only immutable configuration, so one instance can serve
/// concurrent calls from several threads.
#[derive(Debug, Clone)]
pub struct Generator {
    candidates: CandidateSet,
    grammar: Grammar,
    fallback: Codec,
}

impl Generator {
    /// Build a generator; the fallback codec must be single-byte
    pub fn new(candidates: CandidateSet, fallback: Codec) -> Result<Self, GenerationError> {
        if !fallback.is_single_byte() {
            return Err(EncodingError::NotSingleByte(fallback.name().to_string()).into());
        }
        let grammar = Grammar::new().map_err(|e| GenerationError::Grammar(e.to_string()))?;
        Ok(Self {
            candidates,
            grammar,
            fallback,
        })
    }

    /// Default candidates with windows-1251 byte fallback
    pub fn with_defaults() -> Result<Self, GenerationError> {
        Self::new(
            CandidateSet::default(),
            Codec::Standard(encoding_rs::WINDOWS_1251),
        )
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    pub fn fallback_codec(&self) -> Codec {
        self.fallback
    }

    /// Run encoding selection only
    pub fn scan(&self, raw: &[u8]) -> Selection {
        select(raw, &self.candidates, &self.grammar)
    }

    /// Fill placeholders in template bytes without touching the filesystem
    pub fn fill(&self, raw: &[u8], fields: &FieldValues) -> Filled {
        let selection = self.scan(raw);

        if fields.is_empty() {
            info!("no field values supplied, template left unchanged");
            let report = self.report(raw, &selection, MatchReport::default(), Outcome::Untouched);
            return Filled {
                bytes: raw.to_vec(),
                report,
            };
        }

        let matching = match_fields(fields, &selection.inventory);
        let plan = ReplacementPlan::build(fields, &selection.text, &selection.inventory, &matching);
        let substituted = plan.apply(&selection.text);
        let text_replacements = substituted.replacements;
        info!(
            planned = plan.len(),
            replaced = text_replacements,
            "text substitution finished"
        );

        if let Some(bytes) = substituted.into_bytes(selection.candidate.codec) {
            let mut report = self.report(raw, &selection, matching, Outcome::Text);
            report.text_replacements = text_replacements;
            return Filled { bytes, report };
        }

        warn!(
            encoding = %selection.candidate.label,
            "text substitution replaced nothing, falling back to byte replacement"
        );
        let outcome = fallback::apply(raw, fields, self.fallback);
        let result = if outcome.replacements > 0 {
            warn!(
                replaced = outcome.replacements,
                "byte fallback succeeded; chosen text encoding was likely wrong"
            );
            Outcome::Degraded
        } else {
            warn!("no placeholder was replaced; output equals the template");
            Outcome::NoReplacements
        };

        let mut report = self.report(raw, &selection, matching, result);
        report.fallback_triggered = true;
        report.fallback_replacements = outcome.replacements;
        Filled {
            bytes: outcome.bytes,
            report,
        }
    }

    /// Generate a document from a template file
    ///
    /// Fails before any processing when the template cannot be read. The
    /// output directory is created if missing.
    pub fn generate(
        &self,
        template: &Path,
        fields: &FieldValues,
        destination: &dyn OutputDestination,
        file_name: &str,
    ) -> Result<GeneratedDocument, GenerationError> {
        let raw = std::fs::read(template).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GenerationError::TemplateNotFound(template.to_path_buf()),
            _ => GenerationError::TemplateUnreadable {
                path: template.to_path_buf(),
                source: e,
            },
        })?;

        let path = destination.resolve(file_name)?;
        if is_same_file(template, &path) {
            return Err(GenerationError::OutputIsTemplate(path));
        }

        let Filled { bytes, mut report } = self.fill(&raw, fields);
        report.template = Some(template.to_path_buf());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GenerationError::OutputDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&path, &bytes).map_err(|e| GenerationError::OutputWrite {
            path: path.clone(),
            source: e,
        })?;

        info!(
            output = %path.display(),
            outcome = %report.outcome,
            replacements = report.total_replacements(),
            "document generated"
        );

        Ok(GeneratedDocument {
            path,
            bytes,
            report,
        })
    }

    fn report(
        &self,
        raw: &[u8],
        selection: &Selection,
        matching: MatchReport,
        outcome: Outcome,
    ) -> GenerationReport {
        GenerationReport {
            template: None,
            template_sha256: fingerprint(raw),
            generated_at: Utc::now(),
            encoding: selection.candidate.label.clone(),
            encoding_fell_back: selection.fell_back,
            attempts: selection.attempts.clone(),
            placeholders: selection.inventory.names().map(str::to_string).collect(),
            matching,
            text_replacements: 0,
            fallback_triggered: false,
            fallback_replacements: 0,
            outcome,
        }
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Errors surfaced by the generator
#[derive(Debug, Error, Diagnostic)]
pub enum GenerationError {
    #[error("template not found: {0:?}")]
    #[diagnostic(
        code(docfill::template::not_found),
        help("check the path, or place the template under the workspace templates/ directory")
    )]
    TemplateNotFound(PathBuf),

    #[error("cannot read template {path:?}")]
    #[diagnostic(code(docfill::template::unreadable))]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output path {0:?} is the template itself")]
    #[diagnostic(
        code(docfill::output::is_template),
        help("templates are never modified; choose another output name or directory")
    )]
    OutputIsTemplate(PathBuf),

    #[error("cannot create output directory {path:?}")]
    #[diagnostic(code(docfill::output::directory))]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write output {path:?}")]
    #[diagnostic(code(docfill::output::write))]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Destination(#[from] DestinationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Encoding(#[from] EncodingError),

    #[error("invalid placeholder grammar: {0}")]
    #[diagnostic(code(docfill::grammar))]
    Grammar(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::destination::DirectoryDestination;
    use crate::engine::encoding::DecodePolicy;
    use encoding_rs::{UTF_16LE, WINDOWS_1251};
    use tempfile::tempdir;

    const HEADER: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00, 0x00];

    fn template(body: &[u8]) -> Vec<u8> {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(body);
        bytes.extend_from_slice(&[0x00, 0x03, 0xFE, 0xFF]);
        bytes
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_empty_fields_round_trip() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"Hello {{Foo}} [Bar]");
        let filled = generator.fill(&raw, &FieldValues::new());
        assert_eq!(filled.bytes, raw);
        assert_eq!(filled.report.outcome, Outcome::Untouched);
        assert!(!filled.report.is_anomaly());
        assert_eq!(filled.report.placeholders, vec!["Bar", "Foo"]);
    }

    #[test]
    fn test_exact_match_text_path() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"Hello {{Foo}}!");
        let filled = generator.fill(&raw, &fields(&[("Foo", "Bar")]));

        assert_eq!(filled.bytes, template(b"Hello Bar!"));
        assert_eq!(filled.report.outcome, Outcome::Text);
        assert_eq!(filled.report.encoding, "windows-1251");
        assert_eq!(filled.report.text_replacements, 1);
        assert!(!filled.report.fallback_triggered);
    }

    #[test]
    fn test_longest_first_in_full_pipeline() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"{{Name}}|{{NameExtra}}|$Name|$NameExtra");
        let filled = generator.fill(&raw, &fields(&[("Name", "N"), ("NameExtra", "E")]));
        assert_eq!(filled.bytes, template(b"N|E|N|E"));
    }

    #[test]
    fn test_cyrillic_template_text_path() {
        let generator = Generator::with_defaults().unwrap();
        let codec = Codec::Standard(WINDOWS_1251);
        let raw = template(&codec.encode("Договор № <<Номер_Договора>> от [Дата]"));
        let filled = generator.fill(
            &raw,
            &fields(&[("НомерДоговора", "17/2024"), ("Дата", "01.02.2024")]),
        );
        assert_eq!(
            filled.bytes,
            template(&codec.encode("Договор № 17/2024 от 01.02.2024"))
        );
        assert_eq!(filled.report.matching.unresolved, Vec::<String>::new());
    }

    #[test]
    fn test_utf16_template_text_path() {
        let generator = Generator::with_defaults().unwrap();
        let utf16 = Codec::Standard(UTF_16LE);
        let raw = [HEADER.to_vec(), utf16.encode("Name: {{Name}}, Serial: [FactoryNumber]")].concat();
        let filled = generator.fill(&raw, &fields(&[("Name", "Ann"), ("Factory_Number", "77")]));

        let expected = [HEADER.to_vec(), utf16.encode("Name: Ann, Serial: 77")].concat();
        assert_eq!(filled.report.encoding, "utf-16");
        assert_eq!(filled.bytes, expected);
    }

    #[test]
    fn test_binary_fallback_when_text_decode_is_degenerate() {
        // Only UTF-16 is tried, so the 8-bit placeholder never shows up in text
        let candidates = CandidateSet::from_labels(&["utf-16"], DecodePolicy::Lossy).unwrap();
        let generator = Generator::new(candidates, Codec::Standard(WINDOWS_1251)).unwrap();
        let raw = template(b"ab{{Foo}}cd{{Foo}}");
        let filled = generator.fill(&raw, &fields(&[("Foo", "LongerValue")]));

        assert_eq!(filled.report.text_replacements, 0);
        assert!(filled.report.fallback_triggered);
        assert_eq!(filled.report.fallback_replacements, 2);
        assert_eq!(filled.report.outcome, Outcome::Degraded);
        assert_eq!(
            filled.bytes.len() as isize - raw.len() as isize,
            2 * ("LongerValue".len() as isize - "{{Foo}}".len() as isize)
        );
        assert_eq!(filled.bytes, template(b"abLongerValuecdLongerValue"));
    }

    #[test]
    fn test_zero_replacement_is_flagged() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"no placeholders here at all");
        let filled = generator.fill(&raw, &fields(&[("Foo", "Bar")]));

        assert_eq!(filled.bytes, raw);
        assert_eq!(filled.report.outcome, Outcome::NoReplacements);
        assert!(filled.report.is_anomaly());
        assert_eq!(filled.report.total_replacements(), 0);
        assert!(filled.report.encoding_fell_back);
        assert_eq!(filled.report.matching.unused_fields, vec!["Foo"]);
    }

    #[test]
    fn test_value_equal_to_placeholder_is_no_replacement() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"{{A}}");
        let filled = generator.fill(&raw, &fields(&[("A", "{{A}}")]));

        assert_eq!(filled.bytes, raw);
        assert_eq!(filled.report.text_replacements, 0);
        assert_eq!(filled.report.fallback_replacements, 0);
        assert_eq!(filled.report.outcome, Outcome::NoReplacements);
    }

    #[test]
    fn test_unresolved_placeholders_stay_literal() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"{{Known}} and {{Unknown}}");
        let filled = generator.fill(&raw, &fields(&[("Known", "k")]));
        assert_eq!(filled.bytes, template(b"k and {{Unknown}}"));
        assert_eq!(filled.report.matching.unresolved, vec!["Unknown"]);
    }

    #[test]
    fn test_rejects_multi_byte_fallback() {
        let err = Generator::new(CandidateSet::default(), Codec::Standard(encoding_rs::UTF_8))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Encoding(EncodingError::NotSingleByte(_))));
    }

    #[test]
    fn test_generate_writes_output_and_keeps_template() {
        let tmp = tempdir().unwrap();
        let template_path = tmp.path().join("contract.doc");
        let raw = template(b"Client: [Client]");
        std::fs::write(&template_path, &raw).unwrap();

        let generator = Generator::with_defaults().unwrap();
        let dest = DirectoryDestination::new(tmp.path().join("out/nested"));
        let doc = generator
            .generate(&template_path, &fields(&[("Client", "ACME")]), &dest, "acme.doc")
            .unwrap();

        assert_eq!(doc.path, tmp.path().join("out/nested/acme.doc"));
        assert_eq!(std::fs::read(&doc.path).unwrap(), doc.bytes);
        assert_eq!(doc.bytes, template(b"Client: ACME"));
        assert_eq!(std::fs::read(&template_path).unwrap(), raw);
        assert_eq!(doc.report.template.as_deref(), Some(template_path.as_path()));
    }

    #[test]
    fn test_generate_missing_template_fails_before_writing() {
        let tmp = tempdir().unwrap();
        let generator = Generator::with_defaults().unwrap();
        let dest = DirectoryDestination::new(tmp.path().join("out"));
        let err = generator
            .generate(&tmp.path().join("missing.doc"), &FieldValues::new(), &dest, "x.doc")
            .unwrap_err();

        assert!(matches!(err, GenerationError::TemplateNotFound(_)));
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_generate_refuses_to_overwrite_template() {
        let tmp = tempdir().unwrap();
        let template_path = tmp.path().join("t.doc");
        std::fs::write(&template_path, template(b"{{A}}")).unwrap();

        let generator = Generator::with_defaults().unwrap();
        let dest = DirectoryDestination::new(tmp.path());
        let err = generator
            .generate(&template_path, &fields(&[("A", "1")]), &dest, "t.doc")
            .unwrap_err();
        assert!(matches!(err, GenerationError::OutputIsTemplate(_)));
        assert_eq!(std::fs::read(&template_path).unwrap(), template(b"{{A}}"));
    }

    #[test]
    fn test_concurrent_generations_share_one_generator() {
        let generator = Generator::with_defaults().unwrap();
        let raw = template(b"[Who] says $What");

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let generator = &generator;
                    let raw = &raw;
                    scope.spawn(move || {
                        let who = format!("user{}", i);
                        let filled = generator.fill(raw, &fields(&[("Who", who.as_str()), ("What", "hi")]));
                        (who, filled.bytes)
                    })
                })
                .collect();

            for handle in handles {
                let (who, bytes) = handle.join().unwrap();
                let expected = template(format!("{} says hi", who).as_bytes());
                assert_eq!(bytes, expected);
            }
        });
    }
}
