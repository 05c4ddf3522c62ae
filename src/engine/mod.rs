//! Placeholder engine - encoding selection, matching and substitution

pub mod encoding;
pub mod fallback;
pub mod fields;
pub mod generator;
pub mod grammar;
pub mod inventory;
pub mod matcher;
pub mod report;
pub mod selector;
pub mod substitution;

pub use encoding::{CandidateSet, Codec, DecodePolicy, EncodingCandidate, EncodingError};
pub use fields::{FieldValues, FieldsError};
pub use generator::{Filled, GeneratedDocument, GenerationError, Generator};
pub use grammar::{Grammar, Syntax};
pub use inventory::{PlaceholderInventory, PlaceholderToken};
pub use matcher::{MatchReport, MatchRule};
pub use report::{GenerationReport, Outcome};
pub use selector::{CandidateAttempt, Selection};
pub use substitution::{Replacement, ReplacementPlan};
