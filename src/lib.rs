//! docfill: fill placeholders in legacy document templates
//!
//! Reads a binary word-processor template of unknown text encoding, finds
//! `{{Name}}`, `<<Name>>`, `[Name]` and `$Name` placeholders, and writes a
//! new document with field values substituted, falling back to raw byte
//! replacement when the text path cannot find anything.

pub mod cli;
pub mod core;
pub mod engine;
