//! Field values supplied by the caller
//!
//! Keys are field technical names, values are the text to insert. A missing
//! key means "leave placeholders with this name alone"; a null value from a
//! fields file is stored as the empty string.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

/// Field name to value map with deterministic (sorted) iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: BTreeMap<String, String>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fields whose names can produce a placeholder literal
    pub fn usable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(name, _)| !name.trim().is_empty())
    }

    /// Merge `other` into this map; `other` wins on conflicts
    pub fn extend(&mut self, other: FieldValues) {
        self.values.extend(other.values);
    }

    /// Parse a `KEY=VALUE` assignment from the command line
    pub fn parse_assignment(input: &str) -> Result<(String, String), FieldsError> {
        let (key, value) = input
            .split_once('=')
            .ok_or_else(|| FieldsError::InvalidAssignment(input.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(FieldsError::InvalidAssignment(input.to_string()));
        }
        Ok((key.to_string(), value.to_string()))
    }

    /// Load a fields file, choosing the parser by extension
    ///
    /// `.yaml`/`.yml` and `.json` hold a flat mapping; `.csv` holds
    /// `name,value` rows under a header line.
    pub fn load(path: &Path) -> Result<Self, FieldsError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => {
                let contents = read(path)?;
                let raw: BTreeMap<String, Option<FieldScalar>> = serde_yml::from_str(&contents)
                    .map_err(|e| FieldsError::Parse {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                Ok(Self::from_raw(raw))
            }
            "json" => {
                let contents = read(path)?;
                let raw: BTreeMap<String, Option<FieldScalar>> = serde_json::from_str(&contents)
                    .map_err(|e| FieldsError::Parse {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                Ok(Self::from_raw(raw))
            }
            "csv" => Self::load_csv(path),
            _ => Err(FieldsError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn load_csv(path: &Path) -> Result<Self, FieldsError> {
        let file = File::open(path).map_err(|e| FieldsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(BufReader::new(file));

        let mut fields = FieldValues::new();
        for (row_idx, result) in rdr.records().enumerate() {
            let row_num = row_idx + 2; // +2 for 1-indexed and header row
            let record = result.map_err(|e| FieldsError::Parse {
                path: path.to_path_buf(),
                message: format!("row {}: {}", row_num, e),
            })?;
            let Some(name) = record.get(0).map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            fields.insert(name, record.get(1).unwrap_or_default());
        }
        Ok(fields)
    }

    fn from_raw(raw: BTreeMap<String, Option<FieldScalar>>) -> Self {
        raw.into_iter()
            .map(|(k, v)| (k, v.map(FieldScalar::into_text).unwrap_or_default()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FieldValues::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Scalar accepted as a field value in YAML/JSON fields files
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl FieldScalar {
    fn into_text(self) -> String {
        match self {
            FieldScalar::Text(s) => s,
            FieldScalar::Integer(i) => i.to_string(),
            FieldScalar::Float(f) => f.to_string(),
            FieldScalar::Bool(b) => b.to_string(),
        }
    }
}

fn read(path: &Path) -> Result<String, FieldsError> {
    std::fs::read_to_string(path).map_err(|e| FieldsError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors raised while collecting field values
#[derive(Debug, Error, Diagnostic)]
pub enum FieldsError {
    #[error("invalid field assignment '{0}'")]
    #[diagnostic(
        code(docfill::fields::assignment),
        help("use KEY=VALUE, e.g. --set ClientName=\"ACME Ltd\"")
    )]
    InvalidAssignment(String),

    #[error("cannot read fields file {path:?}")]
    #[diagnostic(code(docfill::fields::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse fields file {path:?}: {message}")]
    #[diagnostic(
        code(docfill::fields::parse),
        help("fields files hold a flat mapping of field name to value")
    )]
    Parse { path: PathBuf, message: String },

    #[error("unsupported fields file {0:?}")]
    #[diagnostic(
        code(docfill::fields::format),
        help("use a .yaml, .yml, .json or .csv file")
    )]
    UnsupportedFormat(PathBuf),
}
