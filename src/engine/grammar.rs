//! Placeholder grammar
//!
//! Four surface syntaxes are recognized. All share one matcher shape: an
//! opening delimiter, a run of allowed characters, and a closing delimiter
//! (or a word boundary for the sigil form).

use regex::Regex;
use serde::Serialize;

use crate::engine::inventory::{PlaceholderInventory, PlaceholderToken};

/// Placeholder syntax kinds, in matching order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Syntax {
    /// `{{Name}}`
    DoubleBrace,
    /// `<<Name>>`
    DoubleAngle,
    /// `[Name]`
    Bracket,
    /// `$Name`
    Sigil,
}

impl Syntax {
    pub const ALL: [Syntax; 4] = [
        Syntax::DoubleBrace,
        Syntax::DoubleAngle,
        Syntax::Bracket,
        Syntax::Sigil,
    ];

    pub fn opening(self) -> &'static str {
        match self {
            Syntax::DoubleBrace => "{{",
            Syntax::DoubleAngle => "<<",
            Syntax::Bracket => "[",
            Syntax::Sigil => "$",
        }
    }

    /// Closing delimiter; `None` means the token ends at a word boundary
    pub fn closing(self) -> Option<&'static str> {
        match self {
            Syntax::DoubleBrace => Some("}}"),
            Syntax::DoubleAngle => Some(">>"),
            Syntax::Bracket => Some("]"),
            Syntax::Sigil => None,
        }
    }

    /// Canonical literal form of a placeholder named `name`
    pub fn literal(self, name: &str) -> String {
        format!("{}{}{}", self.opening(), name, self.closing().unwrap_or(""))
    }

    fn pattern(self) -> String {
        let open = regex::escape(self.opening());
        match self.closing() {
            Some(close) => {
                // Inner run excludes the first closing character
                let stop = close.chars().next().map(String::from).unwrap_or_default();
                format!(
                    "{}([^{}]+){}",
                    open,
                    regex::escape(&stop),
                    regex::escape(close)
                )
            }
            None => format!(r"{}(\w+)\b", open),
        }
    }
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Syntax::DoubleBrace => write!(f, "double-brace"),
            Syntax::DoubleAngle => write!(f, "double-angle"),
            Syntax::Bracket => write!(f, "bracket"),
            Syntax::Sigil => write!(f, "sigil"),
        }
    }
}

/// Compiled matchers for every syntax
#[derive(Debug, Clone)]
pub struct Grammar {
    matchers: Vec<(Syntax, Regex)>,
}

impl Grammar {
    /// Compile the matchers for all four syntaxes
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_syntaxes(&Syntax::ALL)
    }

    /// Compile matchers for a subset of syntaxes, in the given order
    pub fn with_syntaxes(syntaxes: &[Syntax]) -> Result<Self, regex::Error> {
        let matchers = syntaxes
            .iter()
            .map(|&syntax| Regex::new(&syntax.pattern()).map(|re| (syntax, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// Every placeholder occurrence in `text`, syntax by syntax, left to right
    pub fn scan(&self, text: &str) -> Vec<PlaceholderToken> {
        let mut tokens = Vec::new();
        for (syntax, re) in &self.matchers {
            for caps in re.captures_iter(text) {
                let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let name = inner.as_str().trim();
                if name.is_empty() {
                    continue;
                }
                tokens.push(PlaceholderToken {
                    name: name.to_string(),
                    literal: whole.as_str().to_string(),
                    syntax: *syntax,
                    offset: whole.start(),
                });
            }
        }
        tokens
    }

    /// Build the placeholder inventory for one decoded text
    pub fn inventory(&self, text: &str) -> PlaceholderInventory {
        self.scan(text).into_iter().collect()
    }
}
