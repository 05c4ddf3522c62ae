//! Field-to-placeholder reconciliation
//!
//! Rules, first success wins per field:
//! 1. case-insensitive exact match
//! 2. case-insensitive match with all underscores removed from both sides
//!
//! Misses in either direction are diagnostics, never errors.

use serde::Serialize;
use tracing::debug;

use crate::engine::fields::FieldValues;
use crate::engine::inventory::PlaceholderInventory;

/// Which rule reconciled a field with a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMatch {
    pub field: String,
    pub placeholder: String,
    pub rule: MatchRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub matches: Vec<FieldMatch>,
    /// Fields with no corresponding placeholder
    pub unused_fields: Vec<String>,
    /// Placeholders no field resolved; they stay as literal text
    pub unresolved: Vec<String>,
}

impl MatchReport {
    /// Placeholder names matched to `field`
    pub fn placeholders_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.matches
            .iter()
            .filter(move |m| m.field == field)
            .map(|m| m.placeholder.as_str())
    }
}

/// Lowercase and strip underscores
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Reconcile supplied fields against discovered placeholders
pub fn match_fields(fields: &FieldValues, inventory: &PlaceholderInventory) -> MatchReport {
    let mut report = MatchReport::default();

    let lowered: Vec<(&str, String, String)> = inventory
        .names()
        .map(|name| (name, name.to_lowercase(), normalize(name)))
        .collect();

    for (field, _) in fields.iter() {
        if field.trim().is_empty() {
            report.unused_fields.push(field.to_string());
            continue;
        }

        let field_lower = field.to_lowercase();
        let mut found: Vec<(&str, MatchRule)> = lowered
            .iter()
            .filter(|(_, lower, _)| *lower == field_lower)
            .map(|(name, _, _)| (*name, MatchRule::Exact))
            .collect();

        if found.is_empty() {
            let field_norm = normalize(field);
            found = lowered
                .iter()
                .filter(|(_, _, norm)| !norm.is_empty() && *norm == field_norm)
                .map(|(name, _, _)| (*name, MatchRule::Normalized))
                .collect();
        }

        if found.is_empty() {
            debug!(field = %field, "field matches no placeholder");
            report.unused_fields.push(field.to_string());
            continue;
        }

        for (placeholder, rule) in found {
            debug!(field = %field, placeholder = %placeholder, rule = ?rule, "matched field");
            report.matches.push(FieldMatch {
                field: field.to_string(),
                placeholder: placeholder.to_string(),
                rule,
            });
        }
    }

    for name in inventory.names() {
        if !report.matches.iter().any(|m| m.placeholder == name) {
            debug!(placeholder = %name, "placeholder left unresolved");
            report.unresolved.push(name.to_string());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grammar::Grammar;

    fn inventory(text: &str) -> PlaceholderInventory {
        Grammar::new().unwrap().inventory(text)
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Factory_Number"), "factorynumber");
        assert_eq!(normalize("__ИНН__"), "инн");
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        let inv = inventory("{{clientname}}");
        let report = match_fields(&fields(&[("ClientName", "ACME")]), &inv);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].placeholder, "clientname");
        assert_eq!(report.matches[0].rule, MatchRule::Exact);
        assert!(report.unused_fields.is_empty());
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_underscore_insensitive_match() {
        let inv = inventory("No. [FactoryNumber]");
        let report = match_fields(&fields(&[("Factory_Number", "F-77")]), &inv);
        assert_eq!(
            report.matches,
            vec![FieldMatch {
                field: "Factory_Number".to_string(),
                placeholder: "FactoryNumber".to_string(),
                rule: MatchRule::Normalized,
            }]
        );
    }

    #[test]
    fn test_exact_rule_shadows_normalized() {
        let inv = inventory("{{Due_Date}} {{DueDate}}");
        let report = match_fields(&fields(&[("DueDate", "x")]), &inv);
        let names: Vec<&str> = report.placeholders_for("DueDate").collect();
        assert_eq!(names, vec!["DueDate"]);
        assert_eq!(report.unresolved, vec!["Due_Date"]);
    }

    #[test]
    fn test_unused_and_unresolved_are_reported() {
        let inv = inventory("{{Known}} <<Orphan>>");
        let report = match_fields(&fields(&[("Known", "1"), ("Extra", "2"), ("", "3")]), &inv);
        assert_eq!(report.unused_fields, vec!["", "Extra"]);
        assert_eq!(report.unresolved, vec!["Orphan"]);
    }

    #[test]
    fn test_one_field_can_match_several_case_variants() {
        let inv = inventory("$name $NAME");
        let report = match_fields(&fields(&[("Name", "x")]), &inv);
        assert_eq!(report.matches.len(), 2);
        assert!(report.unresolved.is_empty());
    }
}
