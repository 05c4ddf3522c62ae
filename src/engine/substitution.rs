//! Text substitution on the decoded template
//!
//! The plan pairs literal placeholder text with field values and is applied
//! longest target first, so `$Name` never eats the front of `$NameExtra`.

use std::cmp::Reverse;

use serde::Serialize;
use tracing::debug;

use crate::engine::encoding::Codec;
use crate::engine::fields::FieldValues;
use crate::engine::grammar::Syntax;
use crate::engine::inventory::PlaceholderInventory;
use crate::engine::matcher::MatchReport;

/// One literal target and the text that replaces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub target: String,
    pub value: String,
}

/// Ordered replacements, longest target first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReplacementPlan {
    entries: Vec<Replacement>,
}

/// Text after applying a plan
#[derive(Debug, Clone)]
pub struct TextSubstitution {
    pub text: String,
    /// Number of plan entries that changed the text
    pub replacements: usize,
}

impl TextSubstitution {
    /// Re-encode the text, or `None` when nothing was replaced
    pub fn into_bytes(self, codec: Codec) -> Option<Vec<u8>> {
        if self.replacements == 0 {
            return None;
        }
        Some(codec.encode(&self.text))
    }
}

impl ReplacementPlan {
    /// Build the plan for `text`
    ///
    /// For each field: every canonical literal form found verbatim in the
    /// text, then the recorded literal of every placeholder the matcher
    /// reconciled with it. Identical pairs are dropped.
    pub fn build(
        fields: &FieldValues,
        text: &str,
        inventory: &PlaceholderInventory,
        matches: &MatchReport,
    ) -> Self {
        let mut entries: Vec<Replacement> = Vec::new();
        let mut push = |target: String, value: &str| {
            if !entries
                .iter()
                .any(|r| r.target == target && r.value == value)
            {
                entries.push(Replacement {
                    target,
                    value: value.to_string(),
                });
            }
        };

        for (field, value) in fields.usable() {
            for syntax in Syntax::ALL {
                let literal = syntax.literal(field);
                if text.contains(&literal) {
                    push(literal, value);
                }
            }

            for placeholder in matches.placeholders_for(field) {
                if let Some(literal) = inventory.literal(placeholder) {
                    push(literal.to_string(), value);
                }
            }
        }

        // Stable sort keeps insertion order among equal lengths
        entries.sort_by_key(|r| Reverse(r.target.chars().count()));
        Self { entries }
    }

    pub fn entries(&self) -> &[Replacement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply every entry in order over the whole text
    ///
    /// A value containing another target's literal is itself rewritten by a
    /// later entry; the order is not adjusted to prevent that.
    pub fn apply(&self, text: &str) -> TextSubstitution {
        let mut current = text.to_string();
        let mut replacements = 0;

        for entry in &self.entries {
            if !current.contains(&entry.target) {
                continue;
            }
            let replaced = current.replace(&entry.target, &entry.value);
            if replaced != current {
                current = replaced;
                replacements += 1;
                debug!(target = %entry.target, "replaced placeholder text");
            }
        }

        TextSubstitution {
            text: current,
            replacements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grammar::Grammar;
    use crate::engine::matcher::match_fields;

    fn plan_for(text: &str, pairs: &[(&str, &str)]) -> ReplacementPlan {
        let fields: FieldValues = pairs.iter().copied().collect();
        let inventory = Grammar::new().unwrap().inventory(text);
        let matches = match_fields(&fields, &inventory);
        ReplacementPlan::build(&fields, text, &inventory, &matches)
    }

    #[test]
    fn test_exact_literal_is_replaced() {
        let text = "Dear {{Foo}},";
        let result = plan_for(text, &[("Foo", "Bar")]).apply(text);
        assert_eq!(result.text, "Dear Bar,");
        assert_eq!(result.replacements, 1);
    }

    #[test]
    fn test_plan_is_sorted_longest_first() {
        let text = "$Name $NameExtra";
        let plan = plan_for(text, &[("Name", "A"), ("NameExtra", "B")]);
        let targets: Vec<&str> = plan.entries().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["$NameExtra", "$Name"]);

        let result = plan.apply(text);
        assert_eq!(result.text, "A B");
    }

    #[test]
    fn test_longer_brace_target_keeps_its_own_value() {
        let text = "{{Name}} / {{NameExtra}}";
        let result = plan_for(text, &[("Name", "short"), ("NameExtra", "long")]).apply(text);
        assert_eq!(result.text, "short / long");
        assert!(!result.text.contains("shortExtra"));
    }

    #[test]
    fn test_fuzzy_match_uses_recorded_literal() {
        let text = "Serial: << FactoryNumber >>";
        let plan = plan_for(text, &[("Factory_Number", "F-77")]);
        assert_eq!(
            plan.entries(),
            &[Replacement {
                target: "<< FactoryNumber >>".to_string(),
                value: "F-77".to_string(),
            }]
        );
        assert_eq!(plan.apply(text).text, "Serial: F-77");
    }

    #[test]
    fn test_identical_pairs_are_deduplicated() {
        // Canonical literal and inventory literal coincide
        let plan = plan_for("{{A}}", &[("A", "1")]);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_every_syntax_for_a_field_is_planned() {
        let text = "{{N}} <<N>> [N] $N";
        let result = plan_for(text, &[("N", "x")]).apply(text);
        assert_eq!(result.text, "x x x x");
        assert_eq!(result.replacements, 4);
    }

    #[test]
    fn test_value_containing_other_target_is_rewritten_by_later_entry() {
        // Equal lengths: field order decides, so A is applied before B and
        // the inserted "{{B}}" is then replaced as well
        let text = "{{A}} {{B}}";
        let result = plan_for(text, &[("A", "{{B}}"), ("B", "x")]).apply(text);
        assert_eq!(result.text, "x x");
        assert_eq!(result.replacements, 2);
    }

    #[test]
    fn test_no_targets_signals_fallback() {
        let text = "nothing to see";
        let result = plan_for(text, &[("Foo", "Bar")]).apply(text);
        assert_eq!(result.replacements, 0);
        assert!(result.into_bytes(Codec::Ascii).is_none());
    }

    #[test]
    fn test_value_equal_to_target_is_not_counted() {
        let text = "x {{A}} y";
        let result = plan_for(text, &[("A", "{{A}}")]).apply(text);
        assert_eq!(result.text, text);
        assert_eq!(result.replacements, 0);
        assert!(result.into_bytes(Codec::Ascii).is_none());
    }

    #[test]
    fn test_empty_value_removes_placeholder() {
        let text = "a[Gap]b";
        let result = plan_for(text, &[("Gap", "")]).apply(text);
        assert_eq!(result.text, "ab");
        assert_eq!(result.replacements, 1);
    }
}
