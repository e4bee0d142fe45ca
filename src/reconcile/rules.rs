// src/reconcile/rules.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "match", content = "text")]
pub enum LabelPattern {
    Exact(String),
    Prefix(String),
    Contains(String),
}

impl LabelPattern {
    fn matches(&self, normalized: &str) -> bool {
        match self {
            LabelPattern::Exact(text) => normalized == text,
            LabelPattern::Prefix(text) => normalized.starts_with(text.as_str()),
            LabelPattern::Contains(text) => normalized.contains(text.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelDecision {
    /// A rolled-up line; left out of section sums.
    Subtotal,
    /// An ordinary line item.
    Item,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtotalRule {
    pub pattern: LabelPattern,
    pub decision: LabelDecision,
}

/// Ordered label rules deciding whether an unclassified line is itself a
/// subtotal. First matching rule wins; no match means `Item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtotalRules {
    pub version: u32,
    pub rules: Vec<SubtotalRule>,
}

impl SubtotalRules {
    pub fn new(version: u32, rules: Vec<SubtotalRule>) -> Self {
        Self { version, rules }
    }

    pub fn decide(&self, label: &str) -> LabelDecision {
        let normalized = normalize(label);
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(&normalized))
            .map(|rule| rule.decision)
            .unwrap_or(LabelDecision::Item)
    }

    pub fn is_subtotal(&self, label: &str) -> bool {
        self.decide(label) == LabelDecision::Subtotal
    }
}

impl Default for SubtotalRules {
    fn default() -> Self {
        let exact = [
            "operating expenses",
            "total operating expenses",
            "gross profit",
            "gross margin",
            "operating income",
            "operating profit",
            "income from operations",
            "net income",
            "net earnings",
            "net loss",
        ];
        let mut rules: Vec<SubtotalRule> = exact
            .iter()
            .map(|text| SubtotalRule {
                pattern: LabelPattern::Exact(text.to_string()),
                decision: LabelDecision::Subtotal,
            })
            .collect();
        rules.extend([
            SubtotalRule { pattern: LabelPattern::Prefix("total".into()), decision: LabelDecision::Subtotal },
            SubtotalRule { pattern: LabelPattern::Contains("total ".into()), decision: LabelDecision::Subtotal },
            SubtotalRule { pattern: LabelPattern::Contains("income before".into()), decision: LabelDecision::Subtotal },
        ]);
        Self::new(1, rules)
    }
}

fn normalize(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(':')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = SubtotalRules::default();
        assert!(rules.is_subtotal("Total X"));
        assert!(rules.is_subtotal("  Gross Profit "));
        assert!(rules.is_subtotal("Income before income taxes"));
        assert!(rules.is_subtotal("Subtotal operating"));
        assert!(!rules.is_subtotal("Restructuring costs"));
        assert!(!rules.is_subtotal("Net income attributable to NCI adjustments"));
        assert_eq!(rules.version, 1);
    }

    #[test]
    fn test_rules_are_ordered_and_overridable() {
        let mut rules = SubtotalRules::default();
        rules.rules.insert(
            0,
            SubtotalRule {
                pattern: LabelPattern::Exact("total return swaps".into()),
                decision: LabelDecision::Item,
            },
        );
        rules.version = 2;
        assert!(!rules.is_subtotal("Total return swaps"));
        assert!(rules.is_subtotal("Total assets"));
    }
}
