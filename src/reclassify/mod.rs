// src/reclassify/mod.rs
use crate::classifier::NarrativeAnalysis;
use crate::edgar::models::StatementType;
use crate::statements::section::SectionKey;
use crate::statements::tree::StatementTree;
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};

/// Narrative analyses collected for one filing, searched for trigger keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NarrativeSignals {
    pub analyses: Vec<(StatementType, NarrativeAnalysis)>,
}

impl NarrativeSignals {
    pub fn new(analyses: Vec<(StatementType, NarrativeAnalysis)>) -> Self {
        Self { analyses }
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    /// First narrative section whose summary or signals mention `keyword`.
    pub fn mentions(&self, keyword: &str) -> Option<StatementType> {
        let keyword = keyword.to_lowercase();
        self.analyses
            .iter()
            .find(|(_, analysis)| {
                std::iter::once(&analysis.summary)
                    .chain(analysis.signals.iter())
                    .any(|text| text.to_lowercase().contains(&keyword))
            })
            .map(|(statement, _)| *statement)
    }
}

/// Sends labels containing `keyword` to a standard field of the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRoute {
    pub keyword: String,
    pub field: String,
}

/// Moves line items out of one section into another when the narrative
/// mentions any trigger. Matched items go to the first routed field that is
/// still empty, otherwise to the destination's additional items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclassificationRule {
    pub name: String,
    pub triggers: Vec<String>,
    pub from: SectionKey,
    pub to: SectionKey,
    pub label_keywords: Vec<String>,
    #[serde(default)]
    pub routes: Vec<FieldRoute>,
}

impl ReclassificationRule {
    fn matches_label(&self, label: &str) -> bool {
        self.label_keywords.iter().any(|k| label.contains(k.as_str()))
    }

    pub fn restructuring() -> Self {
        Self {
            name: "restructuring".into(),
            triggers: vec!["restructuring".into()],
            from: SectionKey::OperatingCosts,
            to: SectionKey::NonRecurring,
            label_keywords: vec!["restructuring".into(), "severance".into(), "impairment of asset".into()],
            routes: vec![
                FieldRoute { keyword: "impairment".into(), field: "impairment_charges".into() },
                FieldRoute { keyword: "restructuring".into(), field: "restructuring_charges".into() },
            ],
        }
    }

    pub fn litigation() -> Self {
        Self {
            name: "litigation".into(),
            triggers: vec!["litigation".into(), "legal settlement".into()],
            from: SectionKey::OperatingCosts,
            to: SectionKey::NonRecurring,
            label_keywords: vec!["litigation".into(), "legal settlement".into(), "settlement charge".into()],
            routes: vec![
                FieldRoute { keyword: "settlement".into(), field: "settlement_costs".into() },
                FieldRoute { keyword: "litigation".into(), field: "settlement_costs".into() },
            ],
        }
    }
}

/// One audit entry per moved item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassificationRecord {
    pub rule: String,
    pub label: String,
    pub from: String,
    pub to: String,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReclassificationEngine {
    pub rules: Vec<ReclassificationRule>,
}

impl Default for ReclassificationEngine {
    fn default() -> Self {
        Self::new(vec![ReclassificationRule::restructuring(), ReclassificationRule::litigation()])
    }
}

impl ReclassificationEngine {
    pub fn new(rules: Vec<ReclassificationRule>) -> Self {
        Self { rules }
    }

    /// Runs every triggered rule against `tree`. Each item moves at most once.
    pub fn apply(&self, tree: &mut StatementTree, signals: &NarrativeSignals) -> Vec<ReclassificationRecord> {
        let mut records = Vec::new();
        for rule in &self.rules {
            let Some((trigger, source)) = rule
                .triggers
                .iter()
                .find_map(|t| signals.mentions(t).map(|source| (t.as_str(), source)))
            else {
                tracing::debug!("Reclassification rule '{}' not triggered", rule.name);
                continue;
            };
            records.extend(self.apply_rule(tree, rule, trigger, source));
        }
        records
    }

    fn apply_rule(
        &self,
        tree: &mut StatementTree,
        rule: &ReclassificationRule,
        trigger: &str,
        source: StatementType,
    ) -> Vec<ReclassificationRecord> {
        let items = std::mem::take(tree.section_mut(rule.from).additional_items_mut());
        let (moving, remaining): (Vec<ExtractedValue>, Vec<ExtractedValue>) =
            items.into_iter().partition(|v| rule.matches_label(&v.label.to_lowercase()));
        *tree.section_mut(rule.from).additional_items_mut() = remaining;

        let mut records = Vec::with_capacity(moving.len());
        for mut item in moving {
            let label = item.label.clone();
            let value = item.value.or_else(|| item.latest_year().and_then(|y| item.year(y)));
            let lowered = label.to_lowercase();
            let destination = tree.section_mut(rule.to);

            let open_field = rule
                .routes
                .iter()
                .filter(|route| lowered.contains(route.keyword.as_str()))
                .find_map(|route| {
                    let field = destination.resolve(&route.field)?;
                    destination.value(field).is_none().then_some(field)
                });

            let (to, reasoning) = match open_field {
                Some(field) => {
                    item.variable = Some(field.to_string());
                    if let Some(slot) = destination.slot_mut(field) {
                        *slot = Some(item);
                    }
                    (
                        format!("{}.{}", rule.to, field),
                        format!("label keyword match; {} narrative mentions '{}'", source, trigger),
                    )
                }
                None => {
                    destination.additional_items_mut().push(item);
                    (
                        format!("{}.additional_items", rule.to),
                        format!("label keyword match; {} narrative mentions '{}'; no open field", source, trigger),
                    )
                }
            };

            tracing::info!("Reclassified '{}' from {} to {}", label, rule.from, to);
            records.push(ReclassificationRecord {
                rule: rule.name.clone(),
                label,
                from: format!("{}.additional_items", rule.from),
                to,
                reasoning,
                value,
            });
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::value::fixtures::item;

    fn opex_extra(label: &str, amount: f64) -> ExtractedValue {
        let mut v = item(label, None, &[(2024, amount)]);
        v.provenance.parent_section = Some("Operating expenses".into());
        v.value = Some(amount);
        v
    }

    fn signals(text: &str) -> NarrativeSignals {
        NarrativeSignals::new(vec![(
            StatementType::RiskFactors,
            NarrativeAnalysis { summary: text.to_string(), signals: Vec::new() },
        )])
    }

    #[test]
    fn test_restructuring_moves_once_with_audit_record() {
        let mut tree = StatementTree::new();
        tree.apply(opex_extra("Restructuring costs", 50.0));
        tree.apply(opex_extra("Marketing programs", 20.0));

        let engine = ReclassificationEngine::default();
        let records = engine.apply(&mut tree, &signals("We announced a restructuring plan in 2024."));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to, "non_recurring.restructuring_charges");
        assert_eq!(records[0].value, Some(50.0));
        let moved = tree.income_statement.non_recurring.restructuring_charges.as_ref().unwrap();
        assert_eq!(moved.value, Some(50.0));
        let remaining: Vec<&str> = tree
            .income_statement
            .operating_costs
            .additional_items
            .iter()
            .map(|v| v.label.as_str())
            .collect();
        assert_eq!(remaining, vec!["Marketing programs"]);

        // A second pass finds nothing left to move.
        assert!(engine.apply(&mut tree, &signals("restructuring")).is_empty());
    }

    #[test]
    fn test_no_trigger_no_move() {
        let mut tree = StatementTree::new();
        tree.apply(opex_extra("Restructuring costs", 50.0));

        let records = ReclassificationEngine::default().apply(&mut tree, &signals("Strong demand across segments."));
        assert!(records.is_empty());
        assert_eq!(tree.income_statement.operating_costs.additional_items.len(), 1);
        assert!(tree.income_statement.non_recurring.restructuring_charges.is_none());
    }

    #[test]
    fn test_filled_field_falls_back_to_additional_items() {
        let mut tree = StatementTree::new();
        tree.apply(opex_extra("Restructuring costs", 50.0));
        tree.apply(opex_extra("Severance and restructuring", 15.0));
        tree.apply(opex_extra("Impairment of assets", 30.0));

        let records = ReclassificationEngine::default().apply(&mut tree, &signals("restructuring"));
        assert_eq!(records.len(), 3);

        let nr = &tree.income_statement.non_recurring;
        assert_eq!(nr.restructuring_charges.as_ref().unwrap().label, "Restructuring costs");
        assert_eq!(nr.impairment_charges.as_ref().unwrap().label, "Impairment of assets");
        assert_eq!(nr.additional_items.len(), 1);
        assert_eq!(nr.additional_items[0].label, "Severance and restructuring");
        assert!(tree.income_statement.operating_costs.additional_items.is_empty());
    }

    #[test]
    fn test_litigation_rule() {
        let mut tree = StatementTree::new();
        tree.apply(opex_extra("Litigation settlement", 12.0));

        let records = ReclassificationEngine::default().apply(&mut tree, &signals("Pending litigation with a competitor"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule, "litigation");
        assert!(tree.income_statement.non_recurring.settlement_costs.is_some());
    }
}
