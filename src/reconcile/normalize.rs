// src/reconcile/normalize.rs
use crate::statements::section::SignPolicy;
use crate::statements::tree::StatementTree;
use crate::statements::value::ExtractedValue;

/// Applies `policy` to every figure of `value`. Returns true if anything changed.
pub fn apply_sign(value: &mut ExtractedValue, policy: SignPolicy) -> bool {
    let flip: fn(f64) -> f64 = match policy {
        SignPolicy::Inflow => f64::abs,
        SignPolicy::Outflow => |v: f64| -v.abs(),
        SignPolicy::AsReported | SignPolicy::Memo => return false,
    };
    let before = (value.value, value.years.clone());
    value.map_values(flip);
    before != (value.value, value.years.clone())
}

/// Enforces each slot's sign convention, and each section's policy for its
/// additional items. Statement-level unclassified values keep their sign.
/// Idempotent. Returns the number of values whose sign changed.
pub fn normalize_signs(tree: &mut StatementTree) -> usize {
    let mut changed = 0;
    for section in tree.sections_mut() {
        for (spec, slot) in section.slots_mut() {
            if let Some(value) = slot.as_mut() {
                if apply_sign(value, spec.sign) {
                    tracing::debug!("Normalized sign of '{}' ({:?})", value.label, spec.sign);
                    changed += 1;
                }
            }
        }
        let policy = section.extras_policy();
        for value in section.additional_items_mut() {
            if apply_sign(value, policy) {
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::StatementType;
    use crate::statements::section::SectionKey;
    use crate::statements::value::fixtures::item;

    fn income(label: &str, variable: Option<&str>, amount: f64) -> ExtractedValue {
        let mut v = item(label, variable, &[(2024, amount)]);
        v.provenance.statement = StatementType::IncomeStatement;
        v
    }

    #[test]
    fn test_outflows_negative_inflows_positive() {
        let mut tree = StatementTree::new();
        tree.apply(income("Revenue", Some("revenues"), -1000.0));
        tree.apply(income("Cost of sales", Some("cost_of_goods_sold"), 600.0));
        tree.apply(income("Gross profit", Some("gross_profit"), 400.0));

        assert_eq!(normalize_signs(&mut tree), 2);
        assert_eq!(tree.value(SectionKey::GrossProfit, "revenues").unwrap().year(2024), Some(1000.0));
        assert_eq!(tree.value(SectionKey::GrossProfit, "cost_of_goods_sold").unwrap().year(2024), Some(-600.0));
        assert_eq!(tree.value(SectionKey::GrossProfit, "gross_profit").unwrap().year(2024), Some(400.0));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut tree = StatementTree::new();
        tree.apply(income("SG&A", Some("sga_expenses"), 200.0));
        let mut hinted = income("Marketing programs", None, 30.0);
        hinted.provenance.parent_section = Some("Operating expenses".into());
        tree.apply(hinted);

        assert_eq!(normalize_signs(&mut tree), 2);
        let once = tree.clone();
        assert_eq!(normalize_signs(&mut tree), 0);
        assert_eq!(tree, once);
        assert_eq!(tree.income_statement.operating_costs.additional_items[0].year(2024), Some(-30.0));
    }
}
