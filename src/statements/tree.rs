// src/statements/tree.rs
use crate::edgar::models::StatementType;
use crate::statements::balance::BalanceSheet;
use crate::statements::cash_flow::CashFlowStatement;
use crate::statements::income::IncomeStatement;
use crate::statements::section::{statement_section, Section, SectionKey};
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

statement_section! {
    /// Per-share and tax data from the supplemental schedule.
    SupplementalDataSection => SupplementalData, extras: Memo {
        statutory_tax_rate: Memo,
        eps_basic: Memo,
        eps_diluted: Memo,
        shares_outstanding_basic: Memo,
        shares_outstanding_diluted: Memo,
        preferred_dividends: Memo,
        depreciation_expense: Memo,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplementalStatement {
    pub data: SupplementalDataSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified: Vec<ExtractedValue>,
}

/// Where `StatementTree::apply` put a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Slot { section: SectionKey, field: &'static str },
    Additional { section: SectionKey },
    Unclassified { statement: StatementType },
    /// The slot was already filled; the first value stays and this one is
    /// kept in the statement's unclassified list.
    Duplicate { section: SectionKey, field: &'static str },
    /// Narrative statement types carry no values.
    Ignored,
}

/// All extracted statements of one filing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTree {
    pub income_statement: IncomeStatement,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    pub supplemental: SupplementalStatement,
}

impl StatementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> Vec<&dyn Section> {
        let mut all = self.income_statement.sections();
        all.extend(self.balance_sheet.sections());
        all.extend(self.cash_flow.sections());
        all.push(&self.supplemental.data);
        all
    }

    pub fn sections_mut(&mut self) -> Vec<&mut dyn Section> {
        let mut all = self.income_statement.sections_mut();
        all.extend(self.balance_sheet.sections_mut());
        all.extend(self.cash_flow.sections_mut());
        all.push(&mut self.supplemental.data);
        all
    }

    fn statement_sections(&self, statement: StatementType) -> Vec<&dyn Section> {
        match statement {
            StatementType::IncomeStatement => self.income_statement.sections(),
            StatementType::BalanceSheet => self.balance_sheet.sections(),
            StatementType::CashFlow => self.cash_flow.sections(),
            StatementType::Supplemental => vec![&self.supplemental.data],
            _ => Vec::new(),
        }
    }

    pub fn section(&self, key: SectionKey) -> &dyn Section {
        use SectionKey::*;
        match key {
            GrossProfit => &self.income_statement.gross_profit,
            OperatingCosts => &self.income_statement.operating_costs,
            NonOperating => &self.income_statement.non_operating,
            TaxAdjustments => &self.income_statement.tax_adjustments,
            NetIncome => &self.income_statement.net_income,
            Oci => &self.income_statement.oci,
            NonRecurring => &self.income_statement.non_recurring,
            CurrentAssets => &self.balance_sheet.current_assets,
            NoncurrentAssets => &self.balance_sheet.noncurrent_assets,
            CurrentLiabilities => &self.balance_sheet.current_liabilities,
            NoncurrentLiabilities => &self.balance_sheet.noncurrent_liabilities,
            Equity => &self.balance_sheet.equity,
            BalanceSheetTotals => &self.balance_sheet.reported,
            OperatingActivities => &self.cash_flow.operating,
            InvestingActivities => &self.cash_flow.investing,
            FinancingActivities => &self.cash_flow.financing,
            CashFlowSupplemental => &self.cash_flow.supplemental,
            CashSummary => &self.cash_flow.summary,
            SupplementalData => &self.supplemental.data,
        }
    }

    pub fn section_mut(&mut self, key: SectionKey) -> &mut dyn Section {
        use SectionKey::*;
        match key {
            GrossProfit => &mut self.income_statement.gross_profit,
            OperatingCosts => &mut self.income_statement.operating_costs,
            NonOperating => &mut self.income_statement.non_operating,
            TaxAdjustments => &mut self.income_statement.tax_adjustments,
            NetIncome => &mut self.income_statement.net_income,
            Oci => &mut self.income_statement.oci,
            NonRecurring => &mut self.income_statement.non_recurring,
            CurrentAssets => &mut self.balance_sheet.current_assets,
            NoncurrentAssets => &mut self.balance_sheet.noncurrent_assets,
            CurrentLiabilities => &mut self.balance_sheet.current_liabilities,
            NoncurrentLiabilities => &mut self.balance_sheet.noncurrent_liabilities,
            Equity => &mut self.balance_sheet.equity,
            BalanceSheetTotals => &mut self.balance_sheet.reported,
            OperatingActivities => &mut self.cash_flow.operating,
            InvestingActivities => &mut self.cash_flow.investing,
            FinancingActivities => &mut self.cash_flow.financing,
            CashFlowSupplemental => &mut self.cash_flow.supplemental,
            CashSummary => &mut self.cash_flow.summary,
            SupplementalData => &mut self.supplemental.data,
        }
    }

    fn unclassified_mut(&mut self, statement: StatementType) -> Option<&mut Vec<ExtractedValue>> {
        match statement {
            StatementType::IncomeStatement => Some(&mut self.income_statement.unclassified),
            StatementType::BalanceSheet => Some(&mut self.balance_sheet.unclassified),
            StatementType::CashFlow => Some(&mut self.cash_flow.unclassified),
            StatementType::Supplemental => Some(&mut self.supplemental.unclassified),
            _ => None,
        }
    }

    /// Value of a standard slot.
    pub fn value(&self, key: SectionKey, field: &str) -> Option<&ExtractedValue> {
        self.section(key).value(field)
    }

    /// Places one value by its variable name within its own statement.
    /// Unique or unknown variables go to the hinted section's additional items,
    /// or to the statement's unclassified list when no section can be inferred.
    pub fn apply(&mut self, value: ExtractedValue) -> Placement {
        let statement = value.provenance.statement;
        if !statement.is_financial() {
            tracing::warn!("Ignoring value '{}' from narrative section {}", value.label, statement);
            return Placement::Ignored;
        }

        if let Some(variable) = value.variable.as_deref() {
            let target = self
                .statement_sections(statement)
                .into_iter()
                .find_map(|section| {
                    let field = section.resolve(variable)?;
                    Some((section.key(), field, section.value(field).is_some()))
                });

            match target {
                Some((key, field, false)) => {
                    if let Some(slot) = self.section_mut(key).slot_mut(field) {
                        *slot = Some(value);
                    }
                    return Placement::Slot { section: key, field };
                }
                Some((key, field, true)) => {
                    tracing::warn!(
                        "Slot {}.{} already filled; keeping first value, '{}' moved to unclassified",
                        key,
                        field,
                        value.label
                    );
                    if let Some(list) = self.unclassified_mut(statement) {
                        list.push(value);
                    }
                    return Placement::Duplicate { section: key, field };
                }
                None => {
                    tracing::debug!("Variable '{}' has no slot in {}; treating as unique", variable, statement);
                }
            }
        }

        let hinted = value
            .provenance
            .parent_section
            .as_deref()
            .and_then(|hint| SectionKey::from_hint(statement, hint));
        if let Some(key) = hinted {
            self.section_mut(key).additional_items_mut().push(value);
            return Placement::Additional { section: key };
        }

        if let Some(list) = self.unclassified_mut(statement) {
            list.push(value);
        }
        Placement::Unclassified { statement }
    }

    pub fn for_each_value(&self, mut f: impl FnMut(&ExtractedValue)) {
        for section in self.sections() {
            for (_, slot) in section.slots() {
                if let Some(v) = slot {
                    f(v);
                }
            }
            section.additional_items().iter().for_each(&mut f);
        }
        for list in [
            &self.income_statement.unclassified,
            &self.balance_sheet.unclassified,
            &self.cash_flow.unclassified,
            &self.supplemental.unclassified,
        ] {
            list.iter().for_each(&mut f);
        }
    }

    pub fn for_each_value_mut(&mut self, mut f: impl FnMut(&mut ExtractedValue)) {
        for section in self.sections_mut() {
            for (_, slot) in section.slots_mut() {
                if let Some(v) = slot.as_mut() {
                    f(v);
                }
            }
            section.additional_items_mut().iter_mut().for_each(&mut f);
        }
        for list in [
            &mut self.income_statement.unclassified,
            &mut self.balance_sheet.unclassified,
            &mut self.cash_flow.unclassified,
            &mut self.supplemental.unclassified,
        ] {
            list.iter_mut().for_each(&mut f);
        }
    }

    /// Copies each value's `year` figure into its primary `value`.
    /// Returns how many values have a figure for that year.
    pub fn populate_primary(&mut self, year: i32) -> usize {
        let mut populated = 0;
        self.for_each_value_mut(|v| {
            v.value = v.year(year);
            if v.value.is_some() {
                populated += 1;
            }
        });
        populated
    }

    /// Every fiscal year present in any value.
    pub fn years(&self) -> BTreeSet<i32> {
        let mut years = BTreeSet::new();
        self.for_each_value(|v| years.extend(v.years.keys().copied()));
        years
    }

    /// (values in standard slots, values in additional or unclassified lists)
    pub fn mapping_counts(&self) -> (usize, usize) {
        let mapped = self
            .sections()
            .iter()
            .map(|s| s.slots().iter().filter(|(_, slot)| slot.is_some()).count())
            .sum();
        let mut total = 0;
        self.for_each_value(|_| total += 1);
        (mapped, total - mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::value::fixtures::item;

    fn in_statement(mut v: ExtractedValue, statement: StatementType, hint: Option<&str>) -> ExtractedValue {
        v.provenance.statement = statement;
        v.provenance.parent_section = hint.map(str::to_string);
        v
    }

    #[test]
    fn test_apply_by_variable_and_alias() {
        let mut tree = StatementTree::new();
        let revenue = in_statement(item("Net sales", Some("net_sales"), &[(2024, 500.0)]), StatementType::IncomeStatement, None);
        let cf_ni = in_statement(item("Net income", Some("net_income"), &[(2024, 90.0)]), StatementType::CashFlow, None);

        assert_eq!(
            tree.apply(revenue),
            Placement::Slot { section: SectionKey::GrossProfit, field: "revenues" }
        );
        assert_eq!(
            tree.apply(cf_ni),
            Placement::Slot { section: SectionKey::OperatingActivities, field: "net_income_start" }
        );
        assert_eq!(tree.value(SectionKey::GrossProfit, "revenues").unwrap().year(2024), Some(500.0));
    }

    #[test]
    fn test_unique_items_follow_parent_hint() {
        let mut tree = StatementTree::new();
        let crypto = in_statement(item("Digital assets", None, &[(2024, 10.0)]), StatementType::BalanceSheet, Some("Current Assets"));
        let orphan = in_statement(item("Something", None, &[(2024, 1.0)]), StatementType::BalanceSheet, None);

        assert_eq!(tree.apply(crypto), Placement::Additional { section: SectionKey::CurrentAssets });
        assert_eq!(tree.apply(orphan), Placement::Unclassified { statement: StatementType::BalanceSheet });
        assert_eq!(tree.balance_sheet.current_assets.additional_items.len(), 1);
        assert_eq!(tree.balance_sheet.unclassified.len(), 1);
    }

    #[test]
    fn test_first_value_wins_on_duplicate() {
        let mut tree = StatementTree::new();
        let first = in_statement(item("Cash", Some("cash"), &[(2024, 100.0)]), StatementType::BalanceSheet, None);
        let second = in_statement(item("Cash and equivalents", Some("cash_and_equivalents"), &[(2024, 120.0)]), StatementType::BalanceSheet, None);

        tree.apply(first);
        assert_eq!(
            tree.apply(second),
            Placement::Duplicate { section: SectionKey::CurrentAssets, field: "cash_and_equivalents" }
        );
        assert_eq!(tree.value(SectionKey::CurrentAssets, "cash_and_equivalents").unwrap().year(2024), Some(100.0));
        assert_eq!(tree.balance_sheet.unclassified.len(), 1);
    }

    #[test]
    fn test_populate_primary_has_no_year_fallback() {
        let mut tree = StatementTree::new();
        tree.apply(in_statement(item("Revenue", Some("revenues"), &[(2024, 5.0), (2023, 4.0)]), StatementType::IncomeStatement, None));
        tree.apply(in_statement(item("Old line", Some("cost_of_goods_sold"), &[(2023, -2.0)]), StatementType::IncomeStatement, None));

        assert_eq!(tree.populate_primary(2024), 1);
        assert_eq!(tree.value(SectionKey::GrossProfit, "revenues").unwrap().value, Some(5.0));
        assert_eq!(tree.value(SectionKey::GrossProfit, "cost_of_goods_sold").unwrap().value, None);
        assert_eq!(tree.years().into_iter().collect::<Vec<_>>(), vec![2023, 2024]);
        assert_eq!(tree.mapping_counts(), (2, 0));
    }
}
