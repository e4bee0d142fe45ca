// src/statements/income.rs
use crate::statements::section::{statement_section, Section};
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};

statement_section! {
    GrossProfitSection => GrossProfit, extras: AsReported {
        revenues: Inflow ["net_sales", "total_revenue", "total_revenues", "revenue", "net_revenues"],
        cost_of_goods_sold: Outflow ["cost_of_revenue", "cost_of_sales", "cogs"],
        gross_profit: Memo ["gross_margin"],
    }
}

statement_section! {
    OperatingCostSection => OperatingCosts, extras: Outflow {
        sga_expenses: Outflow ["selling_general_and_administrative"],
        selling_marketing: Outflow,
        general_admin: Outflow,
        rd_expenses: Outflow ["research_and_development"],
        advertising_expenses: Outflow,
        other_operating_expenses: Outflow,
        operating_income: Memo ["income_from_operations", "operating_profit"],
    }
    supersedes { sga_expenses => [selling_marketing, general_admin] }
}

statement_section! {
    NonOperatingSection => NonOperating, extras: AsReported {
        interest_expense: Outflow,
        other_income_expense: AsReported ["other_income"],
        equity_affiliates_non_operating: AsReported,
        income_before_tax: Memo ["pretax_income", "income_before_income_taxes"],
    }
}

statement_section! {
    TaxAdjustmentsSection => TaxAdjustments, extras: AsReported {
        income_tax_expense: Outflow ["provision_for_income_taxes", "income_taxes"],
        discontinued_operations: AsReported,
        extraordinary_items: AsReported,
    }
}

statement_section! {
    /// Reported bottom line and per-share data; nothing here is summed.
    NetIncomeSection => NetIncome, extras: Memo {
        net_income_to_common: Memo ["net_income"],
        net_income_to_nci: Memo ["net_income_noncontrolling"],
        eps_basic: Memo,
        eps_diluted: Memo,
        weighted_average_shares: Memo,
    }
}

statement_section! {
    OciSection => Oci, extras: AsReported {
        oci_foreign_currency: AsReported,
        oci_securities: AsReported,
        oci_pension: AsReported,
        oci_hedges: AsReported,
        comprehensive_income: Memo ["total_comprehensive_income", "other_comprehensive_income"],
    }
}

statement_section! {
    /// Items moved out of operating costs by reclassification land here.
    NonRecurringSection => NonRecurring, extras: AsReported {
        impairment_charges: Outflow ["impairment"],
        restructuring_charges: Outflow ["restructuring"],
        gain_loss_asset_sales: AsReported,
        settlement_costs: Outflow ["litigation_settlement"],
        write_offs: Outflow,
        other_nonrecurring: AsReported,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub gross_profit: GrossProfitSection,
    pub operating_costs: OperatingCostSection,
    pub non_operating: NonOperatingSection,
    pub tax_adjustments: TaxAdjustmentsSection,
    pub net_income: NetIncomeSection,
    pub oci: OciSection,
    pub non_recurring: NonRecurringSection,
    /// Values with no resolvable section; kept for audit, never summed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified: Vec<ExtractedValue>,
}

impl IncomeStatement {
    pub fn sections(&self) -> Vec<&dyn Section> {
        vec![
            &self.gross_profit,
            &self.operating_costs,
            &self.non_operating,
            &self.tax_adjustments,
            &self.net_income,
            &self.oci,
            &self.non_recurring,
        ]
    }

    pub fn sections_mut(&mut self) -> Vec<&mut dyn Section> {
        vec![
            &mut self.gross_profit,
            &mut self.operating_costs,
            &mut self.non_operating,
            &mut self.tax_adjustments,
            &mut self.net_income,
            &mut self.oci,
            &mut self.non_recurring,
        ]
    }
}
