// src/statements/cash_flow.rs
use crate::statements::section::{statement_section, Section};
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};

statement_section! {
    OperatingActivitiesSection => OperatingActivities, extras: AsReported {
        net_income_start: AsReported ["net_income"],
        depreciation_amortization: AsReported ["depreciation_and_amortization"],
        amortization_intangibles: AsReported,
        deferred_taxes: AsReported ["deferred_income_taxes"],
        stock_based_compensation: AsReported,
        impairment_charges: AsReported,
        gain_loss_asset_sales: AsReported,
        change_receivables: AsReported,
        change_inventory: AsReported,
        change_payables: AsReported,
        change_accrued_expenses: AsReported,
        change_deferred_revenue: AsReported,
        other_working_capital: AsReported,
        other_non_cash_items: AsReported,
    }
}

statement_section! {
    InvestingActivitiesSection => InvestingActivities, extras: AsReported {
        capex: Outflow ["capital_expenditures", "purchases_of_property_and_equipment"],
        acquisitions_net: Outflow ["acquisitions"],
        purchases_securities: Outflow,
        maturities_securities: Inflow,
        sales_securities: Inflow,
        proceeds_asset_sales: Inflow,
        other_investing: AsReported,
    }
}

statement_section! {
    FinancingActivitiesSection => FinancingActivities, extras: AsReported {
        debt_proceeds: Inflow,
        debt_repayments: Outflow,
        stock_issuance_proceeds: Inflow,
        share_repurchases: Outflow ["repurchases_of_common_stock"],
        dividends_paid: Outflow ["dividends"],
        tax_withholding_payments: Outflow,
        other_financing: AsReported,
    }
}

statement_section! {
    CashFlowSupplementalSection => CashFlowSupplemental, extras: Memo {
        cash_interest_paid: Memo,
        cash_taxes_paid: Memo,
        non_cash_investing: Memo,
        non_cash_financing: Memo,
    }
}

statement_section! {
    /// Reported section totals and the cash roll-forward.
    CashSummarySection => CashSummary, extras: Memo {
        net_cash_operating: Memo ["net_cash_from_operations", "net_cash_from_operating_activities"],
        net_cash_investing: Memo ["net_cash_from_investing", "net_cash_from_investing_activities"],
        net_cash_financing: Memo ["net_cash_from_financing", "net_cash_from_financing_activities"],
        fx_effect: Memo ["effect_exchange_rate"],
        net_change_in_cash: Memo,
        cash_beginning: Memo ["cash_beginning_of_period"],
        cash_ending: Memo ["cash_end_of_period"],
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub operating: OperatingActivitiesSection,
    pub investing: InvestingActivitiesSection,
    pub financing: FinancingActivitiesSection,
    pub supplemental: CashFlowSupplementalSection,
    pub summary: CashSummarySection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified: Vec<ExtractedValue>,
}

impl CashFlowStatement {
    pub fn sections(&self) -> Vec<&dyn Section> {
        vec![&self.operating, &self.investing, &self.financing, &self.supplemental, &self.summary]
    }

    pub fn sections_mut(&mut self) -> Vec<&mut dyn Section> {
        vec![
            &mut self.operating,
            &mut self.investing,
            &mut self.financing,
            &mut self.supplemental,
            &mut self.summary,
        ]
    }
}
