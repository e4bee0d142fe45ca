// src/statements/balance.rs
use crate::statements::section::{statement_section, Section};
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};

statement_section! {
    CurrentAssetsSection => CurrentAssets, extras: AsReported {
        cash_and_equivalents: AsReported ["cash", "cash_and_cash_equivalents"],
        short_term_investments: AsReported ["marketable_securities"],
        accounts_receivable_net: AsReported ["accounts_receivable"],
        inventories: AsReported ["inventory"],
        finance_div_loans_leases_st: AsReported,
        finance_div_other_curr_assets: AsReported,
        other_current_assets: AsReported,
    }
}

statement_section! {
    NoncurrentAssetsSection => NoncurrentAssets, extras: AsReported {
        long_term_investments: AsReported,
        deferred_charges_lt: AsReported,
        ppe_at_cost: AsReported ["ppe_gross"],
        accumulated_depreciation: Outflow,
        ppe_net: AsReported ["property_plant_equipment", "property_plant_and_equipment_net"],
        intangibles: AsReported ["intangible_assets"],
        goodwill: AsReported,
        finance_div_loans_leases_lt: AsReported,
        finance_div_other_lt_assets: AsReported,
        deferred_tax_assets_lt: AsReported ["deferred_tax_assets"],
        restricted_cash: AsReported,
        other_noncurrent_assets: AsReported ["other_assets"],
    }
    supersedes { ppe_net => [ppe_at_cost, accumulated_depreciation] }
}

statement_section! {
    CurrentLiabilitiesSection => CurrentLiabilities, extras: AsReported {
        accounts_payable: AsReported,
        accrued_liabilities: AsReported ["accrued_expenses"],
        notes_payable_short_term_debt: AsReported ["short_term_debt", "notes_payable"],
        current_maturities_long_term_debt: AsReported ["current_portion_long_term_debt"],
        current_operating_lease_liabilities: AsReported,
        deferred_revenue_current: AsReported ["deferred_revenue"],
        finance_div_curr: AsReported,
        other_current_liabilities: AsReported,
    }
}

statement_section! {
    NoncurrentLiabilitiesSection => NoncurrentLiabilities, extras: AsReported {
        long_term_debt: AsReported,
        long_term_operating_lease_liabilities: AsReported,
        deferred_tax_liabilities: AsReported,
        pension_obligations: AsReported,
        finance_div_noncurr: AsReported,
        other_noncurrent_liabilities: AsReported,
    }
}

statement_section! {
    EquitySection => Equity, extras: AsReported {
        preferred_stock: AsReported,
        common_stock_apic: AsReported ["common_stock", "additional_paid_in_capital"],
        retained_earnings_deficit: AsReported ["retained_earnings", "accumulated_deficit"],
        treasury_stock: Outflow,
        accum_other_comprehensive_income: AsReported ["aoci"],
        noncontrolling_interests: AsReported,
    }
}

statement_section! {
    /// Totals as printed in the filing, kept for validation.
    BalanceSheetTotalsSection => BalanceSheetTotals, extras: Memo {
        total_current_assets: Memo,
        total_assets: Memo,
        total_current_liabilities: Memo,
        total_liabilities: Memo,
        total_equity: Memo ["total_stockholders_equity", "total_shareholders_equity"],
        total_liabilities_and_equity: Memo,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub current_assets: CurrentAssetsSection,
    pub noncurrent_assets: NoncurrentAssetsSection,
    pub current_liabilities: CurrentLiabilitiesSection,
    pub noncurrent_liabilities: NoncurrentLiabilitiesSection,
    pub equity: EquitySection,
    pub reported: BalanceSheetTotalsSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unclassified: Vec<ExtractedValue>,
}

impl BalanceSheet {
    pub fn sections(&self) -> Vec<&dyn Section> {
        vec![
            &self.current_assets,
            &self.noncurrent_assets,
            &self.current_liabilities,
            &self.noncurrent_liabilities,
            &self.equity,
            &self.reported,
        ]
    }

    pub fn sections_mut(&mut self) -> Vec<&mut dyn Section> {
        vec![
            &mut self.current_assets,
            &mut self.noncurrent_assets,
            &mut self.current_liabilities,
            &mut self.noncurrent_liabilities,
            &mut self.equity,
            &mut self.reported,
        ]
    }
}
