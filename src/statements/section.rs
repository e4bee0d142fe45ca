// src/statements/section.rs
use crate::edgar::models::StatementType;
use crate::statements::value::ExtractedValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign convention enforced by normalization so every statement relation is a sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignPolicy {
    /// Revenue-like; stored positive.
    Inflow,
    /// Expense or cash outflow; stored negative.
    Outflow,
    /// Either sign is meaningful; stored as written.
    AsReported,
    /// Reported subtotal or per-share figure; stored as written and never summed.
    Memo,
}

impl SignPolicy {
    pub fn is_summed(self) -> bool {
        self != SignPolicy::Memo
    }
}

/// A standard slot of a statement section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub sign: SignPolicy,
    /// Other variable names classifiers use for this slot.
    pub aliases: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    // Income statement
    GrossProfit,
    OperatingCosts,
    NonOperating,
    TaxAdjustments,
    NetIncome,
    Oci,
    NonRecurring,
    // Balance sheet
    CurrentAssets,
    NoncurrentAssets,
    CurrentLiabilities,
    NoncurrentLiabilities,
    Equity,
    BalanceSheetTotals,
    // Cash flow
    OperatingActivities,
    InvestingActivities,
    FinancingActivities,
    CashFlowSupplemental,
    CashSummary,
    // Supplemental schedule
    SupplementalData,
}

impl SectionKey {
    pub fn statement(self) -> StatementType {
        use SectionKey::*;
        match self {
            GrossProfit | OperatingCosts | NonOperating | TaxAdjustments | NetIncome | Oci | NonRecurring => {
                StatementType::IncomeStatement
            }
            CurrentAssets | NoncurrentAssets | CurrentLiabilities | NoncurrentLiabilities | Equity
            | BalanceSheetTotals => StatementType::BalanceSheet,
            OperatingActivities | InvestingActivities | FinancingActivities | CashFlowSupplemental
            | CashSummary => StatementType::CashFlow,
            SupplementalData => StatementType::Supplemental,
        }
    }

    pub fn name(self) -> &'static str {
        use SectionKey::*;
        match self {
            GrossProfit => "gross_profit",
            OperatingCosts => "operating_costs",
            NonOperating => "non_operating",
            TaxAdjustments => "tax_adjustments",
            NetIncome => "net_income",
            Oci => "oci",
            NonRecurring => "non_recurring",
            CurrentAssets => "current_assets",
            NoncurrentAssets => "noncurrent_assets",
            CurrentLiabilities => "current_liabilities",
            NoncurrentLiabilities => "noncurrent_liabilities",
            Equity => "equity",
            BalanceSheetTotals => "balance_sheet_totals",
            OperatingActivities => "operating_activities",
            InvestingActivities => "investing_activities",
            FinancingActivities => "financing_activities",
            CashFlowSupplemental => "cash_flow_supplemental",
            CashSummary => "cash_summary",
            SupplementalData => "supplemental_data",
        }
    }

    /// Maps a classifier's free-form parent section ("Current Assets",
    /// "operating_activities_section", ...) to a section of `statement`.
    pub fn from_hint(statement: StatementType, hint: &str) -> Option<Self> {
        let hint = hint.to_lowercase().replace(['_', '-'], " ");
        let has = |needle: &str| hint.contains(needle);
        let noncurrent = has("noncurrent") || has("non current") || has("long term");

        match statement {
            StatementType::BalanceSheet => {
                if has("asset") {
                    Some(if noncurrent { SectionKey::NoncurrentAssets } else { SectionKey::CurrentAssets })
                } else if has("equity") || has("stockholder") || has("shareholder") {
                    Some(SectionKey::Equity)
                } else if has("liabilit") {
                    Some(if noncurrent { SectionKey::NoncurrentLiabilities } else { SectionKey::CurrentLiabilities })
                } else {
                    None
                }
            }
            StatementType::IncomeStatement => {
                if has("non recurring") || has("nonrecurring") || has("special") || has("restructuring") {
                    Some(SectionKey::NonRecurring)
                } else if has("non operating") || has("nonoperating") || has("other income") {
                    Some(SectionKey::NonOperating)
                } else if has("comprehensive") || has("oci") {
                    Some(SectionKey::Oci)
                } else if has("tax") {
                    Some(SectionKey::TaxAdjustments)
                } else if has("net income") || has("per share") || has("eps") {
                    Some(SectionKey::NetIncome)
                } else if has("operating") || has("expense") {
                    Some(SectionKey::OperatingCosts)
                } else if has("revenue") || has("gross") || has("sales") {
                    Some(SectionKey::GrossProfit)
                } else {
                    None
                }
            }
            StatementType::CashFlow => {
                if has("operating") {
                    Some(SectionKey::OperatingActivities)
                } else if has("investing") {
                    Some(SectionKey::InvestingActivities)
                } else if has("financing") {
                    Some(SectionKey::FinancingActivities)
                } else if has("supplemental") || has("non cash") || has("noncash") {
                    Some(SectionKey::CashFlowSupplemental)
                } else if has("summary") || has("cash") {
                    Some(SectionKey::CashSummary)
                } else {
                    None
                }
            }
            StatementType::Supplemental => Some(SectionKey::SupplementalData),
            _ => None,
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uniform access to a statement section's slots, generated by `statement_section!`.
pub trait Section: fmt::Debug + Send {
    fn key(&self) -> SectionKey;
    fn fields(&self) -> &'static [FieldSpec];
    /// (winner, losers): when the winner slot holds a value, losers are left out of totals.
    fn supersedes(&self) -> &'static [(&'static str, &'static [&'static str])];
    /// Sign policy for the unclassified items of this section.
    fn extras_policy(&self) -> SignPolicy;
    fn slots(&self) -> Vec<(&'static FieldSpec, &Option<ExtractedValue>)>;
    fn slots_mut(&mut self) -> Vec<(&'static FieldSpec, &mut Option<ExtractedValue>)>;
    /// Slot by canonical field name.
    fn slot_mut(&mut self, field: &str) -> Option<&mut Option<ExtractedValue>>;
    fn additional_items(&self) -> &[ExtractedValue];
    fn additional_items_mut(&mut self) -> &mut Vec<ExtractedValue>;
    fn calculated_total(&self) -> Option<f64>;
    fn set_calculated_total(&mut self, total: Option<f64>);

    /// Canonical field name for a variable name or alias.
    fn resolve(&self, variable: &str) -> Option<&'static str> {
        self.fields()
            .iter()
            .find(|f| f.name == variable || f.aliases.contains(&variable))
            .map(|f| f.name)
    }

    fn value(&self, field: &str) -> Option<&ExtractedValue> {
        self.slots()
            .into_iter()
            .find(|(spec, _)| spec.name == field)
            .and_then(|(_, slot)| slot.as_ref())
    }

    fn is_superseded(&self, field: &str) -> bool {
        self.supersedes()
            .iter()
            .any(|(winner, losers)| losers.contains(&field) && self.value(winner).is_some())
    }
}

/// Declares a statement section: one optional slot per standard field, an
/// unclassified-items list and a derived total, plus its `Section` impl.
///
/// ```ignore
/// statement_section! {
///     NoncurrentAssets => NoncurrentAssets, extras: AsReported {
///         ppe_at_cost: AsReported,
///         accumulated_depreciation: Outflow,
///         ppe_net: AsReported ["property_plant_equipment"],
///     }
///     supersedes { ppe_net => [ppe_at_cost, accumulated_depreciation] }
/// }
/// ```
macro_rules! statement_section {
    (
        $(#[$meta:meta])*
        $name:ident => $key:ident, extras: $extras:ident {
            $( $field:ident : $sign:ident $( [ $( $alias:literal ),* $(,)? ] )? ),* $(,)?
        }
        $( supersedes { $( $winner:ident => [ $( $loser:ident ),* $(,)? ] ),* $(,)? } )?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$crate::statements::value::ExtractedValue>,
            )*
            #[serde(default, skip_serializing_if = "Vec::is_empty")]
            pub additional_items: Vec<$crate::statements::value::ExtractedValue>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub calculated_total: Option<f64>,
        }

        impl $name {
            pub const FIELDS: &'static [$crate::statements::section::FieldSpec] = &[
                $(
                    $crate::statements::section::FieldSpec {
                        name: stringify!($field),
                        sign: $crate::statements::section::SignPolicy::$sign,
                        aliases: &[ $( $( $alias ),* )? ],
                    },
                )*
            ];

            pub const SUPERSEDES: &'static [(&'static str, &'static [&'static str])] = &[
                $( $( (stringify!($winner), &[ $( stringify!($loser) ),* ] as &'static [&'static str]), )* )?
            ];
        }

        impl $crate::statements::section::Section for $name {
            fn key(&self) -> $crate::statements::section::SectionKey {
                $crate::statements::section::SectionKey::$key
            }

            fn fields(&self) -> &'static [$crate::statements::section::FieldSpec] {
                Self::FIELDS
            }

            fn supersedes(&self) -> &'static [(&'static str, &'static [&'static str])] {
                Self::SUPERSEDES
            }

            fn extras_policy(&self) -> $crate::statements::section::SignPolicy {
                $crate::statements::section::SignPolicy::$extras
            }

            fn slots(
                &self,
            ) -> Vec<(
                &'static $crate::statements::section::FieldSpec,
                &Option<$crate::statements::value::ExtractedValue>,
            )> {
                Self::FIELDS.iter().zip([ $( &self.$field ),* ]).collect()
            }

            fn slots_mut(
                &mut self,
            ) -> Vec<(
                &'static $crate::statements::section::FieldSpec,
                &mut Option<$crate::statements::value::ExtractedValue>,
            )> {
                Self::FIELDS.iter().zip([ $( &mut self.$field ),* ]).collect()
            }

            fn slot_mut(&mut self, field: &str) -> Option<&mut Option<$crate::statements::value::ExtractedValue>> {
                $(
                    if field == stringify!($field) {
                        return Some(&mut self.$field);
                    }
                )*
                None
            }

            fn additional_items(&self) -> &[$crate::statements::value::ExtractedValue] {
                &self.additional_items
            }

            fn additional_items_mut(&mut self) -> &mut Vec<$crate::statements::value::ExtractedValue> {
                &mut self.additional_items
            }

            fn calculated_total(&self) -> Option<f64> {
                self.calculated_total
            }

            fn set_calculated_total(&mut self, total: Option<f64>) {
                self.calculated_total = total;
            }
        }
    };
}

pub(crate) use statement_section;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_map_to_sections() {
        use StatementType::*;
        assert_eq!(SectionKey::from_hint(BalanceSheet, "Current Assets"), Some(SectionKey::CurrentAssets));
        assert_eq!(SectionKey::from_hint(BalanceSheet, "noncurrent_assets_section"), Some(SectionKey::NoncurrentAssets));
        assert_eq!(SectionKey::from_hint(BalanceSheet, "Long-term liabilities"), Some(SectionKey::NoncurrentLiabilities));
        assert_eq!(SectionKey::from_hint(BalanceSheet, "Stockholders' equity"), Some(SectionKey::Equity));
        assert_eq!(SectionKey::from_hint(IncomeStatement, "Operating expenses"), Some(SectionKey::OperatingCosts));
        assert_eq!(SectionKey::from_hint(IncomeStatement, "Non-operating income"), Some(SectionKey::NonOperating));
        assert_eq!(SectionKey::from_hint(CashFlow, "Investing activities"), Some(SectionKey::InvestingActivities));
        assert_eq!(SectionKey::from_hint(CashFlow, "misc"), None);
    }
}
