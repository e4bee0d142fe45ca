// src/reconcile/mod.rs
pub mod aggregation;
pub mod linkage;
pub mod normalize;
pub mod report;
pub mod rules;

pub use aggregation::{check_balance, compute_totals, section_total, validate};
pub use linkage::validate_linkage;
pub use normalize::normalize_signs;
pub use report::{BalanceCheck, CheckResult, CheckStatus, LinkageReport, Tolerance, Tolerances, ValidationReport};
pub use rules::{LabelDecision, LabelPattern, SubtotalRule, SubtotalRules};
