// src/reconcile/aggregation.rs
use crate::reconcile::report::{BalanceCheck, CheckResult, Tolerances, ValidationReport};
use crate::reconcile::rules::SubtotalRules;
use crate::statements::section::{Section, SectionKey, SignPolicy};
use crate::statements::tree::StatementTree;
use crate::statements::value::Period;

/// Sum of the values in `section` that count toward its total:
/// ITEM rows in summed slots that are not superseded, plus additional items
/// unless the section's extras are memo lines or the label reads as a subtotal.
/// `None` when nothing contributed.
pub fn section_total(section: &dyn Section, period: Period, rules: &SubtotalRules) -> Option<f64> {
    let slotted = section
        .slots()
        .into_iter()
        .filter(|(spec, _)| spec.sign.is_summed() && !section.is_superseded(spec.name))
        .filter_map(|(_, slot)| slot.as_ref());

    let extras = section
        .additional_items()
        .iter()
        .filter(|_| section.extras_policy() != SignPolicy::Memo)
        .filter(|v| !rules.is_subtotal(&v.label));

    slotted
        .chain(extras)
        .filter(|v| v.is_item())
        .filter_map(|v| v.at(period))
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Stores each section's derived total for `period`.
pub fn compute_totals(tree: &mut StatementTree, period: Period, rules: &SubtotalRules) {
    for section in tree.sections_mut() {
        let total = section_total(&*section, period, rules);
        section.set_calculated_total(total);
    }
}

fn total(tree: &StatementTree, key: SectionKey, period: Period, rules: &SubtotalRules) -> Option<f64> {
    section_total(tree.section(key), period, rules)
}

fn reported(tree: &StatementTree, key: SectionKey, field: &str, period: Period) -> Option<f64> {
    tree.value(key, field).and_then(|v| v.at(period))
}

/// Adds a section total to a running figure. An empty section adds nothing;
/// a missing running figure stays missing.
fn step(previous: Option<f64>, section: Option<f64>) -> Option<f64> {
    previous.map(|p| p + section.unwrap_or(0.0))
}

fn sum_present(parts: &[Option<f64>]) -> Option<f64> {
    parts.iter().flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Revenue down to comprehensive income. Each step starts from the prior
/// step's reported figure when one exists, so one bad line fails one check.
pub fn income_statement_checks(
    tree: &StatementTree,
    period: Period,
    rules: &SubtotalRules,
    tolerances: &Tolerances,
) -> Vec<CheckResult> {
    use SectionKey::*;
    let tol = tolerances.standard;
    let mut checks = Vec::new();

    let gp_calc = total(tree, GrossProfit, period, rules);
    let gp_rep = reported(tree, GrossProfit, "gross_profit", period);
    checks.push(CheckResult::compare("gross_profit", gp_calc, gp_rep, tol));

    // Non-recurring charges sit above operating income.
    let operating_charges = sum_present(&[
        total(tree, OperatingCosts, period, rules),
        total(tree, NonRecurring, period, rules),
    ]);
    let op_calc = step(gp_rep.or(gp_calc), operating_charges);
    let op_rep = reported(tree, OperatingCosts, "operating_income", period);
    checks.push(CheckResult::compare("operating_income", op_calc, op_rep, tol));

    let ibt_calc = step(op_rep.or(op_calc), total(tree, NonOperating, period, rules));
    let ibt_rep = reported(tree, NonOperating, "income_before_tax", period);
    checks.push(CheckResult::compare("income_before_tax", ibt_calc, ibt_rep, tol));

    let ni_calc = step(ibt_rep.or(ibt_calc), total(tree, TaxAdjustments, period, rules));
    let ni_common = reported(tree, NetIncome, "net_income_to_common", period);
    let ni_rep = ni_common.map(|common| common + reported(tree, NetIncome, "net_income_to_nci", period).unwrap_or(0.0));
    checks.push(CheckResult::compare("net_income", ni_calc, ni_rep, tol));

    let ci_calc = step(ni_rep.or(ni_calc), total(tree, Oci, period, rules));
    let ci_rep = reported(tree, Oci, "comprehensive_income", period);
    checks.push(CheckResult::compare("comprehensive_income", ci_calc, ci_rep, tol));

    checks
}

/// Activity totals against reported net cash, the net change in cash, and the
/// roll from beginning to ending cash.
pub fn cash_flow_checks(
    tree: &StatementTree,
    period: Period,
    rules: &SubtotalRules,
    tolerances: &Tolerances,
) -> Vec<CheckResult> {
    use SectionKey::*;
    let tol = tolerances.standard;
    let mut checks = Vec::new();

    let mut activity = |name: &str, key: SectionKey, field: &str| {
        let calc = total(tree, key, period, rules);
        let rep = reported(tree, CashSummary, field, period);
        checks.push(CheckResult::compare(name, calc, rep, tol));
        rep.or(calc)
    };
    let operating = activity("net_cash_operating", OperatingActivities, "net_cash_operating");
    let investing = activity("net_cash_investing", InvestingActivities, "net_cash_investing");
    let financing = activity("net_cash_financing", FinancingActivities, "net_cash_financing");

    let fx = reported(tree, CashSummary, "fx_effect", period).unwrap_or(0.0);
    let change_calc = match (operating, investing, financing) {
        (Some(o), Some(i), Some(f)) => Some(o + i + f + fx),
        _ => None,
    };
    let change_rep = reported(tree, CashSummary, "net_change_in_cash", period);
    checks.push(CheckResult::compare("net_change_in_cash", change_calc, change_rep, tolerances.cash_flow));

    let ending_calc = reported(tree, CashSummary, "cash_beginning", period)
        .zip(change_rep.or(change_calc))
        .map(|(beginning, change)| beginning + change);
    let ending_rep = reported(tree, CashSummary, "cash_ending", period);
    checks.push(CheckResult::compare("cash_ending", ending_calc, ending_rep, tol));

    checks
}

/// Section totals against the balance sheet's reported totals.
pub fn balance_sheet_checks(
    tree: &StatementTree,
    period: Period,
    rules: &SubtotalRules,
    tolerances: &Tolerances,
) -> Vec<CheckResult> {
    use SectionKey::*;
    let tol = tolerances.standard;
    let rep = |field: &str| reported(tree, BalanceSheetTotals, field, period);

    let current_assets = total(tree, CurrentAssets, period, rules);
    let current_liabilities = total(tree, CurrentLiabilities, period, rules);
    let assets = step(rep("total_current_assets").or(current_assets), total(tree, NoncurrentAssets, period, rules));
    let liabilities = step(
        rep("total_current_liabilities").or(current_liabilities),
        total(tree, NoncurrentLiabilities, period, rules),
    );

    vec![
        CheckResult::compare("total_current_assets", current_assets, rep("total_current_assets"), tol),
        CheckResult::compare("total_assets", assets, rep("total_assets"), tol),
        CheckResult::compare("total_current_liabilities", current_liabilities, rep("total_current_liabilities"), tol),
        CheckResult::compare("total_liabilities", liabilities, rep("total_liabilities"), tol),
        CheckResult::compare("total_equity", total(tree, Equity, period, rules), rep("total_equity"), tol),
    ]
}

/// Assets = Liabilities + Equity within `relative_tolerance` of assets.
pub fn check_balance(assets: f64, liabilities: f64, equity: f64, relative_tolerance: f64) -> BalanceCheck {
    let difference = assets - (liabilities + equity);
    let percent_difference = if assets != 0.0 { difference / assets.abs() * 100.0 } else { 0.0 };
    BalanceCheck {
        assets,
        liabilities,
        equity,
        difference,
        percent_difference,
        is_balanced: difference.abs() <= assets.abs() * relative_tolerance,
    }
}

/// The balance equation from reported totals, falling back to section sums.
pub fn balance_equation(
    tree: &StatementTree,
    period: Period,
    rules: &SubtotalRules,
    tolerances: &Tolerances,
) -> Option<BalanceCheck> {
    use SectionKey::*;
    let rep = |field: &str| reported(tree, BalanceSheetTotals, field, period);
    let sum = |a: SectionKey, b: SectionKey| sum_present(&[total(tree, a, period, rules), total(tree, b, period, rules)]);

    let assets = rep("total_assets").or_else(|| sum(CurrentAssets, NoncurrentAssets))?;
    let liabilities = rep("total_liabilities").or_else(|| sum(CurrentLiabilities, NoncurrentLiabilities))?;
    let equity = rep("total_equity").or_else(|| total(tree, Equity, period, rules))?;
    Some(check_balance(assets, liabilities, equity, tolerances.standard.relative))
}

/// All aggregation checks for one period.
pub fn validate(tree: &StatementTree, period: Period, rules: &SubtotalRules, tolerances: &Tolerances) -> ValidationReport {
    let mut checks = income_statement_checks(tree, period, rules, tolerances);
    checks.extend(balance_sheet_checks(tree, period, rules, tolerances));
    checks.extend(cash_flow_checks(tree, period, rules, tolerances));
    let balance = balance_equation(tree, period, rules, tolerances);

    for check in checks.iter().filter(|c| c.failed()) {
        tracing::warn!(
            "Check {} failed: calculated {:?}, reported {:?}, tolerance {:.2}",
            check.name,
            check.calculated,
            check.reported,
            check.tolerance
        );
    }
    ValidationReport { period, checks, balance }
}
