// src/reconcile/linkage.rs
use crate::reconcile::report::{CheckResult, CheckStatus, LinkageReport, Tolerance, Tolerances};
use crate::statements::section::SectionKey;
use crate::statements::tree::StatementTree;

fn figure(tree: &StatementTree, key: SectionKey, field: &str, year: i32) -> Option<f64> {
    tree.value(key, field).and_then(|v| v.year(year))
}

/// Income statement net income against the cash flow statement's starting line.
/// The difference is income statement minus cash flow.
pub fn net_income_link(tree: &StatementTree, year: i32, tolerances: &Tolerances) -> CheckResult {
    CheckResult::compare(
        "net_income",
        figure(tree, SectionKey::NetIncome, "net_income_to_common", year),
        figure(tree, SectionKey::OperatingActivities, "net_income_start", year),
        tolerances.linkage,
    )
}

/// Cash flow ending cash against balance sheet cash.
pub fn ending_cash_link(tree: &StatementTree, year: i32, tolerances: &Tolerances) -> CheckResult {
    let mut check = CheckResult::compare(
        "cash_ending",
        figure(tree, SectionKey::CashSummary, "cash_ending", year),
        figure(tree, SectionKey::CurrentAssets, "cash_and_equivalents", year),
        tolerances.linkage,
    );
    if check.failed() && tree.value(SectionKey::NoncurrentAssets, "restricted_cash").is_some() {
        check.note = Some("cash flow ending cash may include restricted cash".into());
    }
    check
}

/// Reported net change in cash against the year-over-year change in balance sheet cash.
pub fn cash_change_link(tree: &StatementTree, year: i32, tolerances: &Tolerances) -> CheckResult {
    let cash = |y: i32| figure(tree, SectionKey::CurrentAssets, "cash_and_equivalents", y);
    let balance_change = cash(year).zip(cash(year - 1)).map(|(current, prior)| current - prior);
    CheckResult::compare(
        "cash_change",
        figure(tree, SectionKey::CashSummary, "net_change_in_cash", year),
        balance_change,
        tolerances.linkage,
    )
}

/// Retained earnings roll-forward: the change in retained earnings against
/// net income less dividends. Buybacks, ASC adoptions and other equity
/// movements legitimately break this, so a miss is an advisory, not a failure.
pub fn retained_earnings_link(tree: &StatementTree, year: i32, tolerances: &Tolerances) -> CheckResult {
    let retained = |y: i32| figure(tree, SectionKey::Equity, "retained_earnings_deficit", y);
    let change = retained(year).zip(retained(year - 1)).map(|(current, prior)| current - prior);

    let net_income = figure(tree, SectionKey::NetIncome, "net_income_to_common", year);
    let dividends = figure(tree, SectionKey::FinancingActivities, "dividends_paid", year).map_or(0.0, f64::abs);
    let expected = net_income.map(|ni| ni - dividends);

    let tolerance = Tolerance::absolute(
        (net_income.unwrap_or(0.0).abs() * tolerances.retained_earnings_fraction).max(tolerances.linkage.absolute),
    );
    let mut check = CheckResult::compare("retained_earnings", change, expected, tolerance);
    if check.failed() {
        check.status = CheckStatus::Advisory;
        check.note = Some(
            "retained earnings change differs from net income less dividends; \
             other equity movements such as buybacks or accounting changes may explain it"
                .into(),
        );
    }
    check
}

/// All cross-statement identities for `year`.
pub fn validate_linkage(tree: &StatementTree, year: i32, tolerances: &Tolerances) -> LinkageReport {
    let checks = vec![
        net_income_link(tree, year, tolerances),
        ending_cash_link(tree, year, tolerances),
        cash_change_link(tree, year, tolerances),
        retained_earnings_link(tree, year, tolerances),
    ];
    let report = LinkageReport::from_checks(year, checks);
    if !report.all_passed {
        tracing::warn!("Linkage checks failed for {}: {:?}", year, report.failed_checks);
    }
    report
}
