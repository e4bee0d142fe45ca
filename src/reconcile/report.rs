// src/reconcile/report.rs
use crate::statements::value::Period;
use crate::utils::config::PipelineConfig;
use serde::Serialize;

/// Accepted difference: the larger of an absolute floor and a share of the reported value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    pub fn new(relative: f64, absolute: f64) -> Self {
        Self { relative, absolute }
    }

    pub fn absolute(absolute: f64) -> Self {
        Self { relative: 0.0, absolute }
    }

    pub fn allowed(&self, reference: f64) -> f64 {
        (reference.abs() * self.relative).max(self.absolute)
    }
}

/// Tolerances used by aggregation and linkage checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerances {
    pub standard: Tolerance,
    pub cash_flow: Tolerance,
    pub linkage: Tolerance,
    pub retained_earnings_fraction: f64,
}

impl From<&PipelineConfig> for Tolerances {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            standard: Tolerance::new(config.relative_tolerance, config.absolute_tolerance),
            cash_flow: Tolerance::new(config.cash_flow_relative_tolerance, config.cash_flow_absolute_tolerance),
            linkage: Tolerance::absolute(config.linkage_tolerance),
            retained_earnings_fraction: config.retained_earnings_fraction,
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    /// Outside tolerance, but with known legitimate causes; see the note.
    Advisory,
    /// One side of the comparison is missing.
    Incomplete,
}

/// One calculated-versus-reported comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub calculated: Option<f64>,
    pub reported: Option<f64>,
    pub difference: Option<f64>,
    pub percent_difference: Option<f64>,
    pub tolerance: f64,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CheckResult {
    pub fn compare(name: &str, calculated: Option<f64>, reported: Option<f64>, tolerance: Tolerance) -> Self {
        let allowed = tolerance.allowed(reported.unwrap_or(0.0));
        let (difference, percent_difference, status) = match (calculated, reported) {
            (Some(calc), Some(rep)) => {
                let diff = calc - rep;
                let percent = if rep != 0.0 { Some(diff / rep.abs() * 100.0) } else { None };
                let status = if diff.abs() <= allowed { CheckStatus::Passed } else { CheckStatus::Failed };
                (Some(diff), percent, status)
            }
            _ => (None, None, CheckStatus::Incomplete),
        };
        Self {
            name: name.to_string(),
            calculated,
            reported,
            difference,
            percent_difference,
            tolerance: allowed,
            status,
            note: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }
}

/// Assets against liabilities plus equity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceCheck {
    pub assets: f64,
    pub liabilities: f64,
    pub equity: f64,
    pub difference: f64,
    pub percent_difference: f64,
    pub is_balanced: bool,
}

/// Aggregation results for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub period: Period,
    pub checks: Vec<CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<BalanceCheck>,
}

impl ValidationReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn failed_checks(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self.checks.iter().filter(|c| c.failed()).map(|c| c.name.as_str()).collect();
        if matches!(self.balance, Some(b) if !b.is_balanced) {
            failed.push("balance_sheet_equation");
        }
        failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed_checks().is_empty()
    }
}

/// Cross-statement identities for one fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkageReport {
    pub year: i32,
    pub checks: Vec<CheckResult>,
    pub all_passed: bool,
    pub failed_checks: Vec<String>,
    /// Outside tolerance with an explanatory note; not counted as failures.
    pub advisories: Vec<String>,
    /// Not evaluated because an input was missing.
    pub skipped_checks: Vec<String>,
}

impl LinkageReport {
    pub fn from_checks(year: i32, checks: Vec<CheckResult>) -> Self {
        let names = |status: CheckStatus| -> Vec<String> {
            checks.iter().filter(|c| c.status == status).map(|c| c.name.clone()).collect()
        };
        let failed_checks = names(CheckStatus::Failed);
        let advisories = names(CheckStatus::Advisory);
        let skipped_checks = names(CheckStatus::Incomplete);
        Self {
            year,
            all_passed: failed_checks.is_empty(),
            failed_checks,
            advisories,
            skipped_checks,
            checks,
        }
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_within_and_outside_tolerance() {
        let tol = Tolerance::new(0.01, 1.0);
        let ok = CheckResult::compare("x", Some(1005.0), Some(1000.0), tol);
        assert_eq!(ok.status, CheckStatus::Passed);
        assert_eq!(ok.difference, Some(5.0));
        assert_eq!(ok.tolerance, 10.0);

        let bad = CheckResult::compare("x", Some(1050.0), Some(1000.0), tol);
        assert_eq!(bad.status, CheckStatus::Failed);
        assert_eq!(bad.percent_difference, Some(5.0));

        let missing = CheckResult::compare("x", None, Some(1000.0), tol);
        assert_eq!(missing.status, CheckStatus::Incomplete);
        assert_eq!(missing.difference, None);
    }
}
