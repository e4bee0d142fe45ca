// src/extractors/units.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Magnitude a table's figures are written in. Recorded as metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitScale {
    #[default]
    Unspecified,
    Dollars,
    Thousands,
    Millions,
    Billions,
}

impl UnitScale {
    pub fn multiplier(self) -> f64 {
        match self {
            UnitScale::Unspecified | UnitScale::Dollars => 1.0,
            UnitScale::Thousands => 1_000.0,
            UnitScale::Millions => 1_000_000.0,
            UnitScale::Billions => 1_000_000_000.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitScale::Unspecified => "",
            UnitScale::Dollars => "dollars",
            UnitScale::Thousands => "thousands",
            UnitScale::Millions => "millions",
            UnitScale::Billions => "billions",
        }
    }
}

// The earliest declaration in the header wins; later ones usually qualify share counts
static AMOUNT_SCALE_RE: Lazy<Vec<(Regex, UnitScale)>> = Lazy::new(|| {
    [
        (r"(?i)\bin\s+millions", UnitScale::Millions),
        (r"(?i)millions\s+of\s+dollars", UnitScale::Millions),
        (r"\$\s*MM\b", UnitScale::Millions),
        (r"(?i)\bin\s+thousands", UnitScale::Thousands),
        (r"(?i)thousands\s+of\s+dollars", UnitScale::Thousands),
        (r"(?i)\$\s*000s?\b", UnitScale::Thousands),
        (r"(?i)\bin\s+billions", UnitScale::Billions),
        (r"(?i)amounts\s+in\s+dollars", UnitScale::Dollars),
    ]
    .iter()
    .filter_map(|(pat, scale)| Regex::new(pat).ok().map(|re| (re, *scale)))
    .collect()
});

// "shares in thousands", "number of shares, which are reflected in thousands"
static SHARE_SCALE_RE: Lazy<Vec<(Regex, UnitScale)>> = Lazy::new(|| {
    [
        (r"(?i)shares?\b[^.;()]{0,40}?\bin\s+thousands", UnitScale::Thousands),
        (r"(?i)shares?\b[^.;()]{0,40}?\bin\s+millions", UnitScale::Millions),
        (r"(?i)except\s+(?:per\s+)?share", UnitScale::Dollars),
    ]
    .iter()
    .filter_map(|(pat, scale)| Regex::new(pat).ok().map(|re| (re, *scale)))
    .collect()
});

/// True when the phrase ending at `at` is a share-count qualifier ("shares in millions").
fn qualifies_shares(region: &str, at: usize) -> bool {
    let before = region[..at].trim_end().to_lowercase();
    before.ends_with("shares") || before.ends_with("share")
}

/// Scales declared near the top of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectedUnits {
    pub amounts: UnitScale,
    /// Share counts are sometimes declared separately ("shares in thousands").
    pub shares: Option<UnitScale>,
}

/// Looks for a unit declaration in the first `window` bytes of `text`.
pub fn detect_units(text: &str, window: usize) -> DetectedUnits {
    let mut end = window.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let region = &text[..end];

    let amounts = AMOUNT_SCALE_RE
        .iter()
        .flat_map(|(re, scale)| re.find_iter(region).map(move |m| (m.start(), *scale)))
        .filter(|(start, _)| !qualifies_shares(region, *start))
        .min_by_key(|(start, _)| *start)
        .map(|(_, scale)| scale)
        .unwrap_or_default();
    // An explicit share scale beats "except per share"; among those the shortest
    // qualifier wins, so "shares in millions, dollars in thousands" is millions
    let shares = SHARE_SCALE_RE
        .iter()
        .filter_map(|(re, scale)| re.find(region).map(|m| (m.end(), *scale)))
        .min_by_key(|(end, scale)| (*scale == UnitScale::Dollars, *end))
        .map(|(_, scale)| scale);

    tracing::debug!("Detected unit scale '{}' (shares: {:?})", amounts.label(), shares);
    DetectedUnits { amounts, shares }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_declarations() {
        assert_eq!(detect_units("(In millions, except per share data)", 5000).amounts, UnitScale::Millions);
        assert_eq!(detect_units("| ($000s) | 2024 |", 5000).amounts, UnitScale::Thousands);
        assert_eq!(detect_units("Amounts in dollars", 5000).amounts, UnitScale::Dollars);
        assert_eq!(detect_units("$MM", 5000).amounts, UnitScale::Millions);
        assert_eq!(detect_units("no declaration", 5000).amounts, UnitScale::Unspecified);
    }

    #[test]
    fn test_share_scale_and_window() {
        let units = detect_units("(in thousands, shares in millions)", 5000);
        assert_eq!(units.amounts, UnitScale::Thousands);
        assert_eq!(units.shares, Some(UnitScale::Millions));

        let shares_first = detect_units("(shares in millions, dollars in thousands)", 5000);
        assert_eq!(shares_first.amounts, UnitScale::Thousands);
        assert_eq!(shares_first.shares, Some(UnitScale::Millions));

        let late = format!("{}(in billions)", "x".repeat(100));
        assert_eq!(detect_units(&late, 50).amounts, UnitScale::Unspecified);
    }

    #[test]
    fn test_millions_header_with_shares_in_thousands() {
        let units = detect_units(
            "(In millions, except number of shares, which are reflected in thousands, and per-share amounts)",
            5000,
        );
        assert_eq!(units.amounts, UnitScale::Millions);
        assert_eq!(units.shares, Some(UnitScale::Thousands));

        let per_share = detect_units("(in thousands, except per share data; shares in millions)", 5000);
        assert_eq!(per_share.amounts, UnitScale::Thousands);
        assert_eq!(per_share.shares, Some(UnitScale::Millions));
    }
}
