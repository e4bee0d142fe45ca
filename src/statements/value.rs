// src/statements/value.rs
use crate::classifier::{RowKind, TargetVariable};
use crate::edgar::models::StatementType;
use crate::extractors::units::UnitScale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an extracted value relates to the canonical field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingKind {
    Mapped,
    Unique,
    Subtotal,
    Total,
}

impl MappingKind {
    /// Decided once from the classification; never re-inferred from numbers.
    pub fn classify(target: &TargetVariable, row_kind: RowKind) -> Self {
        match (target, row_kind) {
            (TargetVariable::Unique, _) => MappingKind::Unique,
            (TargetVariable::Mapped(_), RowKind::Subtotal) => MappingKind::Subtotal,
            (TargetVariable::Mapped(_), RowKind::Total) => MappingKind::Total,
            (TargetVariable::Mapped(_), RowKind::Item) => MappingKind::Mapped,
        }
    }
}

/// Which figure of a value to read: the primary-year `value` or a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Primary,
    Year(i32),
}

/// Where a value came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub statement: StatementType,
    pub source_line: usize,
    pub row_index: usize,
    pub row_kind: RowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_title: Option<String>,
}

/// One classified table row with its per-year figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedValue {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub mapping: MappingKind,
    pub years: BTreeMap<i32, f64>,
    /// Primary-year figure, filled after merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_scale: UnitScale,
    pub confidence: f64,
    pub provenance: Provenance,
}

impl ExtractedValue {
    /// Counts toward section totals: ITEM rows, mapped or unique.
    pub fn is_item(&self) -> bool {
        self.provenance.row_kind == RowKind::Item
            && matches!(self.mapping, MappingKind::Mapped | MappingKind::Unique)
    }

    pub fn year(&self, year: i32) -> Option<f64> {
        self.years.get(&year).copied()
    }

    /// No fallback between periods: a missing year is missing.
    pub fn at(&self, period: Period) -> Option<f64> {
        match period {
            Period::Primary => self.value,
            Period::Year(year) => self.year(year),
        }
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.keys().next_back().copied()
    }

    /// Figures multiplied by the declared unit scale. Extraction itself never scales.
    pub fn scaled_years(&self) -> BTreeMap<i32, f64> {
        let factor = self.unit_scale.multiplier();
        self.years.iter().map(|(year, v)| (*year, v * factor)).collect()
    }

    /// Applies `f` to the primary value and every year.
    pub fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        self.value = self.value.map(&f);
        for v in self.years.values_mut() {
            *v = f(*v);
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An ITEM value with one figure per (year, amount) pair.
    pub fn item(label: &str, variable: Option<&str>, years: &[(i32, f64)]) -> ExtractedValue {
        let mapping = if variable.is_some() { MappingKind::Mapped } else { MappingKind::Unique };
        ExtractedValue {
            label: label.to_string(),
            variable: variable.map(str::to_string),
            mapping,
            years: years.iter().copied().collect(),
            value: None,
            unit_scale: UnitScale::Millions,
            confidence: 0.9,
            provenance: Provenance {
                statement: StatementType::IncomeStatement,
                source_line: 1,
                row_index: 0,
                row_kind: RowKind::Item,
                parent_section: None,
                table_title: None,
            },
        }
    }

    pub fn with_kind(mut value: ExtractedValue, row_kind: RowKind) -> ExtractedValue {
        let target = match &value.variable {
            Some(name) => TargetVariable::Mapped(name.clone()),
            None => TargetVariable::Unique,
        };
        value.mapping = MappingKind::classify(&target, row_kind);
        value.provenance.row_kind = row_kind;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_kind_from_classification() {
        let mapped = TargetVariable::Mapped("revenues".into());
        assert_eq!(MappingKind::classify(&mapped, RowKind::Item), MappingKind::Mapped);
        assert_eq!(MappingKind::classify(&mapped, RowKind::Subtotal), MappingKind::Subtotal);
        assert_eq!(MappingKind::classify(&mapped, RowKind::Total), MappingKind::Total);
        assert_eq!(MappingKind::classify(&TargetVariable::Unique, RowKind::Total), MappingKind::Unique);
    }

    #[test]
    fn test_scaling_is_explicit() {
        let value = fixtures::item("Revenue", Some("revenues"), &[(2024, 2.5)]);
        assert_eq!(value.year(2024), Some(2.5));
        assert_eq!(value.scaled_years()[&2024], 2_500_000.0);
    }
}
