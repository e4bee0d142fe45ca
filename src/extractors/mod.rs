// src/extractors/mod.rs
pub mod section;
pub mod table;
pub mod units;
pub mod values;

// Re-export key extraction types for convenience
pub use section::{
    Detection,
    KeywordStrategy,
    MarkerStrategy,
    SegmentationStrategy,
    Segmenter,
    StatementSection,
};
pub use table::{ParsedRow, ParsedTable};
pub use units::{detect_units, DetectedUnits, UnitScale};
pub use values::{parse_cell, RowMatch, ValueExtractor};
