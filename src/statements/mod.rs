// src/statements/mod.rs
pub mod section;
pub mod value;
pub mod income;
pub mod balance;
pub mod cash_flow;
pub mod tree;

pub use section::{FieldSpec, Section, SectionKey, SignPolicy};
pub use tree::{Placement, StatementTree};
pub use value::{ExtractedValue, MappingKind, Period, Provenance};
