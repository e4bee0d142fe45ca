// src/edgar/mod.rs
pub mod models;

pub use models::{AnnotatedDocument, FilingIdentity, StatementType};
