//! specsieve core
//!
//! Types shared by the extraction engine and its callers.
//!
//! This crate provides:
//! - The converted-document input model (blocks, tables, document metadata)
//! - The `Requirement` output record and its acceptance criteria
//! - Error types and result handling
//! - JSON-lines and flattened tabular writers

pub mod error;
pub mod requirement;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use requirement::{
    AcceptanceCriterion, Comparator, NormativeStrength, Requirement, SourceAnchor, SourceLocation,
    SourceType,
};
pub use types::{Block, DocMeta, DocType, Document, DocumentInput, Table, TableCollection};
pub use writer::{write_jsonl, write_tabular, TabularRecord, TABULAR_COLUMNS};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::requirement::{AcceptanceCriterion, NormativeStrength, Requirement};
    pub use crate::types::{Block, DocMeta, DocType, Document, DocumentInput, Table};
}
