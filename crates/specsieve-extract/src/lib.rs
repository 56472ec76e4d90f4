//! specsieve extraction engine
//!
//! Turns a converted engineering specification (blocks plus tables) into a
//! deduplicated list of atomic requirements.
//!
//! The engine is organized as a staged pipeline:
//! - Marker index: one pass over paragraphs and table cells for `#045.0`
//!   and `4.1.2.7` style anchors
//! - Classifier: RS, TPS or unknown, with a confidence and feature breakdown
//! - Segmentation strategies: one type per dialect variant, chained with
//!   uid-based merging
//! - Consolidation: noise filtering, dedup by body score, hybrid correction
//!
//! Everything runs synchronously on the calling thread.

pub mod classifier;
pub mod config;
pub mod consolidate;
pub mod coverage;
pub mod hybrid;
pub mod markers;
pub mod normalize;
pub mod pipeline;
pub mod semantics;
pub mod strategies;
pub mod strategy;
pub mod tables;

pub use classifier::{ClassificationFeatures, ClassifierOverride, DocumentClassifier, DocumentProfile};
pub use config::{
    ClassifierSettings, ExtractionConfig, HybridSettings, MarkerSettings, SegmentationSettings,
};
pub use consolidate::{consolidate, deduplicate, filter_noise, DropReason};
pub use coverage::{CoverageReport, RsCoverage, TpsCoverage};
pub use hybrid::{HybridCorrector, HybridOutcome};
pub use markers::{normalize_rs_uid, ContainerType, Marker, MarkerIndex, MarkerKind};
pub use pipeline::{merge_phase, ExtractionOutcome, Extractor};
pub use strategy::{run_phase, PhaseOutcome, PhaseReport, SegmentationContext, SegmentationStrategy};
pub use tables::{ColumnRole, ColumnRoles, IdColumnReport, TableGrid, TableSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::ExtractionConfig;
    pub use crate::coverage::CoverageReport;
    pub use crate::pipeline::{ExtractionOutcome, Extractor};
    pub use crate::strategies::{
        FallbackStrategy, GenericTableStrategy, IdTableStrategy, MarkdownStrategy,
        MarkerFirstStrategy, PlaintextStrategy, RsMarkerStrategy,
    };
    pub use crate::strategy::{SegmentationContext, SegmentationStrategy};
}
