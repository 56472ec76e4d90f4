//! Segmentation strategy trait and per-phase result records

use serde::{Deserialize, Serialize};
use specsieve_core::{DocMeta, Document, Requirement, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::SegmentationSettings;
use crate::markers::MarkerIndex;
use crate::tables::TableSet;

/// Produces requirement candidates for one document
pub trait SegmentationStrategy: Send + Sync {
    /// Phase name used in reports and logs
    fn name(&self) -> &'static str;

    /// Segment the document
    ///
    /// An `Err` is reported as a failed phase; the pipeline carries on
    /// with the next one.
    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>>;
}

/// Read-only view of one document shared by every phase
#[derive(Debug, Clone)]
pub struct SegmentationContext<'a> {
    pub document: &'a Document,
    pub tables: &'a TableSet,
    pub markers: &'a MarkerIndex,
    pub meta: Arc<DocMeta>,
    pub settings: &'a SegmentationSettings,

    /// Candidates produced by earlier phases
    pub prior: &'a [Requirement],
}

impl<'a> SegmentationContext<'a> {
    pub fn new(
        document: &'a Document,
        tables: &'a TableSet,
        markers: &'a MarkerIndex,
        meta: Arc<DocMeta>,
        settings: &'a SegmentationSettings,
    ) -> Self {
        Self {
            document,
            tables,
            markers,
            meta,
            settings,
            prior: &[],
        }
    }

    /// Same view with the candidates produced so far
    pub fn with_prior(&self, prior: &'a [Requirement]) -> Self {
        Self {
            prior,
            meta: Arc::clone(&self.meta),
            ..*self
        }
    }

    /// Uids already produced by earlier phases
    pub fn resolved_uids(&self) -> HashSet<&str> {
        self.prior.iter().map(|r| r.requirement_uid.as_str()).collect()
    }

    /// (table, row) pairs already covered by earlier phases
    pub fn covered_rows(&self) -> HashSet<(&str, usize)> {
        self.prior
            .iter()
            .filter_map(|r| r.source_location.table_row())
            .collect()
    }
}

/// How a phase ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Extracted,
    Failed { reason: String },
}

impl PhaseOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result record for one pipeline phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: String,

    pub outcome: PhaseOutcome,

    /// Candidates returned by the phase
    pub produced: usize,

    /// Phase execution time
    pub latency_us: u64,
}

/// Run one strategy, turning a failure into a report entry
pub fn run_phase(
    strategy: &dyn SegmentationStrategy,
    ctx: &SegmentationContext<'_>,
) -> (Vec<Requirement>, PhaseReport) {
    let start = Instant::now();
    let (requirements, outcome) = match strategy.segment(ctx) {
        Ok(requirements) => (requirements, PhaseOutcome::Extracted),
        Err(e) => {
            warn!(phase = strategy.name(), error = %e, "segmentation phase failed");
            (
                Vec::new(),
                PhaseOutcome::Failed {
                    reason: e.to_string(),
                },
            )
        }
    };

    let report = PhaseReport {
        phase: strategy.name().to_string(),
        outcome,
        produced: requirements.len(),
        latency_us: start.elapsed().as_micros() as u64,
    };
    debug!(phase = %report.phase, produced = report.produced, "phase finished");
    (requirements, report)
}
