//! Extraction pipeline: index, classify, segment, consolidate, correct
//!
//! Every document goes through the same stages:
//! 1. Parse tables and build the marker index
//! 2. Classify the document
//! 3. Run the segmentation phases for the classified type
//! 4. Filter and deduplicate candidates
//! 5. Apply hybrid correction (TPS only) and the majority relabel
//!
//! No stage returns an error for document content; a failing phase is
//! recorded in the phase reports and the next phase runs.

use serde::Serialize;
use specsieve_core::{DocMeta, DocType, DocumentInput, Requirement};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classifier::{DocumentClassifier, DocumentProfile};
use crate::config::ExtractionConfig;
use crate::consolidate::{consolidate, deduplicate};
use crate::coverage::CoverageReport;
use crate::hybrid::{rs_majority, HybridCorrector};
use crate::markers::MarkerIndex;
use crate::strategies::{
    FallbackStrategy, GenericTableStrategy, IdTableStrategy, MarkdownStrategy,
    MarkerFirstStrategy, PlaintextStrategy, RsMarkerStrategy,
};
use crate::strategy::{run_phase, PhaseReport, SegmentationContext, SegmentationStrategy};
use crate::tables::{IdColumnReport, TableSet};

/// Everything one extraction run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    /// Final requirements, uids unique
    pub requirements: Vec<Requirement>,

    /// Classification, with the corrected type if a relabel happened
    pub profile: DocumentProfile,

    /// Metadata shared by every requirement
    pub doc_meta: Arc<DocMeta>,

    /// One entry per segmentation phase that ran
    pub phases: Vec<PhaseReport>,

    /// Identifier columns found by the ID-table phase
    pub id_columns: Vec<IdColumnReport>,

    /// Post-segmentation evidence changed the document type
    pub relabelled: bool,

    /// Requirements moved into the Dialect-A namespace by hybrid correction
    pub renamespaced: usize,

    #[serde(skip)]
    pub markers: MarkerIndex,
}

impl ExtractionOutcome {
    pub fn doc_type(&self) -> DocType {
        self.profile.doc_type
    }

    /// Coverage audit of this run
    pub fn coverage(&self) -> CoverageReport {
        CoverageReport::audit(self.profile.doc_type, &self.markers, &self.requirements)
    }
}

/// Requirement extractor
///
/// Holds no per-document state; one instance can process any number of
/// documents.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractionConfig,
    classifier: DocumentClassifier,
    hybrid: HybridCorrector,
}

/// Candidates and reports accumulated across phases
struct PhaseRun<'a> {
    ctx: &'a SegmentationContext<'a>,
    phases: Vec<PhaseReport>,
}

impl<'a> PhaseRun<'a> {
    fn new(ctx: &'a SegmentationContext<'a>) -> Self {
        Self {
            ctx,
            phases: Vec::new(),
        }
    }

    fn run(&mut self, strategy: &dyn SegmentationStrategy) -> Vec<Requirement> {
        self.run_with_prior(strategy, &[])
    }

    fn run_with_prior(
        &mut self,
        strategy: &dyn SegmentationStrategy,
        prior: &[Requirement],
    ) -> Vec<Requirement> {
        let (produced, report) = run_phase(strategy, &self.ctx.with_prior(prior));
        self.phases.push(report);
        produced
    }
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            classifier: DocumentClassifier::new(config.classifier.clone()),
            hybrid: HybridCorrector::new(config.hybrid.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the requirements of one document
    pub fn extract(&self, input: &DocumentInput) -> ExtractionOutcome {
        let tables = TableSet::from_tables(&input.tables);
        let markers = MarkerIndex::build(&input.document, &tables, &self.config.markers);
        debug!(
            tables = tables.len(),
            rs_markers = markers.rs_count(),
            tps_markers = markers.tps_count(),
            "marker index built"
        );

        let mut profile = self.classifier.classify(
            &input.document,
            input.tables.len(),
            input.filename.as_deref(),
            &markers,
        );
        let meta = Arc::new(input.meta.classified(profile.doc_type, profile.confidence));
        let ctx = SegmentationContext::new(
            &input.document,
            &tables,
            &markers,
            Arc::clone(&meta),
            &self.config.segmentation,
        );

        let mut run = PhaseRun::new(&ctx);
        let mut id_columns = Vec::new();
        let mut renamespaced = 0;

        let (mut requirements, mut doc_type) = match profile.doc_type {
            DocType::Rs => {
                let produced = run.run(&RsMarkerStrategy);
                (consolidate(produced, &tables), DocType::Rs)
            }
            DocType::Tps => {
                id_columns = tables.id_column_reports(&self.config.segmentation);
                let candidates = self.segment_tps(&mut run);
                let outcome = self.hybrid.apply(&ctx, candidates);
                run.phases.extend(outcome.rs_phase);
                renamespaced = outcome.renamespaced;
                (outcome.requirements, outcome.doc_type)
            }
            DocType::Unknown => {
                let produced = run.run(&FallbackStrategy);
                (consolidate(produced, &tables), DocType::Unknown)
            }
        };
        let phases = run.phases;

        if doc_type != DocType::Rs && rs_majority(&requirements) {
            info!(from = %doc_type, "majority of uids are dialect-a, relabelling as RS");
            doc_type = DocType::Rs;
        }

        let relabelled = doc_type != profile.doc_type;
        let doc_meta = if relabelled {
            profile = profile.relabeled(doc_type);
            let corrected = Arc::new(input.meta.classified(doc_type, profile.confidence));
            for requirement in requirements.iter_mut() {
                requirement.doc_meta = Arc::clone(&corrected);
            }
            corrected
        } else {
            meta
        };

        info!(
            document_id = %doc_meta.document_id,
            doc_type = %doc_type,
            confidence = profile.confidence,
            requirements = requirements.len(),
            relabelled,
            "extraction finished"
        );

        ExtractionOutcome {
            requirements,
            profile,
            doc_meta,
            phases,
            id_columns,
            relabelled,
            renamespaced,
            markers,
        }
    }

    /// Dialect-B phases in priority order, then the generic rescue
    fn segment_tps(&self, run: &mut PhaseRun<'_>) -> Vec<Requirement> {
        let mut candidates = Vec::new();
        for strategy in [
            &IdTableStrategy as &dyn SegmentationStrategy,
            &PlaintextStrategy,
            &MarkdownStrategy,
        ] {
            let produced = run.run(strategy);
            merge_phase(&mut candidates, produced);
        }
        let produced = run.run_with_prior(&MarkerFirstStrategy, &candidates);
        merge_phase(&mut candidates, produced);

        let mut requirements = consolidate(candidates, run.ctx.tables);

        let settings = &self.config.segmentation;
        let tps_markers = run.ctx.markers.tps_count();
        if requirements.len() < settings.generic_rescue_max_requirements
            && tps_markers > settings.generic_rescue_min_tps_markers
        {
            info!(
                requirements = requirements.len(),
                tps_markers, "marker-first came up short, running generic rescue"
            );
            let produced = run.run(&GenericTableStrategy);
            merge_phase(&mut requirements, produced);
            requirements = deduplicate(requirements);
        }
        requirements
    }
}

/// Merge one phase's output into the accumulated candidates
///
/// Uids already held by an earlier phase are kept unless every earlier
/// candidate for that uid is a stub, in which case the first stub is
/// replaced by the new body. Duplicates within the phase are kept for
/// deduplication to arbitrate. Returns the number of candidates taken.
pub fn merge_phase(accumulated: &mut Vec<Requirement>, produced: Vec<Requirement>) -> usize {
    // uid -> (position of first candidate, every candidate is a stub)
    let mut earlier: HashMap<String, (usize, bool)> = HashMap::new();
    for (position, requirement) in accumulated.iter().enumerate() {
        earlier
            .entry(requirement.requirement_uid.clone())
            .and_modify(|(_, all_stub)| *all_stub &= requirement.is_stub)
            .or_insert((position, requirement.is_stub));
    }

    let mut taken = 0;
    for requirement in produced {
        match earlier.get_mut(&requirement.requirement_uid) {
            None => {
                accumulated.push(requirement);
                taken += 1;
            }
            Some((position, all_stub)) if *all_stub && !requirement.is_stub => {
                accumulated[*position] = requirement;
                *all_stub = false;
                taken += 1;
            }
            Some(_) => {}
        }
    }
    taken
}
