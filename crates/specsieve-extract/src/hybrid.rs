//! Hybrid correction for TPS-classified documents that really use `#NNN.N` markers

use regex::Regex;
use specsieve_core::{DocType, Requirement};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::info;

use crate::config::HybridSettings;
use crate::consolidate::deduplicate;
use crate::markers::{normalize_rs_uid, ContainerType, MarkerKind};
use crate::strategies::RsMarkerStrategy;
use crate::strategy::{run_phase, PhaseReport, SegmentationContext};

static SHORT_NUMERIC_UID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TPS:\d{1,3}\.\d{1,2}$").expect("valid short numeric uid regex"));

/// What the correction pass changed
#[derive(Debug, Clone, PartialEq)]
pub struct HybridOutcome {
    pub requirements: Vec<Requirement>,

    pub doc_type: DocType,

    /// Report of the extra Dialect-A pass, when it ran
    pub rs_phase: Option<PhaseReport>,

    /// Requirements moved from `TPS:N.M` to `RS:#NNN.M`
    pub renamespaced: usize,
}

/// Runs the three correction steps over a TPS result set
#[derive(Debug, Clone, Default)]
pub struct HybridCorrector {
    settings: HybridSettings,
}

impl HybridCorrector {
    pub fn new(settings: HybridSettings) -> Self {
        Self { settings }
    }

    pub fn apply(&self, ctx: &SegmentationContext<'_>, requirements: Vec<Requirement>) -> HybridOutcome {
        let mut requirements = requirements;
        let mut doc_type = DocType::Tps;
        let mut rs_phase = None;
        let mut renamespaced = 0;

        let paragraph_rs = ctx.markers.count_in(MarkerKind::Rs, ContainerType::Paragraph);
        if paragraph_rs >= self.settings.paragraph_rs_markers {
            let (produced, report) = run_phase(&RsMarkerStrategy, ctx);
            let known: HashSet<String> = requirements.iter().map(|r| r.requirement_uid.clone()).collect();
            let added: Vec<Requirement> = deduplicate(produced)
                .into_iter()
                .filter(|r| !known.contains(&r.requirement_uid))
                .collect();
            info!(paragraph_rs, added = added.len(), "merged dialect-a paragraph requirements");
            requirements.extend(added);
            rs_phase = Some(report);
        }

        let table_rs = ctx.markers.count_in(MarkerKind::Rs, ContainerType::TableCell);
        if table_rs >= self.settings.table_rs_markers
            && short_id_ratio(&requirements) >= self.settings.short_id_ratio
        {
            for requirement in requirements.iter_mut() {
                if let Some(uid) = rs_namespaced(&requirement.requirement_uid) {
                    requirement.requirement_uid = uid;
                    renamespaced += 1;
                }
            }
            requirements = deduplicate(requirements);
            doc_type = DocType::Rs;
            info!(table_rs, renamespaced, "re-namespaced short numeric uids as dialect-a");
        }

        HybridOutcome {
            requirements,
            doc_type,
            rs_phase,
            renamespaced,
        }
    }
}

/// Share of `TPS:` requirements whose id is a short `N.M` numeral
pub fn short_id_ratio(requirements: &[Requirement]) -> f64 {
    let tps: Vec<&Requirement> = requirements.iter().filter(|r| r.namespace() == "TPS").collect();
    if tps.is_empty() {
        return 0.0;
    }
    let short = tps
        .iter()
        .filter(|r| SHORT_NUMERIC_UID.is_match(&r.requirement_uid))
        .count();
    short as f64 / tps.len() as f64
}

/// `TPS:57.0` as `RS:#057.0`; `None` for uids not of the short numeric form
pub fn rs_namespaced(uid: &str) -> Option<String> {
    if !SHORT_NUMERIC_UID.is_match(uid) {
        return None;
    }
    let local = uid.strip_prefix("TPS:")?;
    normalize_rs_uid(&format!("#{local}")).map(|rs| format!("RS:{rs}"))
}

/// More than half of the requirements carry `RS:` uids
pub fn rs_majority(requirements: &[Requirement]) -> bool {
    let rs = requirements.iter().filter(|r| r.namespace() == "RS").count();
    !requirements.is_empty() && rs * 2 > requirements.len()
}
