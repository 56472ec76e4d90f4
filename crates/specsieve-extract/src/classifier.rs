//! Document classifier: scores RS against TPS evidence
//!
//! Scoring is a weighted sum of header keyword hits, inline marker density,
//! table count, marker-index counts and filename hints, plus an absolute
//! override when Dialect-A markers dominate.

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::{Deserialize, Serialize};
use specsieve_core::{DocType, Document};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::ClassifierSettings;
use crate::markers::MarkerIndex;

const RS_KEYWORDS: &[&str] = &["REQUIREMENT SPECIFICATION", "REQUIREMENTS SPECIFICATION"];
const TPS_KEYWORDS: &[&str] = &["TECHNICAL PURCHASE SPECIFICATION", "TPS"];

static KEYWORDS: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(RS_KEYWORDS.iter().chain(TPS_KEYWORDS))
        .expect("valid classifier keyword automaton")
});

static INLINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*\d+").expect("valid inline marker regex"));

const EPSILON: f64 = 1e-6;

/// Which absolute override fired, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierOverride {
    /// Dialect-A markers outnumber Dialect-B markers by the dominance ratio
    RsMarkerDominance,
    /// Inline `#N` density in the sampled text crossed the threshold
    InlineMarkerDensity,
}

/// Signals behind a classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFeatures {
    pub rs_score: f64,
    pub tps_score: f64,
    pub rs_keyword_hits: usize,
    pub tps_keyword_hits: usize,
    /// `#N` occurrences in the sampled blocks
    pub inline_marker_count: usize,
    pub rs_marker_index_count: usize,
    pub tps_marker_index_count: usize,
    pub table_count: usize,
    pub filename_hint: bool,
    pub override_applied: Option<ClassifierOverride>,
}

/// Classifier verdict for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub doc_type: DocType,
    /// Winning score over the sum of both scores
    pub confidence: f64,
    pub features: ClassificationFeatures,
}

impl DocumentProfile {
    /// Copy with a corrected type, confidence kept
    pub fn relabeled(&self, doc_type: DocType) -> Self {
        let mut profile = self.clone();
        profile.doc_type = doc_type;
        profile
    }
}

/// Scores a document against both specification kinds
#[derive(Debug, Clone, Default)]
pub struct DocumentClassifier {
    settings: ClassifierSettings,
}

impl DocumentClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self { settings }
    }

    pub fn classify(
        &self,
        document: &Document,
        table_count: usize,
        filename: Option<&str>,
        index: &MarkerIndex,
    ) -> DocumentProfile {
        let s = &self.settings;

        let sample = document
            .blocks
            .iter()
            .take(s.sample_blocks)
            .map(|b| b.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let (rs_keyword_hits, tps_keyword_hits) = keyword_hits(&sample);
        let inline_marker_count = INLINE_MARKER.find_iter(&sample).count();
        let rs_idx = index.rs_count();
        let tps_idx = index.tps_count();

        let mut rs_score = rs_keyword_hits as f64
            + inline_marker_count as f64 / s.inline_marker_divisor
            + rs_idx as f64 / s.rs_marker_divisor;
        let mut tps_score = tps_keyword_hits as f64
            + table_count as f64 / s.table_count_divisor
            + tps_idx as f64 / s.tps_marker_divisor;

        if let Some(name) = filename {
            let (rs_hint, tps_hint) = filename_hints(name);
            if rs_hint {
                rs_score += s.rs_filename_bonus;
            }
            if tps_hint {
                tps_score += s.tps_filename_bonus;
            }
        }

        let override_applied = if rs_idx >= s.rs_dominance_min_markers
            && rs_idx as f64 >= s.rs_dominance_ratio * tps_idx.max(1) as f64
        {
            rs_score += s.rs_dominance_bonus;
            Some(ClassifierOverride::RsMarkerDominance)
        } else if inline_marker_count >= s.inline_marker_override_threshold {
            rs_score += s.inline_marker_override_bonus;
            Some(ClassifierOverride::InlineMarkerDensity)
        } else {
            None
        };

        let (doc_type, confidence) = if rs_score == 0.0 && tps_score == 0.0 {
            (DocType::Unknown, 0.0)
        } else if rs_score >= tps_score {
            (DocType::Rs, rs_score / (rs_score + tps_score + EPSILON))
        } else {
            (DocType::Tps, tps_score / (rs_score + tps_score + EPSILON))
        };

        let profile = DocumentProfile {
            doc_type,
            confidence: round3(confidence),
            features: ClassificationFeatures {
                rs_score: round3(rs_score),
                tps_score: round3(tps_score),
                rs_keyword_hits,
                tps_keyword_hits,
                inline_marker_count,
                rs_marker_index_count: rs_idx,
                tps_marker_index_count: tps_idx,
                table_count,
                filename_hint: filename.is_some(),
                override_applied,
            },
        };
        debug!(
            doc_type = %profile.doc_type,
            confidence = profile.confidence,
            rs_score = profile.features.rs_score,
            tps_score = profile.features.tps_score,
            "document classified"
        );
        profile
    }
}

/// Distinct RS and TPS header keywords present as whole words
fn keyword_hits(text: &str) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut found = BTreeSet::new();
    for m in KEYWORDS.find_overlapping_iter(text) {
        let before = m.start().checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(m.end()).copied();
        let bounded = |b: Option<u8>| b.map_or(true, |b| !b.is_ascii_alphanumeric());
        if bounded(before) && bounded(after) {
            found.insert(m.pattern().as_usize());
        }
    }
    let rs = found.iter().filter(|&&p| p < RS_KEYWORDS.len()).count();
    (rs, found.len() - rs)
}

/// (RS hint, TPS hint) from a file name
fn filename_hints(filename: &str) -> (bool, bool) {
    let upper = filename.to_uppercase();
    let rs = format!(" {upper} ").contains(" REQUIREMENT ")
        || upper.starts_with("RS")
        || upper.contains("REQUIREMENT SPECIFICATION");
    let tps = upper.starts_with("TPS") || upper.contains("TECHNICAL PURCHASE SPECIFICATION");
    (rs, tps)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
