//! Coverage audit: how many source requirement numbers made it into the output

use regex::Regex;
use serde::{Deserialize, Serialize};
use specsieve_core::{DocType, Requirement};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::markers::{MarkerIndex, MarkerKind};
use crate::semantics::normative_strength;

static RS_UID_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)\.\d+$").expect("valid rs uid number regex"));

static HASH_UID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\d+\.\d+$").expect("valid hash uid regex"));

static TPS_DOTTED_UID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TPS:(\d+(?:\.\d+){1,6})$").expect("valid dotted uid regex"));

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?$").expect("valid trailing number regex"));

const UNCOVERED_SAMPLE: usize = 25;

/// Coverage of a Dialect-A document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsCoverage {
    /// Requirement numbers (`N.0`) found in the source markers
    pub source_numbers: Vec<String>,
    pub max_number: Option<u64>,
    /// Size of `1.0..=max.0`
    pub expected_count: usize,
    /// Gaps in the source numbering
    pub missing_in_source: Vec<String>,
    /// Source numbers with no extracted requirement
    pub missing_in_extraction: Vec<String>,
    pub coverage_ratio: f64,
}

/// How requirement uids are spelled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidFormats {
    pub tps_prefixed: usize,
    pub hash: usize,
    pub other: usize,
}

/// Source `N.0` numbers against the trailing numbers of extracted uids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberCoverage {
    pub source_numbers: usize,
    pub covered: usize,
    pub ratio: f64,
    pub uncovered_sample: Vec<String>,
}

/// Coverage of a Dialect-B document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpsCoverage {
    pub rows: usize,
    pub unique_uids: usize,
    pub duplicate_uids: Vec<String>,
    pub normative_rows: usize,
    pub normative_ratio: f64,
    pub uid_formats: UidFormats,
    /// Component count of `TPS:<dotted>` uids
    pub depth_distribution: BTreeMap<usize, usize>,
    pub number_coverage: NumberCoverage,
}

/// Audit result, shaped by document type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "document_type")]
pub enum CoverageReport {
    #[serde(rename = "RS")]
    Rs(RsCoverage),
    #[serde(rename = "TPS")]
    Tps(TpsCoverage),
    #[serde(rename = "UNKNOWN")]
    Unknown { requirements: usize },
}

impl CoverageReport {
    pub fn audit(doc_type: DocType, markers: &MarkerIndex, requirements: &[Requirement]) -> Self {
        match doc_type {
            DocType::Rs => Self::Rs(audit_rs(markers, requirements)),
            DocType::Tps => Self::Tps(audit_tps(markers, requirements)),
            DocType::Unknown => Self::Unknown {
                requirements: requirements.len(),
            },
        }
    }
}

/// Main integers of every Dialect-A marker
fn source_numbers(markers: &MarkerIndex) -> BTreeSet<u64> {
    markers
        .of_kind(MarkerKind::Rs)
        .filter_map(|m| m.uid.trim_start_matches('#').split('.').next()?.parse().ok())
        .collect()
}

fn audit_rs(markers: &MarkerIndex, requirements: &[Requirement]) -> RsCoverage {
    let source = source_numbers(markers);
    let max_number = source.iter().next_back().copied();
    let expected: BTreeSet<u64> = max_number.map(|max| (1..=max).collect()).unwrap_or_default();

    let extracted: BTreeSet<u64> = requirements
        .iter()
        .filter(|r| r.namespace() == "RS")
        .filter_map(|r| RS_UID_NUMBER.captures(&r.requirement_uid)?[1].parse().ok())
        .collect();

    let covered = source.intersection(&extracted).count();
    RsCoverage {
        source_numbers: source.iter().map(|n| number(*n)).collect(),
        max_number,
        expected_count: expected.len(),
        missing_in_source: expected.difference(&source).map(|n| number(*n)).collect(),
        missing_in_extraction: source.difference(&extracted).map(|n| number(*n)).collect(),
        coverage_ratio: ratio(covered, source.len()),
    }
}

fn audit_tps(markers: &MarkerIndex, requirements: &[Requirement]) -> TpsCoverage {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in requirements {
        *counts.entry(r.requirement_uid.as_str()).or_default() += 1;
    }
    let mut duplicate_uids: Vec<String> = counts
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(uid, _)| uid.to_string())
        .collect();
    duplicate_uids.sort();

    let normative_rows = requirements
        .iter()
        .filter(|r| {
            normative_strength(&format!("{} {}", r.requirement_raw, r.canonical_statement)).is_some()
        })
        .count();

    let mut uid_formats = UidFormats::default();
    let mut depth_distribution = BTreeMap::new();
    for r in requirements {
        let uid = r.requirement_uid.as_str();
        if uid.starts_with("TPS:") {
            uid_formats.tps_prefixed += 1;
        } else if HASH_UID.is_match(uid) {
            uid_formats.hash += 1;
        } else {
            uid_formats.other += 1;
        }
        if let Some(caps) = TPS_DOTTED_UID.captures(uid) {
            *depth_distribution.entry(caps[1].split('.').count()).or_default() += 1;
        }
    }

    let source = source_numbers(markers);
    let extracted: BTreeSet<u64> = requirements
        .iter()
        .filter_map(|r| TRAILING_NUMBER.captures(&r.requirement_uid)?[1].parse().ok())
        .collect();
    let covered = source.intersection(&extracted).count();

    TpsCoverage {
        rows: requirements.len(),
        unique_uids: counts.len(),
        duplicate_uids,
        normative_rows,
        normative_ratio: ratio(normative_rows, requirements.len()),
        uid_formats,
        depth_distribution,
        number_coverage: NumberCoverage {
            source_numbers: source.len(),
            covered,
            ratio: ratio(covered, source.len()),
            uncovered_sample: source
                .difference(&extracted)
                .take(UNCOVERED_SAMPLE)
                .map(|n| number(*n))
                .collect(),
        },
    }
}

fn number(n: u64) -> String {
    format!("{n}.0")
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkerSettings;
    use crate::tables::TableSet;
    use specsieve_core::{Block, Document};

    fn markers(text: &str) -> MarkerIndex {
        MarkerIndex::build(
            &Document::new(vec![Block::paragraph(text)]),
            &TableSet::default(),
            &MarkerSettings::default(),
        )
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 3), 0.333);
        assert_eq!(ratio(0, 0), 0.0);
    }

    #[test]
    fn test_source_numbers_gaps() {
        let idx = markers("#1.0 a #2.0 b #2.1 c #5.0 d");
        let report = audit_rs(&idx, &[]);
        assert_eq!(report.source_numbers, vec!["1.0", "2.0", "5.0"]);
        assert_eq!(report.max_number, Some(5));
        assert_eq!(report.expected_count, 5);
        assert_eq!(report.missing_in_source, vec!["3.0", "4.0"]);
        assert_eq!(report.missing_in_extraction.len(), 3);
        assert_eq!(report.coverage_ratio, 0.0);
    }

    #[test]
    fn test_unknown_report_serialization() {
        let report = CoverageReport::audit(DocType::Unknown, &MarkerIndex::default(), &[]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["document_type"], "UNKNOWN");
        assert_eq!(value["requirements"], 0);
    }
}
