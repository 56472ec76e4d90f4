//! Noise filtering and uid deduplication of requirement candidates

use indexmap::IndexMap;
use regex::Regex;
use specsieve_core::{Requirement, SourceType};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::semantics::has_obligation_keyword;
use crate::tables::TableSet;

static NUMERIC_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9\s.,:+\-*/()]+$").expect("valid numeric-only regex"));

static DEGENERATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^the\s+[\w\s-]+?\s+shall\s+[0-9\s.,:+-]+$").expect("valid degenerate statement regex")
});

static ALPHA_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("valid alphabetic word regex"));

const MIN_ALPHA_WORDS: usize = 3;
const OBLIGATION_BONUS: usize = 50;
const NORMATIVE_BONUS: usize = 20;
const SNIPPET_CHARS: usize = 60;

/// Why a candidate was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Row of a measurement table without an obligation keyword
    MeasurementTable,
    /// Only digits and punctuation
    NumericOnly,
    /// "The X shall <numbers>"
    DegenerateStatement,
    /// Fewer than three alphabetic words and no obligation keyword
    TooFewWords,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeasurementTable => "measurement_table",
            Self::NumericOnly => "numeric_only",
            Self::DegenerateStatement => "degenerate_statement",
            Self::TooFewWords => "too_few_words",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidates subject to noise filtering: Dialect-B marker-first output
///
/// ID-table rows and plaintext/markdown blocks are always kept.
pub fn is_filterable(requirement: &Requirement) -> bool {
    requirement.namespace() == "TPS"
        && matches!(
            requirement.source_type,
            SourceType::Paragraph | SourceType::TableCell
        )
}

/// Reason to drop a candidate, if any
pub fn drop_reason(requirement: &Requirement, tables: &TableSet) -> Option<DropReason> {
    if !is_filterable(requirement) {
        return None;
    }

    let body = requirement.requirement_raw.trim();
    let obligation = has_obligation_keyword(body);

    let from_measurement_table = requirement
        .source_location
        .table_id
        .as_deref()
        .and_then(|id| tables.get(id))
        .is_some_and(|grid| grid.is_measurement_table());
    if from_measurement_table && !obligation {
        return Some(DropReason::MeasurementTable);
    }

    if body.is_empty() || NUMERIC_ONLY.is_match(body) {
        return Some(DropReason::NumericOnly);
    }
    if DEGENERATE.is_match(body) || DEGENERATE.is_match(requirement.canonical_statement.trim()) {
        return Some(DropReason::DegenerateStatement);
    }
    if ALPHA_WORD.find_iter(body).count() < MIN_ALPHA_WORDS && !obligation {
        return Some(DropReason::TooFewWords);
    }
    None
}

/// Remove noise candidates
pub fn filter_noise(candidates: Vec<Requirement>, tables: &TableSet) -> Vec<Requirement> {
    candidates
        .into_iter()
        .filter(|req| match drop_reason(req, tables) {
            Some(reason) => {
                debug!(
                    uid = %req.requirement_uid,
                    source_type = req.source_type.as_str(),
                    reason = %reason,
                    snippet = %snippet(&req.requirement_raw),
                    "dropping candidate"
                );
                false
            }
            None => true,
        })
        .collect()
}

/// Body quality used to pick between candidates sharing a uid
pub fn candidate_score(requirement: &Requirement) -> usize {
    let body = &requirement.requirement_raw;
    let mut score = body.chars().count();
    if has_obligation_keyword(body) {
        score += OBLIGATION_BONUS;
    }
    if requirement.normative_strength.is_some() {
        score += NORMATIVE_BONUS;
    }
    score
}

/// One candidate per uid, best score wins, first-seen order kept
pub fn deduplicate(candidates: Vec<Requirement>) -> Vec<Requirement> {
    let mut best: IndexMap<String, Requirement> = IndexMap::with_capacity(candidates.len());
    for candidate in candidates {
        match best.get_mut(&candidate.requirement_uid) {
            Some(existing) => {
                if candidate_score(&candidate) > candidate_score(existing) {
                    *existing = candidate;
                }
            }
            None => {
                best.insert(candidate.requirement_uid.clone(), candidate);
            }
        }
    }
    best.into_values().collect()
}

/// Filter, then deduplicate
pub fn consolidate(candidates: Vec<Requirement>, tables: &TableSet) -> Vec<Requirement> {
    let before = candidates.len();
    let kept = deduplicate(filter_noise(candidates, tables));
    debug!(before, after = kept.len(), "candidates consolidated");
    kept
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsieve_core::{
        DocMeta, NormativeStrength, SourceAnchor, SourceLocation, Table, TableCollection,
    };
    use std::sync::Arc;

    fn candidate(uid: &str, raw: &str, source_type: SourceType, location: SourceLocation) -> Requirement {
        Requirement {
            requirement_uid: uid.to_string(),
            doc_meta: Arc::new(DocMeta::default()),
            section_path: vec![],
            source_anchor: SourceAnchor::Text {
                reference: uid.to_string(),
            },
            normative_strength: crate::semantics::normative_strength(raw),
            canonical_statement: raw.to_string(),
            requirement_raw: raw.to_string(),
            acceptance_criteria: vec![],
            verification_method: None,
            references: vec![],
            subject: "generator".to_string(),
            category: None,
            tags: vec![],
            evidence_query: String::new(),
            conflicts: vec![],
            dependencies: vec![],
            page_range: None,
            parent_id: None,
            confidence: None,
            source_type,
            source_location: location,
            is_stub: false,
            raw_section_header: None,
        }
    }

    fn paragraph(uid: &str, raw: &str) -> Requirement {
        candidate(uid, raw, SourceType::Paragraph, SourceLocation::block(0))
    }

    #[test]
    fn test_noise_rules() {
        let tables = TableSet::default();
        assert_eq!(drop_reason(&paragraph("TPS:1.2", "11.5 / 12,0"), &tables), Some(DropReason::NumericOnly));
        assert_eq!(
            drop_reason(&paragraph("TPS:1.2", "The generator shall 1.5"), &tables),
            Some(DropReason::DegenerateStatement)
        );
        assert_eq!(drop_reason(&paragraph("TPS:1.2", "kV rms"), &tables), Some(DropReason::TooFewWords));
        assert_eq!(drop_reason(&paragraph("TPS:1.2", "shall run"), &tables), None);
        assert_eq!(
            drop_reason(&paragraph("TPS:1.2", "Rated output at site conditions"), &tables),
            None
        );
    }

    #[test]
    fn test_only_marker_first_candidates_are_filtered() {
        let tables = TableSet::default();
        let row = candidate("TPS:4.1", "1.8", SourceType::TableRow, SourceLocation::row("t", 1));
        assert_eq!(drop_reason(&row, &tables), None);
        let rs = paragraph("RS:#001.0", "1.8");
        assert_eq!(drop_reason(&rs, &tables), None);
    }

    #[test]
    fn test_measurement_table_rows() {
        let mut collection = TableCollection::new();
        collection.insert(
            "m".to_string(),
            Table::from_csv("Frequency,Pressure,Temperature\n50 Hz,2 bar,40 C\n"),
        );
        let tables = TableSet::from_tables(&collection);
        let loc = SourceLocation::cell("m", Some((1, 0)));

        let plain = candidate("TPS:2.1", "cooling water inlet value range", SourceType::TableCell, loc.clone());
        assert_eq!(drop_reason(&plain, &tables), Some(DropReason::MeasurementTable));

        let normative = candidate("TPS:2.2", "inlet shall stay below limit", SourceType::TableCell, loc);
        assert_eq!(drop_reason(&normative, &tables), None);
    }

    #[test]
    fn test_obligation_keyword_dominates() {
        let kept = deduplicate(vec![
            paragraph("TPS:3.1", "Stator core lamination stacking factor and thickness"),
            paragraph("TPS:3.1", "Core shall be laminated"),
            paragraph("TPS:3.2", "Other"),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].requirement_raw, "Core shall be laminated");
        assert_eq!(kept[0].normative_strength, Some(NormativeStrength::Must));
        assert_eq!(kept[1].requirement_uid, "TPS:3.2");
    }

    #[test]
    fn test_ties_keep_first() {
        let kept = deduplicate(vec![paragraph("RS:#1", "abc"), paragraph("RS:#1", "xyz")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].requirement_raw, "abc");
    }
}
