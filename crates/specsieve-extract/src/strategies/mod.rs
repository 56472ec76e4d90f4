//! Segmentation strategies, one type per dialect variant
//!
//! Every strategy turns its located body text into a [`RequirementDraft`];
//! the draft applies the shared semantic enrichment (canonical statement,
//! normative strength, criteria, references, category, evidence query).

mod fallback;
mod generic_table;
mod id_table;
mod markdown;
mod marker_first;
mod plaintext;
mod rs_marker;

pub use fallback::FallbackStrategy;
pub use generic_table::GenericTableStrategy;
pub use id_table::IdTableStrategy;
pub use markdown::MarkdownStrategy;
pub use marker_first::MarkerFirstStrategy;
pub use plaintext::PlaintextStrategy;
pub use rs_marker::RsMarkerStrategy;

use specsieve_core::{
    AcceptanceCriterion, DocMeta, Requirement, SourceAnchor, SourceLocation, SourceType,
};
use std::sync::Arc;

use crate::normalize::extract_criteria;
use crate::semantics::{
    canonicalize, collect_references, guess_category, make_evidence_query, normative_strength,
};

/// Located requirement body awaiting enrichment
#[derive(Debug, Clone)]
pub(crate) struct RequirementDraft {
    uid: String,
    raw: String,
    subject: String,
    anchor: SourceAnchor,
    source_type: SourceType,
    location: SourceLocation,
    section_path: Vec<String>,
    tags: Vec<String>,
    reference_text: Option<String>,
    extra_references: Vec<String>,
    extra_criteria: Vec<AcceptanceCriterion>,
    verification_method: Option<String>,
    conflicts: Vec<String>,
    raw_section_header: Option<String>,
    canonical_source: Option<String>,
    literal: bool,
}

impl RequirementDraft {
    pub(crate) fn new(
        uid: impl Into<String>,
        raw: impl Into<String>,
        subject: impl Into<String>,
        anchor: SourceAnchor,
        source_type: SourceType,
        location: SourceLocation,
    ) -> Self {
        Self {
            uid: uid.into(),
            raw: raw.into(),
            subject: subject.into(),
            anchor,
            source_type,
            location,
            section_path: Vec::new(),
            tags: Vec::new(),
            reference_text: None,
            extra_references: Vec::new(),
            extra_criteria: Vec::new(),
            verification_method: None,
            conflicts: Vec::new(),
            raw_section_header: None,
            canonical_source: None,
            literal: false,
        }
    }

    pub(crate) fn section_path(mut self, path: Vec<String>) -> Self {
        self.section_path = path;
        self
    }

    pub(crate) fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Mine references from this text instead of the body
    pub(crate) fn references_from(mut self, text: impl Into<String>) -> Self {
        self.reference_text = Some(text.into());
        self
    }

    /// References taken verbatim from reference columns
    pub(crate) fn references(mut self, references: Vec<String>) -> Self {
        self.extra_references = references;
        self
    }

    /// Criteria from bound columns, appended after the body's own
    pub(crate) fn criteria(mut self, criteria: Vec<AcceptanceCriterion>) -> Self {
        self.extra_criteria = criteria;
        self
    }

    pub(crate) fn verification_method(mut self, method: Option<String>) -> Self {
        self.verification_method = method;
        self
    }

    pub(crate) fn conflicts(mut self, conflicts: Vec<String>) -> Self {
        self.conflicts = conflicts;
        self
    }

    pub(crate) fn raw_section_header(mut self, header: Option<String>) -> Self {
        self.raw_section_header = header;
        self
    }

    /// Synthesize the canonical statement from this text instead of the body
    pub(crate) fn canonical_from(mut self, text: impl Into<String>) -> Self {
        self.canonical_source = Some(text.into());
        self
    }

    /// Keep the body as the canonical statement, no normative strength
    pub(crate) fn literal(mut self) -> Self {
        self.literal = true;
        self
    }

    pub(crate) fn build(self, meta: &Arc<DocMeta>) -> Requirement {
        let canonical_statement = if self.literal {
            self.raw.clone()
        } else {
            canonicalize(
                &self.subject,
                self.canonical_source.as_deref().unwrap_or(&self.raw),
            )
        };
        let normative_strength = if self.literal {
            None
        } else {
            normative_strength(&self.raw)
        };

        let mut acceptance_criteria = extract_criteria(&self.raw);
        acceptance_criteria.extend(self.extra_criteria);

        let mut references = self.extra_references;
        let mined = collect_references(self.reference_text.as_deref().unwrap_or(&self.raw));
        for reference in mined {
            if !references.contains(&reference) {
                references.push(reference);
            }
        }

        let category = guess_category(&self.section_path, &self.raw);
        let evidence_query = make_evidence_query(&self.subject, &canonical_statement, &references);

        Requirement {
            requirement_uid: self.uid,
            doc_meta: Arc::clone(meta),
            section_path: self.section_path,
            source_anchor: self.anchor,
            normative_strength,
            canonical_statement,
            requirement_raw: self.raw,
            acceptance_criteria,
            verification_method: self.verification_method,
            references,
            subject: self.subject,
            category,
            tags: self.tags,
            evidence_query,
            conflicts: self.conflicts,
            dependencies: Vec::new(),
            page_range: None,
            parent_id: None,
            confidence: None,
            source_type: self.source_type,
            source_location: self.location,
            is_stub: false,
            raw_section_header: self.raw_section_header,
        }
    }

    /// Marker with no body: placeholder text, no criteria, no references
    pub(crate) fn build_stub(self, meta: &Arc<DocMeta>) -> Requirement {
        let local = self
            .uid
            .split_once(':')
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| self.uid.clone());

        Requirement {
            canonical_statement: format!("Requirement {local}"),
            evidence_query: format!("{} requirement {local}", self.subject),
            requirement_uid: self.uid,
            doc_meta: Arc::clone(meta),
            section_path: self.section_path,
            source_anchor: self.anchor,
            normative_strength: None,
            requirement_raw: self.raw,
            acceptance_criteria: Vec::new(),
            verification_method: None,
            references: Vec::new(),
            subject: self.subject,
            category: None,
            tags: self.tags,
            conflicts: Vec::new(),
            dependencies: Vec::new(),
            page_range: None,
            parent_id: None,
            confidence: None,
            source_type: self.source_type,
            source_location: self.location,
            is_stub: true,
            raw_section_header: self.raw_section_header,
        }
    }
}
