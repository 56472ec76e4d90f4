//! Output shapes: JSON lines and a flattened tabular form
//!
//! The tabular form keeps a fixed column order. List and map valued fields
//! are embedded as JSON strings so every record stays on one CSV row.

use serde::Serialize;
use std::io::Write;

use crate::error::Result;
use crate::requirement::Requirement;

/// Column order of the tabular output
pub const TABULAR_COLUMNS: [&str; 19] = [
    "requirement_uid",
    "section_path",
    "normative_strength",
    "canonical_statement",
    "requirement_raw",
    "acceptance_criteria",
    "verification_method",
    "references",
    "subject",
    "category",
    "tags",
    "evidence_query",
    "doc_meta",
    "source_anchor",
    "conflicts",
    "dependencies",
    "page_range",
    "parent_id",
    "confidence",
];

/// Write one JSON object per line
pub fn write_jsonl<W: Write>(requirements: &[Requirement], mut writer: W) -> Result<()> {
    for requirement in requirements {
        serde_json::to_writer(&mut writer, requirement)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Flattened requirement record, one CSV row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRecord {
    pub requirement_uid: String,
    pub section_path: String,
    pub normative_strength: Option<String>,
    pub canonical_statement: String,
    pub requirement_raw: String,
    pub acceptance_criteria: String,
    pub verification_method: Option<String>,
    pub references: String,
    pub subject: String,
    pub category: Option<String>,
    pub tags: String,
    pub evidence_query: String,
    pub doc_meta: String,
    pub source_anchor: String,
    pub conflicts: String,
    pub dependencies: String,
    pub page_range: String,
    pub parent_id: Option<String>,
    pub confidence: Option<f64>,
}

impl TabularRecord {
    /// Flatten a requirement
    pub fn from_requirement(requirement: &Requirement) -> Result<Self> {
        Ok(Self {
            requirement_uid: requirement.requirement_uid.clone(),
            section_path: requirement.section_path.join(" > "),
            normative_strength: requirement
                .normative_strength
                .map(|strength| strength.as_str().to_string()),
            canonical_statement: requirement.canonical_statement.clone(),
            requirement_raw: requirement.requirement_raw.clone(),
            acceptance_criteria: embed(&requirement.acceptance_criteria)?,
            verification_method: requirement.verification_method.clone(),
            references: embed(&requirement.references)?,
            subject: requirement.subject.clone(),
            category: requirement.category.clone(),
            tags: embed(&requirement.tags)?,
            evidence_query: requirement.evidence_query.clone(),
            doc_meta: embed(requirement.doc_meta.as_ref())?,
            source_anchor: embed(&requirement.source_anchor)?,
            conflicts: embed(&requirement.conflicts)?,
            dependencies: embed(&requirement.dependencies)?,
            page_range: embed(&requirement.page_range)?,
            parent_id: requirement.parent_id.clone(),
            confidence: requirement.confidence,
        })
    }
}

/// JSON text of a value; `None` embeds as `null`
fn embed<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Write the flattened tabular form with a header row
///
/// An empty slice still produces the header.
pub fn write_tabular<W: Write>(requirements: &[Requirement], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(TABULAR_COLUMNS)?;
    for requirement in requirements {
        csv_writer.serialize(TabularRecord::from_requirement(requirement)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}
