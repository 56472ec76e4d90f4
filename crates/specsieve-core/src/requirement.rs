//! Requirement records: the canonical output of extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::types::DocMeta;

/// Obligation level inferred from keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NormativeStrength {
    /// `shall` / `must`
    Must,
    /// `should`
    Should,
    /// `may`
    May,
}

impl NormativeStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::Should => "SHOULD",
            Self::May => "MAY",
        }
    }
}

impl fmt::Display for NormativeStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric comparison attached to an acceptance criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "=")]
    Equal,
}

impl Comparator {
    /// Parse a comparator symbol, accepting the unicode forms
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "<=" | "≤" => Some(Self::AtMost),
            "<" => Some(Self::LessThan),
            ">=" | "≥" => Some(Self::AtLeast),
            ">" => Some(Self::GreaterThan),
            "=" | "==" => Some(Self::Equal),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::AtMost => "<=",
            Self::LessThan => "<",
            Self::AtLeast => ">=",
            Self::GreaterThan => ">",
            Self::Equal => "=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed numeric bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    pub id: String,

    /// Human-readable form, e.g. `<= 1.8 mm_per_s`
    pub text: String,

    pub comparator: Option<Comparator>,

    pub value: Option<f64>,

    /// Normalized unit
    pub unit: Option<String>,

    pub dimension: Option<String>,
}

/// Where a requirement was found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceAnchor {
    /// Slice of a paragraph block
    Paragraph { index: usize, offset: usize },

    /// A single table cell (row, column)
    TableCell {
        table: String,
        cell: Option<(usize, usize)>,
    },

    /// A whole table row
    TableRow { table: String, row: usize },

    /// Line of a plaintext export
    PlaintextLine { line: usize },

    /// Line of a markdown export
    MarkdownLine { line: usize },

    /// Free text reference (unknown document type)
    Text {
        #[serde(rename = "ref")]
        reference: String,
    },
}

/// Kind of container a requirement body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Paragraph,
    TableCell,
    TableRow,
    PlaintextBlock,
    MarkdownLine,
    Text,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::TableCell => "table_cell",
            Self::TableRow => "table_row",
            Self::PlaintextBlock => "plaintext_block",
            Self::MarkdownLine => "markdown_line",
            Self::Text => "text",
        }
    }
}

/// Positional bookkeeping; unset fields are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<(usize, usize)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl SourceLocation {
    pub fn block(index: usize) -> Self {
        Self {
            block_index: Some(index),
            ..Self::default()
        }
    }

    pub fn cell(table_id: impl Into<String>, cell: Option<(usize, usize)>) -> Self {
        Self {
            table_id: Some(table_id.into()),
            cell,
            ..Self::default()
        }
    }

    pub fn row(table_id: impl Into<String>, row_index: usize) -> Self {
        Self {
            table_id: Some(table_id.into()),
            row_index: Some(row_index),
            ..Self::default()
        }
    }

    pub fn line(line: usize) -> Self {
        Self {
            line: Some(line),
            ..Self::default()
        }
    }

    /// Table row this location points into, if any
    pub fn table_row(&self) -> Option<(&str, usize)> {
        let table = self.table_id.as_deref()?;
        self.row_index
            .or(self.cell.map(|(row, _)| row))
            .map(|row| (table, row))
    }
}

/// One atomic requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Dialect-namespaced identity, unique in a final result set
    pub requirement_uid: String,

    pub doc_meta: Arc<DocMeta>,

    /// Heading breadcrumb
    pub section_path: Vec<String>,

    pub source_anchor: SourceAnchor,

    pub normative_strength: Option<NormativeStrength>,

    pub canonical_statement: String,

    pub requirement_raw: String,

    pub acceptance_criteria: Vec<AcceptanceCriterion>,

    pub verification_method: Option<String>,

    /// Standards citations
    pub references: Vec<String>,

    pub subject: String,

    pub category: Option<String>,

    pub tags: Vec<String>,

    pub evidence_query: String,

    #[serde(default)]
    pub conflicts: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub page_range: Option<Vec<u32>>,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub confidence: Option<f64>,

    pub source_type: SourceType,

    #[serde(default)]
    pub source_location: SourceLocation,

    /// No body text could be associated with the marker
    #[serde(default)]
    pub is_stub: bool,

    #[serde(default)]
    pub raw_section_header: Option<String>,
}

impl Requirement {
    /// Identifier part of the uid (after the dialect prefix)
    pub fn local_id(&self) -> &str {
        self.requirement_uid
            .split_once(':')
            .map(|(_, id)| id)
            .unwrap_or(&self.requirement_uid)
    }

    /// Dialect prefix of the uid (`RS`, `TPS`, `GEN`)
    pub fn namespace(&self) -> &str {
        self.requirement_uid
            .split_once(':')
            .map(|(ns, _)| ns)
            .unwrap_or("")
    }
}
