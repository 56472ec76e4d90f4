//! Input types: block-structured documents, extracted tables, and document metadata

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single block of a converted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// Section heading with its outline level (1 = top level)
    Heading {
        #[serde(default = "default_heading_level")]
        level: u32,
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },

    /// Body paragraph
    Paragraph {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },

    /// List item
    List {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },

    /// Any block type the converter emits that we do not interpret
    #[serde(other)]
    Other,
}

impl Block {
    /// Create a heading block
    pub fn heading(level: u32, text: impl Into<String>) -> Self {
        Self::Heading {
            level,
            text: text.into(),
        }
    }

    /// Create a paragraph block
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }

    /// Create a list block
    pub fn list(text: impl Into<String>) -> Self {
        Self::List { text: text.into() }
    }

    /// Text of the block, whatever its kind
    pub fn text(&self) -> &str {
        match self {
            Self::Heading { text, .. } | Self::Paragraph { text } | Self::List { text } => text,
            Self::Other => "",
        }
    }

    /// Text of body blocks (paragraphs and list items); `None` for headings
    pub fn body_text(&self) -> Option<&str> {
        match self {
            Self::Paragraph { text } | Self::List { text } => Some(text),
            _ => None,
        }
    }
}

fn default_heading_level() -> u32 {
    1
}

/// Converters emit `null` for empty cells and text; treat it as absent
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Block-structured document produced by the conversion step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Ordered blocks
    #[serde(default)]
    pub blocks: Vec<Block>,

    /// Flat plaintext export, if the converter produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text: Option<String>,

    /// Markdown export, if the converter produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl Document {
    /// Create a document from blocks only
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            plain_text: None,
            markdown: None,
        }
    }

    /// Attach a plaintext export
    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.plain_text = Some(text.into());
        self
    }

    /// Attach a markdown export
    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    /// Plaintext view: the export if present, otherwise one block per line
    pub fn plaintext(&self) -> String {
        if let Some(text) = &self.plain_text {
            return text.clone();
        }
        self.blocks
            .iter()
            .map(Block::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markdown view: the export if present, otherwise rendered from blocks
    pub fn markdown_text(&self) -> String {
        if let Some(md) = &self.markdown {
            return md.clone();
        }
        let mut out = String::new();
        for block in &self.blocks {
            let line = match block {
                Block::Heading { level, text } => {
                    let hashes = "#".repeat((*level).clamp(1, 6) as usize);
                    format!("{hashes} {}", text.trim())
                }
                Block::Paragraph { text } => text.trim().to_string(),
                Block::List { text } => format!("- {}", text.trim()),
                Block::Other => continue,
            };
            if line.trim().is_empty() {
                continue;
            }
            out.push_str(&line);
            out.push_str("\n\n");
        }
        out
    }
}

/// An extracted table as delivered by the conversion step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Quoted CSV text, cells may span multiple lines
    #[serde(default, deserialize_with = "null_as_default")]
    pub csv_data: String,

    /// Column names as reported by the converter
    #[serde(default, deserialize_with = "null_as_default")]
    pub column_names: Vec<String>,

    /// Data row count
    #[serde(default, deserialize_with = "null_as_default")]
    pub rows: usize,

    /// Column count
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: usize,
}

impl Table {
    /// Create a table from CSV text, taking column names from the first line
    pub fn from_csv(csv_data: impl Into<String>) -> Self {
        let csv_data = csv_data.into();
        let column_names: Vec<String> = csv_data
            .lines()
            .next()
            .map(|header| header.split(',').map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let rows = csv_data.lines().count().saturating_sub(1);
        Self {
            columns: column_names.len(),
            column_names,
            rows,
            csv_data,
        }
    }
}

/// Table collection keyed by table identifier, in converter order
pub type TableCollection = IndexMap<String, Table>;

/// Kind of specification document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocType {
    /// Free-text requirement specification (`#045.0` markers)
    #[serde(rename = "RS")]
    Rs,
    /// Tabular technical purchase specification (`4.1.2.7` identifiers)
    #[serde(rename = "TPS")]
    Tps,
    /// Could not be determined
    #[serde(rename = "UNKNOWN")]
    #[default]
    Unknown,
}

impl DocType {
    /// Upper-case label used in uids and metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rs => "RS",
            Self::Tps => "TPS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-level metadata attached to every requirement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub document_id: String,

    pub title: String,

    /// Set by the extractor after classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocType>,

    /// Set by the extractor after classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_confidence: Option<f64>,

    /// Any further caller-supplied fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DocMeta {
    /// Create metadata with an id and title
    pub fn new(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            document_type: None,
            classification_confidence: None,
            extra: BTreeMap::new(),
        }
    }

    /// Copy with the classification fields set
    pub fn classified(&self, doc_type: DocType, confidence: f64) -> Self {
        let mut meta = self.clone();
        meta.document_type = Some(doc_type);
        meta.classification_confidence = Some(confidence);
        meta
    }
}

/// Everything the extractor reads for one document
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    pub document: Document,
    pub tables: TableCollection,
    pub meta: DocMeta,
    /// Original file name, used only as a classification hint
    pub filename: Option<String>,
}

impl DocumentInput {
    /// Create an input with no tables and no filename hint
    pub fn new(document: Document, meta: DocMeta) -> Self {
        Self {
            document,
            tables: TableCollection::new(),
            meta,
            filename: None,
        }
    }

    /// Attach the table collection
    pub fn with_tables(mut self, tables: TableCollection) -> Self {
        self.tables = tables;
        self
    }

    /// Add a single table
    pub fn with_table(mut self, table_id: impl Into<String>, table: Table) -> Self {
        self.tables.insert(table_id.into(), table);
        self
    }

    /// Attach a filename hint
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
