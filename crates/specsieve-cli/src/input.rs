//! Loader for the converter's output directory
//!
//! Expected layout:
//! - `document.json`: blocks (top level, nested under `document`, or a
//!   docling-style `texts` list)
//! - `tables_data.json`: table id -> `{csv_data, column_names, rows, columns}`
//! - `document.md`, `document.txt`: optional exports for the TPS fallbacks
//!
//! A malformed file is logged and treated as empty; a malformed table or
//! block inside an otherwise valid file is logged and skipped.

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde_json::Value;
use specsieve_core::{Block, DocMeta, Document, DocumentInput, TableCollection};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const DOCUMENT_JSON: &str = "document.json";
pub const TABLES_JSON: &str = "tables_data.json";
pub const MARKDOWN_EXPORT: &str = "document.md";
pub const PLAINTEXT_EXPORT: &str = "document.txt";

const OUTPUT_SUFFIX: &str = "_output";

/// Load one converted document
///
/// Without an explicit `filename` the directory name (minus `_output`) is
/// used as the classification hint.
pub fn load_input(dir: &Path, filename: Option<String>) -> Result<DocumentInput> {
    if !dir.is_dir() {
        bail!("input directory {} does not exist", dir.display());
    }

    let base_name = document_name(dir);
    let mut document = Document::new(load_blocks(&dir.join(DOCUMENT_JSON))?);
    if let Some(markdown) = read_optional(&dir.join(MARKDOWN_EXPORT))? {
        document = document.with_markdown(markdown);
    }
    if let Some(text) = read_optional(&dir.join(PLAINTEXT_EXPORT))? {
        document = document.with_plain_text(text);
    }
    let tables = load_tables(&dir.join(TABLES_JSON))?;

    debug!(
        document = %base_name,
        blocks = document.blocks.len(),
        tables = tables.len(),
        "input loaded"
    );

    Ok(DocumentInput::new(document, DocMeta::new(&base_name, &base_name))
        .with_tables(tables)
        .with_filename(filename.unwrap_or(base_name)))
}

/// Directory name with a trailing `_output` removed
pub fn document_name(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(OUTPUT_SUFFIX)
        .map(str::to_string)
        .unwrap_or(name)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("reading {}", path.display()))
}

fn load_blocks(path: &Path) -> Result<Vec<Block>> {
    let Some(content) = read_optional(path)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(raw) => Ok(blocks_from_value(&raw)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not parse document json");
            Ok(Vec::new())
        }
    }
}

fn load_tables(path: &Path) -> Result<TableCollection> {
    let Some(content) = read_optional(path)? else {
        return Ok(TableCollection::new());
    };
    let raw: IndexMap<String, Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not parse tables json");
            return Ok(TableCollection::new());
        }
    };

    let mut tables = TableCollection::with_capacity(raw.len());
    for (table_id, value) in raw {
        match serde_json::from_value(value) {
            Ok(table) => {
                tables.insert(table_id, table);
            }
            Err(e) => warn!(table_id = %table_id, error = %e, "skipping malformed table"),
        }
    }
    Ok(tables)
}

/// Blocks from any of the supported document.json shapes
fn blocks_from_value(raw: &Value) -> Vec<Block> {
    let listed = raw
        .get("blocks")
        .or_else(|| raw.get("document").and_then(|d| d.get("blocks")));

    let blocks: Vec<Block> = match listed.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<Block>(item.clone()) {
                Ok(block) => Some(block),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed block");
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    };
    if !blocks.is_empty() {
        return blocks;
    }

    raw.get("texts")
        .and_then(Value::as_array)
        .map(|texts| texts.iter().filter_map(docling_block).collect())
        .unwrap_or_default()
}

fn docling_block(item: &Value) -> Option<Block> {
    let label = item
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let text = item
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?;
    match label.as_str() {
        "heading" | "header" => Some(Block::heading(1, text)),
        "paragraph" | "list" | "inline" => Some(Block::paragraph(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn output_dir(name: &str) -> (TempDir, std::path::PathBuf) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(name);
        fs::create_dir(&dir).unwrap();
        (root, dir)
    }

    #[test]
    fn test_document_name_strips_suffix() {
        assert_eq!(document_name(Path::new("/tmp/RS-100_output")), "RS-100");
        assert_eq!(document_name(Path::new("/tmp/plain")), "plain");
    }

    #[test]
    fn test_nested_blocks() {
        let raw = json!({"document": {"blocks": [
            {"type": "heading", "level": 2, "text": "Scope"},
            {"type": "picture"},
            {"type": "paragraph", "text": "#001.0 Body"}
        ]}});
        let blocks = blocks_from_value(&raw);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::heading(2, "Scope"));
        assert_eq!(blocks[1], Block::Other);
    }

    #[test]
    fn test_docling_texts() {
        let raw = json!({"blocks": [], "texts": [
            {"label": "header", "text": "General"},
            {"label": "paragraph", "text": "The supplier shall comply."},
            {"label": "caption", "text": "Figure 1"},
            {"label": "list", "text": ""}
        ]});
        assert_eq!(
            blocks_from_value(&raw),
            vec![
                Block::heading(1, "General"),
                Block::paragraph("The supplier shall comply.")
            ]
        );
    }

    #[test]
    fn test_load_directory() {
        let (_root, dir) = output_dir("TPS-200_output");
        fs::write(
            dir.join(DOCUMENT_JSON),
            json!({"blocks": [{"type": "paragraph", "text": "Intro"}]}).to_string(),
        )
        .unwrap();
        fs::write(
            dir.join(TABLES_JSON),
            r#"{"table_2": {"csv_data": "ID,Requirement\n4.1.1,Paint\n"}, "table_1": {"csv_data": "A\n"}}"#,
        )
        .unwrap();
        fs::write(dir.join(PLAINTEXT_EXPORT), "4.1.1.1\nBody\n").unwrap();

        let input = load_input(&dir, None).unwrap();
        assert_eq!(input.meta.document_id, "TPS-200");
        assert_eq!(input.filename.as_deref(), Some("TPS-200"));
        assert_eq!(input.document.blocks.len(), 1);
        assert_eq!(input.document.plain_text.as_deref(), Some("4.1.1.1\nBody\n"));
        assert!(input.document.markdown.is_none());
        let ids: Vec<&str> = input.tables.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["table_2", "table_1"]);
    }

    #[test]
    fn test_malformed_artifacts_are_empty() {
        let (_root, dir) = output_dir("broken");
        fs::write(dir.join(DOCUMENT_JSON), "{not json").unwrap();
        fs::write(dir.join(TABLES_JSON), "[1, 2]").unwrap();

        let input = load_input(&dir, Some("RS-9.pdf".to_string())).unwrap();
        assert!(input.document.blocks.is_empty());
        assert!(input.tables.is_empty());
        assert_eq!(input.filename.as_deref(), Some("RS-9.pdf"));
    }

    #[test]
    fn test_null_table_fields_keep_other_tables() {
        let (_root, dir) = output_dir("TPS-300_output");
        fs::write(
            dir.join(TABLES_JSON),
            r#"{"table_1": {"csv_data": "ID,Requirement\n4.1.1,Paint\n"},
                "table_2": {"csv_data": null, "column_names": null},
                "table_3": "not a table",
                "table_4": {"csv_data": "A\n1\n", "rows": "many"}}"#,
        )
        .unwrap();

        let input = load_input(&dir, None).unwrap();
        let ids: Vec<&str> = input.tables.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["table_1", "table_2"]);
        assert!(input.tables["table_2"].csv_data.is_empty());
    }

    #[test]
    fn test_null_text_block_keeps_document() {
        let raw = json!({"blocks": [
            {"type": "paragraph", "text": "#001.0 The pump shall start."},
            {"type": "paragraph", "text": null},
            {"type": "heading", "level": "two", "text": "Broken"},
            {"text": "untyped"}
        ]});
        let blocks = blocks_from_value(&raw);
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("#001.0 The pump shall start."),
                Block::paragraph("")
            ]
        );
    }

    #[test]
    fn test_missing_directory() {
        assert!(load_input(Path::new("/nonexistent/specsieve"), None).is_err());
    }
}
