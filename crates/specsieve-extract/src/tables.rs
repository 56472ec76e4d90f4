//! Parsed table grids and column-role detection
//!
//! Tables arrive as quoted CSV text. Each one is parsed once into a
//! [`TableGrid`] (header included as row 0) that the marker index, the
//! strategies and the consolidation filter all share.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use specsieve_core::{Comparator, Error, Table, TableCollection};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::SegmentationSettings;

/// Hierarchical identifier as it appears in an ID column (2 to 5 components)
pub(crate) static HIERARCHICAL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){1,4}$").expect("valid hierarchical id regex"));

static MEASUREMENT_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(frequency|acceleration|flow|temperature|density|capacity|conductivity|viscosity|pressure)",
    )
    .expect("valid measurement vocabulary regex")
});

/// How the CSV text was turned into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Quote-aware parse, multi-line cells preserved
    Structured,
    /// Line and comma split after the structured parse failed
    Naive,
}

/// One table as rows of trimmed cells
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub table_id: String,

    /// All rows, header first
    pub rows: Vec<Vec<String>>,

    /// Column names reported by the converter (header row if none)
    pub column_names: Vec<String>,

    pub parse_mode: ParseMode,
}

impl TableGrid {
    /// Parse a table; `None` when it carries no CSV text
    pub fn parse(table_id: impl Into<String>, table: &Table) -> Option<Self> {
        let table_id = table_id.into();
        if table.csv_data.trim().is_empty() {
            return None;
        }

        let (rows, parse_mode) = match parse_structured(&table_id, &table.csv_data) {
            Ok(rows) => (rows, ParseMode::Structured),
            Err(e) => {
                warn!(error = %e, "structured csv parse failed, splitting naively");
                (parse_naive(&table.csv_data), ParseMode::Naive)
            }
        };

        let column_names = if table.column_names.is_empty() {
            rows.first().cloned().unwrap_or_default()
        } else {
            table.column_names.clone()
        };

        Some(Self {
            table_id,
            rows,
            column_names,
            parse_mode,
        })
    }

    /// Header row (empty for an empty grid)
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Rows after the header, with their grid index
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| (i, row.as_slice()))
    }

    /// Non-empty cells of a row joined by spaces
    pub fn row_text(&self, index: usize) -> String {
        self.row(index)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    /// Table whose columns are mostly physical quantities (frequency, pressure...)
    pub fn is_measurement_table(&self) -> bool {
        if self.column_names.is_empty() {
            return false;
        }
        let hits = self
            .column_names
            .iter()
            .filter(|name| MEASUREMENT_VOCABULARY.is_match(&name.to_lowercase()))
            .count();
        hits >= (self.column_names.len() / 2).max(2)
    }
}

fn parse_structured(table_id: &str, csv_data: &str) -> specsieve_core::Result<Vec<Vec<String>>> {
    if has_unterminated_quote(csv_data) {
        return Err(Error::table(table_id, "unterminated quoted field"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

/// A quoted field still open at end of input
///
/// Quotes only open a field at its start; a doubled quote inside a quoted
/// field is an escape.
fn has_unterminated_quote(csv_data: &str) -> bool {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = csv_data.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match c {
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            ',' | '\n' | '\r' => field_start = true,
            _ => field_start = false,
        }
    }
    in_quotes
}

fn parse_naive(csv_data: &str) -> Vec<Vec<String>> {
    csv_data
        .lines()
        .map(|line| line.split(',').map(|c| c.trim().to_string()).collect())
        .collect()
}

/// Every parseable table of a document, in converter order
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    grids: IndexMap<String, TableGrid>,
}

impl TableSet {
    /// Parse every table; empty tables are skipped
    pub fn from_tables(tables: &TableCollection) -> Self {
        let mut grids = IndexMap::with_capacity(tables.len());
        for (table_id, table) in tables {
            match TableGrid::parse(table_id.clone(), table) {
                Some(grid) => {
                    grids.insert(table_id.clone(), grid);
                }
                None => debug!(table_id = %table_id, "skipping table without csv data"),
            }
        }
        Self { grids }
    }

    pub fn get(&self, table_id: &str) -> Option<&TableGrid> {
        self.grids.get(table_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableGrid> {
        self.grids.values()
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// ID-column detection for every table that has an identifier column
    pub fn id_column_reports(&self, settings: &SegmentationSettings) -> Vec<IdColumnReport> {
        self.iter()
            .filter_map(|grid| {
                let roles = ColumnRoles::detect(grid.header());
                let id = IdColumn::detect(grid, &roles, settings)?;
                Some(IdColumnReport::new(grid, id))
            })
            .collect()
    }
}

/// Semantic role of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Id,
    Requirement,
    Description,
    Documentation,
    Text,
    Subject,
    Unit,
    Lsl,
    Target,
    Usl,
    References,
    Comments,
}

impl ColumnRole {
    /// Role named by a header cell
    pub fn from_header(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let role = match name.as_str() {
            "id" | "req id" | "requirement id" => Self::Id,
            "requirement" | "requirements" => Self::Requirement,
            "description" => Self::Description,
            "documentation" => Self::Documentation,
            "text" => Self::Text,
            "subject" => Self::Subject,
            "unit" | "units" => Self::Unit,
            "lsl" => Self::Lsl,
            "target" => Self::Target,
            "usl" => Self::Usl,
            other if other.contains("reference") => Self::References,
            other if other.contains("comment") => Self::Comments,
            _ => return None,
        };
        Some(role)
    }
}

/// Numeric bound column and the comparator it implies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundColumn {
    pub index: usize,
    pub comparator: Comparator,
}

/// Column-role mapping for one table header; first column wins per role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRoles {
    roles: IndexMap<ColumnRole, usize>,
}

impl ColumnRoles {
    pub fn detect(header: &[String]) -> Self {
        let mut roles = IndexMap::new();
        for (index, name) in header.iter().enumerate() {
            if let Some(role) = ColumnRole::from_header(name) {
                roles.entry(role).or_insert(index);
            }
        }
        Self { roles }
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.roles.get(&role).copied()
    }

    pub fn has(&self, role: ColumnRole) -> bool {
        self.roles.contains_key(&role)
    }

    /// Descriptive column in priority order: requirement, description, documentation
    pub fn body_column(&self) -> Option<usize> {
        self.get(ColumnRole::Requirement)
            .or_else(|| self.get(ColumnRole::Description))
            .or_else(|| self.get(ColumnRole::Documentation))
    }

    /// LSL, Target and USL columns present in the header, in that order
    pub fn bound_columns(&self) -> Vec<BoundColumn> {
        [
            (ColumnRole::Lsl, Comparator::AtLeast),
            (ColumnRole::Target, Comparator::Equal),
            (ColumnRole::Usl, Comparator::AtMost),
        ]
        .into_iter()
        .filter_map(|(role, comparator)| {
            self.get(role).map(|index| BoundColumn { index, comparator })
        })
        .collect()
    }
}

/// How the identifier column was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdDetectionMethod {
    Header,
    Pattern,
}

/// An identifier column of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdColumn {
    pub index: usize,
    pub method: IdDetectionMethod,
}

impl IdColumn {
    /// Header role first, then the hierarchical-pattern heuristic
    pub fn detect(grid: &TableGrid, roles: &ColumnRoles, settings: &SegmentationSettings) -> Option<Self> {
        if let Some(index) = roles.get(ColumnRole::Id) {
            return Some(Self {
                index,
                method: IdDetectionMethod::Header,
            });
        }
        detect_by_pattern(grid, settings).map(|index| Self {
            index,
            method: IdDetectionMethod::Pattern,
        })
    }
}

/// Column with the most hierarchical ids among those passing the thresholds
///
/// Ties go to the rightmost column.
pub fn detect_by_pattern(grid: &TableGrid, settings: &SegmentationSettings) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;

    for col in 0..grid.header().len() {
        let mut non_empty = 0usize;
        let mut matches = 0usize;
        for (_, row) in grid.data_rows() {
            let Some(cell) = row.get(col) else { continue };
            if cell.is_empty() {
                continue;
            }
            non_empty += 1;
            if HIERARCHICAL_ID.is_match(cell) {
                matches += 1;
            }
        }

        let rate = matches as f64 / non_empty.max(1) as f64;
        let qualifies = non_empty >= settings.id_column_min_non_empty
            && matches >= settings.id_column_min_matches
            && rate >= settings.id_column_min_match_rate;
        if qualifies && best.map_or(true, |(best_matches, _)| matches >= best_matches) {
            best = Some((matches, col));
        }
    }

    best.map(|(_, col)| col)
}

/// Diagnostics for one ID-column detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdColumnReport {
    pub table_id: String,
    pub detection: IdDetectionMethod,
    pub column_index: usize,
    pub column_name: Option<String>,
    pub matched_ids: usize,
    pub total_rows: usize,
}

impl IdColumnReport {
    pub fn new(grid: &TableGrid, id: IdColumn) -> Self {
        let matched_ids = grid
            .data_rows()
            .filter(|(_, row)| {
                row.get(id.index)
                    .is_some_and(|cell| HIERARCHICAL_ID.is_match(cell))
            })
            .count();
        Self {
            table_id: grid.table_id.clone(),
            detection: id.method,
            column_index: id.index,
            column_name: grid.header().get(id.index).cloned(),
            matched_ids,
            total_rows: grid.rows.len().saturating_sub(1),
        }
    }
}
