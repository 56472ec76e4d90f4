//! Marker index: one pass over paragraphs and table cells for requirement anchors
//!
//! Two numbering dialects are recognized:
//! - Dialect A, a hash-prefixed number with one sub-index (`#45.0`), stored
//!   zero-padded as `#045.0`
//! - Dialect B, a dotted hierarchical numeral (`4.1.2.7`), ignored when it
//!   directly follows a hash sign
//!
//! Offsets are byte offsets into the container text.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use specsieve_core::Document;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::MarkerSettings;
use crate::tables::TableSet;

pub(crate) static RS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*(\d+)\s*\.\s*(\d+)").expect("valid dialect-a marker regex"));

static TPS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+(?:\.\d+){1,5})\b").expect("valid dialect-b marker regex"));

/// Numbering dialect of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerKind {
    /// `#045.0`
    #[serde(rename = "RS")]
    Rs,
    /// `4.1.2.7`
    #[serde(rename = "TPS")]
    Tps,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rs => "RS",
            Self::Tps => "TPS",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a marker was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    Paragraph,
    TableCell,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::TableCell => "table_cell",
        }
    }
}

/// A discovered requirement anchor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    /// Canonical id (`#045.0` or `4.1.2.7`)
    pub uid: String,

    pub kind: MarkerKind,

    /// Matched text as written
    pub raw: String,

    pub container_type: ContainerType,

    /// Block index for paragraphs, row index for table cells
    pub container_index: usize,

    pub table_id: Option<String>,

    /// (row, column) for table cells
    pub cell_coords: Option<(usize, usize)>,

    pub start: usize,

    pub end: usize,
}

impl Marker {
    /// Grouping key of the marker's container
    pub fn container(&self) -> ContainerKey {
        ContainerKey {
            container_type: self.container_type,
            container_index: self.container_index,
            table_id: self.table_id.clone(),
        }
    }
}

/// A paragraph block or a table row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerKey {
    pub container_type: ContainerType,
    pub container_index: usize,
    pub table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MarkerKey {
    kind: MarkerKind,
    uid: String,
    container_type: ContainerType,
    container_index: usize,
    table_id: Option<String>,
    cell_coords: Option<(usize, usize)>,
    start: usize,
}

impl From<&Marker> for MarkerKey {
    fn from(marker: &Marker) -> Self {
        Self {
            kind: marker.kind,
            uid: marker.uid.clone(),
            container_type: marker.container_type,
            container_index: marker.container_index,
            table_id: marker.table_id.clone(),
            cell_coords: marker.cell_coords,
            start: marker.start,
        }
    }
}

/// Normalize a Dialect-A marker (`#45.0`, `# 45.0`, `#045.0`) to `#045.0`
pub fn normalize_rs_uid(raw: &str) -> Option<String> {
    let caps = RS_MARKER.captures(raw)?;
    rs_uid(&caps[1], &caps[2])
}

fn rs_uid(main: &str, sub: &str) -> Option<String> {
    let main: u64 = main.parse().ok()?;
    let sub: u64 = sub.parse().ok()?;
    Some(format!("#{main:03}.{sub}"))
}

/// Deduplicated, order-stable list of markers for one document
#[derive(Debug, Clone)]
pub struct MarkerIndex {
    markers: Vec<Marker>,
    seen: HashSet<MarkerKey>,
    max_components: usize,
}

impl Default for MarkerIndex {
    fn default() -> Self {
        Self::new(&MarkerSettings::default())
    }
}

impl MarkerIndex {
    pub fn new(settings: &MarkerSettings) -> Self {
        Self {
            markers: Vec::new(),
            seen: HashSet::new(),
            max_components: settings.max_hierarchical_components,
        }
    }

    /// Scan blocks and tables, then sort
    pub fn build(document: &Document, tables: &TableSet, settings: &MarkerSettings) -> Self {
        let mut index = Self::new(settings);
        index.scan_blocks(document);
        index.scan_tables(tables);
        index.sort();
        debug!(
            rs = index.rs_count(),
            tps = index.tps_count(),
            "marker index built"
        );
        index
    }

    /// Paragraph and list blocks are scanned as paragraph containers
    pub fn scan_blocks(&mut self, document: &Document) {
        for (block_index, block) in document.blocks.iter().enumerate() {
            let Some(text) = block.body_text() else {
                continue;
            };
            self.scan_text(text, ContainerType::Paragraph, block_index, None, None);
        }
    }

    /// Every cell of every row, header row included
    pub fn scan_tables(&mut self, tables: &TableSet) {
        for grid in tables.iter() {
            for (row_index, row) in grid.rows.iter().enumerate() {
                for (col_index, cell) in row.iter().enumerate() {
                    self.scan_text(
                        cell,
                        ContainerType::TableCell,
                        row_index,
                        Some(&grid.table_id),
                        Some((row_index, col_index)),
                    );
                }
            }
        }
    }

    fn scan_text(
        &mut self,
        text: &str,
        container_type: ContainerType,
        container_index: usize,
        table_id: Option<&str>,
        cell_coords: Option<(usize, usize)>,
    ) {
        for caps in RS_MARKER.captures_iter(text) {
            let (Some(whole), Some(uid)) = (caps.get(0), rs_uid(&caps[1], &caps[2])) else {
                continue;
            };
            self.insert(Marker {
                uid,
                kind: MarkerKind::Rs,
                raw: whole.as_str().to_string(),
                container_type,
                container_index,
                table_id: table_id.map(str::to_string),
                cell_coords,
                start: whole.start(),
                end: whole.end(),
            });
        }

        for m in TPS_MARKER.find_iter(text) {
            if text[..m.start()].trim_end().ends_with('#') {
                continue;
            }
            if m.as_str().split('.').count() > self.max_components {
                continue;
            }
            self.insert(Marker {
                uid: m.as_str().to_string(),
                kind: MarkerKind::Tps,
                raw: m.as_str().to_string(),
                container_type,
                container_index,
                table_id: table_id.map(str::to_string),
                cell_coords,
                start: m.start(),
                end: m.end(),
            });
        }
    }

    fn insert(&mut self, marker: Marker) {
        if self.seen.insert(MarkerKey::from(&marker)) {
            self.markers.push(marker);
        }
    }

    /// Order by container type, table id, container index, then offset
    pub fn sort(&mut self) {
        self.markers.sort_by(|a, b| {
            a.container_type
                .as_str()
                .cmp(b.container_type.as_str())
                .then_with(|| {
                    a.table_id
                        .as_deref()
                        .unwrap_or("")
                        .cmp(b.table_id.as_deref().unwrap_or(""))
                })
                .then_with(|| a.container_index.cmp(&b.container_index))
                .then_with(|| a.start.cmp(&b.start))
        });
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn count(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }

    pub fn rs_count(&self) -> usize {
        self.count(MarkerKind::Rs)
    }

    pub fn tps_count(&self) -> usize {
        self.count(MarkerKind::Tps)
    }

    /// Markers of one dialect inside one container type
    pub fn count_in(&self, kind: MarkerKind, container_type: ContainerType) -> usize {
        self.markers
            .iter()
            .filter(|m| m.kind == kind && m.container_type == container_type)
            .count()
    }

    /// Markers of one dialect in index order
    pub fn of_kind(&self, kind: MarkerKind) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |m| m.kind == kind)
    }

    /// Markers grouped by container, groups in first-seen order
    pub fn by_container(&self) -> IndexMap<ContainerKey, Vec<&Marker>> {
        let mut buckets: IndexMap<ContainerKey, Vec<&Marker>> = IndexMap::new();
        for marker in &self.markers {
            buckets.entry(marker.container()).or_default().push(marker);
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specsieve_core::{Block, Table, TableCollection};

    fn index(blocks: Vec<Block>, tables: &[(&str, &str)]) -> MarkerIndex {
        let mut collection = TableCollection::new();
        for (id, csv) in tables {
            collection.insert(id.to_string(), Table::from_csv(*csv));
        }
        MarkerIndex::build(
            &Document::new(blocks),
            &TableSet::from_tables(&collection),
            &MarkerSettings::default(),
        )
    }

    #[test]
    fn test_rs_uid_normalization() {
        assert_eq!(normalize_rs_uid("#45.0").as_deref(), Some("#045.0"));
        assert_eq!(normalize_rs_uid("# 45.0").as_deref(), Some("#045.0"));
        assert_eq!(normalize_rs_uid("#045.0").as_deref(), Some("#045.0"));
        assert_eq!(normalize_rs_uid("#1234.12").as_deref(), Some("#1234.12"));
        assert_eq!(normalize_rs_uid("45.0"), None);
    }

    #[test]
    fn test_hash_prefixed_numbers_not_counted_twice() {
        let idx = index(vec![Block::paragraph("#45.0 The stator and # 46.1 the rotor")], &[]);
        assert_eq!(idx.rs_count(), 2);
        assert_eq!(idx.tps_count(), 0);
        assert_eq!(idx.markers()[0].uid, "#045.0");
        assert_eq!(idx.markers()[1].uid, "#046.1");
    }

    #[test]
    fn test_depth_filter() {
        let idx = index(
            vec![Block::paragraph("See 4.1.2.7 and 1.2.3.4.5 and 4.1")],
            &[],
        );
        let uids: Vec<&str> = idx.markers().iter().map(|m| m.uid.as_str()).collect();
        assert_eq!(uids, vec!["4.1.2.7", "4.1"]);
    }

    #[test]
    fn test_offsets_and_headings_ignored() {
        let idx = index(
            vec![
                Block::heading(1, "#001.0 Heading"),
                Block::paragraph("Intro #002.0 body"),
            ],
            &[],
        );
        assert_eq!(idx.len(), 1);
        let m = &idx.markers()[0];
        assert_eq!(m.container_index, 1);
        assert_eq!((m.start, m.end), (6, 12));
        assert_eq!(&"Intro #002.0 body"[m.start..m.end], "#002.0");
    }

    #[test]
    fn test_table_cells_and_sort_order() {
        let idx = index(
            vec![Block::paragraph("#003.0 text")],
            &[("t1", "ID,Requirement\n4.1.2.7,\"Quoted, #010.0\"\n")],
        );
        let kinds: Vec<(ContainerType, MarkerKind, &str)> = idx
            .markers()
            .iter()
            .map(|m| (m.container_type, m.kind, m.uid.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ContainerType::Paragraph, MarkerKind::Rs, "#003.0"),
                (ContainerType::TableCell, MarkerKind::Tps, "4.1.2.7"),
                (ContainerType::TableCell, MarkerKind::Rs, "#010.0"),
            ]
        );
        let cell = &idx.markers()[2];
        assert_eq!(cell.cell_coords, Some((1, 1)));
        assert_eq!(cell.table_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_by_container_groups_rows() {
        let idx = index(
            vec![],
            &[("t1", "A,B\n#001.0,#002.0\n#003.0,x\n")],
        );
        let groups = idx.by_container();
        assert_eq!(groups.len(), 2);
        let first = groups.values().next().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(idx.count_in(MarkerKind::Rs, ContainerType::TableCell), 3);
        assert_eq!(idx.count_in(MarkerKind::Rs, ContainerType::Paragraph), 0);
    }
}
