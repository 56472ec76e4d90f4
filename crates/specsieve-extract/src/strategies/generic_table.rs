//! Generic keyword/table extraction used to rescue marker-first failures

use regex::Regex;
use specsieve_core::{Comparator, Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use std::sync::LazyLock;

use super::RequirementDraft;
use crate::normalize::{bound_criterion, normalize_unit};
use crate::strategy::{SegmentationContext, SegmentationStrategy};
use crate::tables::TableGrid;

static ID_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#\s*\d+(?:[\.-]\d+)?\s*$").expect("valid generic id cell regex")
});

static ID_CAPTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*(\d+(?:[\.-]\d+)?)").expect("valid generic id regex"));

static TRAILING_VERIFICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Verification method:\s*(.*?)\.?\s*$").expect("valid trailing verification regex")
});

/// Exact header names read by the generic extractor
#[derive(Debug, Clone, Copy, Default)]
struct SpecColumns {
    id: Option<usize>,
    subject: Option<usize>,
    requirement: Option<usize>,
    unit: Option<usize>,
    lsl: Option<usize>,
    target: Option<usize>,
    usl: Option<usize>,
}

impl SpecColumns {
    fn detect(header: &[String]) -> Self {
        let find = |name: &str| header.iter().position(|h| h == name);
        Self {
            id: find("ID"),
            subject: find("Subject"),
            requirement: find("Requirement"),
            unit: find("Unit"),
            lsl: find("LSL"),
            target: find("Target"),
            usl: find("USL"),
        }
    }

    fn has_requirement_or_bounds(&self) -> bool {
        self.requirement.is_some() || self.lsl.is_some() || self.target.is_some() || self.usl.is_some()
    }
}

/// Structured spec tables and two-column text/`#NNN.N` tables
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTableStrategy;

impl SegmentationStrategy for GenericTableStrategy {
    fn name(&self) -> &'static str {
        "generic_table"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let mut requirements = Vec::new();
        for grid in ctx.tables.iter() {
            let columns = SpecColumns::detect(grid.header());
            let two_column = grid.header().len() == 2
                && !columns.has_requirement_or_bounds()
                && grid
                    .data_rows()
                    .any(|(_, row)| row.get(1).is_some_and(|c| ID_CELL.is_match(c)));

            for (row_index, row) in grid.data_rows() {
                let requirement = if two_column {
                    two_column_row(ctx, grid, row_index, row)
                } else {
                    spec_row(ctx, grid, &columns, row_index, row)
                };
                requirements.extend(requirement);
            }
        }
        Ok(requirements)
    }
}

fn row_anchor(grid: &TableGrid, row: usize) -> (SourceAnchor, SourceLocation) {
    (
        SourceAnchor::TableRow {
            table: grid.table_id.clone(),
            row,
        },
        SourceLocation::row(&grid.table_id, row),
    )
}

fn two_column_row(
    ctx: &SegmentationContext<'_>,
    grid: &TableGrid,
    row_index: usize,
    row: &[String],
) -> Option<Requirement> {
    let mut raw = row.first().cloned().unwrap_or_default();
    let id_cell = row.get(1).map(String::as_str).unwrap_or("");
    let id = ID_CAPTURE
        .captures(id_cell)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace(' ', ""));
    if raw.is_empty() && id.is_none() {
        return None;
    }
    let row_id = id.unwrap_or_else(|| format!("{}:{row_index}", grid.table_id));

    let mut verification = None;
    if let Some(caps) = TRAILING_VERIFICATION.captures(&raw) {
        verification = caps.get(1).map(|m| m.as_str().trim().to_string());
        let start = caps.get(0).map_or(raw.len(), |m| m.start());
        raw = raw[..start].trim().to_string();
    }

    let (anchor, location) = row_anchor(grid, row_index);
    let draft = RequirementDraft::new(
        format!("TPS:{row_id}"),
        raw,
        ctx.settings.default_subject.as_str(),
        anchor,
        SourceType::TableRow,
        location,
    )
    .verification_method(verification);
    Some(draft.build(&ctx.meta))
}

fn spec_row(
    ctx: &SegmentationContext<'_>,
    grid: &TableGrid,
    columns: &SpecColumns,
    row_index: usize,
    row: &[String],
) -> Option<Requirement> {
    let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).filter(|c| !c.is_empty());

    let row_id = cell(columns.id)
        .cloned()
        .unwrap_or_else(|| format!("{}:{row_index}", grid.table_id));
    let subject = cell(columns.subject)
        .cloned()
        .unwrap_or_else(|| ctx.settings.default_subject.clone());
    let raw = cell(columns.requirement).cloned().unwrap_or_default();
    let unit = cell(columns.unit).map(|u| normalize_unit(u));

    let criteria: Vec<_> = [
        (columns.lsl, Comparator::AtLeast),
        (columns.target, Comparator::Equal),
        (columns.usl, Comparator::AtMost),
    ]
    .into_iter()
    .filter_map(|(col, comparator)| bound_criterion(&row_id, comparator, cell(col)?, unit.as_deref()))
    .collect();

    if raw.is_empty() && criteria.is_empty() {
        return None;
    }

    let canonical_source = if raw.is_empty() {
        unit.clone().unwrap_or_else(|| "specification".to_string())
    } else {
        raw.clone()
    };
    let (anchor, location) = row_anchor(grid, row_index);
    let draft = RequirementDraft::new(
        format!("TPS:{row_id}"),
        raw,
        subject,
        anchor,
        SourceType::TableRow,
        location,
    )
    .canonical_from(canonical_source)
    .criteria(criteria);
    Some(draft.build(&ctx.meta))
}
