//! ID-column table extraction for Dialect-B documents

use specsieve_core::{Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use tracing::debug;

use super::RequirementDraft;
use crate::normalize::{bound_criterion, normalize_unit};
use crate::strategy::{SegmentationContext, SegmentationStrategy};
use crate::tables::{ColumnRole, ColumnRoles, IdColumn, TableGrid, HIERARCHICAL_ID};

/// One requirement per row of a table with a hierarchical identifier column
#[derive(Debug, Clone, Copy, Default)]
pub struct IdTableStrategy;

impl SegmentationStrategy for IdTableStrategy {
    fn name(&self) -> &'static str {
        "id_table"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let mut requirements = Vec::new();
        for grid in ctx.tables.iter() {
            let roles = ColumnRoles::detect(grid.header());
            let Some(id) = IdColumn::detect(grid, &roles, ctx.settings) else {
                continue;
            };
            let has_ids = grid
                .data_rows()
                .any(|(_, row)| row.get(id.index).is_some_and(|c| HIERARCHICAL_ID.is_match(c)));
            if !has_ids {
                debug!(table_id = %grid.table_id, "id column holds no hierarchical ids");
                continue;
            }
            extract_rows(ctx, grid, &roles, id.index, &mut requirements);
        }
        Ok(requirements)
    }
}

fn extract_rows(
    ctx: &SegmentationContext<'_>,
    grid: &TableGrid,
    roles: &ColumnRoles,
    id_col: usize,
    out: &mut Vec<Requirement>,
) {
    let body_col = roles.body_column();
    let reference_cols: Vec<usize> = [ColumnRole::References, ColumnRole::Comments]
        .into_iter()
        .filter_map(|role| roles.get(role))
        .collect();
    let bounds = roles.bound_columns();

    for (row_index, row) in grid.data_rows() {
        let Some(raw_id) = row.get(id_col).filter(|c| HIERARCHICAL_ID.is_match(c)) else {
            continue;
        };

        let body = body_col
            .and_then(|c| row.get(c))
            .filter(|c| !c.is_empty())
            .or_else(|| longest_cell(row, id_col));
        let Some(body) = body else {
            continue;
        };

        let subject = roles
            .get(ColumnRole::Subject)
            .and_then(|c| row.get(c))
            .filter(|c| !c.is_empty())
            .cloned()
            .unwrap_or_else(|| ctx.settings.default_subject.clone());
        let unit = roles
            .get(ColumnRole::Unit)
            .and_then(|c| row.get(c))
            .filter(|c| !c.is_empty())
            .map(|c| normalize_unit(c));

        let criteria = bounds
            .iter()
            .filter_map(|bound| {
                let cell = row.get(bound.index)?;
                bound_criterion(raw_id, bound.comparator, cell, unit.as_deref())
            })
            .collect();

        let references = reference_cols
            .iter()
            .filter_map(|&c| row.get(c))
            .filter(|c| !c.is_empty() && c.as_str() != "-" && c.as_str() != "—")
            .cloned()
            .collect();

        out.push(
            RequirementDraft::new(
                format!("TPS:{raw_id}"),
                body.as_str(),
                subject,
                SourceAnchor::TableRow {
                    table: grid.table_id.clone(),
                    row: row_index,
                },
                SourceType::TableRow,
                SourceLocation::row(&grid.table_id, row_index),
            )
            .references(references)
            .references_from(grid.row_text(row_index))
            .criteria(criteria)
            .build(&ctx.meta),
        );
    }
}

/// Longest non-empty cell outside the identifier column; first wins on ties
fn longest_cell(row: &[String], id_col: usize) -> Option<&String> {
    row.iter()
        .enumerate()
        .filter(|(i, c)| *i != id_col && !c.is_empty())
        .map(|(_, c)| c)
        .fold(None, |best: Option<&String>, c| match best {
            Some(b) if b.chars().count() >= c.chars().count() => Some(b),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarkerSettings, SegmentationSettings};
    use crate::markers::MarkerIndex;
    use crate::tables::TableSet;
    use specsieve_core::{Comparator, DocMeta, Document, Table, TableCollection};
    use std::sync::Arc;

    fn run(csv: &str) -> Vec<Requirement> {
        let document = Document::default();
        let mut collection = TableCollection::new();
        collection.insert("t1".to_string(), Table::from_csv(csv));
        let tables = TableSet::from_tables(&collection);
        let markers = MarkerIndex::build(&document, &tables, &MarkerSettings::default());
        let settings = SegmentationSettings::default();
        let ctx = SegmentationContext::new(
            &document,
            &tables,
            &markers,
            Arc::new(DocMeta::new("tps", "TPS")),
            &settings,
        );
        IdTableStrategy.segment(&ctx).unwrap()
    }

    #[test]
    fn test_bound_columns_become_criteria() {
        let reqs = run(
            "ID,Subject,Requirement,Unit,LSL,Target,USL\n4.1.2.7,generator,Maximum allowed RMS vibration level,mm/s,,,1.8\n",
        );
        assert_eq!(reqs.len(), 1);
        let req = &reqs[0];
        assert_eq!(req.requirement_uid, "TPS:4.1.2.7");
        assert_eq!(req.subject, "generator");
        assert_eq!(req.acceptance_criteria.len(), 1);
        let c = &req.acceptance_criteria[0];
        assert_eq!(c.comparator, Some(Comparator::AtMost));
        assert_eq!(c.value, Some(1.8));
        assert_eq!(c.unit.as_deref(), Some("mm_per_s"));
        assert_eq!(
            req.source_anchor,
            SourceAnchor::TableRow {
                table: "t1".to_string(),
                row: 1
            }
        );
    }

    #[test]
    fn test_pattern_detected_id_and_longest_cell() {
        let reqs = run(
            "No,Short,Long\n4.1.1,ok,The supplier shall deliver drawings\n4.1.2,,\n4.1.3,x,Paint per ISO 12944-5\nNote,a,b\n",
        );
        // 4.1.2 has no body, "Note" is not an id
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].requirement_raw, "The supplier shall deliver drawings");
        assert_eq!(reqs[1].requirement_uid, "TPS:4.1.3");
        assert_eq!(reqs[1].references, vec!["ISO 12944-5"]);
    }

    #[test]
    fn test_reference_columns() {
        let reqs = run(
            "ID,Description,References,Comments\n2.1,Enclosure IP55,IEC 60034-5,-\n2.2,Cooling IC611,—,see drawing\n",
        );
        assert_eq!(reqs[0].references, vec!["IEC 60034-5"]);
        assert_eq!(reqs[1].references, vec!["see drawing"]);
    }

    #[test]
    fn test_table_without_ids_is_skipped() {
        assert!(run("ID,Requirement\nA,Paint it\nB,Ship it\n").is_empty());
    }
}
