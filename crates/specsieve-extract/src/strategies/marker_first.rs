//! Marker-first pass over Dialect-B markers no earlier phase resolved

use specsieve_core::{Block, Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use std::collections::HashSet;

use super::RequirementDraft;
use crate::markers::{ContainerType, Marker, MarkerKind};
use crate::normalize::{bound_criterion, normalize_unit};
use crate::semantics::SectionTracker;
use crate::strategy::{SegmentationContext, SegmentationStrategy};
use crate::tables::{ColumnRole, ColumnRoles, TableGrid};

/// Paragraph slicing and row resolution for leftover hierarchical markers
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerFirstStrategy;

impl SegmentationStrategy for MarkerFirstStrategy {
    fn name(&self) -> &'static str {
        "marker_first"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let mut skip: HashSet<String> = ctx.resolved_uids().into_iter().map(str::to_string).collect();
        let covered = ctx.covered_rows();

        let mut tracker = SectionTracker::new();
        let section_paths: Vec<Vec<String>> =
            ctx.document.blocks.iter().map(|b| tracker.update(b)).collect();

        let mut requirements = Vec::new();
        for (key, markers) in ctx.markers.by_container() {
            let mut markers: Vec<&Marker> =
                markers.into_iter().filter(|m| m.kind == MarkerKind::Tps).collect();
            if markers.is_empty() {
                continue;
            }
            markers.sort_by_key(|m| (m.cell_coords, m.start));

            match key.container_type {
                ContainerType::Paragraph => {
                    let Some(text) = ctx
                        .document
                        .blocks
                        .get(key.container_index)
                        .and_then(Block::body_text)
                    else {
                        continue;
                    };
                    let path = section_paths
                        .get(key.container_index)
                        .cloned()
                        .unwrap_or_default();
                    for (i, marker) in markers.iter().enumerate() {
                        let uid = format!("TPS:{}", marker.uid);
                        if skip.contains(&uid) {
                            continue;
                        }
                        let end = markers.get(i + 1).map_or(text.len(), |next| next.start);
                        let segment = text.get(marker.end..end).unwrap_or("").trim();
                        if segment.is_empty() {
                            continue;
                        }
                        skip.insert(uid.clone());
                        requirements.push(
                            RequirementDraft::new(
                                uid,
                                segment,
                                ctx.settings.default_subject.as_str(),
                                SourceAnchor::Paragraph {
                                    index: key.container_index,
                                    offset: marker.start,
                                },
                                SourceType::Paragraph,
                                SourceLocation {
                                    offset: Some(marker.start),
                                    ..SourceLocation::block(key.container_index)
                                },
                            )
                            .section_path(path.clone())
                            .build(&ctx.meta),
                        );
                    }
                }
                ContainerType::TableCell => {
                    let Some(grid) = key.table_id.as_deref().and_then(|id| ctx.tables.get(id)) else {
                        continue;
                    };
                    let row = key.container_index;
                    if row == 0 || covered.contains(&(grid.table_id.as_str(), row)) {
                        continue;
                    }
                    let Some(marker) = markers
                        .iter()
                        .find(|m| !skip.contains(&format!("TPS:{}", m.uid)))
                    else {
                        continue;
                    };
                    let requirement = resolve_row(ctx, grid, row, marker);
                    skip.insert(requirement.requirement_uid.clone());
                    requirements.push(requirement);
                }
            }
        }

        Ok(requirements)
    }
}

/// Requirement for the table row owning a marker
fn resolve_row(ctx: &SegmentationContext<'_>, grid: &TableGrid, row: usize, marker: &Marker) -> Requirement {
    let cells = grid.row(row).unwrap_or(&[]);
    let roles = ColumnRoles::detect(grid.header());
    let raw = row_text_cell(cells, &roles, &marker.uid);

    let subject = roles
        .get(ColumnRole::Subject)
        .and_then(|c| cells.get(c))
        .filter(|c| !c.is_empty())
        .cloned()
        .unwrap_or_else(|| ctx.settings.default_subject.clone());
    let unit = roles
        .get(ColumnRole::Unit)
        .and_then(|c| cells.get(c))
        .filter(|c| !c.is_empty())
        .map(|c| normalize_unit(c));
    let criteria = roles
        .bound_columns()
        .iter()
        .filter_map(|bound| {
            bound_criterion(&marker.uid, bound.comparator, cells.get(bound.index)?, unit.as_deref())
        })
        .collect();

    let stub = raw.is_empty();
    let draft = RequirementDraft::new(
        format!("TPS:{}", marker.uid),
        if stub { marker.raw.clone() } else { raw },
        subject,
        SourceAnchor::TableCell {
            table: grid.table_id.clone(),
            cell: marker.cell_coords,
        },
        SourceType::TableCell,
        SourceLocation::cell(&grid.table_id, marker.cell_coords),
    );

    if stub {
        return draft.build_stub(&ctx.meta);
    }
    draft
        .references_from(grid.row_text(row))
        .criteria(criteria)
        .build(&ctx.meta)
}

/// Requirement text of a row: a named text column, else the first
/// non-empty cell not holding the marker
fn row_text_cell(cells: &[String], roles: &ColumnRoles, uid: &str) -> String {
    let named = [ColumnRole::Requirement, ColumnRole::Description, ColumnRole::Text]
        .into_iter()
        .find_map(|role| roles.get(role));

    if let Some(col) = named {
        match cells.get(col).map(|c| c.trim()) {
            Some(text) if text == uid => {
                if let Some(next) = cells.get(col + 1).filter(|c| !c.is_empty()) {
                    return next.clone();
                }
            }
            Some(text) if !text.is_empty() => return text.to_string(),
            _ => {}
        }
    }

    cells
        .iter()
        .find(|c| !c.is_empty() && !c.contains(uid))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarkerSettings, SegmentationSettings};
    use crate::markers::MarkerIndex;
    use crate::tables::TableSet;
    use specsieve_core::{Comparator, DocMeta, Document, Table, TableCollection};
    use std::sync::Arc;

    fn run(blocks: Vec<Block>, tables: &[(&str, &str)], prior: &[Requirement]) -> Vec<Requirement> {
        let document = Document::new(blocks);
        let mut collection = TableCollection::new();
        for (id, csv) in tables {
            collection.insert(id.to_string(), Table::from_csv(*csv));
        }
        let tables = TableSet::from_tables(&collection);
        let markers = MarkerIndex::build(&document, &tables, &MarkerSettings::default());
        let settings = SegmentationSettings::default();
        let ctx = SegmentationContext::new(
            &document,
            &tables,
            &markers,
            Arc::new(DocMeta::default()),
            &settings,
        );
        MarkerFirstStrategy.segment(&ctx.with_prior(prior)).unwrap()
    }

    #[test]
    fn test_paragraph_segments_between_markers() {
        let reqs = run(
            vec![Block::paragraph("4.1.1 The stator shall be wound. 4.1.2 Rotor balanced to G2.5")],
            &[],
            &[],
        );
        let uids: Vec<&str> = reqs.iter().map(|r| r.requirement_uid.as_str()).collect();
        assert_eq!(uids, vec!["TPS:4.1.1", "TPS:4.1.2"]);
        assert_eq!(reqs[0].requirement_raw, "The stator shall be wound.");
    }

    #[test]
    fn test_row_text_column_and_bounds() {
        let reqs = run(
            vec![],
            &[("t1", "No,Text,Unit,LSL,USL\n3.2.1,Supply voltage,kV,10.5,11.5\n")],
            &[],
        );
        assert_eq!(reqs.len(), 1);
        let req = &reqs[0];
        assert_eq!(req.requirement_uid, "TPS:3.2.1");
        assert_eq!(req.requirement_raw, "Supply voltage");
        let comparators: Vec<Option<Comparator>> =
            req.acceptance_criteria.iter().map(|c| c.comparator).collect();
        assert_eq!(comparators, vec![Some(Comparator::AtLeast), Some(Comparator::AtMost)]);
        assert_eq!(req.acceptance_criteria[0].unit.as_deref(), Some("kV"));
    }

    #[test]
    fn test_resolved_rows_and_uids_are_skipped() {
        let tables = [("t1", "ID,Requirement\n3.2.1,Supply voltage\n3.2.2,Frequency\n")];
        let first = run(vec![], &tables, &[]);
        assert_eq!(first.len(), 2);

        let again = run(vec![], &tables, &first[..1]);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].requirement_uid, "TPS:3.2.2");
    }

    #[test]
    fn test_marker_only_row_is_stub() {
        let reqs = run(vec![], &[("t1", "Ref,Other\n5.1.2,\n")], &[]);
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].is_stub);
        assert_eq!(reqs[0].requirement_raw, "5.1.2");
        assert_eq!(reqs[0].canonical_statement, "Requirement 5.1.2");
        assert!(reqs[0].acceptance_criteria.is_empty());
    }
}
