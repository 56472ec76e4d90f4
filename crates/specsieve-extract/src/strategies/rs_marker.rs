//! Dialect-A strategy: `#045.0` markers in paragraphs and table cells

use specsieve_core::{Block, Requirement, Result, SourceAnchor, SourceLocation, SourceType};

use super::RequirementDraft;
use crate::markers::{ContainerType, Marker, MarkerKind, RS_MARKER};
use crate::semantics::{split_inline_verification, SectionTracker};
use crate::strategy::{SegmentationContext, SegmentationStrategy};
use crate::tables::TableGrid;

const METADATA_PREFIXES: &[&str] = &["motivation:", "source:", "verification method:", "conflicts:"];

/// Slices text between consecutive Dialect-A markers
#[derive(Debug, Clone, Copy, Default)]
pub struct RsMarkerStrategy;

impl SegmentationStrategy for RsMarkerStrategy {
    fn name(&self) -> &'static str {
        "rs_marker"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let section_paths = section_paths(&ctx.document.blocks);
        let mut requirements = Vec::new();

        for (key, markers) in ctx.markers.by_container() {
            let mut markers: Vec<&Marker> =
                markers.into_iter().filter(|m| m.kind == MarkerKind::Rs).collect();
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
                    self.segment_paragraph(ctx, text, key.container_index, &path, &markers, &mut requirements);
                }
                ContainerType::TableCell => {
                    let Some(grid) = key.table_id.as_deref().and_then(|id| ctx.tables.get(id)) else {
                        continue;
                    };
                    self.segment_row(ctx, grid, &markers, &mut requirements);
                }
            }
        }

        Ok(requirements)
    }
}

impl RsMarkerStrategy {
    fn segment_paragraph(
        &self,
        ctx: &SegmentationContext<'_>,
        text: &str,
        block_index: usize,
        section_path: &[String],
        markers: &[&Marker],
        out: &mut Vec<Requirement>,
    ) {
        let subject = &ctx.settings.default_subject;

        for (i, marker) in markers.iter().enumerate() {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.start);
            let slice = text.get(marker.end..end).unwrap_or("").trim();
            let uid = format!("RS:{}", marker.uid);
            let anchor = SourceAnchor::Paragraph {
                index: block_index,
                offset: marker.start,
            };
            let location = SourceLocation {
                offset: Some(marker.start),
                ..SourceLocation::block(block_index)
            };

            if slice.is_empty() {
                out.push(
                    RequirementDraft::new(uid, &marker.raw, subject, anchor, SourceType::Paragraph, location)
                        .section_path(section_path.to_vec())
                        .build_stub(&ctx.meta),
                );
                continue;
            }

            let (body, verification) = split_inline_verification(slice);
            out.push(
                RequirementDraft::new(uid, body, subject, anchor, SourceType::Paragraph, location)
                    .section_path(section_path.to_vec())
                    .verification_method(verification)
                    .build(&ctx.meta),
            );
        }
    }

    fn segment_row(
        &self,
        ctx: &SegmentationContext<'_>,
        grid: &TableGrid,
        markers: &[&Marker],
        out: &mut Vec<Requirement>,
    ) {
        let subject = &ctx.settings.default_subject;

        for (i, marker) in markers.iter().enumerate() {
            let Some((row, col)) = marker.cell_coords else {
                continue;
            };
            let cell = grid.cell(row, col).unwrap_or("");
            let next_in_cell = markers
                .get(i + 1)
                .filter(|next| next.cell_coords == marker.cell_coords);
            let body_cell = resolve_body(grid, row, col, cell, marker, next_in_cell.copied());

            let uid = format!("RS:{}", marker.uid);
            let anchor = SourceAnchor::TableCell {
                table: grid.table_id.clone(),
                cell: Some((row, col)),
            };
            let location = SourceLocation::cell(&grid.table_id, Some((row, col)));

            let header = grid
                .cell(0, 0)
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string);

            let Some(body) = body_cell else {
                out.push(
                    RequirementDraft::new(uid, &marker.raw, subject, anchor, SourceType::TableCell, location)
                        .build_stub(&ctx.meta),
                );
                continue;
            };

            let meta = CellMetadata::parse(&body);
            let header = header.filter(|h| !h.eq_ignore_ascii_case(meta.requirement_raw.trim()));
            let section_path = header.iter().cloned().collect();

            out.push(
                RequirementDraft::new(
                    uid,
                    meta.requirement_raw,
                    subject,
                    anchor,
                    SourceType::TableCell,
                    location,
                )
                .section_path(section_path)
                .references_from(body.as_str())
                .verification_method(meta.verification_method)
                .conflicts(meta.conflicts)
                .raw_section_header(header)
                .build(&ctx.meta),
            );
        }
    }
}

/// Breadcrumb in force at every block
fn section_paths(blocks: &[Block]) -> Vec<Vec<String>> {
    let mut tracker = SectionTracker::new();
    blocks.iter().map(|block| tracker.update(block)).collect()
}

/// Body text for a marker found in a table cell
///
/// The text after the marker (up to the next marker in the same cell) wins,
/// then text before a trailing marker. A cell holding nothing but markers
/// borrows an adjacent cell: left, right, then the first column.
fn resolve_body(
    grid: &TableGrid,
    row: usize,
    col: usize,
    cell: &str,
    marker: &Marker,
    next: Option<&Marker>,
) -> Option<String> {
    let end = next.map_or(cell.len(), |n| n.start);
    let after = cell.get(marker.end..end).unwrap_or("").trim();
    if !after.is_empty() {
        return Some(after.to_string());
    }

    let before = cell.get(..marker.start).unwrap_or("").trim();
    if !before.is_empty() && !RS_MARKER.is_match(before) {
        return Some(before.to_string());
    }

    if !RS_MARKER.replace_all(cell, "").trim().is_empty() {
        return None;
    }

    [col.checked_sub(1), Some(col + 1), Some(0)]
        .into_iter()
        .flatten()
        .filter(|&c| c != col)
        .filter_map(|c| grid.cell(row, c))
        .map(str::trim)
        .find(|text| !text.is_empty() && !RS_MARKER.replace_all(text, "").trim().is_empty())
        .map(str::to_string)
}

/// Body of a Dialect-A cell split from its trailing metadata lines
#[derive(Debug, Clone, PartialEq, Default)]
struct CellMetadata {
    requirement_raw: String,
    verification_method: Option<String>,
    conflicts: Vec<String>,
}

impl CellMetadata {
    fn parse(body: &str) -> Self {
        let lines: Vec<&str> = body.lines().map(str::trim).collect();
        let is_metadata = |line: &str| {
            let lower = line.to_lowercase();
            METADATA_PREFIXES.iter().any(|p| lower.starts_with(p))
        };

        let content_end = lines.iter().position(|l| is_metadata(l)).unwrap_or(lines.len());
        let content: Vec<&str> = lines[..content_end]
            .iter()
            .copied()
            .filter(|l| !l.is_empty())
            .collect();
        let requirement_raw = if content.is_empty() {
            lines.first().copied().unwrap_or("").to_string()
        } else {
            content.join("\n")
        };

        let mut meta = Self {
            requirement_raw,
            ..Self::default()
        };
        for line in &lines[content_end..] {
            if let Some(value) = strip_prefix_ci(line, "verification method:") {
                let value = value.trim().trim_end_matches(['.', ' ']);
                if !value.is_empty() {
                    meta.verification_method = Some(value.to_string());
                }
            } else if let Some(value) = strip_prefix_ci(line, "conflicts:") {
                let value = value.trim();
                if !matches!(value.to_lowercase().as_str(), "" | "none" | "-" | "n/a") {
                    meta.conflicts = value
                        .split([',', ';'])
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }
        }
        meta
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}
