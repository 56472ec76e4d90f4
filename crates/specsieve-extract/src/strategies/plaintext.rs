//! Plaintext fallback: identifier lines in a flat text export

use regex::Regex;
use specsieve_core::{Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use std::sync::LazyLock;

use super::RequirementDraft;
use crate::strategy::{SegmentationContext, SegmentationStrategy};

static ID_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){3,6}\s*$").expect("valid plaintext id regex"));

/// An identifier on its own line, an optional feature line, then a paragraph
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextStrategy;

impl SegmentationStrategy for PlaintextStrategy {
    fn name(&self) -> &'static str {
        "plaintext"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let text = ctx.document.plaintext();
        // Only trailing whitespace is dropped; an indented number is prose
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let lookahead = ctx.settings.plaintext_lookahead_lines;
        let mut requirements = Vec::new();

        let mut i = 0;
        while i < lines.len() {
            if !is_id_line(lines[i]) {
                i += 1;
                continue;
            }
            let raw_id = lines[i];
            let id_line = i;
            let mut j = skip_blank(&lines, i + 1);

            let feature = match lines.get(j) {
                Some(line) if !is_id_line(line) => {
                    j += 1;
                    line.trim()
                }
                _ => "",
            };

            let start = j;
            let mut paragraph: Vec<&str> = Vec::new();
            while j < lines.len() && j - start < lookahead {
                let line = lines[j];
                if is_id_line(line) {
                    break;
                }
                if line.trim().is_empty() {
                    let next = skip_blank(&lines, j);
                    if lines.get(next).is_some_and(|l| is_id_line(l)) {
                        j = next;
                        break;
                    }
                } else if !is_checkbox_line(line) {
                    paragraph.push(line.trim());
                }
                j += 1;
            }
            i = j.max(id_line + 1);

            let body = if paragraph.is_empty() {
                feature.to_string()
            } else {
                paragraph.join(" ")
            };
            if body.is_empty() {
                continue;
            }

            let subject = if feature.is_empty() {
                ctx.settings.fallback_subject.clone()
            } else {
                feature.to_string()
            };
            let parent = raw_id.rsplit_once('.').map_or(raw_id, |(parent, _)| parent);
            let tags = if feature.is_empty() {
                Vec::new()
            } else {
                vec![feature.to_string()]
            };
            let line = id_line + 1;

            requirements.push(
                RequirementDraft::new(
                    format!("TPS:{raw_id}"),
                    body,
                    subject,
                    SourceAnchor::PlaintextLine { line },
                    SourceType::PlaintextBlock,
                    SourceLocation::line(line),
                )
                .section_path(vec![parent.to_string()])
                .tags(tags)
                .build(&ctx.meta),
            );
        }

        Ok(requirements)
    }
}

fn is_id_line(line: &str) -> bool {
    ID_LINE.is_match(line)
}

fn is_checkbox_line(line: &str) -> bool {
    line.chars().all(|c| c == '☐' || c == '☒' || c.is_whitespace())
}

fn skip_blank(lines: &[&str], mut index: usize) -> usize {
    while lines.get(index).is_some_and(|l| l.trim().is_empty()) {
        index += 1;
    }
    index
}
