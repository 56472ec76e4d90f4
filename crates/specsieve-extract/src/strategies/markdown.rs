//! Markdown fallback: identifier-led lines in the rendered markdown

use regex::Regex;
use specsieve_core::{Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use std::sync::LazyLock;

use super::RequirementDraft;
use crate::strategy::{SegmentationContext, SegmentationStrategy};

static ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+){3,6})\b").expect("valid markdown id regex"));

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6} \d").expect("valid numbered heading regex"));

static VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(shall|must|will|should)\b").expect("valid verb regex"));

const FEATURE_MAX_WORDS: usize = 6;

/// Identifier at the start of a markdown line, body on the same line or below
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownStrategy;

impl SegmentationStrategy for MarkdownStrategy {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let markdown = ctx.document.markdown_text();
        let lines: Vec<&str> = markdown.lines().map(str::trim).collect();
        let lookahead = ctx.settings.markdown_lookahead_lines;
        let mut requirements = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let Some((raw_id, remainder)) = split_id(line) else {
                continue;
            };

            let (feature, mut body) = if remainder.is_empty() {
                (None, None)
            } else if remainder.split_whitespace().count() <= FEATURE_MAX_WORDS
                && !VERB.is_match(remainder)
            {
                (Some(remainder), None)
            } else {
                (None, Some(remainder.to_string()))
            };

            if body.is_none() {
                let following = collect_following(&lines[i + 1..], lookahead);
                body = following
                    .iter()
                    .find(|l| VERB.is_match(l) || l.split_whitespace().count() > FEATURE_MAX_WORDS)
                    .or_else(|| following.first())
                    .map(|l| l.to_string());
            }
            let Some(body) = body else {
                continue;
            };

            let line_number = i + 1;
            requirements.push(
                RequirementDraft::new(
                    format!("TPS:{raw_id}"),
                    body,
                    ctx.settings.fallback_subject.as_str(),
                    SourceAnchor::MarkdownLine { line: line_number },
                    SourceType::MarkdownLine,
                    SourceLocation::line(line_number),
                )
                .tags(feature.map(str::to_string).into_iter().collect())
                .build(&ctx.meta),
            );
        }

        Ok(requirements)
    }
}

/// Identifier and the rest of the line with separators stripped
fn split_id(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start_matches(['-', '*', ' ', '\t']);
    let id = ID_PREFIX.captures(line)?.get(1)?;
    let remainder = line[id.end()..].trim_matches([' ', '-', ':', '\t']);
    Some((id.as_str(), remainder))
}

/// Lines below an identifier: leading blanks skipped, stops at a blank
/// after content, the next identifier or a numbered heading
fn collect_following<'a>(lines: &[&'a str], lookahead: usize) -> Vec<&'a str> {
    let mut collected = Vec::new();
    for line in lines.iter().take(lookahead) {
        if line.is_empty() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        if split_id(line).is_some() || NUMBERED_HEADING.is_match(line) {
            break;
        }
        collected.push(*line);
    }
    collected
}
