//! Conservative strategy for documents the classifier could not place

use regex::Regex;
use specsieve_core::{Requirement, Result, SourceAnchor, SourceLocation, SourceType};
use std::sync::LazyLock;

use super::RequirementDraft;
use crate::strategy::{SegmentationContext, SegmentationStrategy};

static HASH_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)\.(\d+)").expect("valid hash number regex"));

const SUBJECT: &str = "generic";

/// `#N.M` markers in any block, text kept as written
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackStrategy;

impl SegmentationStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn segment(&self, ctx: &SegmentationContext<'_>) -> Result<Vec<Requirement>> {
        let mut requirements = Vec::new();

        for (block_index, block) in ctx.document.blocks.iter().enumerate() {
            let text = block.text();
            let matches: Vec<_> = HASH_NUMBER.captures_iter(text).collect();

            for (i, caps) in matches.iter().enumerate() {
                let (Some(whole), Ok(main)) = (caps.get(0), caps[1].parse::<u64>()) else {
                    continue;
                };
                let end = matches
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map_or(text.len(), |m| m.start());
                let body = text[whole.end()..end].trim();
                if body.is_empty() {
                    continue;
                }

                let number = format!("#{main}.{}", &caps[2]);
                requirements.push(
                    RequirementDraft::new(
                        format!("GEN:{number}"),
                        body,
                        SUBJECT,
                        SourceAnchor::Text {
                            reference: number,
                        },
                        SourceType::Text,
                        SourceLocation {
                            offset: Some(whole.start()),
                            ..SourceLocation::block(block_index)
                        },
                    )
                    .literal()
                    .build(&ctx.meta),
                );
            }
        }

        Ok(requirements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentationSettings;
    use crate::markers::MarkerIndex;
    use crate::tables::TableSet;
    use specsieve_core::{Block, DocMeta, Document};
    use std::sync::Arc;

    #[test]
    fn test_generic_uids_and_literal_bodies() {
        let document = Document::new(vec![
            Block::heading(1, "#12.0 Scope of supply"),
            Block::paragraph("#045.1 cooling water 30 °C #046.0"),
            Block::paragraph("# 47.0 spaced markers are ignored"),
        ]);
        let tables = TableSet::default();
        let markers = MarkerIndex::default();
        let settings = SegmentationSettings::default();
        let ctx = SegmentationContext::new(
            &document,
            &tables,
            &markers,
            Arc::new(DocMeta::default()),
            &settings,
        );

        let reqs = FallbackStrategy.segment(&ctx).unwrap();
        let uids: Vec<&str> = reqs.iter().map(|r| r.requirement_uid.as_str()).collect();
        assert_eq!(uids, vec!["GEN:#12.0", "GEN:#45.1"]);
        assert_eq!(reqs[1].canonical_statement, "cooling water 30 °C");
        assert_eq!(reqs[1].normative_strength, None);
        assert_eq!(reqs[1].subject, "generic");
        assert_eq!(
            reqs[1].source_anchor,
            SourceAnchor::Text {
                reference: "#45.1".to_string()
            }
        );
    }
}
