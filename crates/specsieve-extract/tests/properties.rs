//! Property tests over generated documents

use proptest::prelude::*;
use specsieve_core::{Block, DocMeta, Document, DocumentInput, Table};
use specsieve_extract::normalize_rs_uid;
use specsieve_extract::semantics::canonicalize;
use specsieve_extract::Extractor;
use std::collections::HashSet;

fn sentence() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "The stator shall be class F.",
        "Cooling water below 30 °C.",
        "Enclosure IP55 per IEC 60034-5",
        "The supplier must deliver drawings",
        "1.8",
        "Voltage 11 kV +/- 5 %",
        "",
    ])
    .prop_map(str::to_string)
}

fn rs_paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec((1u32..60, 0u32..3, sentence()), 1..8).prop_map(|items| {
        items
            .into_iter()
            .map(|(main, sub, text)| format!("#{main:03}.{sub} {text}"))
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn tps_table() -> impl Strategy<Value = String> {
    prop::collection::vec(((1u32..5, 1u32..5, 1u32..9), sentence()), 0..12).prop_map(|rows| {
        let mut csv = String::from("ID,Requirement,USL\n");
        for ((a, b, c), text) in rows {
            csv.push_str(&format!("{a}.{b}.{c},\"{text}\",2.5\n"));
        }
        csv
    })
}

fn input() -> impl Strategy<Value = DocumentInput> {
    (
        prop::collection::vec(rs_paragraph(), 0..4),
        tps_table(),
        prop::option::of(prop::sample::select(vec!["RS-100.pdf", "TPS-200.pdf", "scope.docx"])),
    )
        .prop_map(|(paragraphs, csv, filename)| {
            let blocks = paragraphs.into_iter().map(Block::paragraph).collect();
            let mut input = DocumentInput::new(Document::new(blocks), DocMeta::new("p", "P"))
                .with_table("table_1", Table::from_csv(csv));
            input.filename = filename.map(str::to_string);
            input
        })
}

proptest! {
    #[test]
    fn prop_uids_are_unique(input in input()) {
        let outcome = Extractor::default().extract(&input);
        let unique: HashSet<&str> = outcome
            .requirements
            .iter()
            .map(|r| r.requirement_uid.as_str())
            .collect();
        prop_assert_eq!(unique.len(), outcome.requirements.len());
    }

    #[test]
    fn prop_extraction_is_deterministic(input in input()) {
        let extractor = Extractor::default();
        let first = extractor.extract(&input);
        let second = extractor.extract(&input);
        prop_assert_eq!(first.profile, second.profile);
        prop_assert_eq!(first.requirements, second.requirements);
    }

    #[test]
    fn prop_stubs_carry_no_criteria_or_references(input in input()) {
        let outcome = Extractor::default().extract(&input);
        for requirement in outcome.requirements.iter().filter(|r| r.is_stub) {
            prop_assert!(requirement.acceptance_criteria.is_empty());
            prop_assert!(requirement.references.is_empty());
        }
    }

    #[test]
    fn prop_rs_uid_spacing_variants(main in 0u32..1000, sub in 0u32..10, spaces in 0usize..3) {
        let padding = " ".repeat(spaces);
        let expected = format!("#{main:03}.{sub}");
        prop_assert_eq!(normalize_rs_uid(&format!("#{padding}{main}.{sub}")), Some(expected.clone()));
        prop_assert_eq!(normalize_rs_uid(&format!("#{main:03}.{sub}")), Some(expected));
    }

    #[test]
    fn prop_canonicalize_is_idempotent(subject in "[a-z]{3,10}", raw in "[A-Za-z ]{1,40}") {
        let once = canonicalize(&subject, &raw);
        prop_assert_eq!(canonicalize(&subject, &once), once.clone());
    }
}
