//! End-to-end extraction scenarios

use specsieve_core::{
    Block, Comparator, DocMeta, DocType, Document, DocumentInput, NormativeStrength, Table,
};
use specsieve_extract::markers::MarkerKind;
use specsieve_extract::{normalize_rs_uid, CoverageReport, ExtractionConfig, Extractor, MarkerIndex};
use std::collections::HashSet;

fn meta() -> DocMeta {
    DocMeta::new("doc-1", "Generator specification")
}

fn rs_document(blocks: Vec<Block>) -> DocumentInput {
    DocumentInput::new(Document::new(blocks), meta())
}

fn uids(outcome: &specsieve_extract::ExtractionOutcome) -> Vec<&str> {
    outcome
        .requirements
        .iter()
        .map(|r| r.requirement_uid.as_str())
        .collect()
}

#[test]
fn test_paragraph_segmentation() {
    let input = rs_document(vec![Block::paragraph(
        "#001.0 First req. #002.0 Second req, must be good.",
    )]);
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Rs);
    assert_eq!(uids(&outcome), vec!["RS:#001.0", "RS:#002.0"]);
    assert_eq!(outcome.requirements[0].requirement_raw, "First req.");
    assert_eq!(outcome.requirements[1].requirement_raw, "Second req, must be good.");
    assert_eq!(
        outcome.requirements[1].normative_strength,
        Some(NormativeStrength::Must)
    );
}

#[test]
fn test_id_table_with_upper_bound() {
    let input = DocumentInput::new(Document::default(), meta()).with_table(
        "table_1",
        Table::from_csv(
            "ID,Subject,Requirement,Unit,LSL,Target,USL\n4.1.2.7,generator,Maximum allowed RMS vibration level,mm/s,,,1.8\n",
        ),
    );
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Tps);
    assert_eq!(outcome.requirements.len(), 1);
    let req = &outcome.requirements[0];
    assert!(req.requirement_uid.contains("4.1.2.7"));
    assert_eq!(req.acceptance_criteria.len(), 1);
    let criterion = &req.acceptance_criteria[0];
    assert_eq!(criterion.comparator, Some(Comparator::AtMost));
    assert_eq!(criterion.value, Some(1.8));
    assert_eq!(criterion.unit.as_deref(), Some("mm_per_s"));

    assert_eq!(outcome.id_columns.len(), 1);
    assert_eq!(outcome.id_columns[0].column_name.as_deref(), Some("ID"));
    let phases: Vec<&str> = outcome.phases.iter().map(|p| p.phase.as_str()).collect();
    assert_eq!(phases, vec!["id_table", "plaintext", "markdown", "marker_first"]);
}

#[test]
fn test_hybrid_relabel_from_table_markers() {
    let mut csv = String::from("ID,Requirement,Ref\n");
    for n in 1..=45 {
        csv.push_str(&format!("{n}.0,The unit shall comply with item {n},#{n:03}.0\n"));
    }
    let input = DocumentInput::new(Document::default(), meta())
        .with_table("table_1", Table::from_csv(csv))
        .with_filename("TPS-4711 generator.pdf");
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Rs);
    assert!(outcome.relabelled);
    assert_eq!(outcome.renamespaced, 45);
    assert_eq!(outcome.doc_meta.document_type, Some(DocType::Rs));
    assert_eq!(outcome.requirements[0].requirement_uid, "RS:#001.0");
    assert!(outcome
        .requirements
        .iter()
        .all(|r| r.doc_meta.document_type == Some(DocType::Rs)));
}

#[test]
fn test_obligation_candidate_dominates() {
    let input = rs_document(vec![
        Block::paragraph("#003.0 Stator core lamination stacking factor and sheet thickness"),
        Block::paragraph("#003.0 Core shall be laminated"),
    ]);
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.requirements.len(), 1);
    assert_eq!(outcome.requirements[0].requirement_raw, "Core shall be laminated");
}

#[test]
fn test_marker_uid_normalization() {
    for raw in ["#45.0", "# 45.0", "#045.0"] {
        assert_eq!(normalize_rs_uid(raw).as_deref(), Some("#045.0"));
    }
}

#[test]
fn test_deep_identifiers_are_not_markers() {
    let document = Document::new(vec![Block::paragraph("see 1.2.3.4.5 and 4.1.2")]);
    let index = MarkerIndex::build(
        &document,
        &specsieve_extract::TableSet::default(),
        &ExtractionConfig::default().markers,
    );
    let found: Vec<&str> = index
        .of_kind(MarkerKind::Tps)
        .map(|m| m.uid.as_str())
        .collect();
    assert_eq!(found, vec!["4.1.2"]);
}

#[test]
fn test_tps_fallback_chain() {
    let document = Document::default()
        .with_plain_text("4.1.2.7\nVibration\nThe supplier shall limit vibration.\n")
        .with_markdown(
            "4.1.2.7 - Something else entirely shall happen here\n\n4.1.2.9 - The supplier shall deliver spare parts\n",
        );
    let input = DocumentInput::new(document, meta()).with_filename("TPS generator.pdf");
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Tps);
    assert_eq!(uids(&outcome), vec!["TPS:4.1.2.7", "TPS:4.1.2.9"]);
    assert_eq!(
        outcome.requirements[0].requirement_raw,
        "The supplier shall limit vibration."
    );
    assert!(outcome.phases.iter().all(|p| !p.outcome.is_failed()));
}

#[test]
fn test_rs_coverage_audit() {
    let input = rs_document(vec![Block::paragraph(
        "#001.0 The generator shall start. #003.0 The generator shall stop.",
    )]);
    let outcome = Extractor::default().extract(&input);

    let CoverageReport::Rs(report) = outcome.coverage() else {
        panic!("expected an RS report");
    };
    assert_eq!(report.source_numbers, vec!["1.0", "3.0"]);
    assert_eq!(report.missing_in_source, vec!["2.0"]);
    assert!(report.missing_in_extraction.is_empty());
    assert_eq!(report.coverage_ratio, 1.0);
}

#[test]
fn test_repeated_runs_are_identical() {
    let input = DocumentInput::new(
        Document::new(vec![
            Block::heading(1, "Scope"),
            Block::paragraph("#001.0 The generator shall be class F. #002.0 IP55 per IEC 60034-5."),
            Block::paragraph("Clause 4.1.2 applies."),
        ]),
        meta(),
    )
    .with_table(
        "table_1",
        Table::from_csv("ID,Requirement\n4.1.1,The supplier shall paint\n4.1.2,Delivery by sea\n"),
    );

    let extractor = Extractor::default();
    let first = extractor.extract(&input);
    let second = extractor.extract(&input);

    assert_eq!(first.profile, second.profile);
    assert_eq!(first.requirements, second.requirements);
    assert_eq!(first.markers.markers(), second.markers.markers());

    let unique: HashSet<&str> = uids(&first).into_iter().collect();
    assert_eq!(unique.len(), first.requirements.len());
}

fn phase_names(outcome: &specsieve_extract::ExtractionOutcome) -> Vec<&str> {
    outcome.phases.iter().map(|p| p.phase.as_str()).collect()
}

#[test]
fn test_paragraph_markers_in_tps_document_are_added() {
    let blocks: Vec<Block> = (1..=16)
        .map(|n| Block::paragraph(format!("#{n:03}.0 The pump shall meet the listed duty.")))
        .collect();
    let mut csv = String::from("ID,Requirement\n");
    for n in 1..=40 {
        csv.push_str(&format!("4.1.{n},The supplier shall provide item\n"));
    }
    let input = DocumentInput::new(Document::new(blocks), meta())
        .with_table("table_1", Table::from_csv(csv))
        .with_filename("TPS-200 pump.pdf");
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Tps);
    assert!(!outcome.relabelled);
    assert_eq!(outcome.renamespaced, 0);
    assert_eq!(
        phase_names(&outcome),
        vec!["id_table", "plaintext", "markdown", "marker_first", "rs_marker"]
    );

    assert_eq!(outcome.requirements.len(), 56);
    let (tps, rs) = outcome.requirements.split_at(40);
    assert!(tps.iter().all(|r| r.namespace() == "TPS"
        && r.requirement_raw == "The supplier shall provide item"));
    assert_eq!(tps[0].requirement_uid, "TPS:4.1.1");
    assert_eq!(rs[0].requirement_uid, "RS:#001.0");
    assert_eq!(rs[15].requirement_uid, "RS:#016.0");
    assert!(rs.iter().all(|r| r.requirement_raw == "The pump shall meet the listed duty."));
}

#[test]
fn test_generic_rescue_when_markers_go_unresolved() {
    let mut measurements = String::from("Frequency,Pressure,Temperature\n");
    for n in 1..=20 {
        measurements.push_str(&format!("5{n}.0 Hz,1.{n} bar,2{n}.5 C\n"));
    }
    let spec = "ID,Subject,Requirement,Unit,LSL,Target,USL\n\
        4.1.2.7,vibration level,,mm/s,,,1.8\n\
        A-2,pump,The pump shall deliver rated flow,m3/h,10.5,,12.5\n";
    let input = DocumentInput::new(Document::default(), meta())
        .with_table("table_1", Table::from_csv(measurements))
        .with_table("table_2", Table::from_csv(spec));
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Tps);
    assert!(outcome.markers.tps_count() > 50);
    assert_eq!(
        phase_names(&outcome),
        vec!["id_table", "plaintext", "markdown", "marker_first", "generic_table"]
    );
    assert_eq!(uids(&outcome), vec!["TPS:4.1.2.7", "TPS:10.5", "TPS:A-2"]);

    // the ID-table body survives the rescue's empty-bodied row
    assert_eq!(outcome.requirements[0].requirement_raw, "vibration level");
    assert_eq!(outcome.requirements[0].acceptance_criteria.len(), 1);

    let rescued = &outcome.requirements[2];
    assert_eq!(rescued.requirement_raw, "The pump shall deliver rated flow");
    assert_eq!(rescued.subject, "pump");
    assert_eq!(rescued.acceptance_criteria.len(), 2);
}

#[test]
fn test_unterminated_quote_table_still_segments() {
    let input = DocumentInput::new(Document::default(), meta()).with_table(
        "table_1",
        Table::from_csv(
            "ID,Requirement\n4.1.1,\"The supplier shall paint\n4.1.2,The supplier shall deliver spares\n",
        ),
    );
    let outcome = Extractor::default().extract(&input);

    assert_eq!(outcome.doc_type(), DocType::Tps);
    assert_eq!(uids(&outcome), vec!["TPS:4.1.1", "TPS:4.1.2"]);
    assert_eq!(
        outcome.requirements[1].requirement_raw,
        "The supplier shall deliver spares"
    );
    assert_eq!(outcome.id_columns[0].matched_ids, 2);
}
