//! Writers for the extraction artifacts of one document

use anyhow::{Context, Result};
use specsieve_core::{write_jsonl, write_tabular};
use specsieve_extract::ExtractionOutcome;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const REQUIREMENTS_JSONL: &str = "requirements.jsonl";
pub const REQUIREMENTS_CSV: &str = "requirements.csv";
pub const COVERAGE_JSON: &str = "coverage.json";

/// Files written for one document
#[derive(Debug, Default)]
pub struct WrittenFiles {
    pub jsonl: PathBuf,
    pub csv: PathBuf,
    pub coverage: Option<PathBuf>,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_outputs(outcome: &ExtractionOutcome, dir: &Path, audit: bool) -> Result<WrittenFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let jsonl = dir.join(REQUIREMENTS_JSONL);
    write_jsonl(&outcome.requirements, create(&jsonl)?)
        .with_context(|| format!("writing {}", jsonl.display()))?;

    let csv = dir.join(REQUIREMENTS_CSV);
    write_tabular(&outcome.requirements, create(&csv)?)
        .with_context(|| format!("writing {}", csv.display()))?;

    let coverage = if audit {
        let path = dir.join(COVERAGE_JSON);
        let mut writer = create(&path)?;
        serde_json::to_writer_pretty(&mut writer, &outcome.coverage())
            .with_context(|| format!("writing {}", path.display()))?;
        writer.flush()?;
        Some(path)
    } else {
        None
    };

    Ok(WrittenFiles {
        jsonl,
        csv,
        coverage,
    })
}
