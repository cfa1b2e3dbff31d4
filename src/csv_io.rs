// 📑 CSV interchange - import form rows, export full records
// Imported rows only need the input columns; imc/categoria/risco columns
// are ignored and recomputed.

use crate::record::{HealthInput, IdGenerator, Record};
use crate::validation::{describe, validate_input};
use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

/// Outcome of an import: the records built, and the rows rejected.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub records: Vec<Record>,
    /// (line number, reason)
    pub rejected: Vec<(u64, String)>,
}

pub fn load_csv(csv_path: &Path, ids: &IdGenerator) -> Result<ImportReport> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_records(file, ids)
}

pub fn read_records<R: Read>(reader: R, ids: &IdGenerator) -> Result<ImportReport> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let mut report = ImportReport::default();

    for result in rdr.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                warn!(line, error = %e, "Rejected CSV row");
                report.rejected.push((line, e.to_string()));
                continue;
            }
        };
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let input: HealthInput = match row.deserialize(Some(&headers)) {
            Ok(input) => input,
            Err(e) => {
                warn!(line, error = %e, "Rejected CSV row");
                report.rejected.push((line, e.to_string()));
                continue;
            }
        };

        if let Err(errors) = validate_input(&input) {
            warn!(line, errors = %describe(&errors), "Rejected CSV row");
            report.rejected.push((line, describe(&errors)));
            continue;
        }

        report.records.push(Record::new(ids.next_id(), &input));
    }

    Ok(report)
}

pub fn write_csv(csv_path: &Path, records: &[Record]) -> Result<()> {
    let file = std::fs::File::create(csv_path)
        .with_context(|| format!("Failed to create CSV file {}", csv_path.display()))?;
    write_records(file, records)
}

pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record).context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
