//! CSV output format for benchmark trials
//!
//! One row per measurement, for spreadsheet analysis and machine parsing.

use crate::error::Result;
use crate::sink::ResultSink;
use crate::trial::Trial;
use std::io::Write;

const HEADER: &str = "trial_id,name,unit,method,kind,measurement,type,value";

/// CSV record for a single measurement
#[derive(Debug, Clone, PartialEq)]
pub struct CsvMeasurement {
    pub trial_id: String,
    pub name: String,
    pub unit: String,
    pub method: String,
    pub kind: String,
    pub measurement: String,
    pub tag: String,
    pub value: String,
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<CsvMeasurement>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one row per measurement of `trial`
    pub fn add_trial(&mut self, trial: &Trial) {
        let name = trial.name();
        for m in trial.measurements() {
            self.rows.push(CsvMeasurement {
                trial_id: trial.id().to_string(),
                name: name.clone(),
                unit: trial.unit().to_string(),
                method: trial.method().to_string(),
                kind: trial.kind().to_string(),
                measurement: m.description.clone(),
                tag: m.value.tag().to_string(),
                value: m.value.to_string(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &CsvMeasurement) -> String {
        [
            &row.trial_id,
            &row.name,
            &row.unit,
            &row.method,
            &row.kind,
            &row.measurement,
            &row.tag,
            &row.value,
        ]
        .iter()
        .map(|field| Self::escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(HEADER);
        output.push('\n');
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }
        output
    }
}

/// Sink writing a [`CsvOutput`] table to `out` on close
pub struct CsvSink<W: Write> {
    out: W,
    output: CsvOutput,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            output: CsvOutput::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        self.output.add_trial(trial);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.write_all(self.output.to_csv().as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
