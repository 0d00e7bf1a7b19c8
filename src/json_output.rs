//! JSON output format for benchmark trials
//!
//! Trials are buffered and written as one document on close.

use crate::benchmark::MethodKind;
use crate::error::Result;
use crate::sink::ResultSink;
use crate::trial::{Measurement, Trial, TrialId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;

/// One parameter assignment of a trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonParameter {
    pub field: String,
    /// Declared type name (e.g., "int", "string")
    #[serde(rename = "type")]
    pub tag: String,
    /// Rendered value; `(null)` for nulls
    pub value: String,
}

/// A single trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonTrial {
    /// Model id shared by all trials of one statistical model
    pub id: TrialId,
    /// `unit.method[field:value,...]`
    pub name: String,
    pub unit: String,
    pub method: String,
    pub kind: MethodKind,
    pub parameters: Vec<JsonParameter>,
    pub measurements: Vec<Measurement>,
}

impl From<&Trial> for JsonTrial {
    fn from(trial: &Trial) -> Self {
        Self {
            id: trial.id(),
            name: trial.name(),
            unit: trial.unit().to_string(),
            method: trial.method().to_string(),
            kind: trial.kind(),
            parameters: trial
                .row()
                .values()
                .map(|(field, value)| JsonParameter {
                    field: field.to_string(),
                    tag: value.tag().to_string(),
                    value: value.to_string(),
                })
                .collect(),
            measurements: trial.measurements().to_vec(),
        }
    }
}

/// Summary counts for the run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Trials written, warnings included
    pub total_trials: usize,
    /// Distinct statistical models
    pub models: usize,
    /// Warning trials
    pub warnings: usize,
}

/// Root JSON output structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    pub trials: Vec<JsonTrial>,
    pub summary: JsonSummary,
}

impl JsonOutput {
    pub fn new(run_name: Option<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "regla-json-v1".to_string(),
            run_name,
            trials: Vec::new(),
            summary: JsonSummary::default(),
        }
    }

    pub fn add_trial(&mut self, trial: &Trial) {
        self.summary.total_trials += 1;
        if trial.is_warning() {
            self.summary.warnings += 1;
        }
        self.trials.push(JsonTrial::from(trial));
        self.summary.models = self
            .trials
            .iter()
            .map(|t| t.id)
            .collect::<BTreeSet<_>>()
            .len();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sink writing a [`JsonOutput`] document to `out` on close
pub struct JsonSink<W: Write> {
    out: W,
    output: JsonOutput,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W, run_name: Option<String>) -> Self {
        Self {
            out,
            output: JsonOutput::new(run_name),
        }
    }

    pub fn output(&self) -> &JsonOutput {
        &self.output
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        self.output.add_trial(trial);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, &self.output)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::MethodSignature;
    use crate::params::{ParameterField, ParameterSpace};
    use crate::trial::{ELAPSED_TIME_NS, WARNING};
    use crate::value::TypeTag;

    fn trial(id: TrialId) -> Trial {
        let space =
            ParameterSpace::new(vec![ParameterField::new("label", TypeTag::String, ["a,b"])])
                .unwrap();
        let sig = MethodSignature {
            name: "run".to_string(),
            kind: MethodKind::Macro,
        };
        let mut t = Trial::new(id, "unit", &sig, &space.rows()[0]);
        t.push(ELAPSED_TIME_NS, 12.5);
        t
    }

    #[test]
    fn test_json_document_shape() {
        let id = TrialId::from_bytes([1; 16]);
        let mut sink = JsonSink::new(Vec::new(), Some("nightly".to_string()));
        sink.process_trial(&trial(id)).unwrap();
        let mut warning = trial(id);
        warning.push(WARNING, "failed");
        sink.process_trial(&warning).unwrap();
        sink.close().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["format"], "regla-json-v1");
        assert_eq!(doc["run_name"], "nightly");
        assert_eq!(doc["summary"]["total_trials"], 2);
        assert_eq!(doc["summary"]["models"], 1);
        assert_eq!(doc["summary"]["warnings"], 1);
        assert_eq!(doc["trials"][0]["name"], "unit.run[label:a,b]");
        assert_eq!(doc["trials"][0]["parameters"][0]["type"], "string");
        assert_eq!(
            doc["trials"][0]["measurements"][0]["value"],
            serde_json::json!({"type": "double", "value": 12.5})
        );
    }

    #[test]
    fn test_json_output_parses_back() {
        let mut output = JsonOutput::new(None);
        output.add_trial(&trial(TrialId::random()));
        let parsed: JsonOutput = serde_json::from_str(&output.to_json().unwrap()).unwrap();
        assert_eq!(parsed, output);
        assert!(!output.to_json().unwrap().contains("run_name"));
    }
}
