//! Trials and measurements
//!
//! A [`Trial`] is one completed iteration of the statistical loop for a
//! (unit, parameter row, method) combination. All trials of one statistical
//! model share a [`TrialId`]. Trials are handed to the result sink once and
//! never modified afterwards.

use crate::benchmark::{MethodKind, MethodSignature};
use crate::params::ParameterRow;
use crate::value::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Mean elapsed nanoseconds per repetition
pub const ELAPSED_TIME_NS: &str = "elapsed_time_ns";
/// Sample variance of the per-repetition time
pub const VARIANCE_NS: &str = "variance_ns";
/// Repetitions per timed sample
pub const REPS: &str = "reps";
/// Wall-clock start of the trial, epoch milliseconds
pub const TRIAL_START_MS: &str = "trial_start_ms";
/// Monotonic start of the trial
pub const TRIAL_START_NS: &str = "trial_start_ns";
/// Monotonic end of the trial
pub const TRIAL_END_NS: &str = "trial_end_ns";
/// Workload result, kept so the call cannot be optimized away
pub const DUMMY: &str = "dummy";
/// Free-form warning text
pub const WARNING: &str = "warning";

/// Recorded in place of a workload result that was null
pub const NULL_DUMMY: &str = "the dummy was null";

/// Identifier shared by every trial of one statistical model
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrialId([u8; 16]);

impl TrialId {
    /// Fresh random identifier
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrialId({})", self)
    }
}

impl std::str::FromStr for TrialId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for TrialId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TrialId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One named fact about a trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub description: String,
    pub value: Value,
}

impl Measurement {
    pub fn new(description: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            description: description.into(),
            value: value.into(),
        }
    }
}

/// Measurements collected for one (unit, row, method) iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    id: TrialId,
    unit: String,
    method: String,
    kind: MethodKind,
    row: ParameterRow,
    measurements: Vec<Measurement>,
}

impl Trial {
    pub fn new(id: TrialId, unit: &str, method: &MethodSignature, row: &ParameterRow) -> Self {
        Self {
            id,
            unit: unit.to_string(),
            method: method.name.clone(),
            kind: method.kind,
            row: row.clone(),
            measurements: Vec::new(),
        }
    }

    pub fn push(&mut self, description: impl Into<String>, value: impl Into<Value>) {
        self.measurements.push(Measurement::new(description, value));
    }

    pub fn id(&self) -> TrialId {
        self.id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn row(&self) -> &ParameterRow {
        &self.row
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// First measurement with the given description
    pub fn get(&self, description: &str) -> Option<&Value> {
        self.measurements
            .iter()
            .find(|m| m.description == description)
            .map(|m| &m.value)
    }

    pub fn elapsed_time_ns(&self) -> Option<f64> {
        self.get(ELAPSED_TIME_NS).and_then(Value::as_f64)
    }

    pub fn reps(&self) -> Option<i64> {
        self.get(REPS).and_then(Value::as_i64)
    }

    pub fn warning(&self) -> Option<&str> {
        self.get(WARNING).and_then(Value::as_str)
    }

    pub fn is_warning(&self) -> bool {
        self.warning().is_some()
    }

    /// `unit.method[field:value,...]`, brackets omitted without parameters
    pub fn name(&self) -> String {
        if self.row.is_empty() {
            format!("{}.{}", self.unit, self.method)
        } else {
            format!("{}.{}[{}]", self.unit, self.method, self.row)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParameterField, ParameterSpace};
    use crate::value::TypeTag;

    fn sample_trial() -> Trial {
        let space =
            ParameterSpace::new(vec![ParameterField::new("number", TypeTag::Int, ["5"])]).unwrap();
        let method = MethodSignature {
            name: "iterative".to_string(),
            kind: MethodKind::Micro,
        };
        Trial::new(TrialId::random(), "factorial", &method, &space.rows()[0])
    }

    #[test]
    fn test_trial_name_includes_parameters() {
        assert_eq!(sample_trial().name(), "factorial.iterative[number:5]");
    }

    #[test]
    fn test_measurement_lookup() {
        let mut trial = sample_trial();
        trial.push(ELAPSED_TIME_NS, 42.5);
        trial.push(REPS, 1000i64);
        assert_eq!(trial.elapsed_time_ns(), Some(42.5));
        assert_eq!(trial.reps(), Some(1000));
        assert!(!trial.is_warning());
        trial.push(WARNING, "failed");
        assert_eq!(trial.warning(), Some("failed"));
    }

    #[test]
    fn test_trial_id_hex_roundtrip() {
        let id = TrialId::from_bytes([0xab; 16]);
        let text = id.to_string();
        assert_eq!(text, "ab".repeat(16));
        assert_eq!(text.parse::<TrialId>().unwrap(), id);
        assert!("xyz".parse::<TrialId>().is_err());
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(TrialId::random(), TrialId::random());
    }

    #[test]
    fn test_trial_serializes_id_as_hex() {
        let trial = sample_trial();
        let json = serde_json::to_value(&trial).unwrap();
        assert_eq!(json["id"], serde_json::json!(trial.id().to_string()));
        assert_eq!(json["kind"], "micro");
    }
}
