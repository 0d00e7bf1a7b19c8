//! Parameter space generation
//!
//! A benchmark unit declares an ordered list of [`ParameterField`]s. Each
//! field carries string-encoded candidates which are parsed into [`Value`]s
//! using the field's [`TypeTag`]. The [`ParameterSpace`] is the cartesian
//! product of all candidate lists, laid out like an odometer: the rightmost
//! field varies fastest.

use crate::error::{BenchError, Result};
use crate::value::{TypeTag, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Product of cardinalities after `hold`
///
/// With `hold = None` this is the total number of rows. With `hold = Some(k)`
/// it is the number of consecutive rows that share the value of column `k`,
/// i.e. `Π_{i>k} c_i`. The empty product is 1.
///
/// # Example
/// ```
/// use regla::params::euclidean_product;
///
/// assert_eq!(euclidean_product(&[3, 4, 2], None), 24);
/// assert_eq!(euclidean_product(&[3, 4, 2], Some(0)), 8);
/// assert_eq!(euclidean_product(&[3, 4, 2], Some(2)), 1);
/// ```
pub fn euclidean_product(cardinality: &[usize], hold: Option<usize>) -> usize {
    let start = hold.map_or(0, |k| k + 1);
    cardinality.iter().skip(start).product()
}

/// A named, typed slot swept across a list of candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterField {
    pub name: String,
    pub tag: TypeTag,
    pub candidates: Vec<String>,
}

impl ParameterField {
    pub fn new<I, S>(name: impl Into<String>, tag: TypeTag, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tag,
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse every candidate with the field's declared type
    pub fn parse_candidates(&self) -> Result<Vec<Value>> {
        if self.candidates.is_empty() {
            return Err(BenchError::EmptyParameterField {
                field: self.name.clone(),
            });
        }
        self.candidates
            .iter()
            .map(|candidate| {
                Value::parse(self.tag, candidate).map_err(|e| BenchError::InvalidParameterValue {
                    field: self.name.clone(),
                    value: e.value,
                    tag: e.tag.to_string(),
                })
            })
            .collect()
    }
}

/// Replace the candidate lists of the named fields
///
/// Fails with [`BenchError::UnknownParameter`] if an override names a field
/// that is not declared.
pub fn apply_overrides(
    fields: &mut [ParameterField],
    overrides: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    for (name, candidates) in overrides {
        let field = fields
            .iter_mut()
            .find(|f| &f.name == name)
            .ok_or_else(|| BenchError::UnknownParameter { name: name.clone() })?;
        field.candidates = candidates.clone();
    }
    Ok(())
}

/// One assignment of a value to every field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRow {
    index: usize,
    values: Vec<(String, Value)>,
}

impl ParameterRow {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value assigned to `field`, if it exists
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for ParameterRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", name, value)?;
        }
        Ok(())
    }
}

/// The full cartesian product of a unit's parameter fields
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    fields: Vec<ParameterField>,
    rows: Vec<ParameterRow>,
}

impl ParameterSpace {
    /// Parse all candidates and generate every row
    pub fn new(fields: Vec<ParameterField>) -> Result<Self> {
        let columns = fields
            .iter()
            .map(ParameterField::parse_candidates)
            .collect::<Result<Vec<_>>>()?;
        let cardinality: Vec<usize> = columns.iter().map(Vec::len).collect();
        let strides: Vec<usize> = (0..columns.len())
            .map(|j| euclidean_product(&cardinality, Some(j)))
            .collect();

        let total = euclidean_product(&cardinality, None);
        let rows = (0..total)
            .map(|index| {
                let values = fields
                    .iter()
                    .zip(&columns)
                    .zip(&strides)
                    .map(|((field, column), stride)| {
                        let pick = (index / stride) % column.len();
                        (field.name.clone(), column[pick].clone())
                    })
                    .collect();
                ParameterRow { index, values }
            })
            .collect();

        Ok(Self { fields, rows })
    }

    /// Like [`ParameterSpace::new`] with candidate overrides applied first
    pub fn with_overrides(
        mut fields: Vec<ParameterField>,
        overrides: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        apply_overrides(&mut fields, overrides)?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[ParameterField] {
        &self.fields
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cardinality(&self) -> Vec<usize> {
        self.fields.iter().map(|f| f.candidates.len()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, candidates: &[&str]) -> ParameterField {
        ParameterField::new(name, TypeTag::Int, candidates.iter().copied())
    }

    #[test]
    fn test_euclidean_product_hold_index() {
        let c = [3, 4, 2];
        assert_eq!(euclidean_product(&c, None), 24);
        assert_eq!(euclidean_product(&c, Some(0)), 8);
        assert_eq!(euclidean_product(&c, Some(1)), 2);
        assert_eq!(euclidean_product(&c, Some(2)), 1);
        assert_eq!(euclidean_product(&[], None), 1);
    }

    #[test]
    fn test_zero_fields_yield_one_empty_row() {
        let space = ParameterSpace::new(Vec::new()).unwrap();
        assert_eq!(space.len(), 1);
        assert!(space.rows()[0].is_empty());
        assert_eq!(space.rows()[0].to_string(), "");
    }

    #[test]
    fn test_rightmost_field_varies_fastest() {
        let space =
            ParameterSpace::new(vec![field("a", &["1", "2"]), field("b", &["10", "20", "30"])])
                .unwrap();
        let rendered: Vec<String> = space.rows().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "a:1,b:10", "a:1,b:20", "a:1,b:30", "a:2,b:10", "a:2,b:20", "a:2,b:30",
            ]
        );
        assert_eq!(space.rows()[4].index(), 4);
        assert_eq!(space.rows()[4].get("b"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_invalid_candidate_is_reported() {
        let err = ParameterSpace::new(vec![field("number", &["5", "five"])]).unwrap_err();
        match err {
            BenchError::InvalidParameterValue { field, value, tag } => {
                assert_eq!(field, "number");
                assert_eq!(value, "five");
                assert_eq!(tag, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_candidate_list_is_rejected() {
        let err = ParameterSpace::new(vec![field("number", &[])]).unwrap_err();
        assert!(matches!(err, BenchError::EmptyParameterField { .. }));
    }

    #[test]
    fn test_overrides_replace_candidates() {
        let mut overrides = BTreeMap::new();
        overrides.insert("number".to_string(), vec!["7".to_string(), "8".to_string()]);
        let space =
            ParameterSpace::with_overrides(vec![field("number", &["1", "2", "3"])], &overrides)
                .unwrap();
        assert_eq!(space.len(), 2);
        assert_eq!(space.rows()[1].get("number"), Some(&Value::Int(8)));
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("missing".to_string(), vec!["1".to_string()]);
        let err = ParameterSpace::with_overrides(vec![field("number", &["1"])], &overrides)
            .unwrap_err();
        assert!(matches!(err, BenchError::UnknownParameter { name } if name == "missing"));
    }
}
