//! Typed scalar values for parameters and measurements
//!
//! [`Value`] is a closed tagged union: every variant carries its own
//! [`TypeTag`], so the tag can never disagree with the payload. Parameter
//! candidates are declared as strings and parsed with [`Value::parse`]
//! according to the field's declared tag.
//!
//! # Ordering
//!
//! - Same tag: natural order (floats by `total_cmp`), null sorts last
//! - Different numeric tags: numeric order after widening
//! - Otherwise (or on a numeric tie): stable FNV hash of the tag name

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hasher;
use thiserror::Error;

/// Declared type of a parameter field or measurement value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    String,
}

impl TypeTag {
    /// Lower-case name used in messages and output formats
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Byte => "byte",
            TypeTag::Short => "short",
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Bool => "bool",
            TypeTag::Char => "char",
            TypeTag::String => "string",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            TypeTag::Byte | TypeTag::Short | TypeTag::Int | TypeTag::Long
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, TypeTag::Float | TypeTag::Double)
    }

    /// FNV-1a hash of the tag name; identical across runs and platforms
    pub fn stable_hash(self) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write(self.name().as_bytes());
        hasher.finish()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A string could not be parsed into the requested type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse '{value}' as {tag}")]
pub struct ParseValueError {
    pub tag: TypeTag,
    pub value: String,
}

/// Immutable typed scalar, or a typed null
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    String(String),
    Null(TypeTag),
}

impl Value {
    /// Parse a candidate string into a value of the given type
    ///
    /// Numeric and boolean input is trimmed first. A `char` takes the first
    /// character of the string. For strings, `null` and `(null)` produce
    /// [`Value::Null`].
    ///
    /// # Example
    /// ```
    /// use regla::value::{TypeTag, Value};
    ///
    /// assert_eq!(Value::parse(TypeTag::Int, "42").unwrap(), Value::Int(42));
    /// assert!(Value::parse(TypeTag::Int, "forty-two").is_err());
    /// ```
    pub fn parse(tag: TypeTag, s: &str) -> Result<Value, ParseValueError> {
        let err = || ParseValueError {
            tag,
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let value = match tag {
            TypeTag::Byte => Value::Byte(trimmed.parse().map_err(|_| err())?),
            TypeTag::Short => Value::Short(trimmed.parse().map_err(|_| err())?),
            TypeTag::Int => Value::Int(trimmed.parse().map_err(|_| err())?),
            TypeTag::Long => Value::Long(trimmed.parse().map_err(|_| err())?),
            TypeTag::Float => Value::Float(trimmed.parse().map_err(|_| err())?),
            TypeTag::Double => Value::Double(trimmed.parse().map_err(|_| err())?),
            TypeTag::Bool => Value::Bool(trimmed.parse().map_err(|_| err())?),
            TypeTag::Char => Value::Char(s.chars().next().ok_or_else(err)?),
            TypeTag::String => match s {
                "null" | "(null)" => Value::Null(TypeTag::String),
                _ => Value::String(s.to_string()),
            },
        };
        Ok(value)
    }

    /// Type tag of the stored variant
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Byte(_) => TypeTag::Byte,
            Value::Short(_) => TypeTag::Short,
            Value::Int(_) => TypeTag::Int,
            Value::Long(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Float,
            Value::Double(_) => TypeTag::Double,
            Value::Bool(_) => TypeTag::Bool,
            Value::Char(_) => TypeTag::Char,
            Value::String(_) => TypeTag::String,
            Value::Null(tag) => *tag,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Integer payload widened to `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// `tag:value` rendering, e.g. `int:5` or `string:(null)`
    pub fn describe(&self) -> String {
        format!("{}:{}", self.tag(), self)
    }

    fn cmp_same_tag(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null(_), Value::Null(_)) => Ordering::Equal,
            (Value::Null(_), _) => Ordering::Greater,
            (_, Value::Null(_)) => Ordering::Less,
            (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
            (Value::Short(a), Value::Short(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    fn cmp_widened(&self, other: &Value) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            return Some(a.cmp(&b));
        }
        let (a, b) = (self.as_f64()?, other.as_f64()?);
        Some(a.total_cmp(&b))
    }
}

fn cmp_tags(a: TypeTag, b: TypeTag) -> Ordering {
    a.stable_hash()
        .cmp(&b.stable_hash())
        .then_with(|| a.cmp(&b))
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.tag(), other.tag());
        if a == b {
            return self.cmp_same_tag(other);
        }
        // Non-null numbers sort before everything else so that widening
        // stays transitive across mixed tags
        match (self.cmp_widened(other), self.as_f64(), other.as_f64()) {
            (Some(ordering), _, _) => ordering.then_with(|| cmp_tags(a, b)),
            (None, Some(_), None) => Ordering::Less,
            (None, None, Some(_)) => Ordering::Greater,
            _ => cmp_tags(a, b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Null(_) => f.write_str("(null)"),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar!(
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    char => Char,
    String => String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
