//! The comparable scalar values a document contributes to a sort criterion.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mapping::FieldType;
use crate::{Result, SortError};

/// One extracted comparable scalar.
///
/// Numeric variants compare across each other (an `I64` and an `F64` compare
/// as floats); strings compare bytewise. A string never compares equal to a
/// number — mixed comparisons order all numbers before all strings so that
/// the ordering stays total even on heterogeneous input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
    /// 64-bit signed integer.
    I64(i64),
    /// 64-bit float.
    F64(f64),
    /// String, compared bytewise.
    Str(String),
}

impl SortValue {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            SortValue::I64(v) => Some(*v as f64),
            SortValue::F64(v) => Some(*v),
            SortValue::Str(_) => None,
        }
    }

    /// Total order over sort values. NaN sorts after every other number.
    pub fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::I64(lhs), SortValue::I64(rhs)) => lhs.cmp(rhs),
            (SortValue::Str(lhs), SortValue::Str(rhs)) => lhs.cmp(rhs),
            (SortValue::Str(_), _) => Ordering::Greater,
            (_, SortValue::Str(_)) => Ordering::Less,
            (lhs, rhs) => {
                let lhs = lhs.as_f64().unwrap();
                let rhs = rhs.as_f64().unwrap();
                total_cmp_f64(lhs, rhs)
            }
        }
    }

    /// Coerces a literal value (from a `missing` clause) to the scalar type
    /// of the target field. Numeric strings are accepted for numeric fields.
    pub(crate) fn coerce_to(self, field_type: FieldType, field: &str) -> Result<SortValue> {
        let reject = |value: &SortValue| SortError::Coercion {
            field: field.to_string(),
            reason: format!("cannot coerce {value:?} to type [{}]", field_type.name()),
        };
        match field_type {
            FieldType::Long => match &self {
                SortValue::I64(_) => Ok(self),
                SortValue::F64(v) if v.fract() == 0.0 => Ok(SortValue::I64(*v as i64)),
                SortValue::Str(s) => s
                    .parse::<i64>()
                    .map(SortValue::I64)
                    .map_err(|_| reject(&self)),
                _ => Err(reject(&self)),
            },
            // Geo distances compare as doubles, so both take the same coercion.
            FieldType::Double | FieldType::GeoPoint => match &self {
                SortValue::I64(v) => Ok(SortValue::F64(*v as f64)),
                SortValue::F64(_) => Ok(self),
                SortValue::Str(s) => s
                    .parse::<f64>()
                    .map(SortValue::F64)
                    .map_err(|_| reject(&self)),
            },
            FieldType::Keyword => match self {
                SortValue::Str(_) => Ok(self),
                other => Err(reject(&other)),
            },
        }
    }

    /// Converts a JSON literal into a sort value. Objects and arrays are not
    /// scalars and are rejected.
    pub(crate) fn from_json(value: &Value) -> Option<SortValue> {
        match value {
            Value::Number(number) => {
                if let Some(v) = number.as_i64() {
                    Some(SortValue::I64(v))
                } else {
                    number.as_f64().map(SortValue::F64)
                }
            }
            Value::String(text) => Some(SortValue::Str(text.clone())),
            _ => None,
        }
    }
}

pub(crate) fn total_cmp_f64(lhs: f64, rhs: f64) -> Ordering {
    lhs.partial_cmp(&rhs).unwrap_or_else(|| {
        // NaN last, NaN == NaN.
        match (lhs.is_nan(), rhs.is_nan()) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        }
    })
}

/// The single comparable value a document contributes to one sort criterion,
/// or the sentinel for "this document has no value here".
///
/// Keeping `Missing` as its own variant (instead of a sentinel value of the
/// field's own type) removes the ambiguity between "a real value that happens
/// to equal the sentinel" and "genuinely missing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReducedValue {
    /// The document contributed this value.
    Value(SortValue),
    /// The document has no value for the criterion; placement is decided by
    /// the missing-value policy.
    Missing,
}

impl ReducedValue {
    /// True for the `Missing` sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, ReducedValue::Missing)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{ReducedValue, SortValue};
    use crate::mapping::FieldType;

    #[test]
    fn test_cross_numeric_comparison() {
        assert_eq!(
            SortValue::I64(2).compare(&SortValue::F64(2.5)),
            Ordering::Less
        );
        assert_eq!(
            SortValue::F64(2.0).compare(&SortValue::I64(2)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_nan_sorts_last() {
        assert_eq!(
            SortValue::F64(f64::NAN).compare(&SortValue::F64(1e300)),
            Ordering::Greater
        );
    }

    #[test]
    fn test_string_comparison() {
        assert_eq!(
            SortValue::Str("abc".into()).compare(&SortValue::Str("abd".into())),
            Ordering::Less
        );
        // Numbers order before strings.
        assert_eq!(
            SortValue::I64(9).compare(&SortValue::Str("1".into())),
            Ordering::Less
        );
    }

    #[test]
    fn test_literal_coercion() {
        assert_eq!(
            SortValue::Str("42".into())
                .coerce_to(FieldType::Long, "f")
                .unwrap(),
            SortValue::I64(42)
        );
        assert_eq!(
            SortValue::I64(2).coerce_to(FieldType::Double, "f").unwrap(),
            SortValue::F64(2.0)
        );
        assert!(SortValue::Str("abc".into())
            .coerce_to(FieldType::Long, "f")
            .is_err());
        assert!(SortValue::I64(1).coerce_to(FieldType::Keyword, "f").is_err());
    }

    #[test]
    fn test_missing_sentinel() {
        assert!(ReducedValue::Missing.is_missing());
        assert!(!ReducedValue::Value(SortValue::I64(0)).is_missing());
    }
}
