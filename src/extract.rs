//! Per-document value extraction: stored source to raw comparable values.

use serde_json::Value;

use crate::doc::{lookup_path, Document};
use crate::geo::parse_points;
use crate::sort::value::SortValue;
use crate::sort::{BoundKind, BoundSortSpec};
use crate::mapping::FieldType;
use crate::{DocId, Result, SortError};

/// One raw value extracted from a document, before multi-value reduction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawValue {
    pub value: SortValue,
    /// Index of the nested child the value came from, when the criterion is
    /// scoped to a nested path.
    #[allow(dead_code)]
    pub child: Option<usize>,
}

impl RawValue {
    fn root(value: SortValue) -> RawValue {
        RawValue { value, child: None }
    }
}

/// Extracts every raw value `doc` contributes to one bound sort criterion.
///
/// Returns an empty vector when the document holds no value for the field; a
/// value that cannot be decoded as the field's mapped type fails the whole
/// partition rather than being silently skipped.
pub(crate) fn extract(doc: &Document, ordinal: DocId, spec: &BoundSortSpec) -> Result<Vec<RawValue>> {
    match &spec.kind {
        BoundKind::Score => Ok(vec![RawValue::root(SortValue::F64(doc.score as f64))]),
        BoundKind::DocOrder => Ok(vec![RawValue::root(SortValue::I64(i64::from(ordinal)))]),
        BoundKind::Unmapped => Ok(Vec::new()),
        BoundKind::Numeric { field, field_type } => {
            extract_leaves(doc, spec, field, |leaf, child| {
                let value = decode_numeric(leaf, *field_type, field)?;
                Ok(RawValue { value, child })
            })
        }
        BoundKind::Keyword { field } => extract_leaves(doc, spec, field, |leaf, child| {
            let Value::String(text) = leaf else {
                return Err(SortError::Coercion {
                    field: field.clone(),
                    reason: format!("expected a string, got {leaf}"),
                });
            };
            Ok(RawValue {
                value: SortValue::Str(text.clone()),
                child,
            })
        }),
        BoundKind::GeoDistance {
            field,
            origins,
            unit,
            algorithm,
        } => {
            let mut raw_values = Vec::new();
            let mut push_points = |leaf: &Value, child: Option<usize>| -> Result<()> {
                let points = parse_points(leaf).map_err(|err| SortError::Coercion {
                    field: field.clone(),
                    reason: err.to_string(),
                })?;
                for point in &points {
                    for origin in origins {
                        raw_values.push(RawValue {
                            value: SortValue::F64(algorithm.distance(origin, point, *unit)),
                            child,
                        });
                    }
                }
                Ok(())
            };
            match (&spec.nested, &spec.child_path) {
                (Some(scope), Some(child_path)) => {
                    for (child_index, child) in scope.children(&doc.source).into_iter().enumerate()
                    {
                        if let Some(leaf) = lookup_geo(child, child_path) {
                            push_points(leaf, Some(child_index))?;
                        }
                    }
                }
                _ => {
                    if let Some(leaf) = lookup_geo(&doc.source, field) {
                        push_points(leaf, None)?;
                    }
                }
            }
            Ok(raw_values)
        }
    }
}

/// Resolves a geo field's value without flattening arrays: a stored
/// `[lon, lat]` pair or a list of point forms must reach the point parser
/// whole.
fn lookup_geo<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    (!current.is_null()).then_some(current)
}

/// Resolves the field's leaves, honoring the nested scope when present, and
/// maps each leaf through `decode`.
fn extract_leaves<F>(
    doc: &Document,
    spec: &BoundSortSpec,
    field: &str,
    mut decode: F,
) -> Result<Vec<RawValue>>
where
    F: FnMut(&Value, Option<usize>) -> Result<RawValue>,
{
    let mut raw_values = Vec::new();
    match (&spec.nested, &spec.child_path) {
        (Some(scope), Some(child_path)) => {
            for (child_index, child) in scope.children(&doc.source).into_iter().enumerate() {
                let mut leaves = Vec::new();
                lookup_path(child, child_path, &mut leaves);
                for leaf in leaves {
                    raw_values.push(decode(leaf, Some(child_index))?);
                }
            }
        }
        _ => {
            let mut leaves = Vec::new();
            lookup_path(&doc.source, field, &mut leaves);
            for leaf in leaves {
                raw_values.push(decode(leaf, None)?);
            }
        }
    }
    Ok(raw_values)
}

fn decode_numeric(leaf: &Value, field_type: FieldType, field: &str) -> Result<SortValue> {
    let reject = || SortError::Coercion {
        field: field.to_string(),
        reason: format!("expected a [{}] value, got {leaf}", field_type.name()),
    };
    let Value::Number(number) = leaf else {
        return Err(reject());
    };
    match field_type {
        FieldType::Long => number
            .as_i64()
            .map(SortValue::I64)
            // Stored doubles with no fractional part decode as longs.
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|v| v.fract() == 0.0)
                    .map(|v| SortValue::I64(v as i64))
            })
            .ok_or_else(reject),
        FieldType::Double => number.as_f64().map(SortValue::F64).ok_or_else(reject),
        _ => Err(reject()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract, RawValue};
    use crate::doc::Document;
    use crate::geo::GeoPoint;
    use crate::mapping::{FieldType, Mapping};
    use crate::sort::value::SortValue;
    use crate::sort::{FieldSort, GeoDistanceSort, SortSpec};
    use crate::SortError;

    fn mapping() -> Mapping {
        Mapping::builder()
            .field("price", FieldType::Double)
            .field("count", FieldType::Long)
            .field("tag", FieldType::Keyword)
            .field("pin", FieldType::GeoPoint)
            .field("offers.price", FieldType::Double)
            .nested("offers")
            .build()
    }

    fn values(raw: Vec<RawValue>) -> Vec<SortValue> {
        raw.into_iter().map(|r| r.value).collect()
    }

    #[test]
    fn test_extract_multi_valued_numeric() {
        let spec = FieldSort::new("count");
        let bound = SortSpec::Field(spec).bind(&mapping()).unwrap();
        let doc = Document::new("1", json!({"count": [3, 1, 2]}));
        assert_eq!(
            values(extract(&doc, 0, &bound).unwrap()),
            vec![SortValue::I64(3), SortValue::I64(1), SortValue::I64(2)]
        );
    }

    #[test]
    fn test_extract_missing_field_is_empty() {
        let bound = SortSpec::field("price").bind(&mapping()).unwrap();
        let doc = Document::new("1", json!({"other": 1}));
        assert!(extract(&doc, 0, &bound).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_value_is_an_evaluation_error() {
        let bound = SortSpec::field("count").bind(&mapping()).unwrap();
        let doc = Document::new("1", json!({"count": "three"}));
        assert!(matches!(
            extract(&doc, 0, &bound).unwrap_err(),
            SortError::Coercion { .. }
        ));
    }

    #[test]
    fn test_keyword_rejects_numbers() {
        let bound = SortSpec::field("tag").bind(&mapping()).unwrap();
        let doc = Document::new("1", json!({"tag": 7}));
        assert!(extract(&doc, 0, &bound).is_err());
    }

    #[test]
    fn test_nested_scope_restricts_leaves() {
        let bound = SortSpec::Field(
            FieldSort::new("offers.price").nested_path("offers"),
        )
        .bind(&mapping())
        .unwrap();
        let doc = Document::new(
            "1",
            json!({"offers": [{"price": 10.0}, {"price": 30.0}]}),
        );
        let raw = extract(&doc, 0, &bound).unwrap();
        assert_eq!(
            raw,
            vec![
                RawValue {
                    value: SortValue::F64(10.0),
                    child: Some(0)
                },
                RawValue {
                    value: SortValue::F64(30.0),
                    child: Some(1)
                },
            ]
        );
    }

    #[test]
    fn test_geo_distance_one_value_per_origin() {
        let origins = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 10.0)];
        let bound = SortSpec::GeoDistance(GeoDistanceSort::new("pin", origins).unwrap())
            .bind(&mapping())
            .unwrap();
        let doc = Document::new("1", json!({"pin": {"lat": 0.0, "lon": 9.0}}));
        let raw = extract(&doc, 0, &bound).unwrap();
        let mut distances: Vec<f64> = raw
            .into_iter()
            .map(|r| match r.value {
                SortValue::F64(d) => d,
                other => panic!("expected a distance, got {other:?}"),
            })
            .collect();
        distances.sort_by(f64::total_cmp);
        // About one degree of longitude at the equator for the closer origin.
        assert_eq!(distances.len(), 2);
        assert!((distances[0] - 111_195.0).abs() < 500.0, "{distances:?}");
    }

    #[test]
    fn test_geo_array_form_is_not_flattened() {
        let bound = SortSpec::GeoDistance(
            GeoDistanceSort::new("pin", vec![GeoPoint::new(40.7143528, -74.0059731)]).unwrap(),
        )
        .bind(&mapping())
        .unwrap();
        let doc = Document::new("1", json!({"pin": [-74.0059731, 40.7143528]}));
        let raw = extract(&doc, 0, &bound).unwrap();
        assert_eq!(raw.len(), 1);
        let SortValue::F64(distance) = raw[0].value else {
            panic!("expected a distance");
        };
        assert!(distance < 1.0, "distance {distance}");
    }

    #[test]
    fn test_score_and_doc_order_extraction() {
        let bound = SortSpec::score().bind(&mapping()).unwrap();
        let doc = Document::with_score("1", 1.5, json!({}));
        assert_eq!(
            values(extract(&doc, 7, &bound).unwrap()),
            vec![SortValue::F64(1.5)]
        );
        let bound = SortSpec::doc_order().bind(&mapping()).unwrap();
        assert_eq!(
            values(extract(&doc, 7, &bound).unwrap()),
            vec![SortValue::I64(7)]
        );
    }

    #[test]
    fn test_unmapped_fallback_extracts_nothing() {
        let bound = SortSpec::Field(FieldSort::new("nope").unmapped_type(FieldType::Long))
            .bind(&mapping())
            .unwrap();
        let doc = Document::new("1", json!({"nope": 3}));
        assert!(extract(&doc, 0, &bound).unwrap().is_empty());
    }
}
