//! Parsing of the JSON request surface into validated [`SortSpec`]s.
//!
//! A sort clause comes in three shapes: a bare field name (`"price"`), a
//! field-to-order object (`{"price": "desc"}`), or a field-to-options object
//! (`{"price": {"order": "desc", "mode": "avg"}}`). The reserved keys
//! `_geo_distance`, `_score` and `_doc` select the non-field sort kinds.
//! Unknown option keys fail the whole request; the legacy `sort_mode` key is
//! reported as deprecated rather than silently accepted.

use std::sync::Arc;

use serde_json::Value;

use crate::geo::{parse_points, DistanceAlgorithm, DistanceUnit};
use crate::mapping::FieldType;
use crate::merge::SortRequest;
use crate::nested::{ChildFilter, TermFilter};
use crate::sort::value::SortValue;
use crate::sort::{
    DocOrderSort, FieldSort, GeoDistanceSort, MissingPolicy, Order, ScoreSort, SortMode, SortSpec,
};
use crate::{Result, SortError};

/// Parses a nested-filter clause into an executable child filter.
///
/// The full query DSL belongs to the query-evaluation layer; it plugs its
/// parser in here. [`TermFilterParser`] covers the `term` clause and is the
/// default.
pub trait FilterParser: Send + Sync {
    /// Parses one filter clause.
    fn parse_filter(&self, clause: &Value) -> Result<Arc<dyn ChildFilter>>;
}

/// Parses `{"term": {field: value}}` clauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermFilterParser;

impl FilterParser for TermFilterParser {
    fn parse_filter(&self, clause: &Value) -> Result<Arc<dyn ChildFilter>> {
        let term = clause
            .as_object()
            .and_then(|object| object.get("term"))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SortError::Validation(format!("expected a [term] filter clause, got {clause}"))
            })?;
        let (field, value) = term.iter().next().ok_or_else(|| {
            SortError::Validation("empty [term] filter clause".to_string())
        })?;
        if term.len() > 1 {
            return Err(SortError::Validation(
                "[term] filter clause supports exactly one field".to_string(),
            ));
        }
        Ok(Arc::new(TermFilter::new(field.clone(), value.clone())))
    }
}

/// Parses sort clauses and whole requests.
pub struct SortParser {
    filter_parser: Arc<dyn FilterParser>,
}

impl Default for SortParser {
    fn default() -> SortParser {
        SortParser {
            filter_parser: Arc::new(TermFilterParser),
        }
    }
}

impl SortParser {
    /// Creates a parser with a custom nested-filter parser.
    pub fn with_filter_parser(filter_parser: Arc<dyn FilterParser>) -> SortParser {
        SortParser { filter_parser }
    }

    /// Parses a `{"sort": .., "from": .., "size": ..}` request body.
    ///
    /// `sort` may be a single clause or an array of clauses; `from` defaults
    /// to 0 and `size` to 10.
    pub fn parse_request(&self, body: &Value) -> Result<SortRequest> {
        let object = body.as_object().ok_or_else(|| {
            SortError::Validation(format!("expected a request object, got {body}"))
        })?;
        let mut specs = Vec::new();
        if let Some(sort) = object.get("sort") {
            let clauses = match sort {
                Value::Array(clauses) => clauses.as_slice(),
                single => std::slice::from_ref(single),
            };
            for clause in clauses {
                specs.push(self.parse_clause(clause)?);
            }
        }
        let mut request = SortRequest::new(specs);
        if let Some(from) = object.get("from") {
            request = request.from(parse_usize(from, "from")?);
        }
        if let Some(size) = object.get("size") {
            request = request.size(parse_usize(size, "size")?);
        }
        Ok(request)
    }

    /// Parses one sort clause.
    pub fn parse_clause(&self, clause: &Value) -> Result<SortSpec> {
        match clause {
            Value::String(field) => Ok(self.shorthand(field)),
            Value::Object(object) => {
                let (key, options) = object.iter().next().ok_or_else(|| {
                    SortError::Validation("empty sort clause".to_string())
                })?;
                if object.len() > 1 {
                    return Err(SortError::Validation(format!(
                        "sort clause supports exactly one field, got {clause}"
                    )));
                }
                match key.as_str() {
                    "_geo_distance" => self.parse_geo_clause(options),
                    "_score" => {
                        let order = parse_order_shorthand(options, Order::Desc)?;
                        Ok(SortSpec::Score(ScoreSort::default().order(order)))
                    }
                    "_doc" => {
                        let order = parse_order_shorthand(options, Order::Asc)?;
                        Ok(SortSpec::DocOrder(DocOrderSort::default().order(order)))
                    }
                    field => self.parse_field_clause(field, options),
                }
            }
            other => Err(SortError::Validation(format!(
                "cannot parse sort clause from {other}"
            ))),
        }
    }

    fn shorthand(&self, field: &str) -> SortSpec {
        match field {
            "_score" => SortSpec::Score(ScoreSort::default()),
            "_doc" => SortSpec::DocOrder(DocOrderSort::default()),
            name => SortSpec::field(name),
        }
    }

    fn parse_field_clause(&self, field: &str, options: &Value) -> Result<SortSpec> {
        let mut sort = FieldSort::new(field);
        match options {
            Value::String(order) => {
                return Ok(SortSpec::Field(sort.order(Order::from_str(order)?)));
            }
            Value::Object(object) => {
                for (key, value) in object {
                    match key.as_str() {
                        "order" => sort = sort.order(parse_order(value)?),
                        "mode" => sort = sort.mode(parse_mode(value)?),
                        "sort_mode" => {
                            return Err(SortError::DeprecatedField {
                                used: "sort_mode".to_string(),
                                expected: "mode".to_string(),
                            });
                        }
                        "missing" => sort = sort.missing(parse_missing(value)?),
                        "nested_path" => sort = sort.nested_path(parse_str(value, "nested_path")?),
                        "nested_filter" => {
                            sort = sort.nested_filter(self.filter_parser.parse_filter(value)?);
                        }
                        "unmapped_type" => {
                            let name = parse_str(value, "unmapped_type")?;
                            let field_type = FieldType::from_name(&name).ok_or_else(|| {
                                SortError::Validation(format!("unknown unmapped_type [{name}]"))
                            })?;
                            sort = sort.unmapped_type(field_type);
                        }
                        unknown => {
                            return Err(SortError::Validation(format!(
                                "sort on field [{field}] does not support [{unknown}]"
                            )));
                        }
                    }
                }
                Ok(SortSpec::Field(sort))
            }
            other => Err(SortError::Validation(format!(
                "cannot parse sort options for field [{field}] from {other}"
            ))),
        }
    }

    fn parse_geo_clause(&self, options: &Value) -> Result<SortSpec> {
        let object = options.as_object().ok_or_else(|| {
            SortError::Validation(format!("expected [_geo_distance] options, got {options}"))
        })?;
        let mut order = Order::Asc;
        let mut mode = None;
        let mut missing = MissingPolicy::Last;
        let mut unit = DistanceUnit::default();
        let mut algorithm = DistanceAlgorithm::default();
        let mut nested_path = None;
        let mut nested_filter = None;
        let mut field_and_points: Option<(String, Vec<_>)> = None;
        for (key, value) in object {
            match key.as_str() {
                "order" => order = parse_order(value)?,
                "mode" => mode = Some(parse_mode(value)?),
                "sort_mode" => {
                    return Err(SortError::DeprecatedField {
                        used: "sort_mode".to_string(),
                        expected: "mode".to_string(),
                    });
                }
                "missing" => missing = parse_missing(value)?,
                "unit" => unit = DistanceUnit::from_str(&parse_str(value, "unit")?)?,
                "distance_type" => {
                    algorithm = DistanceAlgorithm::from_str(&parse_str(value, "distance_type")?)?;
                }
                "nested_path" => nested_path = Some(parse_str(value, "nested_path")?),
                "nested_filter" => {
                    nested_filter = Some(self.filter_parser.parse_filter(value)?);
                }
                // Any non-reserved key names the geo-point field, with its
                // value holding the origin point(s).
                field => {
                    if let Some((previous, _)) = &field_and_points {
                        return Err(SortError::Validation(format!(
                            "geo distance sort supports one field, got [{previous}] and [{field}]"
                        )));
                    }
                    field_and_points = Some((field.to_string(), parse_points(value)?));
                }
            }
        }
        let (field, points) = field_and_points.ok_or_else(|| {
            SortError::Validation("geo distance sort requires a field with origin points".to_string())
        })?;
        let mut sort = GeoDistanceSort::new(field, points)?
            .order(order)
            .missing(missing)
            .unit(unit)
            .algorithm(algorithm);
        if let Some(mode) = mode {
            sort = sort.mode(mode)?;
        }
        if let Some(path) = nested_path {
            sort = sort.nested_path(path);
        }
        if let Some(filter) = nested_filter {
            sort = sort.nested_filter(filter);
        }
        Ok(SortSpec::GeoDistance(sort))
    }
}

fn parse_order(value: &Value) -> Result<Order> {
    Order::from_str(&parse_str(value, "order")?)
}

/// `_score` and `_doc` clauses accept either a bare order string or an
/// `{"order": ..}` object; anything else is rejected.
fn parse_order_shorthand(options: &Value, default: Order) -> Result<Order> {
    match options {
        Value::String(order) => Order::from_str(order),
        Value::Object(object) => {
            let mut order = default;
            for (key, value) in object {
                match key.as_str() {
                    "order" => order = parse_order(value)?,
                    unknown => {
                        return Err(SortError::Validation(format!(
                            "sort clause does not support [{unknown}]"
                        )));
                    }
                }
            }
            Ok(order)
        }
        other => Err(SortError::Validation(format!(
            "cannot parse sort options from {other}"
        ))),
    }
}

fn parse_mode(value: &Value) -> Result<SortMode> {
    SortMode::from_str(&parse_str(value, "mode")?)
}

fn parse_missing(value: &Value) -> Result<MissingPolicy> {
    match value {
        Value::String(text) if text == "_last" => Ok(MissingPolicy::Last),
        Value::String(text) if text == "_first" => Ok(MissingPolicy::First),
        literal => SortValue::from_json(literal)
            .map(MissingPolicy::Literal)
            .ok_or_else(|| {
                SortError::Validation(format!("cannot parse missing value from {literal}"))
            }),
    }
}

fn parse_str(value: &Value, key: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SortError::Validation(format!("expected a string for [{key}], got {value}")))
}

fn parse_usize(value: &Value, key: &str) -> Result<usize> {
    value.as_u64().map(|v| v as usize).ok_or_else(|| {
        SortError::Validation(format!(
            "expected a non-negative integer for [{key}], got {value}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SortParser;
    use crate::sort::{MissingPolicy, Order, SortMode, SortSpec};
    use crate::sort::value::SortValue;
    use crate::SortError;

    fn parse(clause: serde_json::Value) -> crate::Result<SortSpec> {
        SortParser::default().parse_clause(&clause)
    }

    #[test]
    fn test_string_shorthand() {
        let spec = parse(json!("price")).unwrap();
        let SortSpec::Field(field_sort) = spec else {
            panic!("expected a field sort");
        };
        assert_eq!(field_sort.field_name(), "price");
    }

    #[test]
    fn test_field_to_order_form() {
        let SortSpec::Field(_) = parse(json!({"price": "desc"})).unwrap() else {
            panic!("expected a field sort");
        };
        assert!(parse(json!({"price": "descending"})).is_err());
    }

    #[test]
    fn test_field_options_form() {
        let spec = parse(json!({
            "price": {"order": "desc", "mode": "avg", "missing": "_first"}
        }))
        .unwrap();
        let SortSpec::Field(_) = spec else {
            panic!("expected a field sort");
        };
    }

    #[test]
    fn test_sort_mode_key_is_deprecated() {
        let err = parse(json!({"price": {"sort_mode": "min"}})).unwrap_err();
        assert!(matches!(
            err,
            SortError::DeprecatedField { ref used, ref expected }
                if used == "sort_mode" && expected == "mode"
        ));
        let err = parse(json!({"_geo_distance": {
            "pin": [-74.0, 40.7],
            "sort_mode": "min",
        }}))
        .unwrap_err();
        assert!(matches!(err, SortError::DeprecatedField { .. }));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = parse(json!({"price": {"orderr": "desc"}})).unwrap_err();
        assert!(err.to_string().contains("[orderr]"));
    }

    #[test]
    fn test_missing_forms() {
        let missing = super::parse_missing(&json!("_first")).unwrap();
        assert_eq!(missing, MissingPolicy::First);
        let missing = super::parse_missing(&json!("_last")).unwrap();
        assert_eq!(missing, MissingPolicy::Last);
        let missing = super::parse_missing(&json!(-1)).unwrap();
        assert_eq!(missing, MissingPolicy::Literal(SortValue::I64(-1)));
        assert!(super::parse_missing(&json!({"v": 1})).is_err());
    }

    #[test]
    fn test_geo_clause() {
        let spec = parse(json!({"_geo_distance": {
            "pin.location": {"lat": 40.0, "lon": -70.0},
            "order": "asc",
            "unit": "km",
            "distance_type": "plane",
            "mode": "min",
        }}))
        .unwrap();
        let SortSpec::GeoDistance(geo) = spec else {
            panic!("expected a geo distance sort");
        };
        assert_eq!(geo.field_name(), "pin.location");
    }

    #[test]
    fn test_geo_sum_mode_rejected_in_parse() {
        let err = parse(json!({"_geo_distance": {
            "pin.location": {"lat": 40.0, "lon": -70.0},
            "mode": "sum",
        }}))
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("sort_mode [sum] isn't supported for sorting by geo distance"));
    }

    #[test]
    fn test_score_and_doc_forms() {
        assert!(matches!(parse(json!("_score")).unwrap(), SortSpec::Score(_)));
        assert!(matches!(parse(json!("_doc")).unwrap(), SortSpec::DocOrder(_)));
        assert!(matches!(
            parse(json!({"_score": {"order": "asc"}})).unwrap(),
            SortSpec::Score(_)
        ));
        assert!(parse(json!({"_score": {"mode": "min"}})).is_err());
    }

    #[test]
    fn test_parse_request_defaults() {
        let request = SortParser::default()
            .parse_request(&json!({"sort": ["price"]}))
            .unwrap();
        assert_eq!(request.from_offset(), 0);
        assert_eq!(request.window_size(), 10);

        let request = SortParser::default()
            .parse_request(&json!({"sort": {"price": "desc"}, "from": 5, "size": 3}))
            .unwrap();
        assert_eq!(request.from_offset(), 5);
        assert_eq!(request.window_size(), 3);
    }
}
