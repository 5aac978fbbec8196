//! Validated, immutable descriptions of sort criteria.
//!
//! A [`SortSpec`] is created once per request — either programmatically
//! through the builders here or by [`parse`](crate::SortParser) — validated
//! at construction, and never mutated once the request starts executing.
//! Binding a spec against a [`Mapping`] resolves the field's scalar type and
//! coerces the literal missing-value, producing the [`BoundSortSpec`] the
//! evaluation pipeline runs on.

pub mod parse;
pub mod value;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geo::{DistanceAlgorithm, DistanceUnit, GeoPoint};
use crate::mapping::{FieldType, Mapping};
use crate::nested::{ChildFilter, NestedScope};
use crate::sort::value::SortValue;
use crate::{Result, SortError};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Smallest value first.
    #[default]
    Asc,
    /// Largest value first.
    Desc,
}

impl Order {
    pub(crate) fn from_str(text: &str) -> Result<Order> {
        match text {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            _ => Err(SortError::Validation(format!("unknown order [{text}]"))),
        }
    }
}

/// How a multi-valued field collapses to one comparable value per document.
///
/// When no mode is given, a multi-valued field behaves as `Min` for ascending
/// and `Max` for descending order — the value closest to the sort boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Pick the minimum value.
    Min,
    /// Pick the maximum value.
    Max,
    /// Use the sum of all values. Numeric fields only; never valid for
    /// geo-distance sorting.
    Sum,
    /// Use the mean of all values. Numeric fields only.
    Avg,
    /// Use the median of all values. Numeric fields only.
    Median,
}

impl SortMode {
    pub(crate) fn from_str(text: &str) -> Result<SortMode> {
        match text {
            "min" => Ok(SortMode::Min),
            "max" => Ok(SortMode::Max),
            "sum" => Ok(SortMode::Sum),
            "avg" => Ok(SortMode::Avg),
            "median" => Ok(SortMode::Median),
            _ => Err(SortError::Validation(format!("unknown sort mode [{text}]"))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortMode::Min => "min",
            SortMode::Max => "max",
            SortMode::Sum => "sum",
            SortMode::Avg => "avg",
            SortMode::Median => "median",
        };
        f.write_str(name)
    }
}

/// Placement of documents that have no value for the sort field.
///
/// `Last` and `First` are placement directives: they win over the sort
/// direction and put the document after (resp. before) every document with a
/// real value, in both ascending and descending order. `Literal` substitutes
/// an actual value which then participates in ordinary comparison — it is not
/// guaranteed to be first or last.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MissingPolicy {
    /// Sort after every real value. The default.
    #[default]
    Last,
    /// Sort before every real value.
    First,
    /// Compare as if the document held this value.
    Literal(SortValue),
}

/// One validated sort criterion.
///
/// The original surface models this as a builder-class hierarchy with one
/// subtype per kind; a tagged union keeps invalid kind/mode combinations out
/// of the representable states where possible (score and doc-order sorts
/// simply have no `mode` field) and makes extraction an exhaustive match.
#[derive(Debug, Clone)]
pub enum SortSpec {
    /// Sort by a plain mapped field.
    Field(FieldSort),
    /// Sort by geo-distance from one or more origin points.
    GeoDistance(GeoDistanceSort),
    /// Sort by the relevance score computed by query evaluation.
    Score(ScoreSort),
    /// Sort by physical storage position: a free, stable "no sort" ordering.
    DocOrder(DocOrderSort),
}

impl SortSpec {
    /// Shorthand for an ascending plain-field sort.
    pub fn field(name: impl Into<String>) -> SortSpec {
        SortSpec::Field(FieldSort::new(name))
    }

    /// Shorthand for a descending score sort.
    pub fn score() -> SortSpec {
        SortSpec::Score(ScoreSort::default())
    }

    /// Shorthand for the natural storage order.
    pub fn doc_order() -> SortSpec {
        SortSpec::DocOrder(DocOrderSort::default())
    }

    /// Resolves this spec against the mapping, producing the immutable bound
    /// form the evaluation pipeline runs on. All remaining validation happens
    /// here, before any partition work is dispatched.
    pub fn bind(&self, mapping: &Mapping) -> Result<BoundSortSpec> {
        match self {
            SortSpec::Field(field_sort) => field_sort.bind(mapping),
            SortSpec::GeoDistance(geo_sort) => geo_sort.bind(mapping),
            SortSpec::Score(score_sort) => Ok(BoundSortSpec {
                kind: BoundKind::Score,
                order: score_sort.order,
                mode: None,
                missing: MissingPolicy::Last,
                nested: None,
                child_path: None,
            }),
            SortSpec::DocOrder(doc_sort) => Ok(BoundSortSpec {
                kind: BoundKind::DocOrder,
                order: doc_sort.order,
                mode: None,
                missing: MissingPolicy::Last,
                nested: None,
                child_path: None,
            }),
        }
    }
}

/// Sort by a plain mapped field (numeric or keyword).
#[derive(Debug, Clone, Default)]
pub struct FieldSort {
    field: String,
    order: Order,
    mode: Option<SortMode>,
    missing: MissingPolicy,
    nested_path: Option<String>,
    nested_filter: Option<Arc<dyn ChildFilter>>,
    unmapped_type: Option<FieldType>,
}

impl FieldSort {
    /// Creates an ascending sort on `field`.
    pub fn new(field: impl Into<String>) -> FieldSort {
        FieldSort {
            field: field.into(),
            ..FieldSort::default()
        }
    }

    /// The field this sort operates on.
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// Sets the sort direction.
    pub fn order(mut self, order: Order) -> FieldSort {
        self.order = order;
        self
    }

    /// Sets the multi-value reduction mode.
    pub fn mode(mut self, mode: SortMode) -> FieldSort {
        self.mode = Some(mode);
        self
    }

    /// Sets the missing-value policy. Defaults to [`MissingPolicy::Last`].
    pub fn missing(mut self, missing: MissingPolicy) -> FieldSort {
        self.missing = missing;
        self
    }

    /// Restricts extraction to children of this nested object path.
    pub fn nested_path(mut self, path: impl Into<String>) -> FieldSort {
        self.nested_path = Some(path.into());
        self
    }

    /// Narrows the visible nested children with a filter. Requires
    /// [`nested_path`](Self::nested_path).
    pub fn nested_filter(mut self, filter: Arc<dyn ChildFilter>) -> FieldSort {
        self.nested_filter = Some(filter);
        self
    }

    /// Opts into treating an unmapped field as entirely missing on every
    /// document, coercing literals as if the field had the given type.
    /// Without this, sorting on an unmapped field fails fast.
    pub fn unmapped_type(mut self, field_type: FieldType) -> FieldSort {
        self.unmapped_type = Some(field_type);
        self
    }

    fn bind(&self, mapping: &Mapping) -> Result<BoundSortSpec> {
        let field_type = match mapping.field_type(&self.field) {
            Some(FieldType::GeoPoint) => {
                return Err(SortError::Validation(format!(
                    "can't sort on geo_point field [{}] without a geo distance sort",
                    self.field
                )));
            }
            Some(field_type) => Some(field_type),
            None => match self.unmapped_type {
                Some(fallback) => {
                    debug!(
                        "field [{}] is unmapped, sorting it as missing with fallback type [{}]",
                        self.field,
                        fallback.name()
                    );
                    None
                }
                None => {
                    return Err(SortError::Validation(format!(
                        "no mapping found for field [{}] in order to sort on",
                        self.field
                    )));
                }
            },
        };
        if field_type == Some(FieldType::Keyword) {
            if let Some(mode @ (SortMode::Sum | SortMode::Avg | SortMode::Median)) = self.mode {
                return Err(SortError::Validation(format!(
                    "sort mode [{mode}] isn't supported for field [{}] of type [keyword]",
                    self.field
                )));
            }
        }
        let coercion_type = field_type.or(self.unmapped_type).unwrap_or(FieldType::Keyword);
        let missing = coerce_missing(&self.missing, coercion_type, &self.field)?;
        let (nested, child_path) = bind_nested(
            &self.field,
            self.nested_path.as_deref(),
            self.nested_filter.clone(),
            mapping,
        )?;
        let kind = match field_type {
            Some(FieldType::Keyword) => BoundKind::Keyword {
                field: self.field.clone(),
            },
            Some(numeric) => BoundKind::Numeric {
                field: self.field.clone(),
                field_type: numeric,
            },
            None => BoundKind::Unmapped,
        };
        Ok(BoundSortSpec {
            kind,
            order: self.order,
            mode: self.mode,
            missing,
            nested,
            child_path,
        })
    }
}

impl From<FieldSort> for SortSpec {
    fn from(field_sort: FieldSort) -> SortSpec {
        SortSpec::Field(field_sort)
    }
}

/// A distance-based sort on a geo-point field.
#[derive(Debug, Clone)]
pub struct GeoDistanceSort {
    field: String,
    origins: Vec<GeoPoint>,
    order: Order,
    mode: Option<SortMode>,
    missing: MissingPolicy,
    unit: DistanceUnit,
    algorithm: DistanceAlgorithm,
    nested_path: Option<String>,
    nested_filter: Option<Arc<dyn ChildFilter>>,
}

impl GeoDistanceSort {
    /// Creates a distance sort on `field` from the given origin points.
    ///
    /// At least one origin is required, and every origin must hold valid
    /// coordinates.
    pub fn new(field: impl Into<String>, origins: Vec<GeoPoint>) -> Result<GeoDistanceSort> {
        if origins.is_empty() {
            return Err(SortError::Validation(
                "geo distance sorting needs at least one point".to_string(),
            ));
        }
        for origin in &origins {
            GeoPoint::validated(origin.lat, origin.lon)?;
        }
        Ok(GeoDistanceSort {
            field: field.into(),
            origins,
            order: Order::Asc,
            mode: None,
            missing: MissingPolicy::Last,
            unit: DistanceUnit::default(),
            algorithm: DistanceAlgorithm::default(),
            nested_path: None,
            nested_filter: None,
        })
    }

    /// The geo-point field the distance sort operates on.
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// Sets the sort direction.
    pub fn order(mut self, order: Order) -> GeoDistanceSort {
        self.order = order;
        self
    }

    /// Defines which distance to use when a document contains multiple geo
    /// points. `Sum` is rejected here: summed distances have no geometric
    /// meaning.
    pub fn mode(mut self, mode: SortMode) -> Result<GeoDistanceSort> {
        if mode == SortMode::Sum {
            return Err(SortError::Validation(
                "sort_mode [sum] isn't supported for sorting by geo distance".to_string(),
            ));
        }
        self.mode = Some(mode);
        Ok(self)
    }

    /// Sets the missing-value policy. Defaults to [`MissingPolicy::Last`].
    pub fn missing(mut self, missing: MissingPolicy) -> GeoDistanceSort {
        self.missing = missing;
        self
    }

    /// Sets the distance unit. Defaults to meters.
    pub fn unit(mut self, unit: DistanceUnit) -> GeoDistanceSort {
        self.unit = unit;
        self
    }

    /// Sets the distance algorithm. Defaults to
    /// [`DistanceAlgorithm::SloppyArc`].
    pub fn algorithm(mut self, algorithm: DistanceAlgorithm) -> GeoDistanceSort {
        self.algorithm = algorithm;
        self
    }

    /// Restricts extraction to children of this nested object path.
    pub fn nested_path(mut self, path: impl Into<String>) -> GeoDistanceSort {
        self.nested_path = Some(path.into());
        self
    }

    /// Narrows the visible nested children with a filter. Requires
    /// [`nested_path`](Self::nested_path).
    pub fn nested_filter(mut self, filter: Arc<dyn ChildFilter>) -> GeoDistanceSort {
        self.nested_filter = Some(filter);
        self
    }

    fn bind(&self, mapping: &Mapping) -> Result<BoundSortSpec> {
        match mapping.field_type(&self.field) {
            Some(FieldType::GeoPoint) => {}
            Some(other) => {
                return Err(SortError::Validation(format!(
                    "field [{}] of type [{}] is not a geo_point field",
                    self.field,
                    other.name()
                )));
            }
            None => {
                return Err(SortError::Validation(format!(
                    "failed to find mapper for [{}] for geo distance based sort",
                    self.field
                )));
            }
        }
        // The constructor already rejects Sum; parsed requests go through the
        // same constructor, so this is unreachable unless a new entry point
        // skips it.
        if self.mode == Some(SortMode::Sum) {
            return Err(SortError::Validation(
                "sort_mode [sum] isn't supported for sorting by geo distance".to_string(),
            ));
        }
        let missing = coerce_missing(&self.missing, FieldType::GeoPoint, &self.field)?;
        let (nested, child_path) = bind_nested(
            &self.field,
            self.nested_path.as_deref(),
            self.nested_filter.clone(),
            mapping,
        )?;
        Ok(BoundSortSpec {
            kind: BoundKind::GeoDistance {
                field: self.field.clone(),
                origins: self.origins.clone(),
                unit: self.unit,
                algorithm: self.algorithm,
            },
            order: self.order,
            mode: self.mode,
            missing,
            nested,
            child_path,
        })
    }
}

impl From<GeoDistanceSort> for SortSpec {
    fn from(geo_sort: GeoDistanceSort) -> SortSpec {
        SortSpec::GeoDistance(geo_sort)
    }
}

/// Sort by relevance score. Descending by default: best match first.
#[derive(Debug, Clone)]
pub struct ScoreSort {
    order: Order,
}

impl ScoreSort {
    /// Sets the sort direction.
    pub fn order(mut self, order: Order) -> ScoreSort {
        self.order = order;
        self
    }
}

impl Default for ScoreSort {
    fn default() -> ScoreSort {
        ScoreSort { order: Order::Desc }
    }
}

impl From<ScoreSort> for SortSpec {
    fn from(score_sort: ScoreSort) -> SortSpec {
        SortSpec::Score(score_sort)
    }
}

/// Sort by physical storage position within the partition.
#[derive(Debug, Clone, Default)]
pub struct DocOrderSort {
    order: Order,
}

impl DocOrderSort {
    /// Sets the sort direction.
    pub fn order(mut self, order: Order) -> DocOrderSort {
        self.order = order;
        self
    }
}

impl From<DocOrderSort> for SortSpec {
    fn from(doc_sort: DocOrderSort) -> SortSpec {
        SortSpec::DocOrder(doc_sort)
    }
}

fn coerce_missing(
    missing: &MissingPolicy,
    field_type: FieldType,
    field: &str,
) -> Result<MissingPolicy> {
    match missing {
        MissingPolicy::Literal(value) => Ok(MissingPolicy::Literal(
            value.clone().coerce_to(field_type, field)?,
        )),
        placement => Ok(placement.clone()),
    }
}

fn bind_nested(
    field: &str,
    nested_path: Option<&str>,
    nested_filter: Option<Arc<dyn ChildFilter>>,
    mapping: &Mapping,
) -> Result<(Option<NestedScope>, Option<String>)> {
    let Some(path) = nested_path else {
        if nested_filter.is_some() {
            return Err(SortError::Validation(format!(
                "sort on field [{field}] defines a nested filter but no nested path"
            )));
        }
        return Ok((None, None));
    };
    if !mapping.is_nested(path) {
        return Err(SortError::Validation(format!(
            "[nested] failed to find nested object under path [{path}]"
        )));
    }
    let child_path = field
        .strip_prefix(path)
        .and_then(|rest| rest.strip_prefix('.'))
        .ok_or_else(|| {
            SortError::Validation(format!(
                "sort field [{field}] is not inside nested path [{path}]"
            ))
        })?;
    Ok((
        Some(NestedScope::new(path, nested_filter)),
        Some(child_path.to_string()),
    ))
}

/// A [`SortSpec`] resolved against a mapping: field type known, literal
/// missing-value coerced, nested scope built. Immutable for the duration of
/// the request.
#[derive(Debug, Clone)]
pub struct BoundSortSpec {
    pub(crate) kind: BoundKind,
    pub(crate) order: Order,
    pub(crate) mode: Option<SortMode>,
    pub(crate) missing: MissingPolicy,
    pub(crate) nested: Option<NestedScope>,
    /// Field path relative to the nested path, when scoped.
    pub(crate) child_path: Option<String>,
}

impl BoundSortSpec {
    /// The sort direction of this criterion.
    pub fn order(&self) -> Order {
        self.order
    }
}

#[derive(Debug, Clone)]
pub(crate) enum BoundKind {
    Numeric {
        field: String,
        field_type: FieldType,
    },
    Keyword {
        field: String,
    },
    GeoDistance {
        field: String,
        origins: Vec<GeoPoint>,
        unit: DistanceUnit,
        algorithm: DistanceAlgorithm,
    },
    Score,
    DocOrder,
    /// Unmapped field with an explicit fallback type: missing on every doc.
    Unmapped,
}
