//! Nested-object scoping: which child records of a document are visible to
//! value extraction when a sort targets a field inside a nested object array.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::doc::lookup_path;

/// A filter evaluated against one nested child record at a time.
///
/// Nested-filter sub-queries belong to the query-evaluation layer; this trait
/// is the seam through which that layer plugs in. [`TermFilter`] is the
/// reference implementation.
pub trait ChildFilter: Send + Sync + fmt::Debug {
    /// True if the child record satisfies the filter.
    fn matches(&self, child: &Value) -> bool;
}

/// Exact-match filter on a field of the nested child.
///
/// When the child's field is multi-valued, the filter matches if any of its
/// values equals the term.
#[derive(Debug, Clone)]
pub struct TermFilter {
    field: String,
    value: Value,
}

impl TermFilter {
    /// Creates a term filter over a field path relative to the nested child.
    pub fn new(field: impl Into<String>, value: Value) -> TermFilter {
        TermFilter {
            field: field.into(),
            value,
        }
    }
}

impl ChildFilter for TermFilter {
    fn matches(&self, child: &Value) -> bool {
        let mut leaves = Vec::new();
        lookup_path(child, &self.field, &mut leaves);
        leaves.iter().any(|leaf| **leaf == self.value)
    }
}

/// The subset of a document's nested child records considered for extraction.
///
/// The path is resolved segment by segment from the document root; a child is
/// visible only if every ancestor segment also matched. A plain (non-array)
/// sub-object under a nested path is treated as exactly one child record
/// (offset 0) rather than erroring — required compatibility behavior for
/// documents indexed before the field became an array.
#[derive(Debug, Clone)]
pub struct NestedScope {
    segments: Vec<String>,
    filter: Option<Arc<dyn ChildFilter>>,
}

impl NestedScope {
    /// Creates a scope for `path`, optionally narrowed by a child filter.
    pub fn new(path: &str, filter: Option<Arc<dyn ChildFilter>>) -> NestedScope {
        NestedScope {
            segments: path.split('.').map(str::to_string).collect(),
            filter,
        }
    }

    /// The dotted nested path this scope resolves.
    pub fn path(&self) -> String {
        self.segments.join(".")
    }

    /// Returns the visible child records of `root`, in document order.
    pub fn children<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current: Vec<&'a Value> = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                if let Value::Object(object) = value {
                    match object.get(segment) {
                        Some(Value::Array(elements)) => {
                            next.extend(elements.iter().filter(|e| !e.is_null()));
                        }
                        // Single-object nesting degenerates to a one-element
                        // nested array.
                        Some(child @ Value::Object(_)) => next.push(child),
                        _ => {}
                    }
                }
            }
            current = next;
        }
        if let Some(filter) = &self.filter {
            current.retain(|child| filter.matches(child));
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::{ChildFilter, NestedScope, TermFilter};

    #[test]
    fn test_children_of_nested_array() {
        let doc = json!({"offers": [{"price": 10}, {"price": 20}]});
        let scope = NestedScope::new("offers", None);
        assert_eq!(scope.children(&doc).len(), 2);
    }

    #[test]
    fn test_single_object_degenerates_to_one_child() {
        let doc = json!({"offers": {"price": 10}});
        let scope = NestedScope::new("offers", None);
        let children = scope.children(&doc);
        assert_eq!(children, vec![&json!({"price": 10})]);
    }

    #[test]
    fn test_multi_level_path_requires_every_ancestor() {
        let doc = json!({
            "a": [
                {"b": [{"v": 1}, {"v": 2}]},
                {"b": {"v": 3}},
                {"c": {"v": 4}},
            ]
        });
        let scope = NestedScope::new("a.b", None);
        let children = scope.children(&doc);
        assert_eq!(
            children,
            vec![&json!({"v": 1}), &json!({"v": 2}), &json!({"v": 3})]
        );
    }

    #[test]
    fn test_filter_narrows_children() {
        let doc = json!({"offers": [
            {"color": "blue", "price": 10},
            {"color": "red", "price": 20},
            {"color": "blue", "price": 30},
        ]});
        let filter: Arc<dyn ChildFilter> = Arc::new(TermFilter::new("color", json!("blue")));
        let scope = NestedScope::new("offers", Some(filter));
        let children = scope.children(&doc);
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c["color"] == json!("blue")));
    }

    #[test]
    fn test_term_filter_on_multi_valued_field() {
        let filter = TermFilter::new("tags", json!("sale"));
        assert!(filter.matches(&json!({"tags": ["new", "sale"]})));
        assert!(!filter.matches(&json!({"tags": ["new"]})));
    }
}
