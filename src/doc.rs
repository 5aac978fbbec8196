//! The matched-document inputs handed over by the query-evaluation layer.

use serde_json::Value;

use crate::{PartitionId, Score};

/// One document matched by the query, with its stored source already decoded
/// to primitive JSON scalars by the (out-of-scope) stored-field layer.
#[derive(Debug, Clone)]
pub struct Document {
    /// Global document identifier.
    pub id: String,
    /// Relevance score computed by query evaluation. Zero when the query did
    /// not score.
    pub score: Score,
    /// Decoded stored fields.
    pub source: Value,
}

impl Document {
    /// Creates an unscored document.
    pub fn new(id: impl Into<String>, source: Value) -> Document {
        Document {
            id: id.into(),
            score: 0.0,
            source,
        }
    }

    /// Creates a document carrying a relevance score.
    pub fn with_score(id: impl Into<String>, score: Score, source: Value) -> Document {
        Document {
            id: id.into(),
            score,
            source,
        }
    }
}

/// The matching-document set of one partition, in storage order.
///
/// The position of a document in `docs` is its local ordinal, which is stable
/// for a given partition layout and serves as the final merge tie-break.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Identifier of this partition.
    pub partition_id: PartitionId,
    /// Matched documents, in storage order.
    pub docs: Vec<Document>,
}

impl Partition {
    /// Creates a partition result set.
    pub fn new(partition_id: PartitionId, docs: Vec<Document>) -> Partition {
        Partition { partition_id, docs }
    }
}

/// Collects every leaf value reachable under a dotted `path`, flattening
/// arrays at each step. Plain object arrays are traversed (non-nested
/// multi-valued semantics); scoping to nested children happens before this
/// lookup, not inside it.
pub(crate) fn lookup_path<'a>(root: &'a Value, path: &str, out: &mut Vec<&'a Value>) {
    lookup_segments(root, &path.split('.').collect::<Vec<_>>(), out);
}

fn lookup_segments<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    if let Value::Array(elements) = value {
        for element in elements {
            lookup_segments(element, segments, out);
        }
        return;
    }
    match segments.split_first() {
        None => {
            if !value.is_null() {
                out.push(value);
            }
        }
        Some((head, tail)) => {
            if let Value::Object(object) = value {
                if let Some(child) = object.get(*head) {
                    lookup_segments(child, tail, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::lookup_path;

    #[test]
    fn test_lookup_scalar() {
        let doc = json!({"a": {"b": 3}});
        let mut out = Vec::new();
        lookup_path(&doc, "a.b", &mut out);
        assert_eq!(out, vec![&json!(3)]);
    }

    #[test]
    fn test_lookup_flattens_arrays() {
        let doc = json!({"a": [{"b": 1}, {"b": [2, 3]}]});
        let mut out = Vec::new();
        lookup_path(&doc, "a.b", &mut out);
        assert_eq!(out, vec![&json!(1), &json!(2), &json!(3)]);
    }

    #[test]
    fn test_lookup_missing_and_null() {
        let doc = json!({"a": {"b": null}});
        let mut out = Vec::new();
        lookup_path(&doc, "a.b", &mut out);
        lookup_path(&doc, "a.c", &mut out);
        assert!(out.is_empty());
    }
}
