//! Lexicographic comparison of rank tuples, identical on every partition and
//! at the merge point.

use std::cmp::Ordering;

use serde::Serialize;

use crate::sort::value::ReducedValue;
use crate::sort::{BoundSortSpec, MissingPolicy, Order};
use crate::{DocId, PartitionId};

/// Stable identity of a ranked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocRef {
    /// Partition the document came from.
    pub partition: PartitionId,
    /// Storage-order position within the partition.
    pub ordinal: DocId,
    /// Global document identifier.
    pub id: String,
}

/// One document's reduced sort keys, one per criterion, in criterion order.
#[derive(Debug, Clone, Serialize)]
pub struct RankTuple {
    /// The ranked document.
    pub doc: DocRef,
    /// Reduced values, parallel to the request's sort criteria.
    pub keys: Vec<ReducedValue>,
}

#[derive(Debug, Clone, Copy)]
enum MissingRank {
    First,
    Last,
}

/// Compares rank tuples criterion by criterion.
///
/// Missing placement is a rank of its own: a `_first` missing orders before
/// every real value and a `_last` missing after, in both directions, so the
/// direction flip applies only to real values. Literal missing policies never
/// reach comparison; they were substituted with a real value at reduction.
#[derive(Debug, Clone)]
pub struct TupleComparator {
    keys: Vec<(Order, MissingRank)>,
}

impl TupleComparator {
    /// Builds the comparator for a bound sort criteria list.
    pub fn for_specs(specs: &[BoundSortSpec]) -> TupleComparator {
        TupleComparator {
            keys: specs
                .iter()
                .map(|spec| {
                    let missing_rank = match spec.missing {
                        MissingPolicy::First => MissingRank::First,
                        _ => MissingRank::Last,
                    };
                    (spec.order, missing_rank)
                })
                .collect(),
        }
    }

    /// Lexicographic comparison over the key tuples alone.
    pub fn compare(&self, lhs: &RankTuple, rhs: &RankTuple) -> Ordering {
        for ((order, missing_rank), (left, right)) in
            self.keys.iter().zip(lhs.keys.iter().zip(&rhs.keys))
        {
            let ordering = match (left, right) {
                (ReducedValue::Missing, ReducedValue::Missing) => Ordering::Equal,
                (ReducedValue::Missing, ReducedValue::Value(_)) => match missing_rank {
                    MissingRank::First => Ordering::Less,
                    MissingRank::Last => Ordering::Greater,
                },
                (ReducedValue::Value(_), ReducedValue::Missing) => match missing_rank {
                    MissingRank::First => Ordering::Greater,
                    MissingRank::Last => Ordering::Less,
                },
                (ReducedValue::Value(left), ReducedValue::Value(right)) => {
                    let ordering = left.compare(right);
                    match order {
                        Order::Asc => ordering,
                        Order::Desc => ordering.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Comparison with the deterministic final tie-break: equal key tuples
    /// order by partition id, then by storage ordinal, both ascending.
    pub fn compare_with_tie_break(&self, lhs: &RankTuple, rhs: &RankTuple) -> Ordering {
        self.compare(lhs, rhs)
            .then_with(|| lhs.doc.partition.cmp(&rhs.doc.partition))
            .then_with(|| lhs.doc.ordinal.cmp(&rhs.doc.ordinal))
    }
}
