//! Per-partition top-N collection.
//!
//! Each partition ranks only the documents that can still reach the global
//! result window. The computer keeps a buffer of `2 * n` candidates; when the
//! buffer fills it is pruned to the best `n` with `select_nth_unstable_by`,
//! and the evicted median becomes the admission threshold for later pushes.

use std::cmp::Ordering;

use serde::Serialize;

use crate::compare::{DocRef, RankTuple, TupleComparator};
use crate::extract::extract;
use crate::reduce::reduce;
use crate::sort::value::ReducedValue;
use crate::sort::{BoundSortSpec, MissingPolicy};
use crate::{DocId, Partition, PartitionId, Result};

/// Bounded top-N accumulator over rank tuples.
pub struct TopNComputer {
    comparator: TupleComparator,
    buffer: Vec<RankTuple>,
    top_n: usize,
    threshold: Option<RankTuple>,
}

impl TopNComputer {
    /// Creates a computer keeping the best `top_n` tuples. Allocates a buffer
    /// of `2 * top_n` up front.
    pub fn new(comparator: TupleComparator, top_n: usize) -> TopNComputer {
        TopNComputer {
            comparator,
            buffer: Vec::with_capacity(top_n.max(1) * 2),
            top_n,
            threshold: None,
        }
    }

    /// Offers a tuple. Tuples that cannot beat the current threshold are
    /// dropped without entering the buffer.
    pub fn push(&mut self, tuple: RankTuple) {
        if let Some(threshold) = &self.threshold {
            if self.comparator.compare_with_tie_break(&tuple, threshold) != Ordering::Less {
                return;
            }
        }
        if self.buffer.len() == self.buffer.capacity() {
            self.truncate_top_n();
        }
        self.buffer.push(tuple);
    }

    fn truncate_top_n(&mut self) {
        let comparator = self.comparator.clone();
        let (_, median, _) = self
            .buffer
            .select_nth_unstable_by(self.top_n, |lhs, rhs| {
                comparator.compare_with_tie_break(lhs, rhs)
            });
        self.threshold = Some(median.clone());
        self.buffer.truncate(self.top_n);
    }

    /// Consumes the computer and returns the best tuples in rank order.
    pub fn into_sorted_vec(mut self) -> Vec<RankTuple> {
        if self.buffer.len() > self.top_n {
            self.truncate_top_n();
        }
        let comparator = self.comparator;
        let mut buffer = self.buffer;
        buffer.sort_unstable_by(|lhs, rhs| comparator.compare_with_tie_break(lhs, rhs));
        buffer
    }
}

/// The fruit of sorting one partition: its best tuples and its match count.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionResult {
    /// Partition these hits came from.
    pub partition_id: PartitionId,
    /// Best tuples of the partition, in rank order, at most the window size.
    pub hits: Vec<RankTuple>,
    /// Number of matched documents in the partition, regardless of the
    /// window.
    pub total_matches: u64,
}

/// Ranks one partition: extracts, reduces, and keeps the best `window`
/// tuples.
///
/// A document that fails value decoding fails the whole partition; the caller
/// turns that into a per-partition failure without touching other
/// partitions.
pub(crate) fn sort_partition(
    partition: &Partition,
    specs: &[BoundSortSpec],
    comparator: &TupleComparator,
    window: usize,
) -> Result<PartitionResult> {
    let mut computer = TopNComputer::new(comparator.clone(), window);
    for (ordinal, doc) in partition.docs.iter().enumerate() {
        let ordinal = ordinal as DocId;
        let mut keys = Vec::with_capacity(specs.len());
        for spec in specs {
            let raw = extract(doc, ordinal, spec)?;
            let values = raw.into_iter().map(|r| r.value).collect();
            let mut reduced = reduce(values, spec.mode, spec.order)?;
            if reduced.is_missing() {
                if let MissingPolicy::Literal(literal) = &spec.missing {
                    reduced = ReducedValue::Value(literal.clone());
                }
            }
            keys.push(reduced);
        }
        computer.push(RankTuple {
            doc: DocRef {
                partition: partition.partition_id,
                ordinal,
                id: doc.id.clone(),
            },
            keys,
        });
    }
    Ok(PartitionResult {
        partition_id: partition.partition_id,
        hits: computer.into_sorted_vec(),
        total_matches: partition.docs.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{sort_partition, TopNComputer};
    use crate::compare::{DocRef, RankTuple, TupleComparator};
    use crate::doc::{Document, Partition};
    use crate::mapping::{FieldType, Mapping};
    use crate::sort::value::{ReducedValue, SortValue};
    use crate::sort::{FieldSort, MissingPolicy, Order, SortSpec};

    fn bound(specs: Vec<SortSpec>) -> Vec<crate::sort::BoundSortSpec> {
        let mapping = Mapping::builder().field("v", FieldType::Long).build();
        specs
            .iter()
            .map(|spec| spec.bind(&mapping).unwrap())
            .collect()
    }

    fn tuple(ordinal: u32, v: i64) -> RankTuple {
        RankTuple {
            doc: DocRef {
                partition: 0,
                ordinal,
                id: ordinal.to_string(),
            },
            keys: vec![ReducedValue::Value(SortValue::I64(v))],
        }
    }

    #[test]
    fn test_top_n_keeps_best_of_many() {
        let specs = bound(vec![SortSpec::field("v")]);
        let comparator = TupleComparator::for_specs(&specs);
        let mut computer = TopNComputer::new(comparator, 3);
        for (ordinal, v) in [9i64, 2, 7, 1, 8, 3, 6, 0, 5, 4].into_iter().enumerate() {
            computer.push(tuple(ordinal as u32, v));
        }
        let top: Vec<i64> = computer
            .into_sorted_vec()
            .into_iter()
            .map(|t| match &t.keys[0] {
                ReducedValue::Value(SortValue::I64(v)) => *v,
                other => panic!("unexpected key {other:?}"),
            })
            .collect();
        assert_eq!(top, vec![0, 1, 2]);
    }

    #[test]
    fn test_top_n_smaller_input_than_window() {
        let specs = bound(vec![SortSpec::field("v")]);
        let comparator = TupleComparator::for_specs(&specs);
        let mut computer = TopNComputer::new(comparator, 10);
        computer.push(tuple(0, 2));
        computer.push(tuple(1, 1));
        assert_eq!(computer.into_sorted_vec().len(), 2);
    }

    #[test]
    fn test_sort_partition_ranks_and_counts() {
        let specs = bound(vec![SortSpec::Field(
            FieldSort::new("v").order(Order::Desc),
        )]);
        let comparator = TupleComparator::for_specs(&specs);
        let partition = Partition::new(
            3,
            vec![
                Document::new("a", json!({"v": 5})),
                Document::new("b", json!({"v": 9})),
                Document::new("c", json!({"v": 1})),
            ],
        );
        let result = sort_partition(&partition, &specs, &comparator, 2).unwrap();
        assert_eq!(result.total_matches, 3);
        assert_eq!(
            result.hits.iter().map(|h| h.doc.id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert!(result.hits.iter().all(|h| h.doc.partition == 3));
    }

    #[test]
    fn test_literal_missing_substituted_before_ranking() {
        let specs = bound(vec![SortSpec::Field(
            FieldSort::new("v").missing(MissingPolicy::Literal(SortValue::I64(2))),
        )]);
        let comparator = TupleComparator::for_specs(&specs);
        let partition = Partition::new(
            0,
            vec![
                Document::new("a", json!({"v": 1})),
                Document::new("b", json!({})),
                Document::new("c", json!({"v": 3})),
            ],
        );
        let result = sort_partition(&partition, &specs, &comparator, 3).unwrap();
        assert_eq!(
            result.hits.iter().map(|h| h.doc.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            result.hits[1].keys[0],
            ReducedValue::Value(SortValue::I64(2))
        );
    }

    #[test]
    fn test_decoding_failure_fails_the_partition() {
        let specs = bound(vec![SortSpec::field("v")]);
        let comparator = TupleComparator::for_specs(&specs);
        let partition = Partition::new(
            0,
            vec![
                Document::new("a", json!({"v": 1})),
                Document::new("b", json!({"v": "broken"})),
            ],
        );
        assert!(sort_partition(&partition, &specs, &comparator, 10).is_err());
    }
}
