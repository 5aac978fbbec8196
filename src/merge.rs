//! Cross-partition coordination: fan out the sort to every partition, then
//! merge the per-partition windows into one global window.

use std::sync::Arc;

use serde::Serialize;

use crate::collector::{sort_partition, PartitionResult};
use crate::compare::{RankTuple, TupleComparator};
use crate::doc::Partition;
use crate::executor::Executor;
use crate::future_result::FutureResult;
use crate::mapping::Mapping;
use crate::sort::{BoundSortSpec, SortSpec};
use crate::{PartitionId, Result, SortError};

/// A validated sort request: criteria plus the result window.
#[derive(Debug, Clone)]
pub struct SortRequest {
    sort: Vec<SortSpec>,
    from: usize,
    size: usize,
}

impl SortRequest {
    /// Creates a request for the given criteria, with the default window of
    /// the first 10 hits. An empty criteria list sorts by descending score.
    pub fn new(sort: Vec<SortSpec>) -> SortRequest {
        SortRequest {
            sort,
            from: 0,
            size: 10,
        }
    }

    /// Sets the number of leading hits to skip.
    pub fn from(mut self, from: usize) -> SortRequest {
        self.from = from;
        self
    }

    /// Sets the number of hits to return.
    pub fn size(mut self, size: usize) -> SortRequest {
        self.size = size;
        self
    }

    /// The number of leading hits skipped.
    pub fn from_offset(&self) -> usize {
        self.from
    }

    /// The number of hits returned.
    pub fn window_size(&self) -> usize {
        self.size
    }

    fn bind(&self, mapping: &Mapping) -> Result<Vec<BoundSortSpec>> {
        if self.sort.is_empty() {
            return Ok(vec![SortSpec::score().bind(mapping)?]);
        }
        self.sort.iter().map(|spec| spec.bind(mapping)).collect()
    }
}

/// One partition that could not be evaluated.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionFailure {
    /// The failing partition.
    pub partition: PartitionId,
    /// Human-readable cause.
    pub reason: String,
}

/// The globally merged result window.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalResult {
    /// The requested window of globally ranked hits.
    pub hits: Vec<RankTuple>,
    /// Total matches across the partitions that succeeded.
    pub total_matches: u64,
    /// Partitions that failed evaluation and contribute no hits.
    pub failures: Vec<PartitionFailure>,
}

/// Runs sort requests: binds, fans out to partitions, merges.
///
/// Cloning is cheap and shares the underlying executor.
#[derive(Clone, Default)]
pub struct MergeCoordinator {
    executor: Arc<Executor>,
}

impl MergeCoordinator {
    /// Creates a coordinator that sorts partitions on the caller thread.
    pub fn single_thread() -> MergeCoordinator {
        MergeCoordinator {
            executor: Arc::new(Executor::single_thread()),
        }
    }

    /// Creates a coordinator running partition sorts on the given executor.
    pub fn new(executor: Executor) -> MergeCoordinator {
        MergeCoordinator {
            executor: Arc::new(executor),
        }
    }

    /// Executes a sort request over the given partitions.
    ///
    /// Request validation errors fail the whole request before any partition
    /// work starts. Evaluation errors inside one partition only exclude that
    /// partition; the merged window is built from the partitions that
    /// succeeded, unless every partition failed.
    pub fn execute(
        &self,
        request: &SortRequest,
        mapping: &Mapping,
        partitions: &[Partition],
    ) -> Result<GlobalResult> {
        let specs = request.bind(mapping)?;
        let comparator = TupleComparator::for_specs(&specs);
        let window = request.from + request.size;
        debug!(
            "executing sort over {} partitions, window {window}",
            partitions.len()
        );

        // Partition evaluation errors are part of the fruit, so one bad
        // partition does not abort the map.
        let fruits: Vec<(PartitionId, Result<PartitionResult>)> = self.executor.map(
            |partition| {
                let result = sort_partition(partition, &specs, &comparator, window)
                    .map_err(|err| err.for_partition(partition.partition_id));
                Ok((partition.partition_id, result))
            },
            partitions.iter(),
        )?;

        let mut successes = Vec::with_capacity(fruits.len());
        let mut failures = Vec::new();
        for (partition_id, fruit) in fruits {
            match fruit {
                Ok(result) => successes.push(result),
                Err(err) => {
                    error!("partition {partition_id} failed: {err}");
                    failures.push(PartitionFailure {
                        partition: partition_id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        if successes.is_empty() && !failures.is_empty() {
            return Err(SortError::AllPartitionsFailed(failures.len()));
        }

        let total_matches = successes.iter().map(|r| r.total_matches).sum();
        let hits = itertools::kmerge_by(
            successes.into_iter().map(|r| r.hits),
            |lhs: &RankTuple, rhs: &RankTuple| {
                comparator.compare_with_tie_break(lhs, rhs) == std::cmp::Ordering::Less
            },
        )
        .skip(request.from)
        .take(request.size)
        .collect();

        Ok(GlobalResult {
            hits,
            total_matches,
            failures,
        })
    }

    /// Executes a sort request on a separate thread, returning a handle that
    /// can be awaited or waited on.
    ///
    /// Validation still happens on the caller thread, so an invalid request
    /// fails before anything is spawned.
    pub fn dispatch(
        &self,
        request: SortRequest,
        mapping: Mapping,
        partitions: Vec<Partition>,
    ) -> FutureResult<GlobalResult> {
        if let Err(err) = request.bind(&mapping) {
            return FutureResult::from(err);
        }
        let (future_result, sender) =
            FutureResult::create("sort execution thread terminated before sending its result");
        let coordinator = self.clone();
        std::thread::spawn(move || {
            let result = coordinator.execute(&request, &mapping, &partitions);
            let _ = sender.send(result);
        });
        future_result
    }
}
