//! # topmerge
//!
//! Sort-value computation and cross-partition merging for a distributed
//! document search service.
//!
//! A query matches documents spread across many independent partitions, each
//! holding a disjoint slice of the corpus. For every requested sort criterion
//! ([`SortSpec`]), this crate
//!
//! - extracts a comparable ranking value per document (plain field,
//!   geo-distance from one or more origin points, relevance score, or the
//!   synthetic doc order),
//! - reduces multi-valued and nested-object fields to a single comparable
//!   value per document ([`SortMode`]),
//! - applies a missing-value policy when a document lacks the field
//!   ([`MissingPolicy`]),
//! - sorts each partition's matches down to a bounded `from + size` window,
//! - and merges the per-partition windows into one globally correct top-N
//!   result that does not depend on how the corpus was partitioned.
//!
//! ```rust
//! use topmerge::{
//!     Document, FieldType, Mapping, MergeCoordinator, Partition, SortRequest, SortSpec,
//! };
//! use serde_json::json;
//!
//! let mapping = Mapping::builder().field("rank", FieldType::Long).build();
//! let partitions = vec![
//!     Partition::new(0, vec![Document::new("a", json!({"rank": 3}))]),
//!     Partition::new(1, vec![Document::new("b", json!({"rank": 1}))]),
//! ];
//! let request = SortRequest::new(vec![SortSpec::field("rank")]).size(10);
//! let coordinator = MergeCoordinator::single_thread();
//! let result = coordinator.execute(&request, &mapping, &partitions).unwrap();
//! let ids: Vec<&str> = result.hits.iter().map(|hit| hit.doc.id.as_str()).collect();
//! assert_eq!(ids, vec!["b", "a"]);
//! ```

#[macro_use]
extern crate log;

mod collector;
mod compare;
mod doc;
mod error;
mod executor;
mod extract;
mod future_result;
mod geo;
mod mapping;
mod merge;
mod nested;
mod reduce;
mod sort;

pub use crate::collector::{PartitionResult, TopNComputer};
pub use crate::compare::{DocRef, RankTuple, TupleComparator};
pub use crate::doc::{Document, Partition};
pub use crate::error::SortError;
pub use crate::executor::Executor;
pub use crate::future_result::FutureResult;
pub use crate::geo::{DistanceAlgorithm, DistanceUnit, GeoPoint};
pub use crate::mapping::{FieldType, Mapping, MappingBuilder};
pub use crate::merge::{GlobalResult, MergeCoordinator, PartitionFailure, SortRequest};
pub use crate::nested::{ChildFilter, NestedScope, TermFilter};
pub use crate::sort::parse::{FilterParser, SortParser, TermFilterParser};
pub use crate::sort::value::{ReducedValue, SortValue};
pub use crate::sort::{
    BoundSortSpec, DocOrderSort, FieldSort, GeoDistanceSort, MissingPolicy, Order, ScoreSort,
    SortMode, SortSpec,
};

/// Index of a document within its partition, in storage order.
pub type DocId = u32;

/// Identifier of one partition (shard) of the corpus.
pub type PartitionId = u32;

/// Relevance score computed by the (out-of-scope) query-evaluation layer.
///
/// The score is consumed as an opaque comparable value; this crate never
/// computes one itself.
pub type Score = f32;

/// The crate's result type.
pub type Result<T> = std::result::Result<T, error::SortError>;
