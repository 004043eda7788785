//! Watch-fed caches of the cluster-scoped resources read by the seed
//! controllers.
//!
//! Each kind is cached independently and is fed by a `kubert::index::cluster`
//! task. A cache only reports itself as synced once the initial listing has
//! been observed so that readers never mistake a partially populated cache for
//! the complete state of the cluster.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod metrics;

pub use self::{
    cache::{Cache, SharedCache},
    metrics::{CacheMetrics, Families as CacheMetricsFamilies},
};
