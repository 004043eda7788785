use crate::cache::SharedCache;
use fleet_seed_controller_k8s_api::ResourceExt;
use kubert::index::{ClusterRemoved, IndexClusterResource};
use parking_lot::RwLock;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

/// Records cache activity per kind before delegating to the cache.
pub struct CacheMetrics<T> {
    inner: SharedCache<T>,
    families: Families,
}

#[derive(Clone, Debug, Default)]
pub struct Families {
    cache_size: Family<KindLabels, Gauge>,
    cache_applies: Family<KindLabels, Counter>,
    cache_deletes: Family<KindLabels, Counter>,
    cache_resets: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: String,
}

// === impl Families ===

impl Families {
    pub fn register(prom: &mut Registry) -> Self {
        let cache_size = Family::default();
        prom.register(
            "cache_size",
            "Gauge of the number of resources in the cache",
            cache_size.clone(),
        );

        let cache_applies = Family::default();
        prom.register(
            "cache_applies",
            "Count of applies to the cache",
            cache_applies.clone(),
        );

        let cache_deletes = Family::default();
        prom.register(
            "cache_deletes",
            "Count of deletes from the cache",
            cache_deletes.clone(),
        );

        let cache_resets = Family::default();
        prom.register(
            "cache_resets",
            "Count of resets of the cache",
            cache_resets.clone(),
        );

        Self {
            cache_size,
            cache_applies,
            cache_deletes,
            cache_resets,
        }
    }

    /// Wraps a cache so that updates to it are recorded.
    pub fn instrument<T>(&self, inner: SharedCache<T>) -> Arc<RwLock<CacheMetrics<T>>> {
        Arc::new(RwLock::new(CacheMetrics {
            inner,
            families: self.clone(),
        }))
    }
}

// === impl CacheMetrics ===

impl<T> CacheMetrics<T>
where
    T: ResourceExt<DynamicType = ()>,
{
    fn labels() -> KindLabels {
        KindLabels {
            kind: T::kind(&()).to_string(),
        }
    }

    fn record_size(&self, labels: &KindLabels) {
        let size = self.inner.read().len();
        self.families
            .cache_size
            .get_or_create(labels)
            .set(size as i64);
    }
}

impl<T> IndexClusterResource<T> for CacheMetrics<T>
where
    T: Clone + ResourceExt<DynamicType = ()>,
{
    fn apply(&mut self, resource: T) {
        let labels = Self::labels();
        self.families.cache_applies.get_or_create(&labels).inc();
        self.inner.write().apply(resource);
        self.record_size(&labels);
    }

    fn delete(&mut self, name: String) {
        let labels = Self::labels();
        self.families.cache_deletes.get_or_create(&labels).inc();
        self.inner.write().delete(name);
        self.record_size(&labels);
    }

    fn reset(&mut self, resources: Vec<T>, removed: ClusterRemoved) {
        let labels = Self::labels();
        self.families.cache_resets.get_or_create(&labels).inc();
        self.inner.write().reset(resources, removed);
        self.record_size(&labels);
    }
}
