use fleet_seed_controller_k8s_api::ResourceExt;
use kubert::index::{ClusterRemoved, IndexClusterResource};
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

pub type SharedCache<T> = Arc<RwLock<Cache<T>>>;

/// Holds the latest observed state of every object of a cluster-scoped kind.
///
/// Updated by a single task processing watch events; read by reconcilers.
#[derive(Debug)]
pub struct Cache<T> {
    objects: BTreeMap<String, T>,
    synced: bool,
}

// === impl Cache ===

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            synced: false,
        }
    }
}

impl<T> Cache<T> {
    pub fn shared() -> SharedCache<T> {
        Arc::new(RwLock::new(Self::default()))
    }

    /// Indicates whether the cache has observed a complete listing of the
    /// kind. Until then its contents must not be trusted to be exhaustive.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<T: Clone> Cache<T> {
    pub fn get(&self, name: &str) -> Option<T> {
        self.objects.get(name).cloned()
    }

    /// Returns a snapshot of all cached objects, ordered by name.
    pub fn list(&self) -> Vec<T> {
        self.objects.values().cloned().collect()
    }
}

impl<T> IndexClusterResource<T> for Cache<T>
where
    T: ResourceExt,
{
    fn apply(&mut self, resource: T) {
        let name = resource.name_unchecked();
        tracing::trace!(%name, "Caching");
        self.objects.insert(name, resource);
    }

    fn delete(&mut self, name: String) {
        tracing::trace!(%name, "Evicting");
        self.objects.remove(&name);
    }

    fn reset(&mut self, resources: Vec<T>, removed: ClusterRemoved) {
        for name in removed {
            self.objects.remove(&name);
        }
        for resource in resources {
            self.objects.insert(resource.name_unchecked(), resource);
        }
        self.synced = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_seed_controller_k8s_api::{
        backup::BackupProvider, BackupBucket, BackupBucketSpec, ObjectMeta,
    };

    fn bucket(name: &str) -> BackupBucket {
        BackupBucket {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: BackupBucketSpec {
                provider: BackupProvider {
                    type_: "aws".to_string(),
                    region: None,
                },
                seed_name: None,
            },
        }
    }

    fn names(cache: &Cache<BackupBucket>) -> Vec<String> {
        cache.list().iter().map(|b| b.name_unchecked()).collect()
    }

    #[test]
    fn unsynced_until_reset() {
        let mut cache = Cache::<BackupBucket>::default();
        cache.apply(bucket("a"));
        assert!(!cache.is_synced());
        assert_eq!(names(&cache), ["a"]);

        cache.reset(vec![bucket("b")], Some("a".to_string()).into_iter().collect());
        assert!(cache.is_synced());
        assert_eq!(names(&cache), ["b"]);
    }

    #[test]
    fn apply_and_delete() {
        let mut cache = Cache::<BackupBucket>::default();
        cache.reset(vec![], Default::default());
        cache.apply(bucket("b"));
        cache.apply(bucket("a"));
        cache.apply(bucket("b"));
        assert_eq!(names(&cache), ["a", "b"]);
        assert!(cache.get("a").is_some());

        cache.delete("a".to_string());
        cache.delete("missing".to_string());
        assert_eq!(names(&cache), ["b"]);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 1);
    }
}
