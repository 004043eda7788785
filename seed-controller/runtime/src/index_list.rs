use kubert::index::{ClusterRemoved, IndexClusterResource};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Feeds a single watch into several indexes.
pub(crate) struct IndexList<A, T = A> {
    index: Arc<RwLock<A>>,
    tail: Option<T>,
}

/// Signals that the indexed kind changed. Signals are coalesced while one is
/// pending.
pub(crate) struct Notify(mpsc::Sender<()>);

// === impl IndexList ===

impl<A, T, R> IndexClusterResource<R> for IndexList<A, T>
where
    A: IndexClusterResource<R>,
    T: IndexClusterResource<R>,
    R: Clone,
{
    fn apply(&mut self, resource: R) {
        if let Some(tail) = &mut self.tail {
            tail.apply(resource.clone());
        }
        self.index.write().apply(resource);
    }

    fn delete(&mut self, name: String) {
        if let Some(tail) = &mut self.tail {
            tail.delete(name.clone());
        }
        self.index.write().delete(name);
    }

    fn reset(&mut self, resources: Vec<R>, removed: ClusterRemoved) {
        if let Some(tail) = &mut self.tail {
            tail.reset(resources.clone(), removed.clone());
        }
        self.index.write().reset(resources, removed);
    }
}

impl<A> IndexList<A> {
    pub(crate) fn new(index: Arc<RwLock<A>>) -> Self {
        Self { index, tail: None }
    }
}

impl<A, T> IndexList<A, T> {
    pub(crate) fn push<B>(self, index: Arc<RwLock<B>>) -> IndexList<B, IndexList<A, T>> {
        IndexList {
            index,
            tail: Some(self),
        }
    }

    pub(crate) fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }
}

// === impl Notify ===

impl Notify {
    pub(crate) fn shared(tx: mpsc::Sender<()>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self(tx)))
    }

    fn notify(&self) {
        // A full channel already holds a pending signal.
        let _ = self.0.try_send(());
    }
}

impl<R> IndexClusterResource<R> for Notify {
    fn apply(&mut self, _: R) {
        self.notify();
    }

    fn delete(&mut self, _: String) {
        self.notify();
    }

    fn reset(&mut self, _: Vec<R>, _: ClusterRemoved) {
        self.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Cache;
    use crate::k8s::{
        backup::BackupProvider, BackupBucket, BackupBucketSpec, ObjectMeta, ResourceExt,
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

    #[test]
    fn feeds_every_index() {
        let cache = Cache::<BackupBucket>::shared();
        let (tx, mut rx) = mpsc::channel(1);
        let list = IndexList::new(cache.clone()).push(Notify::shared(tx)).shared();

        list.write().reset(vec![bucket("a")], Default::default());
        list.write().apply(bucket("b"));
        assert_eq!(rx.try_recv(), Ok(()));
        assert!(rx.try_recv().is_err(), "signals must be coalesced");

        list.write().delete("a".to_string());
        assert_eq!(rx.try_recv(), Ok(()));

        assert!(cache.read().is_synced());
        let names = cache
            .read()
            .list()
            .iter()
            .map(|b| b.name_unchecked())
            .collect::<Vec<_>>();
        assert_eq!(names, ["b"]);
    }
}
