//! Access to the objects read and written by the seed controllers.
//!
//! Every kind is exposed as a [`Collection`]. Lists may be served from a
//! watch-fed cache or read live from the API server; the installation list
//! that drives creation is always read live so that two reconciliations can't
//! both decide to create an installation for the same registration.

use fleet_seed_controller_k8s_api::{
    self as k8s, BackupBucket, BackupEntry, ControllerInstallation, ControllerRegistration,
    DeleteParams, ListParams, PostParams, Resource, ResourceExt, Shoot,
};
use fleet_seed_controller_k8s_index::SharedCache;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt, sync::Arc};

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Selects where a list is served from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Read {
    /// Served from a watch-fed cache, which may lag behind the API server.
    Cached,
    /// Served by the API server.
    Live,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("{kind} {name} was modified concurrently")]
    Conflict { kind: String, name: String },

    #[error("{kind} cache has not synced")]
    NotSynced { kind: String },

    #[error(transparent)]
    Api(#[from] k8s::Error),
}

#[async_trait::async_trait]
pub trait Collection<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn list(&self, read: Read) -> Result<Vec<K>>;

    async fn get(&self, name: &str) -> Result<K>;

    /// Creates `object`. If the object has no name, the server generates one
    /// from its `generateName` prefix.
    async fn create(&self, object: K) -> Result<K>;

    /// Replaces `object`, failing with [`StoreError::Conflict`] if its
    /// resource version is no longer current.
    async fn update(&self, object: K) -> Result<K>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// The collections read and written by the seed controllers.
#[derive(Clone)]
pub struct Store {
    pub backup_buckets: Arc<dyn Collection<BackupBucket>>,
    pub backup_entries: Arc<dyn Collection<BackupEntry>>,
    pub shoots: Arc<dyn Collection<Shoot>>,
    pub registrations: Arc<dyn Collection<ControllerRegistration>>,
    pub installations: Arc<dyn Collection<ControllerInstallation>>,
}

/// A collection backed by the Kubernetes API, optionally with a cache for
/// [`Read::Cached`] lists.
pub struct KubeCollection<K> {
    api: k8s::Api<K>,
    cache: Option<SharedCache<K>>,
}

// === impl StoreError ===

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn not_found<K: Resource<DynamicType = ()>>(name: impl ToString) -> Self {
        Self::NotFound {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists<K: Resource<DynamicType = ()>>(name: impl ToString) -> Self {
        Self::AlreadyExists {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
        }
    }

    pub fn conflict<K: Resource<DynamicType = ()>>(name: impl ToString) -> Self {
        Self::Conflict {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
        }
    }

    /// Classifies an API error by its status code.
    fn from_api<K: Resource<DynamicType = ()>>(name: &str, error: k8s::Error) -> Self {
        match &error {
            k8s::Error::Api(rsp) if rsp.code == 404 => Self::not_found::<K>(name),
            k8s::Error::Api(rsp) if rsp.code == 409 && rsp.reason == "AlreadyExists" => {
                Self::already_exists::<K>(name)
            }
            k8s::Error::Api(rsp) if rsp.code == 409 => Self::conflict::<K>(name),
            _ => Self::Api(error),
        }
    }
}

// === impl Store ===

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

// === impl KubeCollection ===

impl<K> KubeCollection<K>
where
    K: Resource<DynamicType = ()>,
{
    pub fn new(client: k8s::Client) -> Self {
        Self {
            api: k8s::Api::all(client),
            cache: None,
        }
    }

    pub fn with_cache(self, cache: SharedCache<K>) -> Self {
        Self {
            cache: Some(cache),
            ..self
        }
    }
}

#[async_trait::async_trait]
impl<K> Collection<K> for KubeCollection<K>
where
    K: Resource<DynamicType = ()>,
    K: Clone + fmt::Debug + DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn list(&self, read: Read) -> Result<Vec<K>> {
        if let (Read::Cached, Some(cache)) = (read, self.cache.as_ref()) {
            let cache = cache.read();
            if !cache.is_synced() {
                return Err(StoreError::NotSynced {
                    kind: K::kind(&()).to_string(),
                });
            }
            return Ok(cache.list());
        }

        let list = self.api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get(&self, name: &str) -> Result<K> {
        self.api
            .get(name)
            .await
            .map_err(|e| StoreError::from_api::<K>(name, e))
    }

    async fn create(&self, object: K) -> Result<K> {
        let name = object
            .meta()
            .name
            .clone()
            .or_else(|| object.meta().generate_name.clone())
            .unwrap_or_default();
        self.api
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| StoreError::from_api::<K>(&name, e))
    }

    async fn update(&self, object: K) -> Result<K> {
        let name = object.name_unchecked();
        self.api
            .replace(&name, &PostParams::default(), &object)
            .await
            .map_err(|e| StoreError::from_api::<K>(&name, e))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| StoreError::from_api::<K>(name, e))
    }
}
