//! An in-memory store for tests.

use crate::{
    domain::{DomainResolver, PrimaryProvider},
    store::{Collection, Read, Result, StoreError},
};
use fleet_seed_controller_k8s_api::{Resource, ResourceExt, Shoot};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

/// A collection that checks resource versions and records writes.
pub(crate) struct Memory<K> {
    state: Mutex<State<K>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Write {
    Create(String),
    Update(String),
    Delete(String),
}

struct State<K> {
    objects: BTreeMap<String, K>,
    cached: Option<Vec<K>>,
    synced: bool,
    version: u64,
    generated: u64,
    writes: Vec<Write>,
}

/// Resolves external domains from primary providers, failing for the named
/// shoots.
#[derive(Clone, Debug)]
pub(crate) struct Domains {
    pub failing: BTreeSet<String>,
    /// Default domain providers; `None` fails the lookup.
    pub defaults: Option<Vec<String>>,
}

// === impl Memory ===

impl<K> Memory<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(objects: impl IntoIterator<Item = K>) -> Self {
        let mut state = State {
            objects: BTreeMap::new(),
            cached: None,
            synced: true,
            version: 0,
            generated: 0,
            writes: vec![],
        };
        for mut object in objects {
            state.bump(&mut object);
            state.objects.insert(object.name_unchecked(), object);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Serves cached lists from `objects` rather than the current state.
    pub(crate) fn with_cached(self, objects: Vec<K>) -> Self {
        self.state.lock().cached = Some(objects);
        self
    }

    /// Fails cached lists as though the cache had not synced.
    pub(crate) fn unsynced(self) -> Self {
        self.state.lock().synced = false;
        self
    }

    pub(crate) fn objects(&self) -> Vec<K> {
        self.state.lock().objects.values().cloned().collect()
    }

    pub(crate) fn writes(&self) -> Vec<Write> {
        self.state.lock().writes.clone()
    }

    pub(crate) fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Changes an object without recording a write, as another client would.
    pub(crate) fn modify(&self, name: &str, f: impl FnOnce(&mut K)) {
        let mut state = self.state.lock();
        let mut object = state.objects.get(name).cloned().expect("object must exist");
        f(&mut object);
        state.bump(&mut object);
        state.objects.insert(name.to_string(), object);
    }

    /// Deletes an object without recording a write, as another client would.
    pub(crate) fn remove(&self, name: &str) {
        self.state.lock().objects.remove(name);
    }
}

impl<K: Resource> State<K> {
    fn bump(&mut self, object: &mut K) {
        self.version += 1;
        object.meta_mut().resource_version = Some(self.version.to_string());
    }
}

#[async_trait::async_trait]
impl<K> Collection<K> for Memory<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn list(&self, read: Read) -> Result<Vec<K>> {
        let state = self.state.lock();
        if read == Read::Live {
            return Ok(state.objects.values().cloned().collect());
        }
        if !state.synced {
            return Err(StoreError::NotSynced {
                kind: K::kind(&()).to_string(),
            });
        }
        Ok(state
            .cached
            .clone()
            .unwrap_or_else(|| state.objects.values().cloned().collect()))
    }

    async fn get(&self, name: &str) -> Result<K> {
        self.state
            .lock()
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found::<K>(name))
    }

    async fn create(&self, mut object: K) -> Result<K> {
        let mut state = self.state.lock();
        let name = match (object.meta().name.clone(), object.meta().generate_name.clone()) {
            (Some(name), _) => name,
            (None, Some(prefix)) => {
                state.generated += 1;
                format!("{prefix}{:05}", state.generated)
            }
            (None, None) => panic!("object must have a name or generateName"),
        };
        if state.objects.contains_key(&name) {
            return Err(StoreError::already_exists::<K>(name));
        }

        object.meta_mut().name = Some(name.clone());
        state.bump(&mut object);
        state.objects.insert(name.clone(), object.clone());
        state.writes.push(Write::Create(name));
        Ok(object)
    }

    async fn update(&self, mut object: K) -> Result<K> {
        let mut state = self.state.lock();
        let name = object.name_unchecked();
        let current = state
            .objects
            .get(&name)
            .ok_or_else(|| StoreError::not_found::<K>(&name))?;
        if current.resource_version() != object.resource_version() {
            return Err(StoreError::conflict::<K>(name));
        }

        state.bump(&mut object);
        state.objects.insert(name.clone(), object.clone());
        state.writes.push(Write::Update(name));
        Ok(object)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .objects
            .remove(name)
            .ok_or_else(|| StoreError::not_found::<K>(name))?;
        state.writes.push(Write::Delete(name.to_string()));
        Ok(())
    }
}

// === impl Domains ===

impl Default for Domains {
    fn default() -> Self {
        Self::with_defaults(&[])
    }
}

impl Domains {
    pub(crate) fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            defaults: Some(vec![]),
        }
    }

    pub(crate) fn with_defaults(providers: &[&str]) -> Self {
        Self {
            failing: BTreeSet::new(),
            defaults: Some(providers.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            failing: BTreeSet::new(),
            defaults: None,
        }
    }
}

#[async_trait::async_trait]
impl DomainResolver for Domains {
    async fn external_domain_provider(&self, shoot: &Shoot) -> anyhow::Result<Option<String>> {
        let name = shoot.name_unchecked();
        if self.failing.contains(&name) {
            anyhow::bail!("no default domain matches shoot {name}");
        }
        PrimaryProvider.external_domain_provider(shoot).await
    }

    async fn default_domain_providers(&self) -> anyhow::Result<Vec<String>> {
        match &self.defaults {
            Some(providers) => Ok(providers.clone()),
            None => anyhow::bail!("default domain secrets are unavailable"),
        }
    }
}
