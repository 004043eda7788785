//! Converges the installations bound to a seed onto a wanted set of
//! registrations.

use crate::store::{Collection, StoreError};
use fleet_seed_controller_core::{
    catalog::{Catalog, Registration},
    hash,
};
use fleet_seed_controller_k8s_api::{
    installation::{ObjectReference, REGISTRATION_SPEC_HASH_LABEL, SEED_SPEC_HASH_LABEL},
    ControllerInstallation, ControllerInstallationSpec, ObjectMeta, ResourceExt, Seed,
};
use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};
use tracing::{debug, info};

/// The installations bound to a seed, indexed by registration.
#[derive(Clone, Debug, Default)]
pub struct Existing {
    by_registration: BTreeMap<String, String>,
    required: BTreeSet<String>,
    surplus: Vec<(String, String)>,
}

/// The changes made by a [`converge`] run, by registration name. Deletions are
/// recorded by installation name; `gone` holds the installations that had
/// already been deleted by the time they were to be removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    pub gone: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to hash {kind} {name} spec: {source}")]
    Hash {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {op} ControllerInstallation for {registration}: {source}")]
    Store {
        op: &'static str,
        registration: String,
        #[source]
        source: StoreError,
    },
}

/// The labels and spec an installation of a registration should carry.
struct Desired {
    registration: String,
    labels: [(&'static str, String); 2],
    spec: ControllerInstallationSpec,
}

/// Creates, updates and deletes installations bound to `seed` so that exactly
/// the `wanted` registrations are installed.
///
/// Registrations that are missing from the catalog or are being deleted are
/// never written; an installation that already exists for one is left alone
/// for as long as the registration is wanted. The first failure aborts the run.
pub async fn converge(
    installations: &dyn Collection<ControllerInstallation>,
    catalog: &Catalog,
    seed: &Seed,
    wanted: &BTreeSet<String>,
    existing: &Existing,
) -> Result<Summary, Error> {
    let seed_name = seed.name_unchecked();
    let seed_hash = hash::spec_hash(&seed.spec).map_err(|source| Error::Hash {
        kind: "Seed",
        name: seed_name.clone(),
        source,
    })?;
    let seed_ref = ObjectReference {
        name: seed_name,
        resource_version: seed.resource_version(),
    };

    let mut summary = Summary::default();

    for name in wanted {
        let registration = match catalog.get(name) {
            Some(registration) if !registration.is_deleting() => registration,
            Some(_) => {
                debug!(registration = %name, "Registration is being deleted");
                summary.skipped.push(name.clone());
                continue;
            }
            None => {
                debug!(registration = %name, "Registration not found");
                summary.skipped.push(name.clone());
                continue;
            }
        };

        let desired = Desired::new(registration, &seed_ref, &seed_hash)?;
        let live = match existing.get(name) {
            Some(installation) => match installations.get(installation).await {
                Ok(live) => Some(live),
                Err(error) if error.is_not_found() => None,
                Err(source) => return Err(Error::store("get", name, source)),
            },
            None => None,
        };

        match live {
            Some(mut installation) => {
                if !desired.apply(&mut installation) {
                    summary.unchanged.push(name.clone());
                    continue;
                }
                let installation = installations
                    .update(installation)
                    .await
                    .map_err(|source| Error::store("update", name, source))?;
                info!(installation = %installation.name_unchecked(), registration = %name, "Updated");
                summary.updated.push(name.clone());
            }
            None => {
                let installation = installations
                    .create(desired.into_installation())
                    .await
                    .map_err(|source| Error::store("create", name, source))?;
                info!(installation = %installation.name_unchecked(), registration = %name, "Created");
                summary.created.push(name.clone());
            }
        }
    }

    let unwanted = existing
        .iter()
        .filter(|(registration, _)| !wanted.contains(*registration));
    for (registration, installation) in unwanted.chain(existing.surplus()) {
        match installations.delete(installation).await {
            Ok(()) => {
                info!(%installation, %registration, "Deleted");
                summary.deleted.push(installation.to_string());
            }
            Err(error) if error.is_not_found() => {
                debug!(%installation, %registration, "Already deleted");
                summary.gone.push(installation.to_string());
            }
            Err(source) => return Err(Error::store("delete", registration, source)),
        }
    }

    Ok(summary)
}

// === impl Existing ===

impl Existing {
    /// Indexes the installations bound to `seed`. Should more than one
    /// installation exist for a registration, the first one is kept and the
    /// others are marked surplus.
    pub fn index(
        installations: impl IntoIterator<Item = ControllerInstallation>,
        seed: &str,
    ) -> Self {
        let mut existing = Self::default();
        for installation in installations {
            if installation.spec.seed_ref.name != seed {
                continue;
            }

            let registration = installation.spec.registration_ref.name.clone();
            if installation.is_required() {
                existing.required.insert(registration.clone());
            }
            match existing.by_registration.entry(registration) {
                Entry::Vacant(entry) => {
                    entry.insert(installation.name_unchecked());
                }
                Entry::Occupied(entry) => {
                    tracing::warn!(
                        registration = %entry.key(),
                        installation = %installation.name_unchecked(),
                        "Duplicate installation",
                    );
                    existing
                        .surplus
                        .push((entry.key().clone(), installation.name_unchecked()));
                }
            }
        }
        existing
    }

    /// Returns the name of the installation of `registration`.
    pub fn get(&self, registration: &str) -> Option<&str> {
        self.by_registration.get(registration).map(String::as_str)
    }

    /// Iterates over `(registration, installation)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_registration
            .iter()
            .map(|(r, i)| (r.as_str(), i.as_str()))
    }

    /// Registrations whose installation reports that it is still required.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    fn surplus(&self) -> impl Iterator<Item = (&str, &str)> {
        self.surplus.iter().map(|(r, i)| (r.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_registration.len() + self.surplus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// === impl Summary ===

impl Summary {
    /// Indicates whether the run wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

// === impl Error ===

impl Error {
    fn store(op: &'static str, registration: &str, source: StoreError) -> Self {
        Self::Store {
            op,
            registration: registration.to_string(),
            source,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_conflict())
    }
}

// === impl Desired ===

impl Desired {
    fn new(
        registration: &Registration,
        seed_ref: &ObjectReference,
        seed_hash: &str,
    ) -> Result<Self, Error> {
        let resource = registration.resource();
        let registration_hash =
            hash::spec_hash(&resource.spec).map_err(|source| Error::Hash {
                kind: "ControllerRegistration",
                name: registration.name().to_string(),
                source,
            })?;

        Ok(Self {
            registration: registration.name().to_string(),
            labels: [
                (REGISTRATION_SPEC_HASH_LABEL, registration_hash),
                (SEED_SPEC_HASH_LABEL, seed_hash.to_string()),
            ],
            spec: ControllerInstallationSpec {
                seed_ref: seed_ref.clone(),
                registration_ref: ObjectReference {
                    name: registration.name().to_string(),
                    resource_version: resource.resource_version(),
                },
            },
        })
    }

    /// Brings `installation` in line with the desired state, preserving
    /// unrelated labels. Returns whether anything changed.
    fn apply(&self, installation: &mut ControllerInstallation) -> bool {
        let mut changed = false;

        let labels = installation.labels_mut();
        for (key, value) in &self.labels {
            if labels.get(*key) != Some(value) {
                labels.insert(key.to_string(), value.clone());
                changed = true;
            }
        }

        if installation.spec != self.spec {
            installation.spec = self.spec.clone();
            changed = true;
        }

        changed
    }

    fn into_installation(self) -> ControllerInstallation {
        let labels = self
            .labels
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        ControllerInstallation {
            metadata: ObjectMeta {
                generate_name: Some(format!("{}-", self.registration)),
                labels: Some(labels),
                ..Default::default()
            },
            spec: self.spec,
            status: None,
        }
    }
}
