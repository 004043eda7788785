use crate::capability::Capability;
use fleet_seed_controller_k8s_api::{
    self as k8s, labels, ControllerRegistration, Policy, ResourceExt,
};
use std::collections::BTreeMap;

/// An immutable index of registrations, built from a fresh list at the start
/// of each reconciliation.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    registrations: BTreeMap<String, Registration>,
}

/// A registration as seen by the seed controllers.
#[derive(Clone, Debug)]
pub struct Registration {
    name: String,
    policy: Policy,
    capabilities: Vec<Capability>,
    deleting: bool,
    resource: ControllerRegistration,
}

// === impl Catalog ===

impl Catalog {
    pub fn new(registrations: impl IntoIterator<Item = ControllerRegistration>) -> Self {
        let registrations = registrations
            .into_iter()
            .map(Registration::new)
            .map(|r| (r.name.clone(), r))
            .collect();
        Self { registrations }
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.registrations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.values()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Names of registrations deployed under `policy`.
    pub fn with_policy(&self, policy: Policy) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |r| r.policy == policy)
            .map(|r| r.name())
    }
}

// === impl Registration ===

impl Registration {
    fn new(resource: ControllerRegistration) -> Self {
        Self {
            name: resource.name_unchecked(),
            policy: resource.spec.policy(),
            capabilities: resource.spec.resources.iter().map(Into::into).collect(),
            deleting: k8s::is_deleting(&resource),
            resource,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub fn seed_selector(&self) -> Option<&labels::Selector> {
        self.resource.spec.seed_selector()
    }

    /// Whether this registration may be deployed onto a seed with `labels`.
    /// Registrations without a selector may be deployed anywhere.
    pub fn selects_seed(&self, labels: &labels::Labels) -> bool {
        self.seed_selector().map_or(true, |s| s.matches(labels))
    }

    pub fn resource(&self) -> &ControllerRegistration {
        &self.resource
    }
}
