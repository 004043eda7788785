use crate::{capability::Capability, catalog::Catalog};
use ahash::AHashMap as HashMap;
use fleet_seed_controller_k8s_api::{labels::Labels, Policy};
use std::collections::BTreeSet;

/// Describes the seed the desired set is computed for.
#[derive(Clone, Debug, Default)]
pub struct SeedState {
    pub labels: Labels,
    pub deleting: bool,
    /// The number of shoots scheduled onto or running on the seed.
    pub shoots: usize,
}

/// A required capability is not served by any registration.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no registration found for {0}")]
pub struct Unsatisfied(pub Capability);

/// Computes the names of registrations that must be installed on a seed.
///
/// `required_installations` names registrations whose installation on the
/// seed reports that it is still required; these are kept even when no
/// capability calls for them. The seed selectors of the registrations are
/// applied last and override every other reason to install.
pub fn registrations<'r>(
    required: &BTreeSet<Capability>,
    catalog: &Catalog,
    seed: &SeedState,
    required_installations: impl IntoIterator<Item = &'r str>,
) -> Result<BTreeSet<String>, Unsatisfied> {
    let mut by_capability = HashMap::<&Capability, Vec<&str>>::new();
    for registration in catalog.iter() {
        for capability in registration.capabilities() {
            by_capability
                .entry(capability)
                .or_default()
                .push(registration.name());
        }
    }

    let mut wanted = BTreeSet::<String>::new();

    if !seed.deleting {
        wanted.extend(catalog.with_policy(Policy::Always).map(String::from));
    }
    if seed.shoots > 0 {
        wanted.extend(
            catalog
                .with_policy(Policy::AlwaysExceptNoShoots)
                .map(String::from),
        );
    }

    for capability in required {
        match by_capability.get(capability) {
            Some(names) => wanted.extend(names.iter().copied().map(String::from)),
            None => return Err(Unsatisfied(capability.clone())),
        }
    }

    wanted.extend(required_installations.into_iter().map(String::from));

    // Registrations that are no longer in the catalog are kept: there is no
    // selector to evaluate and nothing will be created for them.
    wanted.retain(|name| {
        catalog
            .get(name)
            .map_or(true, |r| r.selects_seed(&seed.labels))
    });

    Ok(wanted)
}
