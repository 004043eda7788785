//! Computes the capabilities a seed requires from the objects scheduled onto
//! it.
//!
//! Every function here is pure: the same inputs always produce the same set,
//! and results from different sources are combined by set union.

use crate::capability::{self, Capability};
use ahash::AHashMap as HashMap;
use fleet_seed_controller_k8s_api::{
    self as k8s, BackupBucket, BackupEntry, ControllerRegistration, Seed, Shoot,
};
use std::collections::BTreeSet;

pub type Capabilities = BTreeSet<Capability>;

/// Looks up buckets by name, regardless of the seed they're assigned to.
pub type BucketIndex<'b> = HashMap<&'b str, &'b BackupBucket>;

/// Collects the capabilities required by buckets assigned to `seed`.
///
/// Every bucket is indexed so that entries can be resolved even when their
/// bucket lives on another seed.
pub fn backup_buckets<'b>(
    buckets: &'b [BackupBucket],
    seed: &str,
) -> (Capabilities, BucketIndex<'b>) {
    let mut required = Capabilities::new();
    let mut index = BucketIndex::with_capacity(buckets.len());

    for bucket in buckets {
        if let Some(name) = bucket.metadata.name.as_deref() {
            index.insert(name, bucket);
        }

        if bucket.spec.seed_name.as_deref() == Some(seed) {
            required.insert(Capability::new(
                capability::BACKUP_BUCKET,
                &bucket.spec.provider.type_,
            ));
        }
    }

    (required, index)
}

/// Collects the capabilities required by entries assigned to `seed`.
///
/// Entries are served by the extension of their bucket's provider. Entries
/// whose bucket cannot be found are skipped.
pub fn backup_entries(
    entries: &[BackupEntry],
    buckets: &BucketIndex<'_>,
    seed: &str,
) -> Capabilities {
    let mut required = Capabilities::new();

    for entry in entries {
        if entry.spec.seed_name.as_deref() != Some(seed) {
            continue;
        }

        match buckets.get(entry.spec.bucket_name.as_str()) {
            Some(bucket) => {
                required.insert(Capability::new(
                    capability::BACKUP_ENTRY,
                    &bucket.spec.provider.type_,
                ));
            }
            None => tracing::info!(
                entry = ?entry.metadata.name,
                bucket = %entry.spec.bucket_name,
                "Ignoring BackupEntry referencing an unknown BackupBucket"
            ),
        }
    }

    required
}

/// Collects the capabilities a shoot requires from the fields of its spec.
///
/// The provider of the shoot's external domain is not known here; see
/// [`external_domain`].
pub fn shoot(shoot: &Shoot) -> Capabilities {
    let spec = &shoot.spec;
    let provider = spec.provider.type_.as_str();

    let mut required: Capabilities = [
        capability::CONTROL_PLANE,
        capability::INFRASTRUCTURE,
        capability::WORKER,
    ]
    .into_iter()
    .map(|kind| Capability::new(kind, provider))
    .collect();

    for worker in &spec.provider.workers {
        if let Some(image) = worker.machine.image.as_ref() {
            required.insert(Capability::new(
                capability::OPERATING_SYSTEM_CONFIG,
                &image.name,
            ));
        }

        for runtime in worker.cri.iter().flat_map(|cri| cri.container_runtimes.iter()) {
            required.insert(Capability::new(
                capability::CONTAINER_RUNTIME,
                &runtime.type_,
            ));
        }
    }

    if let Some(network) = spec.networking.as_ref().and_then(|n| n.type_.as_deref()) {
        required.insert(Capability::new(capability::NETWORK, network));
    }

    for extension in &spec.extensions {
        if extension.disabled != Some(true) {
            required.insert(Capability::new(capability::EXTENSION, &extension.type_));
        }
    }

    for provider in spec.dns.iter().flat_map(|dns| dns.providers.iter()) {
        if let Some(type_) = provider.type_.as_deref() {
            required.insert(Capability::new(capability::DNS_RECORD, type_));
        }
    }

    required
}

/// The capability required to manage records of an external domain served by
/// `provider`.
pub fn external_domain(provider: &str) -> Capability {
    Capability::new(capability::DNS_RECORD, provider)
}

/// Collects the capabilities a seed requires for itself.
///
/// `domain_providers` are the DNS providers of the operator's internal and
/// default domains. They are only required while the seed manages shoot DNS.
///
/// A seed that is being deleted requires nothing so that its installations
/// can be torn down.
pub fn seed(
    seed: &Seed,
    registrations: &[ControllerRegistration],
    domain_providers: &[&str],
) -> Capabilities {
    let mut required = Capabilities::new();
    if k8s::is_deleting(seed) {
        return required;
    }

    let spec = &seed.spec;
    required.insert(Capability::new(
        capability::CONTROL_PLANE,
        &spec.provider.type_,
    ));

    if let Some(backup) = spec.backup.as_ref() {
        required.insert(Capability::new(capability::BACKUP_BUCKET, &backup.provider));
        required.insert(Capability::new(capability::BACKUP_ENTRY, &backup.provider));
    }

    if let Some(dns) = spec.dns_provider_type() {
        required.insert(Capability::new(capability::DNS_RECORD, dns));
    }

    if spec.shoot_dns_enabled() {
        for provider in domain_providers {
            required.insert(Capability::new(capability::DNS_RECORD, *provider));
        }
    }

    for resource in registrations.iter().flat_map(|r| r.spec.resources.iter()) {
        if resource.kind == capability::EXTENSION && resource.is_globally_enabled() {
            required.insert(Capability::from(resource));
        }
    }

    required
}
