#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod backup;
pub mod installation;
pub mod labels;
pub mod registration;
pub mod seed;
pub mod shoot;

pub use self::{
    backup::{BackupBucket, BackupBucketSpec, BackupEntry, BackupEntrySpec},
    installation::{ControllerInstallation, ControllerInstallationSpec},
    labels::Labels,
    registration::{ControllerRegistration, ControllerRegistrationSpec, Policy},
    seed::{Seed, SeedSpec},
    shoot::{Shoot, ShootSpec},
};
pub use k8s_openapi::{
    api::{self, core::v1::Secret},
    apimachinery,
};
pub use kube::{
    api::{Api, DeleteParams, ListParams, ObjectMeta, PostParams, ResourceExt},
    error::ErrorResponse,
    runtime::watcher,
    Client, Error, Resource,
};

/// Spec fields that are not modeled explicitly. They are kept so that a
/// resource serializes back to the spec it was read from.
pub type Extra = std::collections::BTreeMap<String, serde_json::Value>;

/// Returns true if the object carries a deletion timestamp.
pub fn is_deleting<T: Resource>(resource: &T) -> bool {
    resource.meta().deletion_timestamp.is_some()
}
