use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A storage location for backups, served by a seed's backup extension.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(group = "core.fleet.dev", version = "v1beta1", kind = "BackupBucket")]
#[serde(rename_all = "camelCase")]
pub struct BackupBucketSpec {
    pub provider: BackupProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct BackupProvider {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// A backup of a shoot's state, stored in a `BackupBucket`.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(group = "core.fleet.dev", version = "v1beta1", kind = "BackupEntry")]
#[serde(rename_all = "camelCase")]
pub struct BackupEntrySpec {
    pub bucket_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,
}
