use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Labels the installation with a digest of its registration's spec.
pub const REGISTRATION_SPEC_HASH_LABEL: &str = "registration-spec-hash.fleet.dev";

/// Labels the installation with a digest of its seed's spec.
pub const SEED_SPEC_HASH_LABEL: &str = "seed-spec-hash.fleet.dev";

/// Condition set by the extension while it still has work on the seed.
pub const CONDITION_REQUIRED: &str = "Required";

/// Binds a `ControllerRegistration` to a `Seed`.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "core.fleet.dev",
    version = "v1beta1",
    kind = "ControllerInstallation",
    status = "ControllerInstallationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInstallationSpec {
    pub seed_ref: ObjectReference,
    pub registration_ref: ObjectReference,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ControllerInstallationStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ControllerInstallation {
    /// Indicates whether the extension has asked to keep this installation
    /// around.
    pub fn is_required(&self) -> bool {
        self.status.iter().flat_map(|s| s.conditions.iter()).any(|c| {
            c.type_ == CONDITION_REQUIRED && c.status == ConditionStatus::True
        })
    }
}
