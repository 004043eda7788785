use crate::labels;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declares an extension controller, the resources it serves and how it is
/// deployed onto seeds.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "core.fleet.dev",
    version = "v1beta1",
    kind = "ControllerRegistration"
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRegistrationSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ControllerResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<ControllerDeployment>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

/// A `kind`/`type` combination served by a registration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerResource {
    pub kind: String,
    #[serde(rename = "type")]
    pub type_: String,
    /// Only meaningful for `Extension` resources: the extension is required
    /// on every seed regardless of the shoots it hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globally_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_selector: Option<labels::Selector>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

/// Governs whether a registration is deployed unconditionally or only when
/// one of its resources is required on a seed.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Policy {
    /// Deployed to every seed that is not being deleted.
    Always,
    /// Deployed to every seed hosting at least one shoot.
    #[serde(alias = "AlwaysExceptNoWorkloads")]
    AlwaysExceptNoShoots,
    /// Deployed only where one of its resources is required.
    #[default]
    OnDemand,
}

impl ControllerRegistrationSpec {
    pub fn policy(&self) -> Policy {
        self.deployment
            .as_ref()
            .and_then(|d| d.policy)
            .unwrap_or_default()
    }

    pub fn seed_selector(&self) -> Option<&labels::Selector> {
        self.deployment.as_ref()?.seed_selector.as_ref()
    }
}

impl ControllerResource {
    pub fn is_globally_enabled(&self) -> bool {
        self.globally_enabled == Some(true)
    }
}
