use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A cluster that hosts the control planes of shoots.
#[derive(Clone, Debug, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(group = "core.fleet.dev", version = "v1beta1", kind = "Seed")]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    pub provider: SeedProvider,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<SeedBackup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<SeedDns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SeedSettings>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SeedProvider {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SeedBackup {
    /// Provider type of the seed's backup infrastructure.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SeedDns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<SeedDnsProvider>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SeedDnsProvider {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedSettings {
    #[serde(
        default,
        rename = "shootDNS",
        skip_serializing_if = "Option::is_none"
    )]
    pub shoot_dns: Option<ShootDnsSetting>,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ShootDnsSetting {
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: crate::Extra,
}

impl SeedSpec {
    /// Whether the seed manages DNS for the internal and default domains of
    /// the shoots it hosts. Enabled unless explicitly turned off.
    pub fn shoot_dns_enabled(&self) -> bool {
        self.settings
            .as_ref()
            .and_then(|s| s.shoot_dns.as_ref())
            .map_or(true, |dns| dns.enabled)
    }

    pub fn dns_provider_type(&self) -> Option<&str> {
        self.dns
            .as_ref()?
            .provider
            .as_ref()
            .map(|p| p.type_.as_str())
    }
}
