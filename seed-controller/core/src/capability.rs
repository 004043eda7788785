use std::fmt;

pub const BACKUP_BUCKET: &str = "BackupBucket";
pub const BACKUP_ENTRY: &str = "BackupEntry";
pub const CONTAINER_RUNTIME: &str = "ContainerRuntime";
pub const CONTROL_PLANE: &str = "ControlPlane";
pub const DNS_RECORD: &str = "DNSRecord";
pub const EXTENSION: &str = "Extension";
pub const INFRASTRUCTURE: &str = "Infrastructure";
pub const NETWORK: &str = "Network";
pub const OPERATING_SYSTEM_CONFIG: &str = "OperatingSystemConfig";
pub const WORKER: &str = "Worker";

/// Identifies a resource `kind` and provider `type` that an extension must
/// serve on a seed.
///
/// Renders as `Kind/Type`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Capability {
    kind: String,
    type_: String,
}

// === impl Capability ===

impl Capability {
    pub fn new(kind: impl Into<String>, type_: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            type_: type_.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.type_)
    }
}

impl From<&fleet_seed_controller_k8s_api::registration::ControllerResource> for Capability {
    fn from(resource: &fleet_seed_controller_k8s_api::registration::ControllerResource) -> Self {
        Self::new(&resource.kind, &resource.type_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_kind_and_type() {
        assert_eq!(
            Capability::new(CONTROL_PLANE, "aws").to_string(),
            "ControlPlane/aws"
        );
    }

    #[test]
    fn kinds_partition_types() {
        assert_ne!(
            Capability::new(WORKER, "aws"),
            Capability::new(INFRASTRUCTURE, "aws")
        );
    }
}
