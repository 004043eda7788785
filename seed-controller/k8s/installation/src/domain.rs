use fleet_seed_controller_k8s_api::Shoot;

/// Resolves the DNS providers that serve shoot domains.
#[async_trait::async_trait]
pub trait DomainResolver: Send + Sync {
    /// Returns the provider type of the shoot's external domain, or `None` if
    /// the shoot has no external domain.
    async fn external_domain_provider(&self, shoot: &Shoot) -> anyhow::Result<Option<String>>;

    /// Returns the DNS providers of the operator's default domains.
    async fn default_domain_providers(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![])
    }
}

/// Only considers the shoot's primary DNS provider.
#[derive(Copy, Clone, Debug, Default)]
pub struct PrimaryProvider;

#[async_trait::async_trait]
impl DomainResolver for PrimaryProvider {
    async fn external_domain_provider(&self, shoot: &Shoot) -> anyhow::Result<Option<String>> {
        let provider = shoot
            .spec
            .dns
            .as_ref()
            .filter(|dns| dns.domain.is_some())
            .and_then(|dns| dns.primary_provider())
            .and_then(|p| p.type_.clone());
        Ok(provider)
    }
}
