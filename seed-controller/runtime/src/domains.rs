use crate::{
    installation::DomainResolver,
    k8s::{self, ListParams, ResourceExt, Secret, Shoot},
};
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tokio::time;

/// Selects the secrets that describe the operator's default domains.
pub const DEFAULT_DOMAIN_SELECTOR: &str = "fleet.dev/role=default-domain";
const DOMAIN_ANNOTATION: &str = "dns.fleet.dev/domain";
const PROVIDER_ANNOTATION: &str = "dns.fleet.dev/provider";

/// How long a listing of default domains is reused.
const REFRESH_INTERVAL: time::Duration = time::Duration::from_secs(30);

/// Resolves a shoot's external domain provider from its primary DNS provider
/// or, failing that, from the default domain the shoot's domain belongs to.
#[derive(Clone)]
pub struct DefaultDomains {
    secrets: k8s::Api<Secret>,
    cached: Arc<RwLock<Option<(time::Instant, Arc<[DefaultDomain]>)>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DefaultDomain {
    domain: String,
    provider: String,
}

// === impl DefaultDomains ===

impl DefaultDomains {
    pub fn new(client: k8s::Client, namespace: &str) -> Self {
        Self {
            secrets: k8s::Api::namespaced(client, namespace),
            cached: Default::default(),
        }
    }

    async fn defaults(&self) -> Result<Arc<[DefaultDomain]>> {
        let cached = self.cached.read().clone();
        if let Some((at, defaults)) = cached {
            if at.elapsed() < REFRESH_INTERVAL {
                return Ok(defaults);
            }
        }

        let secrets = self
            .secrets
            .list(&ListParams::default().labels(DEFAULT_DOMAIN_SELECTOR))
            .await?;
        let defaults = secrets
            .items
            .iter()
            .filter_map(DefaultDomain::from_secret)
            .collect::<Arc<[_]>>();
        tracing::debug!(defaults = defaults.len(), "Listed default domains");

        *self.cached.write() = Some((time::Instant::now(), defaults.clone()));
        Ok(defaults)
    }
}

#[async_trait::async_trait]
impl DomainResolver for DefaultDomains {
    async fn external_domain_provider(&self, shoot: &Shoot) -> Result<Option<String>> {
        let Some(dns) = shoot.spec.dns.as_ref() else {
            return Ok(None);
        };
        let Some(domain) = dns.domain.as_deref() else {
            return Ok(None);
        };

        if let Some(provider) = dns.primary_provider().and_then(|p| p.type_.clone()) {
            return Ok(Some(provider));
        }

        let defaults = self.defaults().await?;
        match DefaultDomain::matching(&defaults, domain) {
            Some(default) => Ok(Some(default.provider.clone())),
            None => bail!(
                "shoot {} uses domain {domain}, which has no primary provider and is not a default domain",
                shoot.name_unchecked()
            ),
        }
    }

    async fn default_domain_providers(&self) -> Result<Vec<String>> {
        let defaults = self.defaults().await?;
        Ok(DefaultDomain::providers(&defaults))
    }
}

// === impl DefaultDomain ===

impl DefaultDomain {
    fn from_secret(secret: &Secret) -> Option<Self> {
        let annotations = secret.annotations();
        let domain = annotations.get(DOMAIN_ANNOTATION)?;
        let provider = annotations.get(PROVIDER_ANNOTATION)?;
        Some(Self {
            domain: domain.trim_end_matches('.').to_string(),
            provider: provider.clone(),
        })
    }

    /// The distinct providers serving `defaults`, ordered by name.
    fn providers(defaults: &[Self]) -> Vec<String> {
        defaults
            .iter()
            .map(|d| d.provider.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Finds the most specific default domain that `domain` falls under.
    fn matching<'d>(defaults: &'d [Self], domain: &str) -> Option<&'d Self> {
        let domain = domain.trim_end_matches('.');
        defaults
            .iter()
            .filter(|d| {
                domain == d.domain
                    || domain
                        .strip_suffix(d.domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .max_by_key(|d| d.domain.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::ObjectMeta;
    use maplit::btreemap;

    fn secret(annotations: std::collections::BTreeMap<String, String>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("default-domain".to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn default(domain: &str, provider: &str) -> DefaultDomain {
        DefaultDomain {
            domain: domain.to_string(),
            provider: provider.to_string(),
        }
    }

    #[test]
    fn parses_annotated_secrets() {
        let parsed = DefaultDomain::from_secret(&secret(btreemap! {
            DOMAIN_ANNOTATION.to_string() => "example.com.".to_string(),
            PROVIDER_ANNOTATION.to_string() => "aws-route53".to_string(),
        }));
        assert_eq!(parsed, Some(default("example.com", "aws-route53")));

        let incomplete = DefaultDomain::from_secret(&secret(btreemap! {
            DOMAIN_ANNOTATION.to_string() => "example.com".to_string(),
        }));
        assert_eq!(incomplete, None);
    }

    #[test]
    fn lists_distinct_providers() {
        let defaults = [
            default("example.com", "aws-route53"),
            default("dev.example.com", "google-clouddns"),
            default("example.org", "aws-route53"),
        ];
        assert_eq!(
            DefaultDomain::providers(&defaults),
            ["aws-route53", "google-clouddns"]
        );
        assert!(DefaultDomain::providers(&[]).is_empty());
    }

    #[test]
    fn matches_most_specific_domain() {
        let defaults = [
            default("example.com", "aws-route53"),
            default("dev.example.com", "google-clouddns"),
        ];

        for (domain, provider) in [
            ("example.com", Some("aws-route53")),
            ("shoot.example.com", Some("aws-route53")),
            ("shoot.dev.example.com.", Some("google-clouddns")),
            ("dev.example.com", Some("google-clouddns")),
            ("myexample.com", None),
            ("example.org", None),
        ] {
            assert_eq!(
                DefaultDomain::matching(&defaults, domain).map(|d| d.provider.as_str()),
                provider,
                "{domain}"
            );
        }
    }
}
