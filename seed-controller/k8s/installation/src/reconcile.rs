use crate::{
    domain::DomainResolver,
    lifecycle::{self, Existing, Summary},
    metrics::{Outcome, ReconcileMetrics},
    store::{Read, Store, StoreError},
};
use fleet_seed_controller_core::{
    desired::{self, SeedState, Unsatisfied},
    requirements::{self, Capabilities},
    Catalog,
};
use fleet_seed_controller_k8s_api::{self as k8s, ResourceExt, Seed, Shoot};
use futures::prelude::*;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    /// The DNS provider of the operator's internal domain, if one is
    /// configured.
    pub internal_domain_provider: Option<String>,

    /// The maximum number of shoots whose requirements are resolved
    /// concurrently.
    pub max_concurrent_shoots: usize,
}

/// Reconciles the installations of one seed at a time.
#[derive(Clone)]
pub struct Reconciler {
    store: Store,
    domains: Arc<dyn DomainResolver>,
    config: Config,
    metrics: ReconcileMetrics,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list {kind}: {source}")]
    List {
        kind: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to list default domains: {0:#}")]
    DefaultDomains(anyhow::Error),

    #[error(transparent)]
    Unsatisfied(#[from] Unsatisfied),

    #[error(transparent)]
    Lifecycle(#[from] lifecycle::Error),
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_domain_provider: None,
            max_concurrent_shoots: 10,
        }
    }
}

// === impl Reconciler ===

impl Reconciler {
    pub fn new(
        store: Store,
        domains: Arc<dyn DomainResolver>,
        config: Config,
        metrics: ReconcileMetrics,
    ) -> Self {
        Self {
            store,
            domains,
            config,
            metrics,
        }
    }

    /// Converges the installations bound to `seed` onto the registrations the
    /// seed requires.
    pub async fn reconcile(&self, seed: &Seed) -> Result<Summary, Error> {
        let start = time::Instant::now();
        let result = self.converge(seed).await;

        let outcome = match &result {
            Ok(summary) => {
                self.metrics.record_writes(summary);
                Outcome::Ok
            }
            Err(Error::Unsatisfied(_)) => Outcome::Unsatisfied,
            Err(error) if error.is_conflict() => Outcome::Conflict,
            Err(_) => Outcome::Error,
        };
        self.metrics.record(outcome, start.elapsed());

        result
    }

    async fn converge(&self, seed: &Seed) -> Result<Summary, Error> {
        let seed_name = seed.name_unchecked();

        let buckets = self
            .store
            .backup_buckets
            .list(Read::Cached)
            .await
            .map_err(Error::list("BackupBucket"))?;
        let entries = self
            .store
            .backup_entries
            .list(Read::Cached)
            .await
            .map_err(Error::list("BackupEntry"))?;
        let shoots = self
            .store
            .shoots
            .list(Read::Cached)
            .await
            .map_err(Error::list("Shoot"))?
            .into_iter()
            .filter(|shoot| shoot.is_on_seed(&seed_name))
            .collect::<Vec<_>>();
        let registrations = self
            .store
            .registrations
            .list(Read::Cached)
            .await
            .map_err(Error::list("ControllerRegistration"))?;

        let domain_providers = self.domain_providers(seed).await?;

        let (mut required, bucket_index) = requirements::backup_buckets(&buckets, &seed_name);
        required.extend(requirements::backup_entries(
            &entries,
            &bucket_index,
            &seed_name,
        ));
        required.extend(self.shoot_requirements(&shoots).await);
        required.extend(requirements::seed(
            seed,
            &registrations,
            &domain_providers
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>(),
        ));
        debug!(
            required = ?required.iter().map(ToString::to_string).collect::<Vec<_>>(),
            shoots = shoots.len(),
            "Computed requirements",
        );

        let catalog = Catalog::new(registrations);

        // Installations are read past the cache: a stale list could lead to a
        // second installation being created for the same registration.
        let installations = self
            .store
            .installations
            .list(Read::Live)
            .await
            .map_err(Error::list("ControllerInstallation"))?;
        let existing = Existing::index(installations, &seed_name);

        let state = SeedState {
            labels: seed.metadata.labels.clone().into(),
            deleting: k8s::is_deleting(seed),
            shoots: shoots.len(),
        };
        let wanted = desired::registrations(&required, &catalog, &state, existing.required())?;
        debug!(?wanted, existing = existing.len(), "Resolved registrations");

        let summary =
            lifecycle::converge(&*self.store.installations, &catalog, seed, &wanted, &existing)
                .await?;
        if !summary.is_noop() {
            info!(
                created = summary.created.len(),
                updated = summary.updated.len(),
                deleted = summary.deleted.len(),
                "Reconciled installations",
            );
        }
        Ok(summary)
    }

    /// The providers of the operator's internal and default domains. They are
    /// only looked up for seeds that manage shoot DNS.
    async fn domain_providers(&self, seed: &Seed) -> Result<Vec<String>, Error> {
        if k8s::is_deleting(seed) || !seed.spec.shoot_dns_enabled() {
            return Ok(vec![]);
        }

        let mut providers = self
            .domains
            .default_domain_providers()
            .await
            .map_err(Error::DefaultDomains)?;
        providers.extend(self.config.internal_domain_provider.clone());
        Ok(providers)
    }

    /// Resolves the requirements of all shoots, a bounded number at a time.
    async fn shoot_requirements(&self, shoots: &[Shoot]) -> Capabilities {
        stream::iter(shoots)
            .map(|shoot| self.shoot(shoot))
            .buffer_unordered(self.config.max_concurrent_shoots.max(1))
            .fold(Capabilities::new(), |mut required, shoot| async move {
                required.extend(shoot);
                required
            })
            .boxed()
            .await
    }

    async fn shoot(&self, shoot: &Shoot) -> Capabilities {
        let mut required = requirements::shoot(shoot);

        match self.domains.external_domain_provider(shoot).await {
            Ok(Some(provider)) => {
                required.insert(requirements::external_domain(&provider));
            }
            Ok(None) => {}
            Err(error) if k8s::is_deleting(shoot) => {
                debug!(shoot = %shoot.name_unchecked(), %error, "Failed to resolve external domain");
            }
            Err(error) => {
                warn!(shoot = %shoot.name_unchecked(), %error, "Failed to resolve external domain");
            }
        }

        required
    }
}

// === impl Error ===

impl Error {
    fn list(kind: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::List { kind, source }
    }

    /// Indicates whether the reconciliation lost a race with another writer.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Lifecycle(error) => error.is_conflict(),
            _ => false,
        }
    }

    /// Indicates whether the reconciliation read from a cache that has not yet
    /// observed the complete state of the cluster.
    pub fn is_not_synced(&self) -> bool {
        matches!(
            self,
            Self::List {
                source: StoreError::NotSynced { .. },
                ..
            }
        )
    }
}
