use crate::{
    controller::{self, Context, Leader},
    domains::DefaultDomains,
    index::{Cache, CacheMetricsFamilies},
    index_list::{IndexList, Notify},
    installation::{self, KubeCollection, Reconciler, Store},
    k8s::{
        self, BackupBucket, BackupEntry, ControllerInstallation, ControllerRegistration, Seed,
        Shoot,
    },
    lease,
    seed_refs::SeedRefs,
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use futures::prelude::*;
use kube::runtime::{controller as runtime_controller, reflector::ObjectRef, watcher, Controller};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::Duration,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "seed-controller",
    about = "Installs the extension controllers each seed requires"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "fleet=info,warn",
        env = "FLEET_SEED_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Restricts the ControllerInstallations that trigger reconciliations.
    #[clap(long)]
    installation_selector: Option<String>,

    /// The maximum number of seeds reconciled concurrently.
    #[clap(long, default_value = "5")]
    max_concurrent_reconciles: u16,

    /// The maximum number of shoots per seed whose requirements are resolved
    /// concurrently.
    #[clap(long, default_value = "10")]
    max_concurrent_shoots: usize,

    /// How often every seed is reconciled in the absence of changes.
    #[clap(long, default_value = "3600")]
    resync_period_secs: u64,

    /// The DNS provider of the internal domain, if one is configured.
    #[clap(long)]
    internal_domain_provider: Option<String>,

    /// The namespace holding the default domain secrets.
    #[clap(long, default_value = "garden")]
    garden_namespace: String,

    #[clap(long, default_value = "garden")]
    controller_namespace: String,

    #[clap(long, default_value = "seed-controller")]
    controller_deployment_name: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            installation_selector,
            max_concurrent_reconciles,
            max_concurrent_shoots,
            resync_period_secs,
            internal_domain_provider,
            garden_namespace,
            controller_namespace,
            controller_deployment_name,
        } = self;

        let mut prom = <Registry>::default();
        let cache_metrics =
            CacheMetricsFamilies::register(prom.sub_registry_with_prefix("seed_cache"));
        let reconcile_metrics =
            installation::ReconcileMetrics::register(prom.sub_registry_with_prefix("seed"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let hostname =
            std::env::var("HOSTNAME").context("failed to fetch `HOSTNAME` environment variable")?;
        let claims = lease::init(
            &runtime,
            &controller_namespace,
            &controller_deployment_name,
            &hostname,
        )
        .await?;

        // Spawn the caches read by reconciliations.

        let buckets = Cache::<BackupBucket>::shared();
        let bucket_watch = runtime.watch_all::<BackupBucket>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(CacheMetricsFamilies::instrument(&cache_metrics, buckets.clone()), bucket_watch)
                .instrument(info_span!("backupbuckets")),
        );

        let entries = Cache::<BackupEntry>::shared();
        let entry_watch = runtime.watch_all::<BackupEntry>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(CacheMetricsFamilies::instrument(&cache_metrics, entries.clone()), entry_watch)
                .instrument(info_span!("backupentries")),
        );

        let shoots = Cache::<Shoot>::shared();
        let shoot_watch = runtime.watch_all::<Shoot>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(CacheMetricsFamilies::instrument(&cache_metrics, shoots.clone()), shoot_watch)
                .instrument(info_span!("shoots")),
        );

        // Every change to a registration may change what every seed requires.
        let registrations = Cache::<ControllerRegistration>::shared();
        let (registrations_tx, registrations_rx) = mpsc::channel(1);
        let registration_indexes = IndexList::new(CacheMetricsFamilies::instrument(&cache_metrics, registrations.clone()))
            .push(Notify::shared(registrations_tx))
            .shared();
        let registration_watch =
            runtime.watch_all::<ControllerRegistration>(watcher::Config::default());
        tokio::spawn(
            kubert::index::cluster(registration_indexes, registration_watch)
                .instrument(info_span!("controllerregistrations")),
        );

        let client = runtime.client();
        let store = Store {
            backup_buckets: Arc::new(KubeCollection::new(client.clone()).with_cache(buckets)),
            backup_entries: Arc::new(KubeCollection::new(client.clone()).with_cache(entries)),
            shoots: Arc::new(KubeCollection::new(client.clone()).with_cache(shoots)),
            registrations: Arc::new(
                KubeCollection::new(client.clone()).with_cache(registrations),
            ),
            // Installations are always read live.
            installations: Arc::new(KubeCollection::new(client.clone())),
        };
        let reconciler = Reconciler::new(
            store,
            Arc::new(DefaultDomains::new(client.clone(), &garden_namespace)),
            installation::Config {
                internal_domain_provider,
                max_concurrent_shoots,
            },
            reconcile_metrics,
        );
        let ctx = Arc::new(Context::new(
            reconciler,
            Leader::new(claims, hostname),
            Duration::from_secs(resync_period_secs),
        ));

        let installations_config = match installation_selector.as_deref() {
            Some(selector) => watcher::Config::default().labels(selector),
            None => watcher::Config::default(),
        };

        // Objects moving between seeds trigger both the seeds they left and
        // the seeds they joined.
        let (shoot_seeds, bucket_seeds, entry_seeds) =
            (SeedRefs::default(), SeedRefs::default(), SeedRefs::default());

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let seeds = Controller::new(
            k8s::Api::<Seed>::all(client.clone()),
            watcher::Config::default(),
        )
        .with_config(runtime_controller::Config::default().concurrency(max_concurrent_reconciles))
        .watches(
            k8s::Api::<ControllerInstallation>::all(client.clone()),
            installations_config,
            |installation| Some(ObjectRef::new(&installation.spec.seed_ref.name)),
        )
        .watches(
            k8s::Api::<Shoot>::all(client.clone()),
            watcher::Config::default(),
            move |shoot| shoot_seeds.map(&shoot, shoot.seed_names().map(str::to_string)),
        )
        .watches(
            k8s::Api::<BackupBucket>::all(client.clone()),
            watcher::Config::default(),
            move |bucket| bucket_seeds.map(&bucket, bucket.spec.seed_name.clone()),
        )
        .watches(
            k8s::Api::<BackupEntry>::all(client),
            watcher::Config::default(),
            move |entry| entry_seeds.map(&entry, entry.spec.seed_name.clone()),
        )
        .reconcile_all_on(ReceiverStream::new(registrations_rx))
        .graceful_shutdown_on(stop_rx.map(|_| ()))
        .run(controller::reconcile, controller::error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((seed, _)) => tracing::debug!(seed = %seed.name, "Reconciled"),
                Err(error) => tracing::debug!(%error, "Reconciliation failed"),
            }
        });

        // Stop dispatching reconciliations on shutdown and let in-flight ones
        // finish.
        let drain = runtime.shutdown_handle();
        tokio::spawn(
            async move {
                tokio::pin!(seeds);
                info!("Seed controller started");
                tokio::select! {
                    _ = (&mut seeds) => {}
                    handle = drain.signaled() => {
                        let _ = stop_tx.send(());
                        handle.release_after(seeds).await;
                    }
                }
            }
            .instrument(info_span!("seeds")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
