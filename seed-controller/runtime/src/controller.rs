use crate::{
    installation::{Error, Reconciler},
    k8s::{ResourceExt, Seed},
};
use chrono::Utc;
use kube::runtime::controller::Action;
use kubert::lease::Claim;
use std::sync::Arc;
use tokio::{sync::watch, time::Duration};
use tracing::{debug, info_span, warn, Instrument};

/// How soon a replica that isn't the leader checks again.
const NOT_LEADER_RETRY: Duration = Duration::from_secs(10);

const CONFLICT_RETRY: Duration = Duration::from_secs(1);
const NOT_SYNCED_RETRY: Duration = Duration::from_secs(2);
const ERROR_RETRY: Duration = Duration::from_secs(10);

/// Unsatisfied requirements need a new registration; there's no point in
/// retrying eagerly.
const UNSATISFIED_RETRY: Duration = Duration::from_secs(60);

pub(crate) struct Context {
    reconciler: Reconciler,
    leader: Leader,
    resync_period: Duration,
}

/// Tracks whether this replica holds the write lease.
pub(crate) struct Leader {
    claims: watch::Receiver<Arc<Claim>>,
    hostname: String,
}

pub(crate) async fn reconcile(seed: Arc<Seed>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = seed.name_unchecked();
    if !ctx.leader.is_current() {
        debug!(seed = %name, "Not the leader; skipping");
        return Ok(Action::requeue(NOT_LEADER_RETRY));
    }

    ctx.reconciler
        .reconcile(&seed)
        .instrument(info_span!("reconcile", seed = %name))
        .await?;
    Ok(Action::requeue(ctx.resync_period))
}

pub(crate) fn error_policy(seed: Arc<Seed>, error: &Error, _: Arc<Context>) -> Action {
    warn!(seed = %seed.name_unchecked(), %error, "Failed to reconcile");
    Action::requeue(retry_delay(error))
}

fn retry_delay(error: &Error) -> Duration {
    if error.is_conflict() {
        CONFLICT_RETRY
    } else if error.is_not_synced() {
        NOT_SYNCED_RETRY
    } else if matches!(error, Error::Unsatisfied(_)) {
        UNSATISFIED_RETRY
    } else {
        ERROR_RETRY
    }
}

// === impl Context ===

impl Context {
    pub(crate) fn new(reconciler: Reconciler, leader: Leader, resync_period: Duration) -> Self {
        Self {
            reconciler,
            leader,
            resync_period,
        }
    }
}

// === impl Leader ===

impl Leader {
    pub(crate) fn new(claims: watch::Receiver<Arc<Claim>>, hostname: String) -> Self {
        Self { claims, hostname }
    }

    fn is_current(&self) -> bool {
        let claim = self.claims.borrow();
        claim.holder == self.hostname && claim.expiry > Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{capability, Capability, Unsatisfied},
        installation::{lifecycle, StoreError},
    };

    fn leader(holder: &str, expiry: chrono::DateTime<Utc>) -> Leader {
        let claim = Claim {
            holder: holder.to_string(),
            expiry,
        };
        let (_claims_tx, claims_rx) = watch::channel(Arc::new(claim));
        Leader::new(claims_rx, "seed-controller-0".to_string())
    }

    #[test]
    fn leadership() {
        assert!(leader("seed-controller-0", chrono::DateTime::<Utc>::MAX_UTC).is_current());
        assert!(!leader("seed-controller-1", chrono::DateTime::<Utc>::MAX_UTC).is_current());
        assert!(!leader("seed-controller-0", chrono::DateTime::<Utc>::MIN_UTC).is_current());
    }

    #[test]
    fn retry_delays() {
        let conflict = Error::Lifecycle(lifecycle::Error::Store {
            op: "update",
            registration: "provider-aws".to_string(),
            source: StoreError::Conflict {
                kind: "ControllerInstallation".to_string(),
                name: "provider-aws-x".to_string(),
            },
        });
        assert_eq!(retry_delay(&conflict), CONFLICT_RETRY);

        let not_synced = Error::List {
            kind: "Shoot",
            source: StoreError::NotSynced {
                kind: "Shoot".to_string(),
            },
        };
        assert_eq!(retry_delay(&not_synced), NOT_SYNCED_RETRY);

        let unsatisfied =
            Error::Unsatisfied(Unsatisfied(Capability::new(capability::NETWORK, "cilium")));
        assert_eq!(retry_delay(&unsatisfied), UNSATISFIED_RETRY);

        let other = Error::Lifecycle(lifecycle::Error::Store {
            op: "create",
            registration: "provider-aws".to_string(),
            source: StoreError::AlreadyExists {
                kind: "ControllerInstallation".to_string(),
                name: "provider-aws-x".to_string(),
            },
        });
        assert_eq!(retry_delay(&other), ERROR_RETRY);
    }
}
