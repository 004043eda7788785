use crate::lifecycle::Summary;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::{Registry, Unit},
};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ReconcileMetrics {
    reconciles: Family<OutcomeLabels, Counter>,
    durations: Histogram,
    writes: Family<WriteLabels, Counter>,
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Unsatisfied,
    Conflict,
    Error,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct WriteLabels {
    op: &'static str,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let reconciles = Family::default();
        prom.register(
            "reconciles",
            "Count of seed reconciliations by outcome",
            reconciles.clone(),
        );

        // Reconciliations are dominated by API round trips.
        let durations = Histogram::new([0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]);
        prom.register_with_unit(
            "reconcile_duration",
            "Histogram of the time taken to reconcile a seed",
            Unit::Seconds,
            durations.clone(),
        );

        let writes = Family::default();
        prom.register(
            "installation_writes",
            "Count of ControllerInstallation writes by operation",
            writes.clone(),
        );

        Self {
            reconciles,
            durations,
            writes,
        }
    }

    pub(crate) fn record(&self, outcome: Outcome, elapsed: Duration) {
        self.reconciles
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str(),
            })
            .inc();
        self.durations.observe(elapsed.as_secs_f64());
    }

    pub(crate) fn record_writes(&self, summary: &Summary) {
        for (op, names) in [
            ("create", &summary.created),
            ("update", &summary.updated),
            ("delete", &summary.deleted),
        ] {
            if !names.is_empty() {
                self.writes
                    .get_or_create(&WriteLabels { op })
                    .inc_by(names.len() as u64);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn reconciles(&self, outcome: Outcome) -> u64 {
        self.reconciles
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str(),
            })
            .get()
    }

    #[cfg(test)]
    pub(crate) fn writes(&self, op: &'static str) -> u64 {
        self.writes.get_or_create(&WriteLabels { op }).get()
    }
}

// === impl Outcome ===

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Unsatisfied => "unsatisfied",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }
}
