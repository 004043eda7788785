//! Reconciles the `ControllerInstallation`s bound to a seed.
//!
//! A [`Reconciler`] reads the objects scheduled onto a seed through a
//! [`Store`], computes the registrations the seed requires and converges the
//! seed's installations onto that set.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod domain;
pub mod lifecycle;
mod metrics;
mod reconcile;
pub mod store;

#[cfg(test)]
mod testing;

pub use self::{
    domain::{DomainResolver, PrimaryProvider},
    lifecycle::{Existing, Summary},
    metrics::ReconcileMetrics,
    reconcile::{Config, Error, Reconciler},
    store::{Collection, KubeCollection, Read, Store, StoreError},
};
