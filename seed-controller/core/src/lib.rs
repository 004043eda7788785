//! Seed extension requirements.
//!
//! Decides which extension controllers must be installed on a seed:
//!
//! - [`requirements`] aggregates the `Kind/Type` capabilities required by the
//!   backup buckets, backup entries and shoots on a seed, and by the seed
//!   itself;
//! - [`catalog`] indexes the registered extension controllers;
//! - [`desired`] maps the required capabilities onto registrations, applying
//!   deployment policies and seed selectors.
//!
//! Nothing in this crate performs I/O.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod capability;
pub mod catalog;
pub mod desired;
pub mod hash;
pub mod requirements;

pub use self::{
    capability::Capability,
    catalog::{Catalog, Registration},
    desired::{SeedState, Unsatisfied},
    requirements::Capabilities,
};
