#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use fleet_seed_controller_core as core;
pub use fleet_seed_controller_k8s_api as k8s;
pub use fleet_seed_controller_k8s_index as index;
pub use fleet_seed_controller_k8s_installation as installation;

mod args;
mod controller;
mod domains;
mod index_list;
mod lease;
mod seed_refs;

pub use self::{args::Args, domains::DefaultDomains};
