//! `scoria-engine`: the decommutation core of the ground-station service.
//!
//! One [`Decommutator`] task per telemetry packet turns UDP datagrams into
//! ring publications; the [config channel](config_channel) hands the live
//! schema to every other process on the host; [`Service`] wires the tasks
//! together and owns their shutdown.

mod config_channel;
mod decom;
mod forward;
mod service;
mod throttle;

pub use config_channel::{fetch_schema, publish_schema};
pub use decom::{Decommutator, DecomError};
pub use forward::run_forwarder;
pub use service::{Service, ServiceError};
