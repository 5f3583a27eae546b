//! Prometheus exporter for Linux DVB frontends.
//!
//! Every scrape runs one collection pass over `/dev/dvb`: adapters and
//! frontends are enumerated, each frontend's lock status and signal
//! statistics are read, and the results are exposed as `dvb_frontend_*`
//! metrics. A frontend that cannot be opened or read is logged and left out
//! of that scrape; the others are still reported.

pub mod collector;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod observation;
pub mod web;

pub use collector::{Collector, Probe, Reading};
pub use observation::{Metric, Observation, ValueKind};
