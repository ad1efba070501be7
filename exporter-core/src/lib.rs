//! # exporter-core
//!
//! Everything between the command line and the metrics endpoint: config
//! parsing, tracing setup, the prometheus [`registry::PromSink`], the
//! exporter's own metrics and the per target [`poller::Poller`].
#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]
#![allow(clippy::cognitive_complexity)]
#![deny(rustdoc::broken_intra_doc_links)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
pub use anyhow;
pub use async_trait::async_trait;
pub use kea_client;
pub use kea_stats;
pub use prometheus;
pub use tokio;
pub use tokio_util;
pub use tracing;

pub use crate::{
    poller::{Catalogs, Poller},
    registry::PromSink,
};

pub mod config;
pub mod env;
pub mod metrics;
pub mod poller;
pub mod registry;
