//! # kea-stats
//!
//! Normalization engine for Kea statistics. Takes the flat key/value
//! namespace returned by `statistic-get-all` together with the subnet/pool
//! configuration of the same daemon, and produces labeled observations for a
//! prometheus registry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kea_stats::{Catalog, Engine, Family, Statistics, SubnetConfig, WarnedSet};
//! # fn sink() -> Box<dyn kea_stats::Sink> { unimplemented!() }
//!
//! let catalog = Arc::new(Catalog::builtin(Family::Dhcp4).unwrap());
//! let mut engine = Engine::new(catalog, Arc::new(WarnedSet::new()));
//! engine.refresh([SubnetConfig::new(1, "10.0.0.0/24", ["10.0.0.10-10.0.0.99"])]);
//! let stats = Statistics::from_iter([("subnet[1].pool[0].total-addresses".to_owned(), 90.0)]);
//! let report = engine.process(&stats, sink().as_ref());
//! ```
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

pub mod catalog;
pub mod family;
pub mod key;
pub mod pipeline;
pub mod reconcile;
pub mod sample;
pub mod subnets;
pub mod warned;

pub use crate::{
    catalog::{Catalog, CatalogError, Kind, MappedMetric, MetricSchema},
    family::Family,
    key::DecodedKey,
    pipeline::{Engine, Labels, Normalized, Observation, Outcome, Pipeline, Report, Sink},
    reconcile::{Reconciler, Update},
    sample::{RawSample, Statistics},
    subnets::{SubnetConfig, SubnetIndex},
    warned::{Diagnostic, WarnedSet},
};
