//! # kea-client
//!
//! Talks to kea's control channel, either a daemon's unix socket or the
//! control agent's HTTP(S) endpoint, and turns `config-get` and
//! `statistic-get-all` replies into [`kea_stats`] inputs.
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

pub mod command;
pub mod daemon;
pub mod error;
pub mod http;
pub mod socket;
pub mod target;
pub mod transport;

pub use crate::{
    command::{Command, Response},
    daemon::{FamilyConfig, parse_config},
    error::{ClientError, ClientResult},
    http::{HttpTransport, TlsOptions},
    socket::SocketTransport,
    target::{Address, ClientOptions, FamilyStatistics, Target, connect},
    transport::Transport,
};
