#![allow(missing_docs)] // proc macros dont play nicely with docstrings

//! # metrics
//!
//! the exporter's own health, next to the kea metrics it re-exports
use std::time::Instant;

use kea_stats::{Family, Outcome, Report};
use lazy_static::lazy_static;
use prometheus::{
    HistogramVec, IntCounter, IntCounterVec, IntGauge, register_histogram_vec,
    register_int_counter_vec, register_int_gauge,
};
use prometheus_static_metric::make_static_metric;

make_static_metric! {
    pub label_enum FamilyLabel {
        dhcp4,
        dhcp6,
    }
    pub label_enum OutcomeLabel {
        emitted,
        filtered,
        stale,
        unmapped,
    }
    pub struct SampleStats: IntCounter {
        "family" => FamilyLabel,
        "outcome" => OutcomeLabel,
    }
}

lazy_static! {
    /// When the exporter started
    pub static ref START_TIME: Instant = Instant::now();

    /// histogram of full poll cycle times (config + statistics + normalize)
    pub static ref POLL_DURATION: HistogramVec = register_histogram_vec!(
        "kea_exporter_poll_duration_seconds",
        "time to poll one target (seconds)",
        &["target"]
    )
    .unwrap();

    /// failed polls by target and stage
    pub static ref POLL_ERRORS: IntCounterVec = register_int_counter_vec!(
        "kea_exporter_poll_errors_total",
        "failed requests to a target, by stage",
        &["target", "stage"]
    )
    .unwrap();

    pub static ref SAMPLE_COUNT_VEC: IntCounterVec = register_int_counter_vec!(
        "kea_exporter_samples_total",
        "statistics seen, by what became of them",
        &["family", "outcome"]
    )
    .unwrap();

    /// samples by family and outcome
    pub static ref SAMPLE_OUTCOMES: SampleStats = SampleStats::from(&SAMPLE_COUNT_VEC);

    /// # of targets being polled
    pub static ref ACTIVE_TARGETS: IntGauge =
        register_int_gauge!("kea_exporter_targets", "count of targets being polled").unwrap();

    /// exporter uptime
    pub static ref UPTIME: IntGauge = register_int_gauge!("kea_exporter_uptime", "exporter uptime (seconds)").unwrap();
}

/// stage of a poll cycle, used as the `stage` label of [`POLL_ERRORS`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Config,
    Statistics,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Statistics => "statistics",
        }
    }
}

/// count a failed stage for `target`
pub fn poll_error(target: &str, stage: Stage) {
    POLL_ERRORS
        .with_label_values(&[target, stage.as_str()])
        .inc();
}

/// add the outcome counts of one normalized snapshot
pub fn record_report(family: Family, report: &Report) {
    let by_outcome = match family {
        Family::Dhcp4 => &SAMPLE_OUTCOMES.dhcp4,
        Family::Dhcp6 => &SAMPLE_OUTCOMES.dhcp6,
    };
    for (counter, outcome) in [
        (&by_outcome.emitted, Outcome::Emitted),
        (&by_outcome.filtered, Outcome::Filtered),
        (&by_outcome.stale, Outcome::Stale),
        (&by_outcome.unmapped, Outcome::Unmapped),
    ] {
        counter.inc_by(report.count(outcome) as u64);
    }
}
