//! # poller
//!
//! One [`Poller`] per target. It owns the target's connection and the
//! per family [`Engine`]s, so fetching and normalizing a snapshot never
//! races with another cycle of the same target. Pollers of different targets
//! only share the registry and the warn-once set.
use std::{fmt, sync::Arc, time::Duration};

use kea_client::{ClientError, FamilyStatistics, Target, Transport};
use kea_stats::{Catalog, CatalogError, Engine, Family, Report, Sink, WarnedSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{self, Stage};

/// the registry as the pollers see it
pub type SharedSink = Arc<dyn Sink + Send + Sync>;

/// catalogs for both families, loaded once at startup
#[derive(Debug, Clone)]
pub struct Catalogs {
    dhcp4: Arc<Catalog>,
    dhcp6: Arc<Catalog>,
}

impl Catalogs {
    /// Fails if a catalog belongs to the wrong family.
    pub fn new(dhcp4: Catalog, dhcp6: Catalog) -> Result<Self, CatalogError> {
        for (expected, catalog) in [(Family::Dhcp4, &dhcp4), (Family::Dhcp6, &dhcp6)] {
            if catalog.family() != expected {
                return Err(CatalogError::FamilyMismatch {
                    expected,
                    found: catalog.family(),
                });
            }
        }
        Ok(Self {
            dhcp4: Arc::new(dhcp4),
            dhcp6: Arc::new(dhcp6),
        })
    }

    /// builtin tables for both families
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(
            Catalog::builtin(Family::Dhcp4)?,
            Catalog::builtin(Family::Dhcp6)?,
        )
    }

    /// catalog of `family`
    pub fn get(&self, family: Family) -> &Arc<Catalog> {
        match family {
            Family::Dhcp4 => &self.dhcp4,
            Family::Dhcp6 => &self.dhcp6,
        }
    }

    /// both catalogs
    pub fn iter(&self) -> impl Iterator<Item = &Catalog> {
        [self.dhcp4.as_ref(), self.dhcp6.as_ref()].into_iter()
    }
}

/// Polls one target on a fixed interval.
pub struct Poller<T = Box<dyn Transport>> {
    target: Target<T>,
    engines: [Engine; 2],
    sink: SharedSink,
    interval: Duration,
}

impl<T: fmt::Debug> fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("target", &self.target)
            .field("engines", &self.engines)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Poller<T> {
    /// new poller, nothing is sent before [`Poller::run`] or [`Poller::poll_once`]
    pub fn new(
        target: Target<T>,
        catalogs: &Catalogs,
        warned: Arc<WarnedSet>,
        sink: SharedSink,
        interval: Duration,
    ) -> Self {
        let engines = Family::ALL.map(|family| {
            Engine::new(Arc::clone(catalogs.get(family)), Arc::clone(&warned))
        });
        Self {
            target,
            engines,
            sink,
            interval,
        }
    }

    /// the polled target
    pub fn target(&self) -> &Target<T> {
        &self.target
    }

    /// normalization state of `family`
    pub fn engine(&self, family: Family) -> &Engine {
        &self.engines[family as usize]
    }

    fn engine_mut(&mut self, family: Family) -> &mut Engine {
        &mut self.engines[family as usize]
    }

    /// One cycle: refresh the configuration, fetch statistics and push them
    /// through each family's engine. A failed refresh keeps the previous
    /// subnet index; failing to fetch statistics skips the cycle.
    #[instrument(skip(self), fields(addr = %self.target.name()))]
    pub async fn poll_once(&mut self) -> Result<Vec<(Family, Report)>, ClientError> {
        let name = self.target.name().to_owned();
        let _timer = metrics::POLL_DURATION
            .with_label_values(&[name.as_str()])
            .start_timer();

        match self.target.refresh_config().await {
            Ok(configs) => {
                for config in configs {
                    self.engine_mut(config.family).refresh(config.subnets);
                }
            }
            Err(err) => {
                metrics::poll_error(&name, Stage::Config);
                warn!(%err, "configuration refresh failed, keeping previous subnets");
            }
        }

        let snapshots = match self.target.statistics().await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                metrics::poll_error(&name, Stage::Statistics);
                warn!(%err, "failed to fetch statistics, skipping cycle");
                return Err(err);
            }
        };

        let sink = Arc::clone(&self.sink);
        let mut reports = Vec::with_capacity(snapshots.len());
        for FamilyStatistics { family, statistics } in snapshots {
            if let Some(report) = self.engine_mut(family).process(&statistics, sink.as_ref()) {
                debug!(
                    %family,
                    emitted = report.emitted,
                    filtered = report.filtered,
                    stale = report.stale,
                    unmapped = report.unmapped,
                    "snapshot processed"
                );
                metrics::record_report(family, &report);
                reports.push((family, report));
            }
        }
        Ok(reports)
    }

    /// Poll every interval until `token` is cancelled. The first poll
    /// happens immediately.
    pub async fn run(mut self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(addr = %self.target.name(), interval = ?self.interval, "polling target");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(addr = %self.target.name(), "poller stopping");
                    return;
                }
                _ = ticker.tick() => {
                    // errors are logged and counted in poll_once
                    let _ = self.poll_once().await;
                }
            }
        }
    }
}
