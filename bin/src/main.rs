#![allow(clippy::cognitive_complexity)]
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

mod startup_health;

use exporter_core::{
    Catalogs, Poller, PromSink,
    config::{
        cli::{self, Parser},
        trace,
    },
    kea_client::{self, Address, Target},
    kea_stats::{Family, WarnedSet},
    metrics,
    poller::SharedSink,
    tokio::{self, runtime::Builder, signal, task::JoinHandle},
    tracing::*,
};
use external_api::{ExternalApi, Health};
use startup_health::verify_startup_subsystems;
use tracing_futures::Instrument;

#[cfg(not(target_env = "musl"))]
use jemallocator::Jemalloc;
use tokio_util::sync::CancellationToken;

#[cfg(not(target_env = "musl"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    // .env may carry TARGETS and friends, load it before parsing
    let dotenv = dotenv::dotenv();
    // parses from cli or environment var
    let config = cli::Config::parse();
    let trace_config = trace::Config::parse(&config.exporter_log)?;
    debug!(?config, ?trace_config);
    if let Err(err) = dotenv {
        debug!(?err, ".env file not loaded");
    }
    config.validate()?;

    let mut builder = Builder::new_multi_thread();
    // configure thread name & enable IO/time
    builder.thread_name(&config.thread_name).enable_all();
    // default num threads will be num logical CPUs
    // if we have a configured value here, set it
    if let Some(num) = config.threads {
        builder.worker_threads(num);
    }
    // build the runtime
    let rt = builder.build()?;

    rt.block_on(async move {
        match tokio::spawn(async move { start(config).await }).await {
            Err(err) => Err(anyhow!(err).context("exporter task panicked")),
            Ok(Err(err)) => {
                error!(?err, "exited with error");
                Err(err)
            }
            Ok(Ok(())) => {
                debug!("exiting...");
                Ok(())
            }
        }
    })
}

async fn start(config: cli::Config) -> Result<()> {
    let catalogs = Catalogs::new(
        config
            .catalog(Family::Dhcp4)
            .context("failed to load dhcp4 catalog")?,
        config
            .catalog(Family::Dhcp6)
            .context("failed to load dhcp6 catalog")?,
    )?;
    let sink: SharedSink = Arc::new(
        PromSink::new(catalogs.iter(), prometheus_registry())
            .context("failed to register kea metrics")?,
    );
    let warned = Arc::new(WarnedSet::new());

    let targets = connect_targets(&config);
    if targets.is_empty() {
        bail!("none of the configured targets is usable");
    }
    metrics::ACTIVE_TARGETS.set(targets.len() as i64);
    info!(count = targets.len(), interval = ?config.interval(), "starting pollers");

    let token = CancellationToken::new();
    let api = ExternalApi::new(config.listen_addr());
    let api_sender = api.sender();
    let mut api_task = api.start(token.clone());

    let mut pollers = targets
        .into_iter()
        .map(|target| {
            let span = info_span!("poller", addr = %target.name());
            let poller = Poller::new(
                target,
                &catalogs,
                Arc::clone(&warned),
                Arc::clone(&sink),
                config.interval(),
            );
            tokio::spawn(poller.run(token.clone()).instrument(span))
        })
        .collect::<Vec<JoinHandle<()>>>();

    // Keep health BAD until the api and every poller are confirmed running.
    if let Err(err) = verify_startup_subsystems(&mut api_task, &mut pollers).await {
        let _ = api_sender.send(Health::Bad).await;
        token.cancel();
        return Err(err);
    }

    debug!("changing health to good after startup checks passed");
    api_sender
        .send(Health::Good)
        .await
        .context("error occurred in changing health status to Good")?;

    shutdown_signal(token.clone()).await?;
    info!("shutting down");
    let _ = api_sender.send(Health::Bad).await;

    for poller in pollers {
        if let Err(err) = poller.await {
            error!(?err, "error waiting for poller");
        }
    }
    if let Err(err) = api_task.await {
        error!(?err, "error waiting for web server API");
    }
    Ok(())
}

/// the registry `/metrics` gathers from
fn prometheus_registry() -> &'static exporter_core::prometheus::Registry {
    exporter_core::prometheus::default_registry()
}

/// Parse and connect every target. Bad targets are logged and skipped.
fn connect_targets(config: &cli::Config) -> Vec<Target> {
    let opts = config.client_options();
    config
        .targets()
        .filter_map(|raw| {
            let target = raw
                .parse::<Address>()
                .and_then(|address| kea_client::connect(&address, &opts));
            match target {
                Ok(target) => {
                    debug!(addr = %target.name(), "target ready");
                    Some(target)
                }
                Err(err) => {
                    error!(addr = raw, %err, "skipping target");
                    None
                }
            }
        })
        .collect()
}

async fn shutdown_signal(token: CancellationToken) -> Result<()> {
    let ret = signal::ctrl_c().await.map_err(|err| anyhow!(err));
    token.cancel();
    ret
}
