use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use exporter_core::tokio::{self, task::JoinHandle};
use futures::future::try_join_all;

const STARTUP_STABILIZATION_WINDOW: Duration = Duration::from_millis(300);

/// the api and every poller must survive the stabilization window; pollers
/// are checked concurrently so startup time doesn't grow with the target count
pub async fn verify_startup_subsystems(
    api_task: &mut JoinHandle<()>,
    pollers: &mut [JoinHandle<()>],
) -> Result<()> {
    let api = verify_background_task_running("external API", api_task);
    let pollers = try_join_all(pollers.iter_mut().enumerate().map(|(i, task)| async move {
        verify_background_task_running(&format!("poller {i}"), task).await
    }));
    tokio::try_join!(api, pollers).context("startup check failed")?;
    Ok(())
}

pub async fn verify_background_task_running(name: &str, task: &mut JoinHandle<()>) -> Result<()> {
    match tokio::time::timeout(STARTUP_STABILIZATION_WINDOW, task).await {
        Err(_) => Ok(()),
        Ok(join_res) => match join_res {
            Ok(()) => Err(anyhow!("{name} exited during startup stabilization window")),
            Err(err) => Err(anyhow!("{name} panicked during startup: {err}")),
        },
    }
}
