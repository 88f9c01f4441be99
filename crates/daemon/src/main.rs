mod config;

use std::sync::Arc;

use anyhow::Context;
use homeprint_printer::TcpPrinterTransport;
use homeprint_scheduler::{InMemoryPrintStore, Scheduler};

use crate::config::DaemonConfig;

fn main() -> anyhow::Result<()> {
    let format = config::log_format(|key| std::env::var(key).ok())?;
    homeprint_observability::init_with(format);

    let config = DaemonConfig::from_env()?;

    let store = match &config.snapshot {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            let store = InMemoryPrintStore::from_json(&json)
                .with_context(|| format!("invalid snapshot {}", path.display()))?;
            tracing::info!(snapshot = %path.display(), "store loaded");
            store
        }
        None => InMemoryPrintStore::new(),
    };

    let transport = TcpPrinterTransport::new(config.transport.clone());
    let scheduler = Arc::new(
        Scheduler::new(Arc::new(store), transport).with_config(config.scheduler.clone()),
    );

    let installed = scheduler
        .initialize()
        .context("failed to install print job triggers")?;
    tracing::info!(installed, tick_ms = config.scheduler.tick_interval.as_millis() as u64, "starting print scheduler");

    let handle = scheduler.spawn().context("failed to start scheduler thread")?;
    handle.wait();

    tracing::info!("print scheduler exited");
    Ok(())
}
