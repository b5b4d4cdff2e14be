pub mod config;
pub mod provision;
pub mod refresh;
pub mod telemetry;

use std::sync::Arc;

use tracing::info;
use zev_core::directory::{DeviceDirectory, InMemoryDirectory};

use crate::{
    config::{Config, DirectoryKind},
    telemetry::init_tracing,
};

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    init_tracing()?;

    let directory: Arc<dyn DeviceDirectory> = match cfg.directory {
        DirectoryKind::InMem => Arc::new(InMemoryDirectory::default()),
    };

    let audit = refresh::spawn(directory, cfg.device_poll, cfg.full_reload);
    info!(
        poll_secs = cfg.device_poll.as_secs(),
        reload_secs = cfg.full_reload.as_secs(),
        broker = %cfg.broker.host,
        "fleet audit running"
    );

    tokio::signal::ctrl_c().await?;
    audit.cancel();
    info!("shutting down");
    Ok(())
}
