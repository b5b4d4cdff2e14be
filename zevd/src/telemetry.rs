use anyhow::Result;
use tracing_subscriber::{filter::EnvFilter, fmt};

/// Audit findings from the zev crates land at info, dependency noise stays at
/// warn. `RUST_LOG` overrides the whole filter.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,zevd=info,zev_core=info"));
    fmt().with_env_filter(filter).compact().init();
    Ok(())
}
