//! `checkroomd`: runs a checkroom server configured from the environment.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use checkroom::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), CheckroomError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        idle_threshold = ?config.idle_threshold,
        sweep_interval = ?config.sweep_interval,
        reconnect_mode = ?config.reconnect_mode,
        "starting checkroomd"
    );

    let server = CheckroomServer::builder().config(config).build().await?;
    server.run().await
}
