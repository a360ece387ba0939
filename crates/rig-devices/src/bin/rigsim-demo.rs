//! Serve the simulated temperature controller over TCP.
//!
//! ```text
//! rigsim-demo [listen-addr]    # default 127.0.0.1:4040
//! ```
//!
//! Connect with netcat and talk CRLF: `SETP:50.0`, `TEMP?`, `STATE?`.
//! The device streams `STATUS <temp> <state>` once a second.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rig_devices::tempcon::{self, TempConConfig};
use rig_net::{
    run_server_task, DeviceHandle, InterfaceFactory, ServerCommand, ServerConfig,
    UnsolicitedFactory,
};
use rig_sim::{run_clock_task, ClockCommand, ClockConfig};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:4040".to_string());

    let config = TempConConfig {
        status_period_ms: Some(1000),
        ..TempConConfig::default()
    };
    let device = tempcon::build_device(&config).context("building device")?;
    let handle = DeviceHandle::new(device);

    // Validate the command patterns once; the per-connection factory
    // rebuilds from the same definitions
    tempcon::interface().context("compiling command table")?;
    let interfaces: InterfaceFactory = Arc::new(|| {
        tempcon::interface().expect("command patterns validated at startup")
    });
    let unsolicited: Option<UnsolicitedFactory> = config.status_period_ms.map(|ms| {
        let period = Duration::from_millis(ms);
        Arc::new(move || tempcon::status_stream(period)) as UnsolicitedFactory
    });

    let (clock_tx, clock_rx) = mpsc::channel(1);
    let clock = tokio::spawn(run_clock_task(
        vec![handle.shared()],
        ClockConfig::default(),
        clock_rx,
    ));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let (server_tx, server_rx) = mpsc::channel(1);
    let server = tokio::spawn(run_server_task(
        listener,
        handle.shared(),
        interfaces,
        unsolicited,
        ServerConfig::default(),
        server_rx,
    ));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");

    let _ = server_tx.send(ServerCommand::Shutdown).await;
    let _ = clock_tx.send(ClockCommand::Shutdown).await;
    server.await??;
    clock.await?;
    Ok(())
}
