//! Connection listener
//!
//! [`run_server_task`] accepts transport connections for one simulated
//! device and binds each to a fresh [`StreamInterface`] sharing the
//! device. The interface (and optional unsolicited spec) come from
//! factory closures because they carry per-connection mutable state
//! (framing buffers, handler closures) that cannot be shared between
//! clients.
//!
//! Multiple simultaneous clients are allowed unless the config restricts
//! the device to one, modelling instruments with an exclusive serial
//! link: a second concurrent client is accepted and immediately closed.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rig_proto::StreamInterface;
use rig_sim::SharedDevice;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{run_connection_task, ConnectionCommand};
use crate::unsolicited::UnsolicitedSpec;

/// Builds a fresh protocol interface for each accepted connection
pub type InterfaceFactory = Arc<dyn Fn() -> StreamInterface + Send + Sync>;

/// Builds a fresh unsolicited spec for each accepted connection
pub type UnsolicitedFactory = Arc<dyn Fn() -> UnsolicitedSpec + Send + Sync>;

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Refuse a second concurrent client (exclusive-link devices)
    pub single_client: bool,
}

/// Commands accepted by the server task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    /// Stop accepting and shut down every active connection
    Shutdown,
}

/// Accept connections for one device until shut down
pub async fn run_server_task(
    listener: TcpListener,
    device: SharedDevice,
    interfaces: InterfaceFactory,
    unsolicited: Option<UnsolicitedFactory>,
    config: ServerConfig,
    mut cmd_rx: mpsc::Receiver<ServerCommand>,
) -> io::Result<()> {
    let active = Arc::new(AtomicUsize::new(0));
    let mut conn_senders: Vec<mpsc::Sender<ConnectionCommand>> = Vec::new();

    if let Ok(addr) = listener.local_addr() {
        info!("device server listening on {}", addr);
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                if config.single_client && active.load(Ordering::SeqCst) > 0 {
                    info!("refusing second client {} (single-client device)", peer);
                    drop(socket);
                    continue;
                }
                info!("client connected: {}", peer);

                let (conn_tx, conn_rx) = mpsc::channel(4);
                conn_senders.retain(|tx| !tx.is_closed());
                conn_senders.push(conn_tx);

                let iface = interfaces();
                let spec = unsolicited.as_ref().map(|f| f());
                let device = device.clone();
                let active = active.clone();
                active.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    if let Err(e) =
                        run_connection_task(socket, device, iface, spec, conn_rx).await
                    {
                        warn!("connection from {} ended with error: {}", peer, e);
                    } else {
                        debug!("connection from {} closed", peer);
                    }
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ServerCommand::Shutdown) => info!("server shutdown requested"),
                    None => debug!("server command channel closed"),
                }
                break;
            }
        }
    }

    for tx in conn_senders {
        let _ = tx.send(ConnectionCommand::Shutdown).await;
    }
    Ok(())
}
