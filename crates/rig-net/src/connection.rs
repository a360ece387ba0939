//! Per-connection task
//!
//! One task per accepted transport connection, built as a select loop in
//! the engine's actor style:
//!
//! - the read branch feeds raw bytes into the connection's
//!   [`StreamInterface`], dispatches complete frames under the device
//!   mutex, and writes the framed replies back
//! - the timer branch drives the connection's unsolicited spec, if any
//! - the command branch accepts shutdown
//!
//! The device mutex is held while handlers run, never across an I/O
//! await, so the simulation clock is not blocked by a slow client.
//! When the task ends (client disconnect, I/O error, or shutdown) the
//! unsolicited timer dies with it: zero sends after close.

use std::io;
use std::time::Duration;

use rig_proto::StreamInterface;
use rig_sim::SharedDevice;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

use crate::unsolicited::UnsolicitedSpec;

/// Commands accepted by a connection task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// Close the connection and end the task
    Shutdown,
}

/// Serve one connection until it closes or is shut down
pub async fn run_connection_task<S>(
    mut stream: S,
    device: SharedDevice,
    mut iface: StreamInterface,
    mut unsolicited: Option<UnsolicitedSpec>,
    mut cmd_rx: mpsc::Receiver<ConnectionCommand>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 1024];

    // The timer is created unconditionally so select! has a branch to
    // poll; `armed` keeps it inert when there is no unsolicited spec.
    // First fire comes one period after the connection opens.
    let period = unsolicited
        .as_ref()
        .map(|u| u.period)
        .unwrap_or(Duration::from_secs(3600));
    let mut timer = interval_at(Instant::now() + period, period);
    let mut armed = unsolicited.is_some();

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("connection closed by peer");
                        break;
                    }
                    Ok(n) => {
                        iface.push_bytes(&buf[..n]);
                        // Dispatch under the device mutex, then release
                        // it before writing replies
                        let replies = {
                            let mut dev = device.lock().await;
                            let mut out = Vec::new();
                            while let Some(reply) = iface.next_reply(&mut dev) {
                                out.push(reply);
                            }
                            out
                        };
                        for reply in &replies {
                            stream.write_all(reply).await?;
                        }
                        if !replies.is_empty() {
                            stream.flush().await?;
                        }
                    }
                    Err(e) => {
                        warn!("connection read error: {}", e);
                        return Err(e);
                    }
                }
            }

            // The interval has already rescheduled itself by the time
            // this branch runs, so a failed send cannot stop the next one
            _ = timer.tick(), if armed => {
                let payload = {
                    let dev = device.lock().await;
                    unsolicited.as_mut().and_then(|u| u.produce(&dev))
                };
                if unsolicited.as_ref().is_some_and(|u| u.one_shot) {
                    armed = false;
                }
                if let Some(payload) = payload {
                    let framed = iface.frame_unsolicited(&payload);
                    if let Err(e) = stream.write_all(&framed).await {
                        warn!("unsolicited send failed: {}", e);
                    } else {
                        let _ = stream.flush().await;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnectionCommand::Shutdown) => {
                        debug!("connection shutdown requested");
                        break;
                    }
                    None => {
                        debug!("connection command channel closed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
