//! Simulation clock task
//!
//! The clock is the single authority for time advancement. It owns the
//! set of registered devices and, on a fixed cadence, computes `dt` as
//! the measured wall-clock elapsed since the previous tick and ticks
//! every device in registration order.
//!
//! The task holds each device's mutex only for the duration of that
//! device's tick, so protocol I/O on other devices is never blocked by
//! the clock, and ticks never wait on I/O.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::sim::SharedDevice;

/// Clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Tick period; `dt` is measured, not assumed equal to this
    pub period: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20),
        }
    }
}

/// Commands accepted by the clock task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Stop ticking and end the task
    Shutdown,
}

/// Run the simulation clock until shut down
///
/// Devices are ticked in the order they appear in `devices`. The first
/// interval tick fires immediately with a near-zero measured `dt`.
pub async fn run_clock_task(
    devices: Vec<SharedDevice>,
    config: ClockConfig,
    mut cmd_rx: mpsc::Receiver<ClockCommand>,
) {
    let mut ticker = interval(config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    info!(
        "simulation clock started: {} device(s), period {:?}",
        devices.len(),
        config.period
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;

                for device in &devices {
                    device.lock().await.tick(dt);
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClockCommand::Shutdown) => {
                        info!("simulation clock shutdown requested");
                        break;
                    }
                    None => {
                        debug!("clock command channel closed");
                        break;
                    }
                }
            }
        }
    }

    info!("simulation clock stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceModel;
    use crate::machine::{State, StateMachine};
    use crate::sim::SimDevice;

    fn counting_device(id: &str) -> SharedDevice {
        let model = DeviceModel::builder()
            .field("ticks", 0.0)
            .field("elapsed", 0.0)
            .build()
            .unwrap();
        let machine = StateMachine::builder()
            .state(State::new("running").on_tick(|m, dt| {
                let ticks = m.number("ticks").unwrap();
                let elapsed = m.number("elapsed").unwrap();
                m.set("ticks", ticks + 1.0).unwrap();
                m.set("elapsed", elapsed + dt).unwrap();
            }))
            .initial("running")
            .build()
            .unwrap();
        SimDevice::new(id, model, machine).into_shared()
    }

    #[tokio::test]
    async fn test_clock_ticks_devices_until_shutdown() {
        let device = counting_device("dev-1");
        let (cmd_tx, cmd_rx) = mpsc::channel(4);

        let handle = tokio::spawn(run_clock_task(
            vec![device.clone()],
            ClockConfig {
                period: Duration::from_millis(5),
            },
            cmd_rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cmd_tx.send(ClockCommand::Shutdown).await.unwrap();
        handle.await.unwrap();

        let ticks = device.lock().await.model().number("ticks").unwrap();
        assert!(ticks >= 2.0, "expected several ticks, got {ticks}");

        // No further ticks after shutdown
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after = device.lock().await.model().number("ticks").unwrap();
        assert_eq!(ticks, after);
    }

    #[tokio::test]
    async fn test_clock_stops_when_channel_closes() {
        let device = counting_device("dev-2");
        let (cmd_tx, cmd_rx) = mpsc::channel::<ClockCommand>(1);

        let handle = tokio::spawn(run_clock_task(
            vec![device],
            ClockConfig::default(),
            cmd_rx,
        ));

        drop(cmd_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_measured_dt_accumulates_wall_clock() {
        let device = counting_device("dev-3");
        let (cmd_tx, cmd_rx) = mpsc::channel(1);

        let handle = tokio::spawn(run_clock_task(
            vec![device.clone()],
            ClockConfig {
                period: Duration::from_millis(5),
            },
            cmd_rx,
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;
        cmd_tx.send(ClockCommand::Shutdown).await.unwrap();
        handle.await.unwrap();

        let elapsed = device.lock().await.model().number("elapsed").unwrap();
        assert!(elapsed > 0.0);
        assert!(elapsed < 10.0, "dt accumulation wildly off: {elapsed}");
    }
}
