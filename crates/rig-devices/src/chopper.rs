//! Simulated beam chopper
//!
//! A positioning device with the classic two-state topology: `stopped`
//! until the target moves away from the position, `moving` until the
//! position catches up at `speed` units per second. Movement begins in
//! the same tick that leaves `stopped`: the entry hook steps the
//! position with the dt that fired the transition.
//!
//! Protocol (LF framed): `MOVE <int>` / `HOME` / `POS?` / `STATE?`.
//! Positions render zero-padded to four digits. Unparseable input is
//! ignored silently, as the real device never acknowledges garbage.

use rig_proto::{
    ArgKind, CommandPattern, CommandSpec, CommandTable, InterfaceConfig, NumberFormat,
    PatternError, StreamInterface,
};
use rig_sim::{approach, ConfigError, DeviceModel, SimDevice, State, StateMachine};
use serde::{Deserialize, Serialize};

/// Rendering of position replies: `0005`
pub const POS_FMT: NumberFormat = NumberFormat::integer().width(4).zero_pad();

/// Chopper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChopperConfig {
    /// Travel speed in position units per second
    pub speed: f64,
}

impl Default for ChopperConfig {
    fn default() -> Self {
        Self { speed: 5.0 }
    }
}

/// Build the device: model plus stopped/moving machine
pub fn build_device(config: &ChopperConfig) -> Result<SimDevice, ConfigError> {
    let model = DeviceModel::builder()
        .field("position", 0.0)
        .field("target", 0.0)
        .field("speed", config.speed)
        .build()?;

    let step = |m: &mut DeviceModel, dt: f64| {
        let position = m.number("position").unwrap_or(0.0);
        let target = m.number("target").unwrap_or(0.0);
        let speed = m.number("speed").unwrap_or(0.0);
        let _ = m.set("position", approach(position, target, speed, dt));
    };

    let machine = StateMachine::builder()
        .state(State::new("stopped"))
        .state(State::new("moving").on_entry(step).on_tick(step))
        .initial("stopped")
        .transition("stopped", "moving", |m| {
            m.number("target").unwrap_or(0.0) != m.number("position").unwrap_or(0.0)
        })
        .transition("moving", "stopped", |m| {
            m.number("target").unwrap_or(0.0) == m.number("position").unwrap_or(0.0)
        })
        .build()?;

    Ok(SimDevice::new("chopper", model, machine))
}

/// Build a per-connection protocol interface
pub fn interface() -> Result<StreamInterface, PatternError> {
    let table = CommandTable::new()
        .with(CommandSpec::new(
            CommandPattern::new(r"MOVE ([+-]?[0-9]+)", vec![ArgKind::Int])?,
            |dev, args| {
                let target = args[0].as_int()? as f64;
                dev.model_mut().set("target", target).ok()?;
                Some("ACK".into())
            },
        ))
        .with(CommandSpec::new(CommandPattern::literal("HOME")?, |dev, _| {
            dev.model_mut().set("target", 0.0).ok()?;
            Some("ACK".into())
        }))
        .with(CommandSpec::new(
            CommandPattern::new(r"POS\?", vec![])?,
            |dev, _| Some(POS_FMT.format(dev.model().number("position").ok()?)),
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"STATE\?", vec![])?,
            |dev, _| Some(dev.active_state().to_string()),
        ));

    // No error callback: garbage is silently dropped
    Ok(StreamInterface::new(InterfaceConfig::line("\n"), table))
}
