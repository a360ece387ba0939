//! Simulated temperature controller
//!
//! A bath-style controller that ramps its process temperature toward a
//! setpoint at a bounded rate. Two operating states:
//!
//! - `holding`: temperature equals the setpoint, nothing moves
//! - `ramping`: temperature approaches the setpoint at `ramp_rate` deg/s
//!
//! Protocol (CRLF framed, both directions):
//!
//! | request            | reply            |
//! |--------------------|------------------|
//! | `SETP:<float>`     | `OK`             |
//! | `SETP?`            | setpoint, `%.2f` |
//! | `TEMP?`            | temperature, `%.2f` (link-gated) |
//! | `RATE:<float>`     | `OK`             |
//! | `RATE?`            | rate, `%.1f`     |
//! | `UNIT:C` / `UNIT:F`| `OK`             |
//! | `UNIT?`            | unit label       |
//! | `STATE?`           | `HOLDING` / `RAMPING` |
//! | `*RST`             | `OK`             |
//!
//! Anything else answers `ERR`. Writing the unit field also rewrites the
//! human-readable label, the classic derived-property pairing. With a
//! status period configured, the device streams `STATUS <temp> <state>`
//! unsolicited.

use std::time::Duration;

use rig_net::UnsolicitedSpec;
use rig_proto::{
    ArgKind, CommandPattern, CommandSpec, CommandTable, InterfaceConfig, NumberFormat,
    PatternError, StreamInterface,
};
use rig_sim::{approach, ConfigError, DeviceModel, SimDevice, State, StateMachine};
use serde::{Deserialize, Serialize};

/// Rendering of temperature and setpoint replies
pub const TEMP_FMT: NumberFormat = NumberFormat::fixed(2);
/// Rendering of ramp-rate replies
pub const RATE_FMT: NumberFormat = NumberFormat::fixed(1);

/// Temperature controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempConConfig {
    /// Process temperature at startup
    pub initial_temperature: f64,
    /// Setpoint at startup
    pub setpoint: f64,
    /// Ramp rate in degrees per second
    pub ramp_rate: f64,
    /// Period of the unsolicited STATUS stream, if any
    pub status_period_ms: Option<u64>,
}

impl Default for TempConConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 20.0,
            setpoint: 20.0,
            ramp_rate: 10.0,
            status_period_ms: None,
        }
    }
}

/// Build the device: model plus holding/ramping machine
pub fn build_device(config: &TempConConfig) -> Result<SimDevice, ConfigError> {
    let model = DeviceModel::builder()
        .field("temperature", config.initial_temperature)
        .field("setpoint", config.setpoint)
        .field("ramp_rate", config.ramp_rate)
        .field("units", "C")
        .field("unit_label", "degC")
        .field("connected", true)
        .connectivity_flag("connected")
        .derive_on_write("units", |fields, value| {
            let label = match value.as_text() {
                Some("F") => "degF",
                _ => "degC",
            };
            let _ = fields.set("unit_label", label);
        })
        .build()?;

    let step = |m: &mut DeviceModel, dt: f64| {
        let t = m.number("temperature").unwrap_or(0.0);
        let sp = m.number("setpoint").unwrap_or(0.0);
        let rate = m.number("ramp_rate").unwrap_or(0.0);
        let _ = m.set("temperature", approach(t, sp, rate, dt));
    };

    let machine = StateMachine::builder()
        .state(State::new("holding"))
        .state(State::new("ramping").on_entry(step).on_tick(step))
        .initial("holding")
        .transition("holding", "ramping", |m| {
            m.number("temperature").unwrap_or(0.0) != m.number("setpoint").unwrap_or(0.0)
        })
        .transition("ramping", "holding", |m| {
            m.number("temperature").unwrap_or(0.0) == m.number("setpoint").unwrap_or(0.0)
        })
        .build()?;

    Ok(SimDevice::new("tempcon", model, machine))
}

/// Build a per-connection protocol interface
pub fn interface() -> Result<StreamInterface, PatternError> {
    let float = r"([+-]?[0-9]+(?:\.[0-9]+)?)";

    let table = CommandTable::new()
        .with(CommandSpec::new(
            CommandPattern::new(&format!("SETP:{float}"), vec![ArgKind::Float])?,
            |dev, args| {
                let sp = args[0].as_float()?;
                dev.model_mut().set("setpoint", sp).ok()?;
                Some("OK".into())
            },
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"SETP\?", vec![])?,
            |dev, _| Some(TEMP_FMT.format(dev.model().number("setpoint").ok()?)),
        ))
        .with(
            CommandSpec::new(CommandPattern::new(r"TEMP\?", vec![])?, |dev, _| {
                Some(TEMP_FMT.format(dev.model().number("temperature").ok()?))
            })
            .requires_connection(),
        )
        .with(CommandSpec::new(
            CommandPattern::new(&format!("RATE:{float}"), vec![ArgKind::Float])?,
            |dev, args| {
                let rate = args[0].as_float()?;
                dev.model_mut().set("ramp_rate", rate).ok()?;
                Some("OK".into())
            },
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"RATE\?", vec![])?,
            |dev, _| Some(RATE_FMT.format(dev.model().number("ramp_rate").ok()?)),
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"UNIT:([A-Z])", vec![ArgKind::choice(&["C", "F"])])?,
            |dev, args| {
                dev.model_mut().set("units", args[0].as_str()?).ok()?;
                Some("OK".into())
            },
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"UNIT\?", vec![])?,
            |dev, _| Some(dev.model().text("unit_label").ok()?.to_string()),
        ))
        .with(CommandSpec::new(
            CommandPattern::new(r"STATE\?", vec![])?,
            |dev, _| Some(dev.active_state().to_uppercase()),
        ))
        .with(CommandSpec::new(CommandPattern::literal("*RST")?, |dev, _| {
            dev.reset();
            Some("OK".into())
        }));

    Ok(StreamInterface::new(InterfaceConfig::line("\r\n"), table).on_error(|_, _| Some("ERR".into())))
}

/// Unsolicited STATUS stream: `STATUS <temp> <state>` every period
pub fn status_stream(period: Duration) -> UnsolicitedSpec {
    UnsolicitedSpec::recurring(period, |dev| {
        let temp = dev.model().number("temperature").ok()?;
        Some(format!(
            "STATUS {} {}",
            TEMP_FMT.format(temp),
            dev.active_state().to_uppercase()
        ))
    })
}
