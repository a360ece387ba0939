//! Device Simulation Core
//!
//! This crate provides the simulation half of the rigsim engine:
//!
//! - **approach**: bounded-rate ramping of continuous quantities
//! - **DeviceModel**: per-instrument mutable state with declared
//!   defaults, setter side effects, and a reset operation
//! - **StateMachine**: named states with lifecycle hooks and an ordered
//!   table of guarded transitions, advanced by discrete ticks
//! - **SimDevice**: one model paired with one machine, shareable behind
//!   a per-device mutex
//! - **run_clock_task**: the simulation clock actor that ticks every
//!   registered device on a measured wall-clock cadence
//!
//! # Example
//!
//! ```rust
//! use rig_sim::{approach, DeviceModel, SimDevice, State, StateMachine};
//!
//! let model = DeviceModel::builder()
//!     .field("position", 0.0)
//!     .field("target", 0.0)
//!     .build()
//!     .unwrap();
//!
//! let machine = StateMachine::builder()
//!     .state(State::new("stopped"))
//!     .state(State::new("moving").on_tick(|m, dt| {
//!         let next = approach(
//!             m.number("position").unwrap(),
//!             m.number("target").unwrap(),
//!             5.0,
//!             dt,
//!         );
//!         m.set("position", next).unwrap();
//!     }))
//!     .initial("stopped")
//!     .transition("stopped", "moving", |m| {
//!         m.number("target").unwrap() != m.number("position").unwrap()
//!     })
//!     .transition("moving", "stopped", |m| {
//!         m.number("target").unwrap() == m.number("position").unwrap()
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut device = SimDevice::new("stage", model, machine);
//! device.model_mut().set("target", 5.0).unwrap();
//! device.tick(1.0);
//! assert_eq!(device.active_state(), "moving");
//! ```

pub mod approach;
pub mod clock;
pub mod device;
pub mod error;
pub mod machine;
pub mod sim;

pub use approach::approach;
pub use clock::{run_clock_task, ClockCommand, ClockConfig};
pub use device::{DeviceModel, ModelBuilder, RawFields, Value};
pub use error::{ConfigError, DeviceError, GuardError};
pub use machine::{Guard, Hook, MachineBuilder, State, StateMachine};
pub use sim::{SharedDevice, SimDevice};
