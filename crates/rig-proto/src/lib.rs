//! Device Protocol Library
//!
//! This crate provides the protocol half of the rigsim engine: the
//! request/response adapter a control-system client speaks to instead of
//! real hardware.
//!
//! - **CommandPattern / ArgKind**: compiled match patterns with typed
//!   capture groups
//! - **CommandTable / CommandSpec**: the ordered per-device vocabulary;
//!   first match wins
//! - **FrameCodec**: streaming terminator framing over raw bytes
//! - **StreamInterface**: per-connection dispatch engine with link-down
//!   gating, an error callback for unmatched input, and the unsolicited
//!   send path
//! - **NumberFormat**: declared fixed-width numeric rendering
//!
//! # Example
//!
//! ```rust
//! use rig_proto::{
//!     ArgKind, CommandPattern, CommandSpec, CommandTable, InterfaceConfig, StreamInterface,
//! };
//! use rig_sim::{DeviceModel, SimDevice, State, StateMachine};
//!
//! let model = DeviceModel::builder().field("setpoint", 0.0).build().unwrap();
//! let machine = StateMachine::builder()
//!     .state(State::new("idle"))
//!     .initial("idle")
//!     .build()
//!     .unwrap();
//! let mut device = SimDevice::new("demo", model, machine);
//!
//! let table = CommandTable::new().with(CommandSpec::new(
//!     CommandPattern::new(r"SETP:([0-9.]+)", vec![ArgKind::Float]).unwrap(),
//!     |dev, args| {
//!         dev.model_mut()
//!             .set("setpoint", args[0].as_float().unwrap())
//!             .unwrap();
//!         Some("OK".into())
//!     },
//! ));
//!
//! let mut iface = StreamInterface::new(InterfaceConfig::line("\r\n"), table);
//! let replies = iface.handle(&mut device, b"SETP:25.0\r\n");
//! assert_eq!(replies, vec![b"OK\r\n".to_vec()]);
//! ```

pub mod error;
pub mod format;
pub mod framing;
pub mod interface;
pub mod pattern;
pub mod table;

pub use error::{PatternError, ProtocolError};
pub use format::NumberFormat;
pub use framing::{FrameCodec, MAX_FRAME_LEN};
pub use interface::{ErrorCallback, InterfaceConfig, StreamInterface};
pub use pattern::{Arg, ArgKind, CommandPattern};
pub use table::{CommandSpec, CommandTable, Handler};
