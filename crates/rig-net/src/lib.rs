//! Device Transport Layer
//!
//! This crate connects the rigsim engine to clients over TCP:
//!
//! - **run_server_task**: accept loop binding each client to a fresh
//!   protocol interface over one shared device
//! - **run_connection_task**: per-connection select loop covering
//!   reads, dispatch under the device mutex, reply writes, and the
//!   unsolicited timer branch
//! - **UnsolicitedSpec**: timer-driven telemetry tied to a connection's
//!   lifetime
//! - **DeviceHandle**: the backdoor side channel for test fault
//!   injection, serialized with protocol and clock access
//!
//! Concurrency model: one `tokio::sync::Mutex` per device serializes
//! every mutation (tick, handler, backdoor); independent devices run in
//! parallel. No ordering is guaranteed between a tick and a concurrent
//! command beyond that mutual exclusion.

pub mod connection;
pub mod handle;
pub mod server;
pub mod unsolicited;

pub use connection::{run_connection_task, ConnectionCommand};
pub use handle::DeviceHandle;
pub use server::{run_server_task, InterfaceFactory, ServerCommand, ServerConfig, UnsolicitedFactory};
pub use unsolicited::{PayloadFn, UnsolicitedSpec};
