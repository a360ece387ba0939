//! A simulated device: one model paired with one state machine
//!
//! [`SimDevice`] is the unit the simulation clock ticks and the protocol
//! layer binds to. The model and machine are created together at
//! simulator start and stay paired for the life of the device; the model
//! is owned exclusively through this pairing and is never shared
//! process-wide.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::device::DeviceModel;
use crate::machine::StateMachine;

/// A device shared between the clock task and connection tasks
///
/// One mutex per device serializes every mutation (clock ticks, command
/// handlers, backdoor writes) while independent devices proceed in
/// parallel.
pub type SharedDevice = Arc<Mutex<SimDevice>>;

/// One simulated instrument: identity, state model, and state machine
pub struct SimDevice {
    id: String,
    model: DeviceModel,
    machine: StateMachine,
}

impl SimDevice {
    /// Pair a model with its state machine
    pub fn new(id: impl Into<String>, model: DeviceModel, machine: StateMachine) -> Self {
        Self {
            id: id.into(),
            model,
            machine,
        }
    }

    /// Wrap this device for sharing between tasks
    pub fn into_shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    /// Device identifier (used in logs)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read access to the model
    pub fn model(&self) -> &DeviceModel {
        &self.model
    }

    /// Write access to the model
    pub fn model_mut(&mut self) -> &mut DeviceModel {
        &mut self.model
    }

    /// Name of the machine's active state
    pub fn active_state(&self) -> &str {
        self.machine.active_state()
    }

    /// Advance the device by `dt` seconds
    pub fn tick(&mut self, dt: f64) {
        self.machine.tick(&mut self.model, dt);
    }

    /// Reinitialize the model to its declared defaults
    ///
    /// Machine topology and the active state are untouched; use
    /// [`StateMachine::reset`] via [`machine_mut`](Self::machine_mut) to
    /// force a startup state.
    pub fn reset(&mut self) {
        self.model.reset();
    }

    /// Access the state machine
    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Mutable access to the state machine (startup resets)
    pub fn machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }
}
