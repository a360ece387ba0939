//! Backdoor device handle
//!
//! A [`DeviceHandle`] is the non-protocol side channel into a shared
//! device: test scenarios use it to inject fault conditions (flip the
//! connectivity flag, corrupt a reading) and to trigger resets without
//! going through the instrument's command vocabulary.
//!
//! Every access acquires the same per-device mutex as the clock tick
//! and the protocol handlers, so backdoor writes serialize with both.

use rig_sim::{DeviceError, SharedDevice, SimDevice, Value};

/// Cloneable handle to one shared device
#[derive(Clone)]
pub struct DeviceHandle {
    inner: SharedDevice,
}

impl DeviceHandle {
    /// Wrap a device for shared access
    pub fn new(device: SimDevice) -> Self {
        Self {
            inner: device.into_shared(),
        }
    }

    /// Adopt an already-shared device
    pub fn from_shared(inner: SharedDevice) -> Self {
        Self { inner }
    }

    /// The underlying shared device (for clock registration and
    /// connection tasks)
    pub fn shared(&self) -> SharedDevice {
        self.inner.clone()
    }

    /// Run a closure under the device mutex
    pub async fn with<R>(&self, f: impl FnOnce(&mut SimDevice) -> R) -> R {
        let mut device = self.inner.lock().await;
        f(&mut device)
    }

    /// Directly set a model field, bypassing the protocol
    pub async fn set_field(
        &self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), DeviceError> {
        let value = value.into();
        self.with(|dev| dev.model_mut().set(name, value)).await
    }

    /// Read a model field
    pub async fn get_field(&self, name: &str) -> Result<Value, DeviceError> {
        self.with(|dev| dev.model().get(name).cloned()).await
    }

    /// Reinitialize the model to its declared defaults
    pub async fn reset(&self) {
        self.with(SimDevice::reset).await;
    }

    /// Name of the machine's active state
    pub async fn active_state(&self) -> String {
        self.with(|dev| dev.active_state().to_string()).await
    }
}
