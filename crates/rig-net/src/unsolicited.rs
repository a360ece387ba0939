//! Unsolicited message scheduling
//!
//! Free-running instruments stream telemetry without being polled. An
//! [`UnsolicitedSpec`] describes that behavior for one connection: a
//! delay, whether it repeats, and a payload closure that reads the
//! current device state when the timer fires.
//!
//! The spec is consumed by the connection task, which drives it from a
//! timer branch of its own select loop. The interval reschedules before
//! the send is attempted, so a failed send (client gone, link wedged)
//! never stops future attempts; closing the connection ends the task
//! and with it the timer, so no sends can fire after close.

use std::time::Duration;

use rig_sim::SimDevice;

/// Payload closure: reads device state, returns the message to send
/// (or `None` to skip this firing)
pub type PayloadFn = Box<dyn FnMut(&SimDevice) -> Option<String> + Send>;

/// Timer-driven out-of-band send, bound to one connection's lifetime
pub struct UnsolicitedSpec {
    pub(crate) period: Duration,
    pub(crate) one_shot: bool,
    payload: PayloadFn,
}

impl UnsolicitedSpec {
    /// Fire every `period`, starting one period after the connection
    /// opens
    pub fn recurring(
        period: Duration,
        payload: impl FnMut(&SimDevice) -> Option<String> + Send + 'static,
    ) -> Self {
        Self {
            period,
            one_shot: false,
            payload: Box::new(payload),
        }
    }

    /// Fire once, `delay` after the connection opens
    pub fn one_shot(
        delay: Duration,
        payload: impl FnMut(&SimDevice) -> Option<String> + Send + 'static,
    ) -> Self {
        Self {
            period: delay,
            one_shot: true,
            payload: Box::new(payload),
        }
    }

    /// Produce the next payload from current device state
    pub(crate) fn produce(&mut self, device: &SimDevice) -> Option<String> {
        (self.payload)(device)
    }
}
