//! Bounded-rate ramp toward a target value
//!
//! Continuous quantities in a simulated device (temperature, position,
//! frequency) move toward their setpoint at a bounded rate rather than
//! jumping. `approach` computes one step of that ramp.

/// Move `current` toward `target` by at most `max_rate * dt`
///
/// Returns `target` exactly once it is within reach, so callers can
/// compare against the setpoint with `==` to detect arrival. A
/// non-positive `max_rate` or `dt` produces no movement.
pub fn approach(current: f64, target: f64, max_rate: f64, dt: f64) -> f64 {
    if max_rate <= 0.0 || dt <= 0.0 {
        return current;
    }

    let step = max_rate * dt;
    let delta = target - current;

    if delta.abs() <= step {
        target
    } else if delta > 0.0 {
        current + step
    } else {
        current - step
    }
}
