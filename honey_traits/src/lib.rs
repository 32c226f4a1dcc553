//! Hardware seams for the honey dispenser.
//!
//! The core never talks to GPIO directly: the load cell and the valve servo
//! sit behind these traits so the control loop can run against the
//! simulated bench, real HX711/servo drivers, or test doubles.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type crossing the hardware boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Load-cell amplifier (HX711 class).
pub trait LoadCell {
    /// One reading in raw ADC counts, relative to the last tare.
    fn read_raw(&mut self, timeout: std::time::Duration) -> HwResult<i32>;

    /// Zero the internal offset against the current load.
    fn tare(&mut self) -> HwResult<()>;
}

/// Valve actuator (servo driving the honey tap).
pub trait ValveActuator {
    /// Move to an absolute position in the actuator's native unit
    /// (degrees for a hobby servo).
    fn set_position(&mut self, position: f32) -> HwResult<()>;
}

impl<T: LoadCell + ?Sized> LoadCell for Box<T> {
    fn read_raw(&mut self, timeout: std::time::Duration) -> HwResult<i32> {
        (**self).read_raw(timeout)
    }

    fn tare(&mut self) -> HwResult<()> {
        (**self).tare()
    }
}

impl<T: ValveActuator + ?Sized> ValveActuator for Box<T> {
    fn set_position(&mut self, position: f32) -> HwResult<()> {
        (**self).set_position(position)
    }
}
