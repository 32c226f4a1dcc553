use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `busy` until it reports false or `timeout` expires, sleeping
/// `poll_interval` between checks instead of spinning.
///
/// The HX711 holds DT high while a conversion is in progress, so the driver
/// passes `|| dt.is_high()` here.
pub fn wait_while(
    mut busy: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while busy() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Map a servo angle in degrees (0..=180) to a pulse width in microseconds.
///
/// Standard hobby servos span 500–2500 µs over their travel.
#[inline]
pub fn servo_pulse_us(degrees: f32) -> u64 {
    let d = if degrees.is_finite() {
        degrees.clamp(0.0, 180.0)
    } else {
        0.0
    };
    (500.0 + d / 180.0 * 2000.0).round() as u64
}
