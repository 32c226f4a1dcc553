use std::time::Duration;

use crate::error::{HwError, Result};
use crate::util::servo_pulse_us;

/// 50 Hz frame expected by hobby servos.
const SERVO_PERIOD: Duration = Duration::from_millis(20);

/// Tap servo driven by software PWM on a GPIO pin.
pub struct ServoValve {
    pin: rppal::gpio::OutputPin,
    last_pulse_us: Option<u64>,
}

impl ServoValve {
    pub fn new(pwm_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pwm_pin)
            .map_err(|e| HwError::Gpio(format!("open servo pin {pwm_pin}: {e}")))?
            .into_output();
        Ok(Self {
            pin,
            last_pulse_us: None,
        })
    }
}

impl honey_traits::ValveActuator for ServoValve {
    fn set_position(&mut self, position: f32) -> honey_traits::HwResult<()> {
        let pulse_us = servo_pulse_us(position);
        // Re-arming software PWM every tick causes jitter; only touch it on change
        if self.last_pulse_us == Some(pulse_us) {
            return Ok(());
        }
        self.pin
            .set_pwm(SERVO_PERIOD, Duration::from_micros(pulse_us))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        self.last_pulse_us = Some(pulse_us);
        tracing::trace!(position, pulse_us, "servo position");
        Ok(())
    }
}
