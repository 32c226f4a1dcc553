use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::wait_while;

/// Readings averaged when zeroing the offset.
const TARE_READINGS: usize = 10;

/// Bit-banged HX711 on two GPIO lines.
pub struct Hx711 {
    dt: rppal::gpio::InputPin,
    sck: rppal::gpio::OutputPin,
    gain_pulses: u8, // 25, 26, 27 based on gain/channel
    offset: i32,
}

impl Hx711 {
    pub fn new(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
            .into_input();
        let mut sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
            .into_output();
        sck.set_low(); // clock idle low
        Ok(Self {
            dt,
            sck,
            gain_pulses,
            offset: 0,
        })
    }

    /// One absolute 24-bit reading, sign-extended.
    pub fn read_absolute(&mut self, timeout: Duration) -> Result<i32> {
        let dt = &self.dt;
        wait_while(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut value: i32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            std::hint::spin_loop();
            value = (value << 1) | i32::from(self.dt.is_high());
            self.sck.set_low();
            std::hint::spin_loop();
        }

        // Extra pulses select gain/channel for the next conversion
        for _ in 0..self.gain_pulses.saturating_sub(24) {
            self.sck.set_high();
            std::hint::spin_loop();
            self.sck.set_low();
            std::hint::spin_loop();
        }

        if (value & 0x80_0000) != 0 {
            value |= !0xFF_FFFF;
        }
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }
}

/// `LoadCell` backed by a real HX711.
pub struct HardwareLoadCell {
    hx711: Hx711,
    timeout: Duration,
}

impl HardwareLoadCell {
    pub fn new(dt_pin: u8, sck_pin: u8, timeout: Duration) -> Result<Self> {
        // 25 pulses: channel A, gain 128
        let hx711 = Hx711::new(dt_pin, sck_pin, 25)?;
        Ok(Self { hx711, timeout })
    }
}

impl honey_traits::LoadCell for HardwareLoadCell {
    fn read_raw(&mut self, timeout: Duration) -> honey_traits::HwResult<i32> {
        let abs = self.hx711.read_absolute(timeout)?;
        Ok(abs.saturating_sub(self.hx711.offset))
    }

    fn tare(&mut self) -> honey_traits::HwResult<()> {
        let mut sum: i64 = 0;
        for _ in 0..TARE_READINGS {
            sum += i64::from(self.hx711.read_absolute(self.timeout)?);
        }
        self.hx711.offset = (sum / TARE_READINGS as i64) as i32;
        debug!(offset = self.hx711.offset, "hx711 tared");
        Ok(())
    }
}
