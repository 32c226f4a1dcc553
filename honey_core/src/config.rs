//! Runtime configuration for the control loop.
//!
//! Separate from the TOML schema in `honey_config`; see `conversions` for the
//! mapping.
use std::time::Duration;

use crate::pid::PidLimits;

/// Loop timing, debounce counts and controller limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCfg {
    /// Control tick period.
    pub period: Duration,
    /// Consecutive ticks at or above the glass threshold before a glass counts.
    pub glass_debounce_ticks: u32,
    /// Consecutive ticks inside the stop band before a fill completes.
    pub fill_confirm_ticks: u32,
    /// Settle delay after the calibration tare.
    pub tare_settle: Duration,
    /// Raw samples averaged against the reference weight.
    pub calibration_samples: u32,
    pub pid_limits: PidLimits,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(20),
            glass_debounce_ticks: 10,
            fill_confirm_ticks: 3,
            tare_settle: Duration::from_secs(1),
            calibration_samples: 100,
            pid_limits: PidLimits::default(),
        }
    }
}

/// Hardware-facing timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Max wait for one load-cell reading.
    pub sensor: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            sensor: Duration::from_millis(150),
        }
    }
}

/// Settings persistence timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceCfg {
    /// Quiet period after the last change before a flush.
    pub flush_quiet: Duration,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            flush_quiet: Duration::from_secs(5),
        }
    }
}
