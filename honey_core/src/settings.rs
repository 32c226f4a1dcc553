//! Runtime-tunable parameters, their validation, and debounced persistence.
use std::time::{Duration, Instant};

use crate::command::Parameter;
use crate::dosing::DosingParams;
use crate::error::SettingsError;
use crate::viscosity::{GainTable, Gains, ViscosityProfile};

/// Servo travel is expressed in degrees.
pub const ACTUATOR_RANGE: (f32, f32) = (0.0, 180.0);

/// Parameters an operator can change while the loop runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub target_amount_g: f32,
    pub min_target_g: f32,
    pub max_target_g: f32,
    pub gains: GainTable,
    pub actuator_min: f32,
    pub actuator_max: f32,
    pub stop_hysteresis_g: f32,
    pub min_glass_weight_g: f32,
    pub cal_reference_weight_g: f32,
    pub auto_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_amount_g: 250.0,
            min_target_g: 10.0,
            max_target_g: 5000.0,
            gains: GainTable::new(Gains::default(), ViscosityProfile::Medium),
            actuator_min: 0.0,
            actuator_max: 90.0,
            stop_hysteresis_g: 5.0,
            min_glass_weight_g: 10.0,
            cal_reference_weight_g: 200.0,
            auto_mode: false,
        }
    }
}

/// Whether an accepted change invalidates the controller history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Plain,
    ReinitController,
}

fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<f32, SettingsError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(SettingsError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Smallest value accepted where a strictly positive one is required.
const POSITIVE_MIN: f32 = 0.1;

impl Settings {
    /// Validate and apply one change; on error nothing is modified.
    pub fn apply(&mut self, param: Parameter) -> Result<Applied, SettingsError> {
        let (lo, hi) = ACTUATOR_RANGE;
        match param {
            Parameter::TargetAmount(v) => {
                self.target_amount_g =
                    check_range("target_amount", v, self.min_target_g, self.max_target_g)?;
            }
            Parameter::Viscosity(p) => {
                self.gains.select(p);
                return Ok(Applied::ReinitController);
            }
            Parameter::ActuatorMin(v) => {
                let v = check_range("actuator_min", v, lo, hi)?;
                if v == self.actuator_max {
                    return Err(SettingsError::ActuatorRangeEmpty);
                }
                self.actuator_min = v;
                return Ok(Applied::ReinitController);
            }
            Parameter::ActuatorMax(v) => {
                let v = check_range("actuator_max", v, lo, hi)?;
                if v == self.actuator_min {
                    return Err(SettingsError::ActuatorRangeEmpty);
                }
                self.actuator_max = v;
                return Ok(Applied::ReinitController);
            }
            Parameter::StopHysteresis(v) => {
                self.stop_hysteresis_g =
                    check_range("stop_hysteresis", v, 0.0, self.max_target_g)?;
            }
            Parameter::MinGlassWeight(v) => {
                self.min_glass_weight_g =
                    check_range("min_glass_weight", v, POSITIVE_MIN, self.max_target_g)?;
            }
            Parameter::CalReferenceWeight(v) => {
                self.cal_reference_weight_g =
                    check_range("cal_reference_weight", v, POSITIVE_MIN, f32::MAX)?;
            }
            Parameter::AutoMode(on) => self.auto_mode = on,
            Parameter::Kp(v) => {
                let v = check_range("kp", v, 0.0, f32::MAX)?;
                self.gains.update_active(|g| g.kp = v);
                return Ok(Applied::ReinitController);
            }
            Parameter::Ti(v) => {
                let v = check_range("ti", v, 0.0, f32::MAX)?;
                self.gains.update_active(|g| g.ti = v);
                return Ok(Applied::ReinitController);
            }
            Parameter::Kd(v) => {
                let v = check_range("kd", v, 0.0, f32::MAX)?;
                self.gains.update_active(|g| g.kd = v);
                return Ok(Applied::ReinitController);
            }
        }
        Ok(Applied::Plain)
    }

    pub fn viscosity(&self) -> ViscosityProfile {
        self.gains.active()
    }

    /// Map a normalized controller output onto the servo travel.
    #[inline]
    pub fn valve_position(&self, output: f32) -> f32 {
        self.actuator_min + output * (self.actuator_max - self.actuator_min)
    }

    pub fn dosing_params(&self, glass_debounce_ticks: u32, fill_confirm_ticks: u32) -> DosingParams {
        DosingParams {
            min_glass_weight_g: self.min_glass_weight_g,
            stop_hysteresis_g: self.stop_hysteresis_g,
            glass_debounce_ticks,
            fill_confirm_ticks,
            auto_mode: self.auto_mode,
        }
    }
}

/// Destination for settings that must survive a reboot.
pub trait SettingsStore {
    fn persist(
        &mut self,
        settings: &Settings,
        cal_factor: Option<f32>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Dirty flag with a quiet period: flush once nothing changed for `quiet`.
#[derive(Debug, Clone)]
pub struct FlushScheduler {
    quiet: Duration,
    dirty_since: Option<Instant>,
}

impl FlushScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            dirty_since: None,
        }
    }

    /// Record a change; restarts the quiet period.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty_since = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.dirty_since
            .is_some_and(|t| now.saturating_duration_since(t) >= self.quiet)
    }

    pub fn flushed(&mut self) {
        self.dirty_since = None;
    }

    /// A failed flush is retried after another quiet period.
    pub fn failed(&mut self, now: Instant) {
        self.dirty_since = Some(now);
    }
}
