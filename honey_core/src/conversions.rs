//! `From` implementations bridging `honey_config` types to `honey_core` types,
//! plus the reverse mapping used when settings are written back.

use std::time::Duration;

use crate::config::{ControlCfg, PersistenceCfg, Timeouts};
use crate::pid::PidLimits;
use crate::settings::Settings;
use crate::util::period_from_ms;
use crate::viscosity::{GainTable, Gains, ViscosityProfile};

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&honey_config::ControlCfg> for ControlCfg {
    fn from(c: &honey_config::ControlCfg) -> Self {
        Self {
            period: period_from_ms(c.period_ms),
            glass_debounce_ticks: c.glass_debounce_ticks,
            fill_confirm_ticks: c.fill_confirm_ticks,
            tare_settle: Duration::from_millis(c.tare_settle_ms),
            calibration_samples: c.calibration_samples,
            pid_limits: PidLimits {
                output_min: c.output_min,
                output_max: c.output_max,
                integral_min: c.integral_min,
                integral_max: c.integral_max,
            },
        }
    }
}

// ── Timeouts / persistence ───────────────────────────────────────────────────

impl From<&honey_config::Hardware> for Timeouts {
    fn from(c: &honey_config::Hardware) -> Self {
        Self {
            sensor: Duration::from_millis(c.sensor_read_timeout_ms),
        }
    }
}

impl From<&honey_config::PersistenceCfg> for PersistenceCfg {
    fn from(c: &honey_config::PersistenceCfg) -> Self {
        Self {
            flush_quiet: Duration::from_millis(c.flush_quiet_ms),
        }
    }
}

// ── Viscosity / gains ────────────────────────────────────────────────────────

impl From<honey_config::Viscosity> for ViscosityProfile {
    fn from(v: honey_config::Viscosity) -> Self {
        match v {
            honey_config::Viscosity::UserDefined => Self::UserDefined,
            honey_config::Viscosity::Low => Self::Low,
            honey_config::Viscosity::Medium => Self::Medium,
            honey_config::Viscosity::High => Self::High,
        }
    }
}

impl From<ViscosityProfile> for honey_config::Viscosity {
    fn from(v: ViscosityProfile) -> Self {
        match v {
            ViscosityProfile::UserDefined => Self::UserDefined,
            ViscosityProfile::Low => Self::Low,
            ViscosityProfile::Medium => Self::Medium,
            ViscosityProfile::High => Self::High,
        }
    }
}

impl From<&honey_config::GainsCfg> for Gains {
    fn from(c: &honey_config::GainsCfg) -> Self {
        Gains::new(c.kp, c.ti, c.kd)
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

impl From<&honey_config::Config> for Settings {
    fn from(c: &honey_config::Config) -> Self {
        let d = &c.dosing;
        Self {
            target_amount_g: d.target_amount_g,
            min_target_g: d.min_target_g,
            max_target_g: d.max_target_g,
            gains: GainTable::new(Gains::from(&c.gains), d.viscosity.into()),
            actuator_min: d.actuator_min,
            actuator_max: d.actuator_max,
            stop_hysteresis_g: d.stop_hysteresis_g,
            min_glass_weight_g: d.min_glass_weight_g,
            cal_reference_weight_g: d.cal_reference_weight_g,
            auto_mode: d.auto_mode,
        }
    }
}

impl Settings {
    /// Write runtime settings (and a calibration factor, if any) back into a
    /// config document so the next boot starts where this one left off.
    pub fn write_to(&self, cfg: &mut honey_config::Config, cal_factor: Option<f32>) {
        let d = &mut cfg.dosing;
        d.target_amount_g = self.target_amount_g;
        d.viscosity = self.viscosity().into();
        d.actuator_min = self.actuator_min;
        d.actuator_max = self.actuator_max;
        d.stop_hysteresis_g = self.stop_hysteresis_g;
        d.min_glass_weight_g = self.min_glass_weight_g;
        d.cal_reference_weight_g = self.cal_reference_weight_g;
        d.auto_mode = self.auto_mode;

        let user = self.gains.user_gains();
        cfg.gains = honey_config::GainsCfg {
            kp: user.kp,
            ti: user.ti,
            kd: user.kd,
        };
        if let Some(cal_factor) = cal_factor {
            cfg.calibration = Some(honey_config::PersistedCalibration { cal_factor });
        }
    }
}
