#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the honey dispenser.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The same schema is written back (atomically) when runtime settings or a
//!   fresh calibration factor must survive a reboot.
use serde::{Deserialize, Serialize};
use std::path::Path;

mod atomic;

pub use atomic::write_atomic;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// PWM-capable pin driving the tap servo
    pub servo_pwm: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    /// Control tick period in ms
    pub period_ms: u64,
    /// Consecutive ticks above min glass weight before a glass is accepted
    pub glass_debounce_ticks: u32,
    /// Consecutive ticks inside the stop hysteresis before a fill completes
    pub fill_confirm_ticks: u32,
    /// Settle time after tare during calibration
    pub tare_settle_ms: u64,
    /// Raw samples averaged while calibrating against the reference weight
    pub calibration_samples: u32,
    /// Anti-windup band for the integral contribution
    pub integral_min: f32,
    pub integral_max: f32,
    /// Controller output limits (normalized valve travel)
    pub output_min: f32,
    pub output_max: f32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            period_ms: 20,
            glass_debounce_ticks: 10,
            fill_confirm_ticks: 3,
            tare_settle_ms: 1000,
            calibration_samples: 100,
            integral_min: 0.0,
            integral_max: 0.5,
            output_min: 0.0,
            output_max: 1.0,
        }
    }
}

/// Viscosity preset selector as written in TOML.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Viscosity {
    UserDefined,
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DosingCfg {
    /// Desired amount per glass (grams)
    pub target_amount_g: f32,
    /// Smallest dose the settings layer accepts; must be > 0
    pub min_target_g: f32,
    /// Largest dose the settings layer accepts
    pub max_target_g: f32,
    pub viscosity: Viscosity,
    /// Servo position with the tap closed
    pub actuator_min: f32,
    /// Servo position with the tap fully open
    pub actuator_max: f32,
    /// Stop once within this many grams of the target
    pub stop_hysteresis_g: f32,
    /// A glass is present at or above this weight
    pub min_glass_weight_g: f32,
    /// Reference mass used by the calibration routine
    pub cal_reference_weight_g: f32,
    /// Re-arm glass detection automatically after a glass is removed
    pub auto_mode: bool,
}

impl Default for DosingCfg {
    fn default() -> Self {
        Self {
            target_amount_g: 250.0,
            min_target_g: 10.0,
            max_target_g: 5000.0,
            viscosity: Viscosity::Medium,
            actuator_min: 0.0,
            actuator_max: 90.0,
            stop_hysteresis_g: 5.0,
            min_glass_weight_g: 10.0,
            cal_reference_weight_g: 200.0,
            auto_mode: false,
        }
    }
}

/// Gains of the user-defined viscosity profile.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
#[serde(default)]
pub struct GainsCfg {
    pub kp: f32,
    /// Integral time in seconds; 0 disables integral action
    pub ti: f32,
    pub kd: f32,
}

impl Default for GainsCfg {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ti: 5.0,
            kd: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PersistenceCfg {
    /// Where runtime settings and calibration are written back; None disables persistence
    pub settings_file: Option<String>,
    /// Quiet period after the last change before settings are flushed
    pub flush_quiet_ms: u64,
}

impl Default for PersistenceCfg {
    fn default() -> Self {
        Self {
            settings_file: None,
            flush_quiet_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before failing
    pub sensor_read_timeout_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            sensor_read_timeout_ms: 150,
        }
    }
}

/// Parameters of the simulated bench used when no hardware is attached.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SimulationCfg {
    /// True counts-per-gram of the simulated load cell
    pub counts_per_gram: f32,
    /// Raw counts reported with an empty platform before tare
    pub zero_offset_counts: i32,
    /// Weight of an empty jar
    pub jar_weight_g: f32,
    /// Remove and replace jars automatically after each fill
    pub auto_jar: bool,
    /// Honey level in the bucket
    pub bucket_fill_cm: f32,
    pub temperature_c: f32,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            counts_per_gram: 420.0,
            zero_offset_counts: 8_000,
            jar_weight_g: 50.0,
            auto_jar: false,
            bucket_fill_cm: 60.0,
            temperature_c: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct PersistedCalibration {
    /// Raw counts per gram derived by the calibration routine
    pub cal_factor: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub dosing: DosingCfg,
    #[serde(default)]
    pub gains: GainsCfg,
    #[serde(default)]
    pub persistence: PersistenceCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub simulation: SimulationCfg,
    /// Persisted calibration; absent until the calibration routine has run once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<PersistedCalibration>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

impl Config {
    /// Serialize and atomically replace `path`.
    pub fn save(&self, path: &Path) -> eyre::Result<()> {
        let text =
            toml::to_string_pretty(self).map_err(|e| eyre::eyre!("serialize config: {e}"))?;
        write_atomic(path, text.as_bytes())
            .map_err(|e| eyre::eyre!("write config {:?}: {}", path, e))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Control
        if !(1..=1000).contains(&self.control.period_ms) {
            eyre::bail!("control.period_ms must be in [1, 1000]");
        }
        if self.control.glass_debounce_ticks == 0 {
            eyre::bail!("control.glass_debounce_ticks must be >= 1");
        }
        if self.control.fill_confirm_ticks == 0 {
            eyre::bail!("control.fill_confirm_ticks must be >= 1");
        }
        if self.control.calibration_samples == 0 {
            eyre::bail!("control.calibration_samples must be >= 1");
        }
        if self.control.tare_settle_ms > 60_000 {
            eyre::bail!("control.tare_settle_ms is unreasonably large (>60s)");
        }
        let c = &self.control;
        if !(c.integral_min.is_finite() && c.integral_max.is_finite())
            || c.integral_min > c.integral_max
        {
            eyre::bail!("control.integral_min must be <= control.integral_max");
        }
        if !(c.output_min.is_finite() && c.output_max.is_finite()) || c.output_min >= c.output_max
        {
            eyre::bail!("control.output_min must be < control.output_max");
        }

        // Dosing
        let d = &self.dosing;
        if !(d.min_target_g.is_finite() && d.min_target_g > 0.0) {
            eyre::bail!("dosing.min_target_g must be > 0");
        }
        if !(d.max_target_g.is_finite() && d.max_target_g >= d.min_target_g) {
            eyre::bail!("dosing.max_target_g must be >= dosing.min_target_g");
        }
        if !(d.min_target_g..=d.max_target_g).contains(&d.target_amount_g) {
            eyre::bail!("dosing.target_amount_g must be within [min_target_g, max_target_g]");
        }
        for (name, v) in [
            ("dosing.actuator_min", d.actuator_min),
            ("dosing.actuator_max", d.actuator_max),
        ] {
            if !(0.0..=180.0).contains(&v) {
                eyre::bail!("{name} must be in [0, 180]");
            }
        }
        if d.actuator_min == d.actuator_max {
            eyre::bail!("dosing.actuator_min and dosing.actuator_max must differ");
        }
        if !(d.stop_hysteresis_g.is_finite() && d.stop_hysteresis_g >= 0.0) {
            eyre::bail!("dosing.stop_hysteresis_g must be >= 0");
        }
        if !(d.min_glass_weight_g.is_finite() && d.min_glass_weight_g > 0.0) {
            eyre::bail!("dosing.min_glass_weight_g must be > 0");
        }
        if !(d.cal_reference_weight_g.is_finite() && d.cal_reference_weight_g > 0.0) {
            eyre::bail!("dosing.cal_reference_weight_g must be > 0");
        }

        // Gains
        for (name, v) in [
            ("gains.kp", self.gains.kp),
            ("gains.ti", self.gains.ti),
            ("gains.kd", self.gains.kd),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                eyre::bail!("{name} must be a finite value >= 0");
            }
        }

        // Persistence
        if self.persistence.flush_quiet_ms == 0 {
            eyre::bail!("persistence.flush_quiet_ms must be >= 1");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }

        // Simulation
        if !(self.simulation.counts_per_gram.is_finite() && self.simulation.counts_per_gram > 0.0)
        {
            eyre::bail!("simulation.counts_per_gram must be > 0");
        }

        if let Some(cal) = self.calibration
            && !(cal.cal_factor.is_finite() && cal.cal_factor != 0.0)
        {
            eyre::bail!("calibration.cal_factor must be finite and non-zero");
        }

        Ok(())
    }
}
