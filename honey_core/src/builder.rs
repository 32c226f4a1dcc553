//! Type-state builder for `Dispenser`.
//!
//! `build()` only exists once a load cell and a valve have been supplied;
//! `try_build()` is always available and reports what is missing at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use honey_traits::clock::{Clock, MonotonicClock};
use honey_traits::{LoadCell, ValveActuator};

use crate::calibration::{Calibration, CalibrationMachine};
use crate::config::{ControlCfg, PersistenceCfg, Timeouts};
use crate::dispenser::Dispenser;
use crate::dosing::DosingMachine;
use crate::error::{BuildError, Result};
use crate::pid::PidController;
use crate::sampler::WeightSampler;
use crate::settings::{FlushScheduler, Settings, SettingsStore};
use crate::telemetry::{TelemetryFrame, TelemetrySink};
use crate::util::dt_seconds;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct DispenserBuilder<L, V> {
    load_cell: Option<Box<dyn LoadCell>>,
    valve: Option<Box<dyn ValveActuator>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    control: ControlCfg,
    timeouts: Timeouts,
    persistence: PersistenceCfg,
    settings: Settings,
    cal_factor: Option<f32>,
    store: Option<Box<dyn SettingsStore>>,
    telemetry: Option<Box<dyn TelemetrySink>>,
    _l: PhantomData<L>,
    _v: PhantomData<V>,
}

impl Default for DispenserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            load_cell: None,
            valve: None,
            clock: None,
            control: ControlCfg::default(),
            timeouts: Timeouts::default(),
            persistence: PersistenceCfg::default(),
            settings: Settings::default(),
            cal_factor: None,
            store: None,
            telemetry: None,
            _l: PhantomData,
            _v: PhantomData,
        }
    }
}

impl Dispenser {
    pub fn builder() -> DispenserBuilder<Missing, Missing> {
        DispenserBuilder::default()
    }
}

impl<L, V> DispenserBuilder<L, V> {
    fn retype<L2, V2>(self) -> DispenserBuilder<L2, V2> {
        DispenserBuilder {
            load_cell: self.load_cell,
            valve: self.valve,
            clock: self.clock,
            control: self.control,
            timeouts: self.timeouts,
            persistence: self.persistence,
            settings: self.settings,
            cal_factor: self.cal_factor,
            store: self.store,
            telemetry: self.telemetry,
            _l: PhantomData,
            _v: PhantomData,
        }
    }

    pub fn with_load_cell(mut self, cell: impl LoadCell + 'static) -> DispenserBuilder<Set, V> {
        self.load_cell = Some(Box::new(cell));
        self.retype()
    }

    pub fn with_valve(mut self, valve: impl ValveActuator + 'static) -> DispenserBuilder<L, Set> {
        self.valve = Some(Box::new(valve));
        self.retype()
    }

    /// Inject a clock (tests use `TestClock`). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = control;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_persistence(mut self, persistence: PersistenceCfg) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Persisted counts-per-gram factor from a previous calibration.
    pub fn with_cal_factor(mut self, factor: Option<f32>) -> Self {
        self.cal_factor = factor;
        self
    }

    pub fn with_store(mut self, store: impl SettingsStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_telemetry(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Some(Box::new(sink));
        self
    }

    /// Validate and construct; available in any type state.
    pub fn try_build(self) -> Result<Dispenser> {
        let load_cell = self
            .load_cell
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLoadCell))?;
        let valve = self
            .valve
            .ok_or_else(|| eyre::Report::new(BuildError::MissingValve))?;
        validate(&self.control, &self.settings)?;

        let calibration = match self.cal_factor {
            Some(f) => Some(Calibration::new(f).ok_or_else(|| {
                eyre::Report::new(BuildError::InvalidConfig(
                    "calibration factor must be finite and non-zero",
                ))
            })?),
            None => None,
        };
        let cal_machine = CalibrationMachine::new(
            calibration.is_some(),
            self.control.tare_settle,
            self.control.calibration_samples,
        );
        if calibration.is_none() {
            tracing::warn!("no calibration factor; run the calibration routine before dosing");
        }

        let pid = PidController::new(
            self.settings.gains.active_gains(),
            dt_seconds(self.control.period),
            self.control.pid_limits,
        );
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();

        Ok(Dispenser {
            load_cell,
            valve,
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            commands_tx,
            commands_rx,
            telemetry: self.telemetry,
            store: self.store,
            timeouts: self.timeouts,
            calibration: calibration.unwrap_or_default(),
            cal_factor: self.cal_factor,
            cal_machine,
            sampler: WeightSampler::new(),
            dosing: DosingMachine::new(pid),
            flush: FlushScheduler::new(self.persistence.flush_quiet),
            last_raw: 0,
            last_frame: TelemetryFrame::default(),
            ticks: 0,
            control: self.control,
            settings: self.settings,
        })
    }
}

impl DispenserBuilder<Set, Set> {
    pub fn build(self) -> Result<Dispenser> {
        self.try_build()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn validate(control: &ControlCfg, s: &Settings) -> Result<()> {
    if control.period.is_zero() {
        return Err(invalid("period must be > 0"));
    }
    if control.glass_debounce_ticks == 0 || control.fill_confirm_ticks == 0 {
        return Err(invalid("debounce and confirm counts must be >= 1"));
    }
    let l = control.pid_limits;
    if l.output_min >= l.output_max || l.integral_min > l.integral_max {
        return Err(invalid("controller limits are inverted"));
    }
    if !positive(s.min_target_g) || s.min_target_g > s.max_target_g {
        return Err(invalid("min_target_g must be > 0 and <= max_target_g"));
    }
    if !(s.min_target_g..=s.max_target_g).contains(&s.target_amount_g) {
        return Err(invalid("target amount out of range"));
    }
    if s.actuator_min == s.actuator_max {
        return Err(invalid("actuator_min and actuator_max must differ"));
    }
    if !positive(s.cal_reference_weight_g) {
        return Err(invalid("cal_reference_weight_g must be > 0"));
    }
    if !positive(s.min_glass_weight_g) {
        return Err(invalid("min_glass_weight_g must be > 0"));
    }
    if s.stop_hysteresis_g.is_sign_negative() {
        return Err(invalid("stop_hysteresis_g must be >= 0"));
    }
    Ok(())
}
