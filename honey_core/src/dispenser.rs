//! The `Dispenser` context: every piece of loop state in one owner.
//!
//! One `tick()` per control period: drain commands, read one raw sample,
//! convert and smooth it, advance calibration (when armed) and dosing,
//! position the valve, publish telemetry and flush settings when due.
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use eyre::WrapErr;
use honey_traits::{Clock, LoadCell, ValveActuator};

use crate::calibration::{
    CalibrateAction, Calibration, CalibrationMachine, CalibrationOutcome, CalibrationState,
};
use crate::command::Command;
use crate::config::{ControlCfg, Timeouts};
use crate::dosing::{DoseStats, DosingMachine, DosingParams, DosingState};
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::sampler::WeightSampler;
use crate::settings::{Applied, FlushScheduler, Settings, SettingsStore};
use crate::telemetry::{TelemetryFrame, TelemetrySink};

pub struct Dispenser {
    pub(crate) load_cell: Box<dyn LoadCell>,
    pub(crate) valve: Box<dyn ValveActuator>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) commands_tx: Sender<Command>,
    pub(crate) commands_rx: Receiver<Command>,
    pub(crate) telemetry: Option<Box<dyn TelemetrySink>>,
    pub(crate) store: Option<Box<dyn SettingsStore>>,
    pub(crate) control: ControlCfg,
    pub(crate) timeouts: Timeouts,
    pub(crate) settings: Settings,
    pub(crate) calibration: Calibration,
    pub(crate) cal_factor: Option<f32>,
    pub(crate) cal_machine: CalibrationMachine,
    pub(crate) sampler: WeightSampler,
    pub(crate) dosing: DosingMachine,
    pub(crate) flush: FlushScheduler,
    pub(crate) last_raw: i32,
    pub(crate) last_frame: TelemetryFrame,
    pub(crate) ticks: u64,
}

impl core::fmt::Debug for Dispenser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispenser")
            .field("dosing", &self.dosing.state())
            .field("calibration", &self.cal_machine.state())
            .field("cal_factor", &self.cal_factor)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Dispenser {
    /// Handle for queueing commands from other threads.
    pub fn command_sender(&self) -> Sender<Command> {
        self.commands_tx.clone()
    }

    pub fn dosing_state(&self) -> DosingState {
        self.dosing.state()
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.cal_machine.state()
    }

    pub fn stats(&self) -> DoseStats {
        self.dosing.stats()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Active counts-per-gram factor, if one has been loaded or measured.
    pub fn cal_factor(&self) -> Option<f32> {
        self.cal_factor
    }

    pub fn control(&self) -> &ControlCfg {
        &self.control
    }

    pub fn last_frame(&self) -> &TelemetryFrame {
        &self.last_frame
    }

    pub fn settings_dirty(&self) -> bool {
        self.flush.is_dirty()
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// One control period.
    pub fn tick(&mut self) -> Result<TelemetryFrame> {
        let now = self.clock.now();
        self.drain_commands(now);

        let raw = self.read_raw();
        let grams = self.calibration.to_grams(raw);
        let stable = self.sampler.sample(grams);

        if self.cal_machine.is_armed() {
            let reference = self.settings.cal_reference_weight_g;
            if let Some(outcome) = self.cal_machine.tick(now, raw, reference) {
                self.finish_calibration(now, outcome);
            }
        }

        let params = self.dosing_params();
        let output = self
            .dosing
            .tick(stable, self.settings.target_amount_g, &params);
        let position = self.settings.valve_position(output);
        self.valve
            .set_position(position)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("set valve position")?;

        self.ticks += 1;
        let stats = self.dosing.stats();
        let frame = TelemetryFrame {
            tick: self.ticks,
            dosing_state: self.dosing.state().code(),
            calibration_state: self.cal_machine.state().code(),
            actual_weight: stable,
            adjusted_weight: self.dosing.session().map_or(0.0, |s| s.adjusted_weight),
            controller_output: output,
            valve_position: position,
            completed: stats.completed,
            total_dispensed_g: stats.total_dispensed_g,
        };
        tracing::trace!(
            raw,
            grams,
            stable,
            output,
            position,
            state = frame.dosing_state,
            "tick"
        );
        if let Some(sink) = self.telemetry.as_mut() {
            sink.publish(&frame);
        }
        self.last_frame = frame;

        if self.flush.is_due(now) {
            self.flush_settings(now);
        }
        Ok(frame)
    }

    /// Close the valve and park in `Idle`. Safe to call from any state, any
    /// number of times.
    pub fn emergency_stop(&mut self) -> Result<()> {
        self.dosing.stop();
        let closed = self.settings.valve_position(0.0);
        self.valve
            .set_position(closed)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("close valve")
    }

    /// Emergency stop plus a final flush of pending settings.
    pub fn shutdown(&mut self) -> Result<()> {
        let stopped = self.emergency_stop();
        if self.flush.is_dirty() {
            let now = self.clock.now();
            self.flush_settings(now);
        }
        stopped
    }

    fn dosing_params(&self) -> DosingParams {
        self.settings.dosing_params(
            self.control.glass_debounce_ticks,
            self.control.fill_confirm_ticks,
        )
    }

    fn read_raw(&mut self) -> i32 {
        match self.load_cell.read_raw(self.timeouts.sensor) {
            Ok(raw) => {
                self.last_raw = raw;
                raw
            }
            Err(e) => {
                let mapped = map_hw_error(&*e);
                tracing::warn!(error = %mapped, last_raw = self.last_raw, "load cell read failed; reusing last reading");
                self.last_raw
            }
        }
    }

    fn drain_commands(&mut self, now: Instant) {
        while let Ok(cmd) = self.commands_rx.try_recv() {
            self.handle_command(now, cmd);
        }
    }

    fn handle_command(&mut self, now: Instant, cmd: Command) {
        tracing::debug!(?cmd, "command");
        match cmd {
            Command::Start => {
                if self.cal_factor.is_none()
                    || self.cal_machine.state() != CalibrationState::NeedsCalibration
                {
                    tracing::warn!(
                        calibration = self.cal_machine.state().code(),
                        "start ignored: calibration pending"
                    );
                    return;
                }
                self.dosing.start();
            }
            Command::Stop => {
                self.dosing.stop();
                if self.cal_machine.in_progress() {
                    self.cal_machine.abort();
                }
            }
            Command::Tare => {
                if !self.dosing.state().is_rest() || self.cal_machine.in_progress() {
                    tracing::warn!("tare ignored while dosing or calibrating");
                    return;
                }
                self.tare();
            }
            Command::Calibrate => {
                if !self.dosing.state().is_rest() {
                    tracing::warn!("calibrate ignored while dosing");
                    return;
                }
                if self.cal_machine.on_calibrate(now) == CalibrateAction::Tare {
                    // Dosing stays parked for the whole routine.
                    self.dosing.stop();
                    if !self.tare() {
                        self.cal_machine.abort();
                    }
                }
            }
            Command::Set(param) => match self.settings.apply(param) {
                Ok(applied) => {
                    tracing::info!(?param, "setting changed");
                    if applied == Applied::ReinitController {
                        let gains = self.settings.gains.active_gains();
                        self.dosing.pid_mut().set_gains(gains);
                    }
                    self.flush.mark_dirty(now);
                }
                Err(e) => tracing::warn!(error = %e, "setting rejected"),
            },
        }
    }

    fn tare(&mut self) -> bool {
        match self.load_cell.tare() {
            Ok(()) => {
                self.sampler.reset();
                self.last_raw = 0;
                tracing::info!("load cell tared");
                true
            }
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "tare failed");
                false
            }
        }
    }

    fn finish_calibration(&mut self, now: Instant, outcome: CalibrationOutcome) {
        let CalibrationOutcome::Finished(factor) = outcome else {
            tracing::warn!(cal_factor = ?self.cal_factor, "calibration rejected; keeping prior factor");
            return;
        };
        let Some(cal) = Calibration::new(factor) else {
            return;
        };
        self.calibration = cal;
        self.cal_factor = Some(factor);
        self.sampler.reset();
        // Calibration is persisted right away; a failure falls back to the
        // debounced retry path.
        self.flush_settings(now);
    }

    fn flush_settings(&mut self, now: Instant) {
        let Some(store) = self.store.as_mut() else {
            self.flush.flushed();
            return;
        };
        match store.persist(&self.settings, self.cal_factor) {
            Ok(()) => {
                tracing::debug!("settings persisted");
                self.flush.flushed();
            }
            Err(e) => {
                tracing::warn!(error = %e, "settings flush failed; will retry");
                self.flush.failed(now);
            }
        }
    }
}
