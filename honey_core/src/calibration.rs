//! Raw-count to gram conversion and the multi-step calibration routine.
use std::time::{Duration, Instant};

/// Linear scale conversion: `grams = raw / counts_per_gram`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    counts_per_gram: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            counts_per_gram: 1.0,
        }
    }
}

impl Calibration {
    /// Returns `None` for a zero or non-finite factor.
    pub fn new(counts_per_gram: f32) -> Option<Self> {
        is_usable_factor(counts_per_gram).then_some(Self { counts_per_gram })
    }

    pub fn counts_per_gram(&self) -> f32 {
        self.counts_per_gram
    }

    /// Convert tared raw counts to whole grams, rounding to nearest.
    #[inline]
    pub fn to_grams(&self, raw: i32) -> i32 {
        let g = (f64::from(raw) / f64::from(self.counts_per_gram)).round();
        g.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }
}

#[inline]
fn is_usable_factor(f: f32) -> bool {
    f.is_finite() && f != 0.0
}

/// Calibration phase. `code()` gives the numeric form shown in telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// No routine in progress; the active factor (if any) is in use.
    NeedsCalibration,
    /// Waiting for the operator to start the routine on an empty platform.
    AwaitStart,
    /// Load cell tared, waiting for the reading to settle.
    Taring { since: Instant },
    /// Waiting for the operator to place the reference mass.
    AwaitReference,
    /// Accumulating raw samples of the reference mass.
    Sampling { count: u32, sum: i64 },
}

impl CalibrationState {
    pub fn code(&self) -> u8 {
        match self {
            CalibrationState::NeedsCalibration => 0,
            CalibrationState::AwaitStart => 1,
            CalibrationState::Taring { .. } => 2,
            CalibrationState::AwaitReference => 3,
            CalibrationState::Sampling { .. } => 4,
        }
    }
}

/// What the owner must do after feeding a `calibrate` command in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrateAction {
    /// Tare the load cell now; call `abort` if that fails.
    Tare,
    /// Nothing to do in this phase.
    None,
}

/// Result of a completed sampling phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// New counts-per-gram factor to apply and persist.
    Finished(f32),
    /// Routine ended without a usable factor; the prior one stays.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CalibrationMachine {
    state: CalibrationState,
    settle: Duration,
    samples: u32,
    has_factor: bool,
}

impl CalibrationMachine {
    /// `has_factor` selects the boot state: without a persisted factor the
    /// routine waits for the operator straight away.
    pub fn new(has_factor: bool, settle: Duration, samples: u32) -> Self {
        Self {
            state: rest_state(has_factor),
            settle,
            samples: samples.max(1),
            has_factor,
        }
    }

    /// True once a usable factor is loaded or has been measured.
    pub fn has_factor(&self) -> bool {
        self.has_factor
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Taring or sampling: needs a tick every control period.
    pub fn is_armed(&self) -> bool {
        matches!(
            self.state,
            CalibrationState::Taring { .. } | CalibrationState::Sampling { .. }
        )
    }

    /// Any phase past the idle states.
    pub fn in_progress(&self) -> bool {
        !matches!(
            self.state,
            CalibrationState::NeedsCalibration | CalibrationState::AwaitStart
        )
    }

    /// Operator pressed `calibrate`.
    pub fn on_calibrate(&mut self, now: Instant) -> CalibrateAction {
        match self.state {
            CalibrationState::NeedsCalibration | CalibrationState::AwaitStart => {
                tracing::info!("calibration: taring empty platform");
                self.state = CalibrationState::Taring { since: now };
                CalibrateAction::Tare
            }
            CalibrationState::AwaitReference => {
                tracing::info!(samples = self.samples, "calibration: sampling reference");
                self.state = CalibrationState::Sampling { count: 0, sum: 0 };
                CalibrateAction::None
            }
            CalibrationState::Taring { .. } | CalibrationState::Sampling { .. } => {
                tracing::debug!(state = self.state.code(), "calibrate ignored in this phase");
                CalibrateAction::None
            }
        }
    }

    /// Abandon the routine; the prior factor remains in effect. Without one
    /// the machine goes back to waiting for the operator.
    pub fn abort(&mut self) {
        if self.in_progress() {
            tracing::warn!(state = self.state.code(), "calibration aborted");
        }
        self.state = rest_state(self.has_factor);
    }

    /// Advance an armed phase by one tick with the current tared raw reading.
    pub fn tick(
        &mut self,
        now: Instant,
        raw: i32,
        reference_weight_g: f32,
    ) -> Option<CalibrationOutcome> {
        match self.state {
            CalibrationState::Taring { since } => {
                if now.saturating_duration_since(since) >= self.settle {
                    tracing::info!("calibration: place reference weight, then calibrate");
                    self.state = CalibrationState::AwaitReference;
                }
                None
            }
            CalibrationState::Sampling { count, sum } => {
                let count = count + 1;
                let sum = sum + i64::from(raw);
                if count < self.samples {
                    self.state = CalibrationState::Sampling { count, sum };
                    return None;
                }
                let outcome = finish(sum, count, reference_weight_g);
                if matches!(outcome, CalibrationOutcome::Finished(_)) {
                    self.has_factor = true;
                }
                self.state = rest_state(self.has_factor);
                Some(outcome)
            }
            _ => None,
        }
    }
}

fn rest_state(has_factor: bool) -> CalibrationState {
    if has_factor {
        CalibrationState::NeedsCalibration
    } else {
        CalibrationState::AwaitStart
    }
}

fn finish(sum: i64, count: u32, reference_weight_g: f32) -> CalibrationOutcome {
    if !(reference_weight_g.is_finite() && reference_weight_g > 0.0) {
        tracing::error!(reference_weight_g, "calibration rejected: invalid reference weight");
        return CalibrationOutcome::Rejected;
    }
    let raw_average = sum as f64 / f64::from(count);
    let factor = (raw_average / f64::from(reference_weight_g)) as f32;
    if !is_usable_factor(factor) {
        tracing::error!(raw_average, factor, "calibration rejected: unusable factor");
        return CalibrationOutcome::Rejected;
    }
    tracing::info!(raw_average, cal_factor = factor, "calibration finished");
    CalibrationOutcome::Finished(factor)
}
