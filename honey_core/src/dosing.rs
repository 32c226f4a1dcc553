//! Glass detection, fill and completion.
//!
//! The machine owns the PID controller: it locks the setpoint when a fill
//! starts, feeds it the weight ratio while filling and stops it on every
//! exit from `Filling`. `tick` returns the normalized valve output.
use crate::pid::PidController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosingState {
    /// Parked after boot or an explicit stop; waits for `start`.
    Idle,
    DetectGlass,
    StartFill,
    Filling,
    /// Dose done; waits for the glass to be removed (auto mode) or `start`.
    Complete,
}

impl DosingState {
    /// Numeric form used in telemetry. `Idle` and `Complete` share code 4.
    pub fn code(self) -> u8 {
        match self {
            DosingState::DetectGlass => 1,
            DosingState::StartFill => 2,
            DosingState::Filling => 3,
            DosingState::Idle | DosingState::Complete => 4,
        }
    }

    pub fn is_rest(self) -> bool {
        self.code() == 4
    }
}

/// Per-glass bookkeeping, created on glass detect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DosingSession {
    /// Stable weight when the glass was accepted
    pub glass_weight: f32,
    /// Setpoint locked at fill start
    pub target_weight: f32,
    /// Stable weight minus glass weight, floored at 0
    pub adjusted_weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoseStats {
    pub completed: u32,
    pub total_dispensed_g: f32,
    pub last_dose_g: f32,
}

/// Thresholds the machine reads each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DosingParams {
    pub min_glass_weight_g: f32,
    pub stop_hysteresis_g: f32,
    pub glass_debounce_ticks: u32,
    pub fill_confirm_ticks: u32,
    pub auto_mode: bool,
}

impl Default for DosingParams {
    fn default() -> Self {
        Self {
            min_glass_weight_g: 10.0,
            stop_hysteresis_g: 5.0,
            glass_debounce_ticks: 10,
            fill_confirm_ticks: 3,
            auto_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DosingMachine {
    state: DosingState,
    pid: PidController,
    glass_ticks: u32,
    confirm_ticks: u32,
    session: Option<DosingSession>,
    stats: DoseStats,
}

impl DosingMachine {
    pub fn new(pid: PidController) -> Self {
        Self {
            state: DosingState::Idle,
            pid,
            glass_ticks: 0,
            confirm_ticks: 0,
            session: None,
            stats: DoseStats::default(),
        }
    }

    pub fn state(&self) -> DosingState {
        self.state
    }

    pub fn session(&self) -> Option<&DosingSession> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> DoseStats {
        self.stats
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn pid_mut(&mut self) -> &mut PidController {
        &mut self.pid
    }

    /// Accepted only at rest. Returns whether the machine was armed.
    pub fn start(&mut self) -> bool {
        if !self.state.is_rest() {
            tracing::debug!(state = ?self.state, "start ignored while dosing");
            return false;
        }
        self.reset_counters();
        self.transition(DosingState::DetectGlass);
        true
    }

    /// Emergency stop: park in `Idle` with the controller stopped.
    pub fn stop(&mut self) {
        self.pid.stop();
        self.reset_counters();
        self.session = None;
        if self.state != DosingState::Idle {
            self.transition(DosingState::Idle);
        }
    }

    fn reset_counters(&mut self) {
        self.glass_ticks = 0;
        self.confirm_ticks = 0;
    }

    fn transition(&mut self, next: DosingState) {
        tracing::info!(from = ?self.state, to = ?next, "dosing state");
        self.state = next;
    }

    /// Advance one tick. Returns the normalized valve output.
    pub fn tick(&mut self, stable_weight: f32, target_amount_g: f32, p: &DosingParams) -> f32 {
        match self.state {
            DosingState::Idle => 0.0,
            DosingState::DetectGlass => {
                if stable_weight >= p.min_glass_weight_g {
                    self.glass_ticks += 1;
                    if self.glass_ticks >= p.glass_debounce_ticks {
                        tracing::info!(glass_weight = stable_weight, "glass detected");
                        self.session = Some(DosingSession {
                            glass_weight: stable_weight,
                            ..DosingSession::default()
                        });
                        self.glass_ticks = 0;
                        self.transition(DosingState::StartFill);
                    }
                } else {
                    self.glass_ticks = 0;
                }
                0.0
            }
            DosingState::StartFill => {
                if !(target_amount_g.is_finite() && target_amount_g > 0.0) {
                    tracing::error!(target_amount_g, "refusing to fill: target must be > 0");
                    self.stop();
                    return 0.0;
                }
                if let Some(s) = self.session.as_mut() {
                    s.target_weight = target_amount_g;
                }
                self.pid.set_setpoint(1.0);
                self.pid.start();
                self.confirm_ticks = 0;
                self.transition(DosingState::Filling);
                0.0
            }
            DosingState::Filling => self.fill_step(stable_weight, p),
            DosingState::Complete => {
                if stable_weight < p.min_glass_weight_g && p.auto_mode {
                    tracing::debug!("glass removed; re-arming detection");
                    self.session = None;
                    self.reset_counters();
                    self.transition(DosingState::DetectGlass);
                }
                0.0
            }
        }
    }

    fn fill_step(&mut self, stable_weight: f32, p: &DosingParams) -> f32 {
        let Some(session) = self.session.as_mut() else {
            tracing::error!("filling without a session; stopping");
            self.stop();
            return 0.0;
        };
        session.adjusted_weight = (stable_weight - session.glass_weight).max(0.0);
        let DosingSession {
            target_weight,
            adjusted_weight,
            ..
        } = *session;

        if target_weight - adjusted_weight < p.stop_hysteresis_g {
            self.confirm_ticks += 1;
            if self.confirm_ticks >= p.fill_confirm_ticks {
                self.complete(adjusted_weight);
                return 0.0;
            }
        } else {
            self.confirm_ticks = 0;
        }
        self.pid.compute(adjusted_weight / target_weight)
    }

    fn complete(&mut self, dispensed_g: f32) {
        self.pid.stop();
        self.confirm_ticks = 0;
        self.stats.completed += 1;
        self.stats.total_dispensed_g += dispensed_g;
        self.stats.last_dose_g = dispensed_g;
        tracing::info!(
            dispensed_g,
            completed = self.stats.completed,
            "dose complete"
        );
        self.transition(DosingState::Complete);
    }
}
