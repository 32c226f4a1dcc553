//! Fixed-period PID controller with a clamped integral contribution.
use crate::viscosity::Gains;

/// Output and anti-windup limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidLimits {
    pub output_min: f32,
    pub output_max: f32,
    pub integral_min: f32,
    pub integral_max: f32,
}

impl Default for PidLimits {
    fn default() -> Self {
        Self {
            output_min: 0.0,
            output_max: 1.0,
            integral_min: 0.0,
            integral_max: 0.5,
        }
    }
}

/// `output = kp·e + (kp/ti)·∫e·dt + kd·de/dt` with `e = setpoint - input`.
///
/// The integral term is stored as its contribution to the output and kept
/// inside `[integral_min, integral_max]`.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: Gains,
    limits: PidLimits,
    dt: f32,
    setpoint: f32,
    running: bool,
    integral: f32,
    prev_error: Option<f32>,
    output: f32,
}

impl PidController {
    pub fn new(gains: Gains, dt: f32, limits: PidLimits) -> Self {
        Self {
            gains,
            limits,
            dt: if dt > 0.0 { dt } else { 0.02 },
            setpoint: 1.0,
            running: false,
            integral: 0.0,
            prev_error: None,
            output: 0.0,
        }
    }

    /// Clear integral and derivative history.
    pub fn init(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    /// New gains take effect from a clean history.
    pub fn set_gains(&mut self, gains: Gains) {
        self.gains = gains;
        self.init();
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    /// Cold start.
    pub fn start(&mut self) {
        self.running = true;
        self.init();
    }

    /// Output drops to zero immediately; next `start` is a cold start.
    pub fn stop(&mut self) {
        self.running = false;
        self.init();
        self.output = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    pub fn integral_term(&self) -> f32 {
        self.integral
    }

    /// One controller step. Returns 0 while stopped.
    pub fn compute(&mut self, input: f32) -> f32 {
        if !self.running {
            self.output = 0.0;
            return 0.0;
        }
        let Gains { kp, ti, kd } = self.gains;
        let e = self.setpoint - input;
        if !e.is_finite() {
            tracing::warn!(input, "pid input not finite; holding output");
            return self.output;
        }

        if ti > 0.0 {
            self.integral = (self.integral + kp / ti * e * self.dt)
                .clamp(self.limits.integral_min, self.limits.integral_max);
        }
        let derivative = self.prev_error.map_or(0.0, |prev| kd * (e - prev) / self.dt);
        self.prev_error = Some(e);

        self.output =
            (kp * e + self.integral + derivative).clamp(self.limits.output_min, self.limits.output_max);
        tracing::trace!(e, i = self.integral, d = derivative, out = self.output, "pid step");
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_controller_outputs_zero() {
        let mut pid = PidController::new(Gains::default(), 0.02, PidLimits::default());
        assert_eq!(pid.compute(0.0), 0.0);
        pid.start();
        assert!(pid.compute(0.0) > 0.0);
        pid.stop();
        assert_eq!(pid.output(), 0.0);
        assert_eq!(pid.integral_term(), 0.0);
    }

    #[test]
    fn proportional_only_when_ti_is_zero() {
        let mut pid = PidController::new(Gains::new(0.5, 0.0, 0.0), 0.02, PidLimits::default());
        pid.start();
        for _ in 0..100 {
            assert!((pid.compute(0.5) - 0.25).abs() < 1e-6);
        }
        assert_eq!(pid.integral_term(), 0.0);
    }

    #[test]
    fn first_sample_has_no_derivative_kick() {
        let mut pid = PidController::new(Gains::new(0.0, 0.0, 1.0), 0.02, PidLimits::default());
        pid.start();
        assert_eq!(pid.compute(0.0), 0.0);
        // error fell from 1.0 to 0.9: negative derivative clamps to 0
        assert_eq!(pid.compute(0.1), 0.0);
    }

    #[test]
    fn set_gains_clears_history() {
        let mut pid = PidController::new(Gains::new(1.0, 1.0, 0.0), 0.02, PidLimits::default());
        pid.start();
        for _ in 0..10 {
            pid.compute(0.0);
        }
        assert!(pid.integral_term() > 0.0);
        pid.set_gains(Gains::new(1.0, 2.0, 0.0));
        assert_eq!(pid.integral_term(), 0.0);
        assert!(pid.is_running());
    }
}
