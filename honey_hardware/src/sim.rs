//! Simulated bench: honey bucket with a servo tap above a load cell.
//!
//! The flow model is deliberately coarse (laminar pipe flow through the tap,
//! driven by the bucket's head pressure) but reacts to viscosity, temperature,
//! tap opening and bucket level the way the real bench does, which is enough
//! to exercise the controller end to end without hardware.
//!
//! Time only advances when the load cell is read: every `read_raw` steps the
//! model by one control period.
use std::f64::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use honey_traits::{HwResult, LoadCell, ValveActuator};

use crate::error::HwError;

const HONEY_DENSITY: f64 = 1400.0; // kg/m³
const GRAVITY: f64 = 9.81;
/// Seconds for the stream to develop fully after the tap opens.
const RAMP_UP_S: f64 = 2.0;
/// Openings below this fraction do not flow at all.
const MIN_OPENING: f64 = 0.05;
/// Automatic jar handling timings.
const JAR_REMOVE_AFTER_CLOSED_S: f64 = 10.0;
const JAR_REPLACE_AFTER_S: f64 = 2.0;
/// Automatic jar handling stops when the bucket is this low.
const BUCKET_EMPTY_CM: f64 = 5.0;

/// Honey grade; picks the dynamic viscosity at 20 °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimHoney {
    Low,
    Medium,
    High,
}

impl SimHoney {
    /// Dynamic viscosity in Pa·s at 20 °C.
    fn base_viscosity(self) -> f64 {
        match self {
            SimHoney::Low => 12.0,
            SimHoney::Medium => 25.0,
            SimHoney::High => 75.0,
        }
    }
}

/// Physical parameters of the bench.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub bucket_diameter_cm: f64,
    pub bucket_height_cm: f64,
    pub tap_diameter_mm: f64,
    pub initial_fill_cm: f64,
    pub honey: SimHoney,
    pub temperature_c: f64,
    /// True counts per gram of the simulated load cell.
    pub counts_per_gram: f64,
    /// Raw counts with an empty platform before the first tare.
    pub zero_offset_counts: i64,
    pub jar_weight_g: f64,
    pub auto_jar: bool,
    /// Servo positions for closed and fully open.
    pub valve_closed: f32,
    pub valve_open: f32,
    /// Simulated time per load-cell read.
    pub step: Duration,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            bucket_diameter_cm: 40.0,
            bucket_height_cm: 60.0,
            tap_diameter_mm: 20.0,
            initial_fill_cm: 60.0,
            honey: SimHoney::Medium,
            temperature_c: 20.0,
            counts_per_gram: 420.0,
            zero_offset_counts: 8_000,
            jar_weight_g: 50.0,
            auto_jar: false,
            valve_closed: 0.0,
            valve_open: 90.0,
            step: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JarPhase {
    Absent { since_s: f64 },
    Present,
}

/// Full bench state. Share it through [`SimBench::shared`].
#[derive(Debug)]
pub struct SimBench {
    params: SimParams,
    fill_height_cm: f64,
    opening: f64,
    time_since_open_s: f64,
    time_closed_s: f64,
    jar: JarPhase,
    honey_in_jar_g: f64,
    total_dispensed_g: f64,
    last_flow_g_per_s: f64,
    tare_counts: i64,
    elapsed_s: f64,
}

impl SimBench {
    pub fn new(params: SimParams) -> Self {
        let fill = params.initial_fill_cm.clamp(0.0, params.bucket_height_cm);
        Self {
            params,
            fill_height_cm: fill,
            opening: 0.0,
            time_since_open_s: 0.0,
            time_closed_s: 0.0,
            jar: JarPhase::Absent { since_s: 0.0 },
            honey_in_jar_g: 0.0,
            total_dispensed_g: 0.0,
            last_flow_g_per_s: 0.0,
            tare_counts: 0,
            elapsed_s: 0.0,
        }
    }

    /// Wrap in a shared handle and hand out the load cell and valve views.
    pub fn shared(params: SimParams) -> (SimHandle, SimLoadCell, SimValve) {
        let (closed, open) = (params.valve_closed, params.valve_open);
        let handle = SimHandle(Arc::new(Mutex::new(Self::new(params))));
        let cell = SimLoadCell {
            bench: handle.clone(),
        };
        let valve = SimValve {
            bench: handle.clone(),
            closed,
            open,
        };
        (handle, cell, valve)
    }

    fn viscosity(&self) -> f64 {
        let temp_factor = 2f64.powf((20.0 - self.params.temperature_c) / 10.0);
        self.params.honey.base_viscosity() * temp_factor
    }

    fn head_pressure(&self) -> f64 {
        HONEY_DENSITY * GRAVITY * (self.fill_height_cm / 100.0)
    }

    fn reynolds(&self, flow_g_per_s: f64) -> f64 {
        let r = self.params.tap_diameter_mm / 1000.0 / 2.0;
        let area = PI * r * r;
        let mass_flow = flow_g_per_s / 1000.0;
        let velocity = mass_flow / (HONEY_DENSITY * area);
        HONEY_DENSITY * velocity * 2.0 * r / self.viscosity()
    }

    /// Current flow through the tap in grams per second.
    pub fn flow_g_per_s(&self) -> f64 {
        if self.opening < MIN_OPENING || self.fill_height_cm <= 0.0 {
            return 0.0;
        }
        let r = self.params.tap_diameter_mm / 1000.0 / 2.0;
        let length = self.params.tap_diameter_mm / 1000.0;
        let delta_p = self.head_pressure() * self.opening * self.opening;
        if delta_p < 50.0 {
            return 0.0;
        }
        let q_m3_s = PI * r.powi(4) * delta_p / (8.0 * self.viscosity() * length);
        let ramp = (self.time_since_open_s / RAMP_UP_S).min(1.0);
        let mut q_g_s = q_m3_s * HONEY_DENSITY * 1000.0 * ramp;
        if self.reynolds(q_g_s) > 2000.0 {
            q_g_s *= 0.7;
        }
        q_g_s
    }

    /// Advance the model by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.elapsed_s += dt;
        if self.opening > 0.0 {
            self.time_since_open_s += dt;
            self.time_closed_s = 0.0;
        } else {
            self.time_since_open_s = 0.0;
            self.time_closed_s += dt;
        }

        let flow = self.flow_g_per_s();
        self.last_flow_g_per_s = flow;
        let dispensed = flow * dt;
        if dispensed > 0.0 {
            let bucket_area_m2 = PI * (self.params.bucket_diameter_cm / 200.0).powi(2);
            let volume_m3 = dispensed / HONEY_DENSITY / 1000.0;
            let height_loss_cm = volume_m3 / bucket_area_m2 * 100.0;
            self.fill_height_cm = (self.fill_height_cm - height_loss_cm).max(0.0);
            self.total_dispensed_g += dispensed;
            // Without a jar the honey lands on the platform anyway
            self.honey_in_jar_g += dispensed;
        }

        if self.params.auto_jar && self.fill_height_cm >= BUCKET_EMPTY_CM {
            self.auto_jar_step();
        }
    }

    fn auto_jar_step(&mut self) {
        match self.jar {
            JarPhase::Present
                if self.honey_in_jar_g > 0.0 && self.time_closed_s >= JAR_REMOVE_AFTER_CLOSED_S =>
            {
                tracing::debug!(honey_g = self.honey_in_jar_g, "sim: removing filled jar");
                self.remove_jar();
            }
            JarPhase::Absent { since_s } if self.elapsed_s - since_s >= JAR_REPLACE_AFTER_S => {
                tracing::debug!("sim: placing empty jar");
                self.place_jar();
            }
            _ => {}
        }
    }

    pub fn place_jar(&mut self) {
        self.jar = JarPhase::Present;
        self.honey_in_jar_g = 0.0;
    }

    pub fn remove_jar(&mut self) {
        self.jar = JarPhase::Absent {
            since_s: self.elapsed_s,
        };
        self.honey_in_jar_g = 0.0;
    }

    pub fn jar_present(&self) -> bool {
        self.jar == JarPhase::Present
    }

    pub fn set_opening(&mut self, opening: f64) {
        let opening = if opening.is_finite() {
            opening.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if opening == 0.0 {
            self.time_since_open_s = 0.0;
        }
        self.opening = opening;
    }

    pub fn opening(&self) -> f64 {
        self.opening
    }

    /// Load on the platform in grams.
    pub fn load_g(&self) -> f64 {
        let jar = if self.jar_present() {
            self.params.jar_weight_g
        } else {
            0.0
        };
        jar + self.honey_in_jar_g
    }

    pub fn honey_in_jar_g(&self) -> f64 {
        self.honey_in_jar_g
    }

    pub fn total_dispensed_g(&self) -> f64 {
        self.total_dispensed_g
    }

    pub fn fill_height_cm(&self) -> f64 {
        self.fill_height_cm
    }

    fn absolute_counts(&self) -> i64 {
        (self.load_g() * self.params.counts_per_gram).round() as i64
            + self.params.zero_offset_counts
    }

    /// Tared raw counts as the load cell reports them.
    pub fn raw_counts(&self) -> i32 {
        let v = self.absolute_counts() - self.tare_counts;
        v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    fn tare(&mut self) {
        self.tare_counts = self.absolute_counts();
    }
}

/// Cloneable handle to a shared bench (for jar placement from a UI thread).
#[derive(Debug, Clone)]
pub struct SimHandle(Arc<Mutex<SimBench>>);

impl SimHandle {
    pub fn lock(&self) -> Result<MutexGuard<'_, SimBench>, HwError> {
        self.0
            .lock()
            .map_err(|_| HwError::Sim("bench mutex poisoned".into()))
    }
}

/// Load-cell view of the bench; each read advances simulated time.
pub struct SimLoadCell {
    bench: SimHandle,
}

impl LoadCell for SimLoadCell {
    fn read_raw(&mut self, _timeout: Duration) -> HwResult<i32> {
        let mut bench = self.bench.lock()?;
        let dt = bench.params.step.as_secs_f64();
        bench.advance(dt);
        Ok(bench.raw_counts())
    }

    fn tare(&mut self) -> HwResult<()> {
        self.bench.lock()?.tare();
        Ok(())
    }
}

/// Servo view of the bench; maps positions back to a tap opening.
pub struct SimValve {
    bench: SimHandle,
    closed: f32,
    open: f32,
}

impl ValveActuator for SimValve {
    fn set_position(&mut self, position: f32) -> HwResult<()> {
        let span = self.open - self.closed;
        let opening = if span == 0.0 {
            0.0
        } else {
            (position - self.closed) / span
        };
        self.bench.lock()?.set_opening(f64::from(opening));
        Ok(())
    }
}
