//! Hardware assembly: simulated bench by default, Raspberry Pi drivers with
//! the `hardware` feature.

use eyre::WrapErr;
#[cfg(not(feature = "hardware"))]
use honey_hardware::sim::SimBench;
use honey_hardware::sim::{SimHandle, SimHoney, SimParams};
use honey_traits::{LoadCell, ValveActuator};

pub struct Hardware {
    pub load_cell: Box<dyn LoadCell>,
    pub valve: Box<dyn ValveActuator>,
    /// Present when running on the simulated bench.
    pub sim: Option<SimHandle>,
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
fn sim_honey(v: honey_config::Viscosity) -> SimHoney {
    match v {
        honey_config::Viscosity::Low => SimHoney::Low,
        honey_config::Viscosity::High => SimHoney::High,
        honey_config::Viscosity::Medium | honey_config::Viscosity::UserDefined => {
            SimHoney::Medium
        }
    }
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
pub fn sim_params(cfg: &honey_config::Config) -> SimParams {
    let s = &cfg.simulation;
    SimParams {
        initial_fill_cm: f64::from(s.bucket_fill_cm),
        honey: sim_honey(cfg.dosing.viscosity),
        temperature_c: f64::from(s.temperature_c),
        counts_per_gram: f64::from(s.counts_per_gram),
        zero_offset_counts: i64::from(s.zero_offset_counts),
        jar_weight_g: f64::from(s.jar_weight_g),
        auto_jar: s.auto_jar,
        valve_closed: cfg.dosing.actuator_min,
        valve_open: cfg.dosing.actuator_max,
        step: std::time::Duration::from_millis(cfg.control.period_ms),
        ..SimParams::default()
    }
}

#[cfg(not(feature = "hardware"))]
pub fn open(cfg: &honey_config::Config) -> eyre::Result<Hardware> {
    let (handle, cell, valve) = SimBench::shared(sim_params(cfg));
    tracing::info!(
        counts_per_gram = cfg.simulation.counts_per_gram,
        auto_jar = cfg.simulation.auto_jar,
        "using simulated bench"
    );
    Ok(Hardware {
        load_cell: Box::new(cell),
        valve: Box::new(valve),
        sim: Some(handle),
    })
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &honey_config::Config) -> eyre::Result<Hardware> {
    use honey_hardware::{HardwareLoadCell, ServoValve};
    use std::time::Duration;

    let timeout = Duration::from_millis(cfg.hardware.sensor_read_timeout_ms);
    let cell = HardwareLoadCell::new(cfg.pins.hx711_dt, cfg.pins.hx711_sck, timeout)
        .map_err(eyre::Report::new)
        .wrap_err("open hx711")?;
    let valve = ServoValve::new(cfg.pins.servo_pwm)
        .map_err(eyre::Report::new)
        .wrap_err("open servo")?;
    tracing::info!(
        dt = cfg.pins.hx711_dt,
        sck = cfg.pins.hx711_sck,
        servo = cfg.pins.servo_pwm,
        "using hardware"
    );
    Ok(Hardware {
        load_cell: Box::new(cell),
        valve: Box::new(valve),
        sim: None,
    })
}

/// Read once and close the valve.
pub fn self_check(cfg: &honey_config::Config) -> eyre::Result<i32> {
    let mut hw = open(cfg)?;
    let timeout = std::time::Duration::from_millis(cfg.hardware.sensor_read_timeout_ms);
    let raw = hw
        .load_cell
        .read_raw(timeout)
        .map_err(|e| eyre::Report::new(honey_core::hw_error::map_hw_error(&*e)))
        .wrap_err("reading load cell")?;
    hw.valve
        .set_position(cfg.dosing.actuator_min)
        .map_err(|e| eyre::Report::new(honey_core::hw_error::map_hw_error(&*e)))
        .wrap_err("closing valve")?;
    Ok(raw)
}
