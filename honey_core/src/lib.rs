#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core dispensing logic (hardware-agnostic).
//!
//! All hardware goes through `honey_traits::LoadCell` and
//! `honey_traits::ValveActuator`; time goes through `honey_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Sampling**: raw counts → grams (`calibration::Calibration`) → moving
//!   average (`sampler`)
//! - **Calibration**: tare / settle / reference sampling routine (`calibration`)
//! - **Dosing**: glass detection, fill, completion, auto-restart (`dosing`)
//! - **Control**: PID on the weight ratio with viscosity presets (`pid`, `viscosity`)
//! - **Intake**: commands and runtime settings (`command`, `settings`)
//! - **Context**: `Dispenser` owns all loop state; `runner` schedules it

pub mod builder;
pub mod calibration;
pub mod command;
pub mod config;
pub mod conversions;
pub mod dispenser;
pub mod dosing;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod pid;
pub mod runner;
pub mod sampler;
pub mod settings;
pub mod telemetry;
pub mod util;
pub mod viscosity;

pub use builder::DispenserBuilder;
pub use calibration::{Calibration, CalibrationMachine, CalibrationState};
pub use command::{Command, Parameter};
pub use config::{ControlCfg, PersistenceCfg, Timeouts};
pub use dispenser::Dispenser;
pub use dosing::{DoseStats, DosingMachine, DosingParams, DosingSession, DosingState};
pub use error::{BuildError, DispenserError, Result, SettingsError};
pub use pid::{PidController, PidLimits};
pub use runner::{LoopStats, RunOptions};
pub use sampler::WeightSampler;
pub use settings::{FlushScheduler, Settings, SettingsStore};
pub use telemetry::{NullSink, TelemetryFrame, TelemetrySink};
pub use viscosity::{GainTable, Gains, ViscosityProfile};
