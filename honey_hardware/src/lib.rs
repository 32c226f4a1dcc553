//! Hardware backends for the honey dispenser.
//!
//! - `sim`: a physical model of bucket, tap and scale; always available.
//! - `hx711` / `servo`: Raspberry Pi drivers behind the `hardware` feature.
pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hx711;
#[cfg(feature = "hardware")]
pub mod servo;

pub use error::HwError;
pub use sim::{SimBench, SimHandle, SimHoney, SimLoadCell, SimParams, SimValve};

#[cfg(feature = "hardware")]
pub use hx711::HardwareLoadCell;
#[cfg(feature = "hardware")]
pub use servo::ServoValve;
