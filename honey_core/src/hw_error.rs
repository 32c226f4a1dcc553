//! Maps `Box<dyn Error>` from trait boundaries to typed `DispenserError`.
//!
//! The traits in `honey_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `honey_hardware::HwError` downcasting.

use crate::error::DispenserError;

/// Map a trait-boundary error to a typed `DispenserError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DispenserError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<honey_hardware::error::HwError>() {
            return match hw {
                honey_hardware::error::HwError::Timeout
                | honey_hardware::error::HwError::DataReadyTimeout => DispenserError::Timeout,
                other => DispenserError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        DispenserError::Timeout
    } else {
        DispenserError::Hardware(s)
    }
}
