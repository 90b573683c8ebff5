//! Maps `Box<dyn Error>` from trait boundaries to typed `TroughError`.
//!
//! The traits in `trough_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `trough_hardware::HwError` downcasting.

use crate::error::TroughError;

/// Map a trait-boundary error to a typed `TroughError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the error's display text.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TroughError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<trough_hardware::error::HwError>() {
            return match hw {
                trough_hardware::error::HwError::UnknownCoil(name)
                | trough_hardware::error::HwError::UnknownSwitch(name) => {
                    TroughError::Config(format!("no such device '{name}'"))
                }
                other @ (trough_hardware::error::HwError::CoilDisabled(_)
                | trough_hardware::error::HwError::Poisoned(_)) => {
                    TroughError::HardwareFault(other.to_string())
                }
            };
        }
    }

    TroughError::Hardware(e.to_string())
}
