//! Maps `Box<dyn Error>` from trait boundaries to typed `InstrumentError`.
//!
//! The traits in `thermocal_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `thermocal_hardware::HwError` downcasting.

use crate::error::InstrumentError;

/// Map a trait-boundary error to a typed `InstrumentError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> InstrumentError {
    #[cfg(feature = "hardware-errors")]
    {
        use thermocal_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Io(_) | HwError::ProbeNotFound(_) => {
                    InstrumentError::Hardware(hw.to_string())
                }
                other => InstrumentError::HardwareFault(other.to_string()),
            };
        }
    }

    if e.downcast_ref::<std::io::Error>().is_some() {
        return InstrumentError::Hardware(format!("io: {e}"));
    }
    InstrumentError::Hardware(e.to_string())
}

/// Message of the mapped error without the category prefix, for embedding
/// in an `AbortReason`.
pub fn hw_detail(e: &(dyn std::error::Error + 'static)) -> String {
    match map_hw_error(e) {
        InstrumentError::Hardware(m) | InstrumentError::HardwareFault(m) => m,
        other => other.to_string(),
    }
}
