use thiserror::Error;

/// Why an acquisition session was abandoned and the instrument fell back to standby.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AbortReason {
    #[error("reference probe disconnected")]
    SensorDisconnected,
    #[error("log storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("log write failed: {0}")]
    StorageWrite(String),
    #[error("data collection overran the sampling interval")]
    CadenceOverrun,
    #[error("adc read failed: {0}")]
    Adc(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("aborted: {0}")]
    Abort(AbortReason),
}

impl From<AbortReason> for InstrumentError {
    fn from(reason: AbortReason) -> Self {
        InstrumentError::Abort(reason)
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing adc")]
    MissingAdc,
    #[error("missing reference probe")]
    MissingProbe,
    #[error("missing data log")]
    MissingLog,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
