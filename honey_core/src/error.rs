use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DispenserError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing load cell")]
    MissingLoadCell,
    #[error("missing valve actuator")]
    MissingValve,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Rejection of a runtime parameter change or an unparsable command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SettingsError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("missing value for `{0}`")]
    MissingValue(String),
    #[error("invalid value `{value}` for `{name}`")]
    InvalidValue { name: &'static str, value: String },
    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("actuator_min and actuator_max must differ")]
    ActuatorRangeEmpty,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
