use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TroughError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing switch registry")]
    MissingSwitches,
    #[error("missing coil registry")]
    MissingCoils,
    #[error("missing game context")]
    MissingGame,
    #[error("missing trough wiring")]
    MissingWiring,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
