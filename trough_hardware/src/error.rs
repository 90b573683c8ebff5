use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("unknown switch: {0}")]
    UnknownSwitch(String),
    #[error("unknown coil: {0}")]
    UnknownCoil(String),
    #[error("coil {0} is disabled")]
    CoilDisabled(String),
    #[error("{0} state is poisoned")]
    Poisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, HwError>;
