use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid readiness level {value}: expected 1 through 8")]
    InvalidLevel { value: u8 },
}

pub type Result<T> = std::result::Result<T, ModelError>;
