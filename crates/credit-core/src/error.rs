//! Error types for Credit Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CreditError {
    /// The decoded input is neither a list of records nor a container
    /// holding one.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type CreditResult<T> = Result<T, CreditError>;
