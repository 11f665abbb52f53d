//! Runtime errors

use thiserror::Error;

use crate::types::{BufferRole, PassId};

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("numeric error in {pass} pass at cell {cell}: {message}")]
    Numeric {
        pass: PassId,
        cell: usize,
        message: String,
    },

    #[error("buffer length mismatch for {field}: expected {expected}, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("pass ordering violation: {pass} reads {role:?} before any pass has written it")]
    OrderViolation { pass: PassId, role: BufferRole },
}
