//! Error type for dispatch operations.
//!
//! Rejections are ordinary outcomes: the caller decides whether to resubmit.
//! Only construction-time misconfiguration prevents the system from running.

use thiserror::Error;

use crate::types::{Floor, UnitId};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("floor {floor} outside configured range {min}..={max}")]
    FloorOutOfRange { floor: Floor, min: Floor, max: Floor },

    #[error("unit {unit} queue is full (capacity {capacity})")]
    QueueFull { unit: UnitId, capacity: usize },

    #[error("unit {unit} is shutting down")]
    ShuttingDown { unit: UnitId },

    #[error("no units registered")]
    NoUnits,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker for unit {unit} panicked")]
    WorkerPanicked { unit: UnitId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
