//! Matrix and gateway errors

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::DimensionId;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Unknown column: {0}")]
    UnknownColumn(DimensionId),

    #[error("Unknown row: {0}")]
    UnknownRow(DimensionId),

    #[error("Price must not be negative: {0}")]
    NegativePrice(i64),

    #[error("Discount must be between 0 and 100 percent: {0}")]
    DiscountOutOfRange(u8),

    #[error("Effective range starts after it ends: {from} > {until}")]
    InvalidEffectiveRange { from: NaiveDate, until: NaiveDate },

    #[error("Percentage must be between -100 and 1000: {0}")]
    PercentOutOfRange(f64),

    #[error("Rounding step must be greater than zero: {0}")]
    InvalidRoundingStep(i64),

    #[error("Price overflow in column {0}")]
    PriceOverflow(DimensionId),

    #[error("Permission '{0}' requires access to be granted first")]
    DependentWithoutMaster(&'static str),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl MatrixError {
    /// Local validation failures: rejected before the matrix is touched, never sent to the backend
    pub fn is_validation(&self) -> bool {
        !matches!(self, MatrixError::Gateway(_))
    }
}

impl From<validator::ValidationErrors> for MatrixError {
    fn from(err: validator::ValidationErrors) -> Self {
        MatrixError::ValidationError(err.to_string())
    }
}

/// Failures talking to the backend mirror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Backend rejected request: {0}")]
    Rejected(String),
}
