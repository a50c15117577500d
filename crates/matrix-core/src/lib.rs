//! # Matrix Core
//!
//! Sparse (column × row) matrix model shared by the pricing matrix
//! (package × duration) and the access-control matrix (level × menu),
//! with bulk operators, CSV export, the gateway port and the load/save session.

pub mod domain;
pub mod error;
pub mod matrix;
pub mod operators;
pub mod export;
pub mod repositories;
pub mod services;

// Re-export domain entities
pub use domain::*;
pub use error::{GatewayError, MatrixError};
pub use matrix::Matrix;
