//! # Matrix Shared
//!
//! Configuration, telemetry, and shared error types for the matrix workspace.

pub mod constants;
pub mod telemetry;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::AppError;
