//! # Matrix Infrastructure
//!
//! REST adapters for the matrix gateway port.

pub mod http;

pub use http::{build_client, HttpMatrixGateway, PermissionGateway, PriceGateway, WireCell, WireError};
