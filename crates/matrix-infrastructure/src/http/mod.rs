//! HTTP module (REST adapters over the backend mirror)

pub mod client;
pub mod gateway;
pub mod wire;

pub use client::build_client;
pub use gateway::{HttpMatrixGateway, PermissionGateway, PriceGateway};
pub use wire::{WireCell, WireError};
