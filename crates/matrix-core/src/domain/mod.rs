//! # Matrix Core - Domain Module
//!
//! Dimension records and cell value kinds.

pub mod dimension;
pub mod cell;
pub mod price;
pub mod permission;

// Re-export all entities and enums
pub use dimension::{ColumnDimension, DimensionId, RecordStatus, RowDimension};
pub use cell::{CellKey, CellRecord, CellUpsert, CellValue, MatrixRow, NumericCell};
pub use price::{PriceCell, PricePatch};
pub use permission::{PermissionCell, PermissionFlag, PermissionPatch, PermissionPreset};
