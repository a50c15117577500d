//! Matrix gateway trait (port) over the backend mirror

use async_trait::async_trait;

use crate::domain::{CellRecord, CellUpsert, CellValue, ColumnDimension, RowDimension};
use crate::error::GatewayError;

/// Backend collaborator for one matrix kind.
///
/// Implementations hand back strict domain records; shape normalization
/// happens on their side of this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatrixGateway<V: CellValue>: Send + Sync {
    /// Dimension A list (packages / levels)
    async fn fetch_columns(&self) -> Result<Vec<ColumnDimension>, GatewayError>;

    /// Dimension B list (durations / menus)
    async fn fetch_rows(&self) -> Result<Vec<RowDimension>, GatewayError>;

    /// Sparse cell set of one column
    async fn fetch_cells(&self, column_id: &str) -> Result<Vec<CellRecord<V>>, GatewayError>;

    /// Replace the backend's cell set of one column; last writer wins
    async fn save_cells(&self, column_id: &str, cells: Vec<CellUpsert<V>>) -> Result<(), GatewayError>;
}
