//! Cell value contract and the record shapes that move cells in and out of a matrix

use std::fmt;

use serde::{Deserialize, Serialize};

use super::dimension::DimensionId;
use crate::error::MatrixError;

/// Composite key of one cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub column_id: DimensionId,
    pub row_id: DimensionId,
}

impl CellKey {
    pub fn new(column_id: impl Into<DimensionId>, row_id: impl Into<DimensionId>) -> Self {
        Self {
            column_id: column_id.into(),
            row_id: row_id.into(),
        }
    }
}

/// A value stored at one (column, row) coordinate.
///
/// `Default` is the canonical value of a cell that was never set.
pub trait CellValue: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Partial update merged into an existing cell
    type Patch: fmt::Debug + Send + Sync;

    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Check the value's own invariants
    fn validate(&self) -> Result<(), MatrixError>;

    /// Produce the merged value, or reject the patch without touching `self`
    fn merge(&self, patch: &Self::Patch) -> Result<Self, MatrixError>;

    /// Repair a value loaded from the backend; returns true if anything changed
    fn normalize(&mut self) -> bool {
        false
    }

    fn export_headers() -> &'static [&'static str];

    fn export_fields(&self) -> Vec<String>;
}

/// Cells carrying a single adjustable amount (prices)
pub trait NumericCell: CellValue {
    fn amount(&self) -> i64;

    fn with_amount(&self, amount: i64) -> Self;
}

/// One cell as loaded from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord<V> {
    pub column_id: DimensionId,
    pub row_id: DimensionId,
    pub value: V,
}

impl<V> CellRecord<V> {
    pub fn new(column_id: impl Into<DimensionId>, row_id: impl Into<DimensionId>, value: V) -> Self {
        Self {
            column_id: column_id.into(),
            row_id: row_id.into(),
            value,
        }
    }
}

/// One cell of a save payload; the column id travels with the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpsert<V> {
    pub row_id: DimensionId,
    #[serde(flatten)]
    pub value: V,
}

/// One flat record of the full (column × row) cross product
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow<V> {
    pub column_id: DimensionId,
    pub column_name: String,
    pub row_id: DimensionId,
    pub row_name: String,
    pub row_group: Option<String>,
    pub value: V,
    /// False when the value is the default of an unset cell
    pub explicit: bool,
}

impl<V: CellValue> MatrixRow<V> {
    pub fn headers() -> Vec<&'static str> {
        let mut headers = vec!["column_id", "column_name", "row_id", "row_name", "row_group", "explicit"];
        headers.extend_from_slice(V::export_headers());
        headers
    }

    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.column_id.clone(),
            self.column_name.clone(),
            self.row_id.clone(),
            self.row_name.clone(),
            self.row_group.clone().unwrap_or_default(),
            self.explicit.to_string(),
        ];
        fields.extend(self.value.export_fields());
        fields
    }
}
