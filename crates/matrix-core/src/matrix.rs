// ============================================================================
// Matrix Core - Sparse Matrix Model
// File: crates/matrix-core/src/matrix.rs
// Description: Sparse (column x row) cell store with defaults and unsaved tracking
// ============================================================================

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::{
    CellKey, CellRecord, CellUpsert, CellValue, ColumnDimension, DimensionId, MatrixRow, RowDimension,
};
use crate::error::MatrixError;

/// Sparse matrix over the current column and row lists.
///
/// A pair without an entry reads as `V::default()`. Columns edited locally are
/// tracked as unsaved until `mark_saved` or a fresh load replaces them.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<V: CellValue> {
    columns: Vec<ColumnDimension>,
    rows: Vec<RowDimension>,
    cells: HashMap<CellKey, V>,
    unsaved: HashSet<DimensionId>,
}

impl<V: CellValue> Default for Matrix<V> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl<V: CellValue> Matrix<V> {
    pub fn new(columns: Vec<ColumnDimension>, rows: Vec<RowDimension>) -> Self {
        Self {
            columns,
            rows,
            cells: HashMap::new(),
            unsaved: HashSet::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnDimension] {
        &self.columns
    }

    pub fn rows(&self) -> &[RowDimension] {
        &self.rows
    }

    pub fn column(&self, column_id: &str) -> Option<&ColumnDimension> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&RowDimension> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    pub fn has_dimensions(&self) -> bool {
        !self.columns.is_empty() || !self.rows.is_empty()
    }

    /// Replace both lists; cells and unsaved flags of vanished ids are dropped
    pub fn set_dimensions(&mut self, columns: Vec<ColumnDimension>, rows: Vec<RowDimension>) {
        self.columns = columns;
        self.rows = rows;

        let column_ids: HashSet<&str> = self.columns.iter().map(|c| c.id.as_str()).collect();
        let row_ids: HashSet<&str> = self.rows.iter().map(|r| r.id.as_str()).collect();

        let before = self.cells.len();
        self.cells
            .retain(|key, _| column_ids.contains(key.column_id.as_str()) && row_ids.contains(key.row_id.as_str()));
        self.unsaved.retain(|id| column_ids.contains(id.as_str()));

        let pruned = before - self.cells.len();
        if pruned > 0 {
            debug!("Pruned {} cells outside the new dimension lists", pruned);
        }
    }

    /// Stored value or the canonical default; unknown ids read as default too
    pub fn get_cell(&self, column_id: &str, row_id: &str) -> V {
        self.cell(column_id, row_id).cloned().unwrap_or_default()
    }

    /// Explicitly stored value only
    pub fn cell(&self, column_id: &str, row_id: &str) -> Option<&V> {
        self.cells.get(&CellKey::new(column_id, row_id))
    }

    pub fn is_explicit(&self, column_id: &str, row_id: &str) -> bool {
        self.cell(column_id, row_id).is_some()
    }

    pub fn explicit_count(&self) -> usize {
        self.cells.len()
    }

    /// Merge a partial update into the cell, creating it from the default when absent
    pub fn set_cell(&mut self, column_id: &str, row_id: &str, patch: &V::Patch) -> Result<&V, MatrixError> {
        self.ensure_known(column_id, row_id)?;

        let merged = self.get_cell(column_id, row_id).merge(patch)?;
        Ok(self.store(column_id, row_id, merged))
    }

    /// Validated whole-value write
    pub fn put_cell(&mut self, column_id: &str, row_id: &str, value: V) -> Result<(), MatrixError> {
        self.ensure_known(column_id, row_id)?;
        value.validate()?;
        self.store(column_id, row_id, value);
        Ok(())
    }

    pub(crate) fn store(&mut self, column_id: &str, row_id: &str, value: V) -> &V {
        self.unsaved.insert(column_id.to_string());
        let slot = self.cells.entry(CellKey::new(column_id, row_id)).or_default();
        *slot = value;
        slot
    }

    pub(crate) fn clear_cells(&mut self) {
        self.cells.clear();
        self.unsaved = self.columns.iter().map(|c| c.id.clone()).collect();
    }

    fn ensure_known(&self, column_id: &str, row_id: &str) -> Result<(), MatrixError> {
        self.ensure_column(column_id)?;
        if self.row(row_id).is_none() {
            return Err(MatrixError::UnknownRow(row_id.to_string()));
        }
        Ok(())
    }

    pub(crate) fn ensure_column(&self, column_id: &str) -> Result<(), MatrixError> {
        match self.column(column_id) {
            Some(_) => Ok(()),
            None => Err(MatrixError::UnknownColumn(column_id.to_string())),
        }
    }

    /// Replace every cell of one column with a freshly loaded set.
    /// Returns the number of records kept.
    pub fn replace_column(&mut self, column_id: &str, records: Vec<CellRecord<V>>) -> usize {
        self.cells.retain(|key, _| key.column_id != column_id);

        let mut kept = 0;
        for record in records {
            if record.column_id != column_id {
                warn!(
                    "Dropping cell for column {} from a load of column {}",
                    record.column_id, column_id
                );
                continue;
            }
            if self.row(&record.row_id).is_none() {
                warn!("Dropping cell for unknown row {} in column {}", record.row_id, column_id);
                continue;
            }

            let mut value = record.value;
            if value.normalize() {
                warn!(
                    "Normalized inconsistent cell ({}, {}) from backend",
                    column_id, record.row_id
                );
            }
            if let Err(e) = value.validate() {
                warn!("Rejecting cell ({}, {}): {}", column_id, record.row_id, e);
                continue;
            }

            self.cells.insert(CellKey::new(column_id, record.row_id), value);
            kept += 1;
        }

        self.unsaved.remove(column_id);
        kept
    }

    /// Full cross product, column-major, defaults for unset cells
    pub fn to_rows(&self) -> Vec<MatrixRow<V>> {
        let mut out = Vec::with_capacity(self.columns.len() * self.rows.len());
        for column in &self.columns {
            for row in &self.rows {
                let stored = self.cell(&column.id, &row.id);
                out.push(MatrixRow {
                    column_id: column.id.clone(),
                    column_name: column.name.clone(),
                    row_id: row.id.clone(),
                    row_name: row.name.clone(),
                    row_group: row.group.clone(),
                    value: stored.cloned().unwrap_or_default(),
                    explicit: stored.is_some(),
                });
            }
        }
        out
    }

    /// Explicit cells of one column in row order, ready for a save request
    pub fn serialize_for_save(&self, column_id: &str) -> Result<Vec<CellUpsert<V>>, MatrixError> {
        self.ensure_column(column_id)?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                self.cell(column_id, &row.id).map(|value| CellUpsert {
                    row_id: row.id.clone(),
                    value: value.clone(),
                })
            })
            .collect())
    }

    /// Distinct row groups (modules) in first-seen order
    pub fn groups(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.group.as_deref())
            .filter(|g| seen.insert(*g))
            .collect()
    }

    /// Rows of one group; `None` selects ungrouped rows
    pub fn rows_in_group(&self, group: Option<&str>) -> Vec<&RowDimension> {
        self.rows.iter().filter(|r| r.group.as_deref() == group).collect()
    }

    pub fn is_dirty(&self, column_id: &str) -> bool {
        self.unsaved.contains(column_id)
    }

    /// Unsaved column ids, sorted
    pub fn unsaved_columns(&self) -> Vec<DimensionId> {
        self.unsaved.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn mark_saved(&mut self, column_id: &str) {
        self.unsaved.remove(column_id);
    }
}
