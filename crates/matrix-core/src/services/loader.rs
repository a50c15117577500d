// ============================================================================
// Matrix Core - Matrix Session (Reconciliation Loader)
// File: crates/matrix-core/src/services/loader.rs
// ============================================================================
//! Owns one matrix, loads it from the backend mirror and saves it back.
//!
//! Cell loads are tagged with the selected column id and a generation number.
//! A response is applied only while its ticket is still the current selection,
//! so a late answer for an abandoned selection never overwrites newer data,
//! whatever order the responses arrive in.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{CellRecord, CellValue, DimensionId};
use crate::error::{GatewayError, MatrixError};
use crate::matrix::Matrix;
use crate::repositories::MatrixGateway;

/// Load state of the current column selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading { column_id: DimensionId },
    Ready { column_id: DimensionId },
    /// The matrix still holds the last good data
    Error { column_id: DimensionId, message: String },
}

/// Tag of one in-flight cell load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    column_id: DimensionId,
    generation: u64,
}

impl LoadTicket {
    pub fn column_id(&self) -> &str {
        &self.column_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { column_id: DimensionId, cells: usize },
    /// Superseded by a newer selection; nothing changed
    Stale { column_id: DimensionId },
}

struct SessionInner<V: CellValue> {
    matrix: Matrix<V>,
    selection: Option<DimensionId>,
    generation: u64,
    state: LoadState,
}

pub struct MatrixSession<V: CellValue, G: MatrixGateway<V>> {
    gateway: Arc<G>,
    inner: Mutex<SessionInner<V>>,
}

impl<V: CellValue, G: MatrixGateway<V>> MatrixSession<V, G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_matrix(gateway, Matrix::default())
    }

    pub fn with_matrix(gateway: Arc<G>, matrix: Matrix<V>) -> Self {
        Self {
            gateway,
            inner: Mutex::new(SessionInner {
                matrix,
                selection: None,
                generation: 0,
                state: LoadState::Idle,
            }),
        }
    }

    /// Fetch both dimension lists; on any failure the previous lists stay in place
    pub async fn load_dimensions(&self) -> Result<(), MatrixError> {
        let (columns, rows) = tokio::try_join!(self.gateway.fetch_columns(), self.gateway.fetch_rows())
            .map_err(|e| {
                error!("Failed to load matrix dimensions: {}", e);
                e
            })?;

        info!("Loaded {} columns and {} rows", columns.len(), rows.len());
        self.inner.lock().matrix.set_dimensions(columns, rows);
        Ok(())
    }

    /// Select a column and open a tagged load for it
    pub fn begin_load(&self, column_id: &str) -> Result<LoadTicket, MatrixError> {
        let mut inner = self.inner.lock();
        inner.matrix.ensure_column(column_id)?;

        inner.generation += 1;
        inner.selection = Some(column_id.to_string());
        inner.state = LoadState::Loading {
            column_id: column_id.to_string(),
        };

        debug!("Begin load of column {} (generation {})", column_id, inner.generation);
        Ok(LoadTicket {
            column_id: column_id.to_string(),
            generation: inner.generation,
        })
    }

    /// Apply a load response if its ticket is still current
    pub fn complete_load(
        &self,
        ticket: LoadTicket,
        result: Result<Vec<CellRecord<V>>, GatewayError>,
    ) -> Result<LoadOutcome, MatrixError> {
        let mut inner = self.inner.lock();

        let is_current =
            inner.generation == ticket.generation && inner.selection.as_deref() == Some(ticket.column_id.as_str());
        if !is_current {
            debug!(
                "Discarding stale response for column {} (generation {}, current {})",
                ticket.column_id, ticket.generation, inner.generation
            );
            return Ok(LoadOutcome::Stale {
                column_id: ticket.column_id,
            });
        }

        match result {
            Ok(records) => {
                let received = records.len();
                let kept = inner.matrix.replace_column(&ticket.column_id, records);
                if kept < received {
                    warn!(
                        "Column {}: kept {} of {} cells from backend",
                        ticket.column_id, kept, received
                    );
                }
                info!("Loaded {} cells for column {}", kept, ticket.column_id);

                inner.state = LoadState::Ready {
                    column_id: ticket.column_id.clone(),
                };
                Ok(LoadOutcome::Applied {
                    column_id: ticket.column_id,
                    cells: kept,
                })
            }
            Err(e) => {
                error!("Failed to load cells for column {}: {}", ticket.column_id, e);
                inner.state = LoadState::Error {
                    column_id: ticket.column_id,
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    /// Select a column and replace its cells with the backend's set
    pub async fn load_cells(&self, column_id: &str) -> Result<LoadOutcome, MatrixError> {
        let ticket = self.begin_load(column_id)?;
        let result = self.gateway.fetch_cells(column_id).await;
        self.complete_load(ticket, result)
    }

    /// Load every known column one after another; returns the number of cells kept
    pub async fn load_every_column(&self) -> Result<usize, MatrixError> {
        let column_ids: Vec<DimensionId> = {
            let inner = self.inner.lock();
            inner.matrix.columns().iter().map(|c| c.id.clone()).collect()
        };

        let mut total = 0;
        for column_id in column_ids {
            if let LoadOutcome::Applied { cells, .. } = self.load_cells(&column_id).await? {
                total += cells;
            }
        }
        Ok(total)
    }

    /// Push the explicit cells of one column; the unsaved flag clears only on success
    pub async fn save(&self, column_id: &str) -> Result<usize, MatrixError> {
        let payload = {
            let inner = self.inner.lock();
            inner.matrix.serialize_for_save(column_id)?
        };
        let count = payload.len();

        self.gateway.save_cells(column_id, payload).await.map_err(|e| {
            error!("Failed to save column {}: {}", column_id, e);
            e
        })?;

        self.inner.lock().matrix.mark_saved(column_id);
        info!("Saved {} cells for column {}", count, column_id);
        Ok(count)
    }

    /// Save every unsaved column, stopping at the first failure
    pub async fn save_unsaved(&self) -> Result<Vec<DimensionId>, MatrixError> {
        let unsaved = self.inner.lock().matrix.unsaved_columns();
        for column_id in &unsaved {
            self.save(column_id).await?;
        }
        Ok(unsaved)
    }

    /// Merge a partial update into one cell
    pub fn set_cell(&self, column_id: &str, row_id: &str, patch: &V::Patch) -> Result<V, MatrixError> {
        let mut inner = self.inner.lock();
        inner.matrix.set_cell(column_id, row_id, patch).cloned()
    }

    /// Run a bulk operator; the result replaces the matrix only on success
    pub fn apply<F>(&self, op: F) -> Result<(), MatrixError>
    where
        F: FnOnce(&Matrix<V>) -> Result<Matrix<V>, MatrixError>,
    {
        let mut inner = self.inner.lock();
        let next = op(&inner.matrix)?;
        inner.matrix = next;
        Ok(())
    }

    pub fn read<R>(&self, f: impl FnOnce(&Matrix<V>) -> R) -> R {
        f(&self.inner.lock().matrix)
    }

    pub fn snapshot(&self) -> Matrix<V> {
        self.inner.lock().matrix.clone()
    }

    pub fn state(&self) -> LoadState {
        self.inner.lock().state.clone()
    }

    pub fn selection(&self) -> Option<DimensionId> {
        self.inner.lock().selection.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use crate::domain::{
        CellUpsert, ColumnDimension, PermissionCell, PermissionFlag, PermissionPatch, RowDimension,
    };
    use crate::matrix::tests::access_matrix;
    use crate::operators;
    use crate::repositories::MockMatrixGateway;

    fn session_with(mock: MockMatrixGateway<PermissionCell>) -> MatrixSession<PermissionCell, MockMatrixGateway<PermissionCell>> {
        MatrixSession::with_matrix(Arc::new(mock), access_matrix())
    }

    #[tokio::test]
    async fn test_load_dimensions_replaces_lists() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_columns().returning(|| {
            Ok(vec![ColumnDimension::new("LEVEL_C", "Auditor", Default::default()).unwrap()])
        });
        mock.expect_fetch_rows().returning(|| {
            Ok(vec![RowDimension::new("reports", "Reports", None, Default::default()).unwrap()])
        });

        let session: MatrixSession<PermissionCell, _> = MatrixSession::new(Arc::new(mock));
        session.load_dimensions().await.unwrap();

        let rows = session.read(|m| m.to_rows());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column_id, "LEVEL_C");
        assert_eq!(session.state(), LoadState::Idle);
    }

    #[tokio::test]
    async fn test_load_dimensions_failure_keeps_previous_lists() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_columns().returning(|| {
            Ok(vec![ColumnDimension::new("LEVEL_C", "Auditor", Default::default()).unwrap()])
        });
        mock.expect_fetch_rows()
            .returning(|| Err(GatewayError::Transport("connection refused".into())));

        let session = session_with(mock);
        let err = session.load_dimensions().await.unwrap_err();

        assert!(matches!(err, MatrixError::Gateway(GatewayError::Transport(_))));
        assert!(!err.is_validation());
        assert_eq!(session.read(|m| m.columns().len()), 2);
        assert_eq!(session.read(|m| m.rows().len()), 4);
    }

    #[tokio::test]
    async fn test_malformed_columns_keep_matrix() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_columns()
            .returning(|| Err(GatewayError::Malformed("no recognizable column records among 1".into())));
        mock.expect_fetch_rows().returning(|| Ok(Vec::new()));

        let session = session_with(mock);
        let before = session.read(|m| m.to_rows());
        let err = session.load_dimensions().await.unwrap_err();

        assert!(matches!(err, MatrixError::Gateway(GatewayError::Malformed(_))));
        assert_eq!(session.read(|m| m.columns().len()), 2);
        assert_eq!(session.read(|m| m.to_rows()), before);
    }

    #[tokio::test]
    async fn test_load_cells_ready() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_cells()
            .withf(|id| id == "LEVEL_A")
            .times(1)
            .returning(|_| Ok(vec![CellRecord::new("LEVEL_A", "users", PermissionCell::full_access())]));

        let session = session_with(mock);
        let outcome = session.load_cells("LEVEL_A").await.unwrap();

        assert_eq!(
            outcome,
            LoadOutcome::Applied {
                column_id: "LEVEL_A".into(),
                cells: 1
            }
        );
        assert_eq!(session.state(), LoadState::Ready { column_id: "LEVEL_A".into() });
        assert_eq!(session.read(|m| m.get_cell("LEVEL_A", "users")), PermissionCell::full_access());
    }

    #[tokio::test]
    async fn test_load_cells_error_retains_last_good_data() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        let mut calls = 0;
        mock.expect_fetch_cells().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![CellRecord::new("LEVEL_A", "users", PermissionCell::read_only())])
            } else {
                Err(GatewayError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                })
            }
        });

        let session = session_with(mock);
        session.load_cells("LEVEL_A").await.unwrap();
        let err = session.load_cells("LEVEL_A").await.unwrap_err();

        assert!(matches!(err, MatrixError::Gateway(GatewayError::Status { status: 502, .. })));
        assert!(matches!(session.state(), LoadState::Error { ref column_id, .. } if column_id == "LEVEL_A"));
        assert_eq!(session.read(|m| m.get_cell("LEVEL_A", "users")), PermissionCell::read_only());
    }

    #[tokio::test]
    async fn test_load_unknown_column_is_rejected_locally() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_cells().never();

        let session = session_with(mock);
        let err = session.load_cells("LEVEL_Z").await.unwrap_err();
        assert!(matches!(err, MatrixError::UnknownColumn(_)));
        assert_eq!(session.state(), LoadState::Idle);
    }

    #[test]
    fn test_ticket_of_abandoned_selection_is_stale() {
        let session = session_with(MockMatrixGateway::new());

        let ticket_a = session.begin_load("LEVEL_A").unwrap();
        let ticket_b = session.begin_load("LEVEL_B").unwrap();

        let stale = session
            .complete_load(ticket_a, Ok(vec![CellRecord::new("LEVEL_A", "users", PermissionCell::full_access())]))
            .unwrap();
        assert_eq!(stale, LoadOutcome::Stale { column_id: "LEVEL_A".into() });
        assert_eq!(session.state(), LoadState::Loading { column_id: "LEVEL_B".into() });

        // a failure of an abandoned load is swallowed as stale too
        let ticket_b2 = session.begin_load("LEVEL_B").unwrap();
        let old_b = session
            .complete_load(ticket_b, Err(GatewayError::Malformed("empty body".into())))
            .unwrap();
        assert!(matches!(old_b, LoadOutcome::Stale { .. }));

        session.complete_load(ticket_b2, Ok(Vec::new())).unwrap();
        assert_eq!(session.state(), LoadState::Ready { column_id: "LEVEL_B".into() });
        assert!(!session.read(|m| m.is_explicit("LEVEL_A", "users")));
    }

    /// Gateway whose cell responses are released by the test
    struct ScriptedGateway {
        pending: parking_lot::Mutex<HashMap<String, oneshot::Receiver<Vec<CellRecord<PermissionCell>>>>>,
    }

    #[async_trait]
    impl MatrixGateway<PermissionCell> for ScriptedGateway {
        async fn fetch_columns(&self) -> Result<Vec<ColumnDimension>, GatewayError> {
            Ok(Vec::new())
        }

        async fn fetch_rows(&self) -> Result<Vec<RowDimension>, GatewayError> {
            Ok(Vec::new())
        }

        async fn fetch_cells(&self, column_id: &str) -> Result<Vec<CellRecord<PermissionCell>>, GatewayError> {
            let rx = self.pending.lock().remove(column_id).expect("unscripted column");
            rx.await.map_err(|_| GatewayError::Transport("script dropped".into()))
        }

        async fn save_cells(&self, _: &str, _: Vec<CellUpsert<PermissionCell>>) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    async fn wait_for_selection<G: MatrixGateway<PermissionCell>>(
        session: &MatrixSession<PermissionCell, G>,
        column_id: &str,
    ) {
        for _ in 0..100 {
            if session.selection().as_deref() == Some(column_id) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("selection never switched to {}", column_id);
    }

    #[tokio::test]
    async fn test_late_response_does_not_overwrite_newer_selection() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let gateway = ScriptedGateway {
            pending: parking_lot::Mutex::new(HashMap::from([
                ("LEVEL_A".to_string(), rx_a),
                ("LEVEL_B".to_string(), rx_b),
            ])),
        };
        let session = Arc::new(MatrixSession::with_matrix(Arc::new(gateway), access_matrix()));

        let s = session.clone();
        let load_a = tokio::spawn(async move { s.load_cells("LEVEL_A").await });
        wait_for_selection(&session, "LEVEL_A").await;

        let s = session.clone();
        let load_b = tokio::spawn(async move { s.load_cells("LEVEL_B").await });
        wait_for_selection(&session, "LEVEL_B").await;

        // LEVEL_A answers while LEVEL_B is still in flight
        tx_a.send(vec![
            CellRecord::new("LEVEL_A", "users", PermissionCell::full_access()),
            CellRecord::new("LEVEL_A", "roles", PermissionCell::full_access()),
        ])
        .unwrap();
        let outcome_a = load_a.await.unwrap().unwrap();
        assert_eq!(outcome_a, LoadOutcome::Stale { column_id: "LEVEL_A".into() });
        assert_eq!(session.state(), LoadState::Loading { column_id: "LEVEL_B".into() });
        assert_eq!(session.read(|m| m.explicit_count()), 0);

        tx_b.send(vec![CellRecord::new("LEVEL_B", "home", PermissionCell::read_only())])
            .unwrap();
        let outcome_b = load_b.await.unwrap().unwrap();
        assert!(matches!(outcome_b, LoadOutcome::Applied { cells: 1, .. }));

        assert_eq!(session.state(), LoadState::Ready { column_id: "LEVEL_B".into() });
        assert_eq!(session.read(|m| m.get_cell("LEVEL_B", "home")), PermissionCell::read_only());
        assert!(!session.read(|m| m.is_explicit("LEVEL_A", "users")));
    }

    #[tokio::test]
    async fn test_save_sends_column_and_clears_unsaved() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_save_cells()
            .withf(|id, cells| id == "LEVEL_B" && cells.len() == 1 && cells[0].row_id == "users")
            .times(1)
            .returning(|_, _| Ok(()));

        let session = session_with(mock);
        let granted = session
            .set_cell(
                "LEVEL_B",
                "users",
                &PermissionPatch::new()
                    .with(PermissionFlag::Access, true)
                    .with(PermissionFlag::View, true),
            )
            .unwrap();
        assert!(granted.view);
        assert!(session.read(|m| m.is_dirty("LEVEL_B")));

        assert_eq!(session.save("LEVEL_B").await.unwrap(), 1);
        assert!(!session.read(|m| m.is_dirty("LEVEL_B")));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_unsaved_flag() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_save_cells()
            .returning(|_, _| Err(GatewayError::Transport("timeout".into())));

        let session = session_with(mock);
        session
            .apply(|m| operators::apply_preset_to_group(m, "LEVEL_A", Some("Catalog"), crate::domain::PermissionPreset::FullAccess))
            .unwrap();
        let before = session.snapshot();

        assert!(session.save("LEVEL_A").await.is_err());
        assert!(session.read(|m| m.is_dirty("LEVEL_A")));
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_save_unsaved_saves_each_dirty_column() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_save_cells().times(2).returning(|_, cells| {
            assert!(cells.is_empty());
            Ok(())
        });

        let session = session_with(mock);
        session.apply(|m| Ok(operators::clear_all(m))).unwrap();

        let saved = session.save_unsaved().await.unwrap();
        assert_eq!(saved, vec!["LEVEL_A".to_string(), "LEVEL_B".to_string()]);
        assert!(session.read(|m| m.unsaved_columns().is_empty()));
    }

    #[test]
    fn test_rejected_operator_leaves_matrix() {
        let session = session_with(MockMatrixGateway::new());
        let before = session.snapshot();

        let err = session
            .apply(|m| operators::copy_column(m, "LEVEL_A", "LEVEL_Z"))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_load_every_column() {
        let mut mock = MockMatrixGateway::<PermissionCell>::new();
        mock.expect_fetch_cells()
            .times(2)
            .returning(|id| Ok(vec![CellRecord::new(id, "home", PermissionCell::read_only())]));

        let session = session_with(mock);
        assert_eq!(session.load_every_column().await.unwrap(), 2);
        assert_eq!(session.state(), LoadState::Ready { column_id: "LEVEL_B".into() });
    }
}
