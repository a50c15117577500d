// ============================================================================
// Matrix Infrastructure - HTTP Matrix Gateway
// File: crates/matrix-infrastructure/src/http/gateway.rs
// ============================================================================

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, error, info};

use matrix_core::domain::{CellRecord, CellUpsert, ColumnDimension, PermissionCell, PriceCell, RowDimension};
use matrix_core::repositories::MatrixGateway;
use matrix_core::GatewayError;
use matrix_shared::config::{ApiSettings, EndpointSettings};

use super::client::build_client;
use super::wire::{check_ack, decode_items, unwrap_list, RawColumn, RawRow, SaveRequest, WireCell};

/// REST gateway for one matrix kind
pub struct HttpMatrixGateway<V> {
    client: Client,
    base_url: String,
    endpoints: EndpointSettings,
    _cell: PhantomData<fn() -> V>,
}

pub type PriceGateway = HttpMatrixGateway<PriceCell>;
pub type PermissionGateway = HttpMatrixGateway<PermissionCell>;

impl<V: WireCell> HttpMatrixGateway<V> {
    pub fn new(api: &ApiSettings, endpoints: EndpointSettings) -> Result<Self, GatewayError> {
        Ok(Self::with_client(build_client(api)?, &api.base_url, endpoints))
    }

    pub fn with_client(client: Client, base_url: &str, endpoints: EndpointSettings) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            _cell: PhantomData,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_list(&self, path: &str) -> Result<Vec<serde_json::Value>, GatewayError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let body = read_success_body(response).await?;
        unwrap_list(&body)
    }
}

#[async_trait]
impl<V: WireCell> MatrixGateway<V> for HttpMatrixGateway<V> {
    async fn fetch_columns(&self) -> Result<Vec<ColumnDimension>, GatewayError> {
        let items = self.get_list(&self.endpoints.columns_path).await?;
        decode_items(items, "column", |raw: RawColumn| ColumnDimension::try_from(raw))
    }

    async fn fetch_rows(&self) -> Result<Vec<RowDimension>, GatewayError> {
        let items = self.get_list(&self.endpoints.rows_path).await?;
        decode_items(items, "row", |raw: RawRow| RowDimension::try_from(raw))
    }

    async fn fetch_cells(&self, column_id: &str) -> Result<Vec<CellRecord<V>>, GatewayError> {
        let items = self.get_list(&self.endpoints.cells_path_for(column_id)).await?;
        decode_items(items, "cell", |raw: V::Raw| V::from_raw(raw, column_id))
    }

    async fn save_cells(&self, column_id: &str, cells: Vec<CellUpsert<V>>) -> Result<(), GatewayError> {
        let url = self.url(&self.endpoints.cells_path_for(column_id));
        info!("PUT {} ({} cells)", url, cells.len());

        let request = SaveRequest {
            column_id,
            cells: &cells,
        };
        let response = self
            .client
            .put(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_success_body(response).await?;
        check_ack(&body)
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transport(format!("request timed out: {}", e))
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Body of a 2xx response; anything else becomes `GatewayError::Status`
async fn read_success_body(response: Response) -> Result<Vec<u8>, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        error!("Backend error: {} - {}", status, body);
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(transport_error)?;
    Ok(bytes.to_vec())
}
