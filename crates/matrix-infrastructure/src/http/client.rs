//! Shared HTTP client

use std::time::Duration;

use reqwest::Client;

use matrix_core::GatewayError;
use matrix_shared::config::ApiSettings;

pub fn build_client(api: &ApiSettings) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(Duration::from_secs(api.timeout_seconds))
        .user_agent(concat!("matrix-admin/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))
}
