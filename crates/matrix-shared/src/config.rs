//! Configuration management

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;

use crate::constants::{
    CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR, DEFAULT_APP_ENV, DEFAULT_TIMEOUT_SECONDS, ID_PLACEHOLDER,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ApiSettings,
    pub pricing: EndpointSettings,
    pub permissions: EndpointSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

/// Backend REST API (the mirror that owns packages, levels, prices, permissions)
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Endpoint paths for one matrix kind.
/// `cells_path` carries an `{id}` placeholder for the column (Dimension A) id.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub columns_path: String,
    pub rows_path: String,
    pub cells_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for the daily rolling log file; stdout only when absent
    pub file_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl EndpointSettings {
    /// Resolve the cells path for one column id
    pub fn cells_path_for(&self, column_id: &str) -> String {
        self.cells_path.replace(ID_PLACEHOLDER, column_id)
    }

    fn validate(&self, section: &str) -> Result<(), AppError> {
        for (name, path) in [
            ("columns_path", &self.columns_path),
            ("rows_path", &self.rows_path),
            ("cells_path", &self.cells_path),
        ] {
            if !path.starts_with('/') {
                return Err(AppError::InvalidConfig(format!(
                    "{}.{} must start with '/': {}",
                    section, name, path
                )));
            }
        }

        if !self.cells_path.contains(ID_PLACEHOLDER) {
            return Err(AppError::InvalidConfig(format!(
                "{}.cells_path must contain {}",
                section, ID_PLACEHOLDER
            )));
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load using APP_ENV (default: development)
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_APP_ENV.into());
        Self::load_for_env(&env)
    }

    /// Layering: defaults -> config/default -> config/{env} -> MATRIX_* variables
    /// Example: MATRIX_API__BASE_URL=https://admin.example.com/api/v1
    pub fn load_for_env(env: &str) -> Result<Self, AppError> {
        let config = Self::with_defaults(env)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(CONFIG_ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let settings: AppConfig = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults overlaid with an inline TOML document (no files, no environment)
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = Self::with_defaults(DEFAULT_APP_ENV)?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        let settings: AppConfig = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn with_defaults(env: &str) -> Result<ConfigBuilder<DefaultState>, AppError> {
        Ok(Config::builder()
            .set_default("app.env", env)?
            .set_default("app.name", "matrix-admin")?
            .set_default("api.base_url", "http://127.0.0.1:8080/api/v1")?
            .set_default("api.timeout_seconds", DEFAULT_TIMEOUT_SECONDS)?
            .set_default("pricing.columns_path", "/packages")?
            .set_default("pricing.rows_path", "/durations")?
            .set_default("pricing.cells_path", "/packages/{id}/prices")?
            .set_default("permissions.columns_path", "/levels")?
            .set_default("permissions.rows_path", "/menus")?
            .set_default("permissions.cells_path", "/levels/{id}/menu-permissions")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://")) {
            return Err(AppError::InvalidConfig(format!(
                "api.base_url must be an http(s) URL: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(AppError::InvalidConfig(
                "api.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        self.pricing.validate("pricing")?;
        self.permissions.validate("permissions")?;
        Ok(())
    }
}
