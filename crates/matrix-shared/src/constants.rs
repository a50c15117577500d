//! Application-wide constants

pub const CONFIG_ENV_PREFIX: &str = "MATRIX";
pub const CONFIG_ENV_SEPARATOR: &str = "__";
pub const DEFAULT_APP_ENV: &str = "development";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
pub const ID_PLACEHOLDER: &str = "{id}";
pub const DEFAULT_LOG_FILE_PREFIX: &str = "matrix-admin";
