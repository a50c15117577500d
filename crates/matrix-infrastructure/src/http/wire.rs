// ============================================================================
// Matrix Infrastructure - Wire Shapes
// File: crates/matrix-infrastructure/src/http/wire.rs
// Description: Loose backend JSON shapes and their conversion to strict domain types
// ============================================================================
//! The backend is not consistent about field names, id types or response
//! envelopes. Everything loose stops here: the raw structs accept the known
//! aliases and convert into domain records via `TryFrom`.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use matrix_core::domain::{
    CellRecord, CellUpsert, CellValue, ColumnDimension, DimensionId, PermissionCell, PriceCell, RecordStatus,
    RowDimension,
};
use matrix_core::{GatewayError, MatrixError};

/// Why a single record was rejected
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid flag value: {0}")]
    InvalidFlag(String),

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    #[error(transparent)]
    Domain(#[from] MatrixError),
}

// ============================================================================
// Scalars
// ============================================================================

/// Ids arrive as integers or strings (UUIDs, codes)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    pub fn into_id(self) -> DimensionId {
        match self {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        }
    }
}

/// Amounts arrive as integers, floats or decimal strings ("149000.00")
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawAmount {
    /// Whole units, fractions rounded half-up
    pub fn to_units(&self) -> Result<i64, WireError> {
        match self {
            RawAmount::Int(n) => Ok(*n),
            RawAmount::Float(f) => float_to_units(*f),
            RawAmount::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<i64>() {
                    return Ok(n);
                }
                let f = s
                    .parse::<f64>()
                    .map_err(|_| WireError::InvalidNumber(s.to_string()))?;
                float_to_units(f)
            }
        }
    }
}

fn float_to_units(f: f64) -> Result<i64, WireError> {
    let rounded = f.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(WireError::InvalidNumber(f.to_string()));
    }
    Ok(rounded as i64)
}

/// Boolean flags arrive as bools, 0/1 or strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl RawFlag {
    pub fn to_bool(&self) -> Result<bool, WireError> {
        match self {
            RawFlag::Bool(b) => Ok(*b),
            RawFlag::Int(0) => Ok(false),
            RawFlag::Int(1) => Ok(true),
            RawFlag::Int(n) => Err(WireError::InvalidFlag(n.to_string())),
            RawFlag::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(true),
                "false" | "0" | "no" | "n" | "" => Ok(false),
                other => Err(WireError::InvalidFlag(other.to_string())),
            },
        }
    }
}

fn flag(raw: &Option<RawFlag>) -> Result<Option<bool>, WireError> {
    raw.as_ref().map(RawFlag::to_bool).transpose()
}

/// `status` string wins over `is_active`; records carrying neither are active
fn resolve_status(status: Option<RawFlag>, is_active: Option<bool>) -> Result<RecordStatus, WireError> {
    match (status, is_active) {
        (Some(RawFlag::Text(s)), _) => {
            RecordStatus::from_str(&s).ok_or_else(|| WireError::InvalidStatus(s))
        }
        (Some(other), _) => Ok(RecordStatus::from_flag(other.to_bool()?)),
        (None, Some(active)) => Ok(RecordStatus::from_flag(active)),
        (None, None) => Ok(RecordStatus::Active),
    }
}

// ============================================================================
// Dimensions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RawColumn {
    #[serde(alias = "package_id", alias = "level_id")]
    pub id: RawId,
    #[serde(alias = "nama", alias = "package_name", alias = "level_name")]
    pub name: String,
    #[serde(default)]
    pub status: Option<RawFlag>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TryFrom<RawColumn> for ColumnDimension {
    type Error = WireError;

    fn try_from(raw: RawColumn) -> Result<Self, Self::Error> {
        let status = resolve_status(raw.status, raw.is_active)?;
        ColumnDimension::new(raw.id.into_id(), raw.name, status)
            .map_err(|e| WireError::Domain(MatrixError::from(e)))
    }
}

#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(alias = "duration_id", alias = "menu_id")]
    pub id: RawId,
    #[serde(alias = "nama", alias = "duration_name", alias = "menu_name", alias = "label")]
    pub name: String,
    #[serde(default, alias = "module", alias = "module_name")]
    pub group: Option<String>,
    #[serde(default)]
    pub status: Option<RawFlag>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TryFrom<RawRow> for RowDimension {
    type Error = WireError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        let status = resolve_status(raw.status, raw.is_active)?;
        RowDimension::new(raw.id.into_id(), raw.name, raw.group, status)
            .map_err(|e| WireError::Domain(MatrixError::from(e)))
    }
}

// ============================================================================
// Cells
// ============================================================================

/// A cell kind that knows its backend record shape
pub trait WireCell: CellValue + Serialize {
    type Raw: DeserializeOwned;

    /// Convert one raw record; records without a column id belong to `column_id`
    fn from_raw(raw: Self::Raw, column_id: &str) -> Result<CellRecord<Self>, WireError>;
}

#[derive(Debug, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default, alias = "package_id")]
    pub column_id: Option<RawId>,
    #[serde(alias = "duration_id")]
    pub row_id: RawId,
    #[serde(alias = "amount")]
    pub price: RawAmount,
    #[serde(default, alias = "discount", alias = "discount_percentage")]
    pub discount_percent: Option<RawAmount>,
    #[serde(default, alias = "is_prorate", alias = "prorated")]
    pub prorate: Option<RawFlag>,
    #[serde(default, alias = "start_date", alias = "valid_from")]
    pub effective_from: Option<NaiveDate>,
    #[serde(default, alias = "end_date", alias = "valid_until")]
    pub effective_until: Option<NaiveDate>,
}

impl WireCell for PriceCell {
    type Raw = RawPriceRecord;

    fn from_raw(raw: RawPriceRecord, column_id: &str) -> Result<CellRecord<Self>, WireError> {
        let discount = match &raw.discount_percent {
            Some(d) => {
                let value = d.to_units()?;
                u8::try_from(value).map_err(|_| WireError::OutOfRange {
                    field: "discount_percent",
                    value,
                })?
            }
            None => 0,
        };

        let cell = PriceCell {
            price: raw.price.to_units()?,
            discount_percent: discount,
            prorate: flag(&raw.prorate)?.unwrap_or(false),
            effective_from: raw.effective_from,
            effective_until: raw.effective_until,
        };
        cell.validate()?;

        let column = raw.column_id.map_or_else(|| column_id.to_string(), RawId::into_id);
        Ok(CellRecord::new(column, raw.row_id.into_id(), cell))
    }
}

#[derive(Debug, Deserialize)]
pub struct RawPermissionRecord {
    #[serde(default, alias = "level_id")]
    pub column_id: Option<RawId>,
    #[serde(alias = "menu_id")]
    pub row_id: RawId,
    #[serde(default, alias = "is_access", alias = "can_access")]
    pub access: Option<RawFlag>,
    #[serde(default, alias = "is_view", alias = "can_view")]
    pub view: Option<RawFlag>,
    #[serde(default, alias = "is_add", alias = "can_add")]
    pub add: Option<RawFlag>,
    #[serde(default, alias = "is_edit", alias = "can_edit")]
    pub edit: Option<RawFlag>,
    #[serde(default, alias = "is_delete", alias = "can_delete")]
    pub delete: Option<RawFlag>,
    #[serde(default, alias = "is_approve", alias = "can_approve")]
    pub approve: Option<RawFlag>,
    #[serde(default, alias = "is_print", alias = "can_print")]
    pub print: Option<RawFlag>,
}

impl WireCell for PermissionCell {
    type Raw = RawPermissionRecord;

    fn from_raw(raw: RawPermissionRecord, column_id: &str) -> Result<CellRecord<Self>, WireError> {
        let mut cell = PermissionCell {
            access: false,
            view: flag(&raw.view)?.unwrap_or(false),
            add: flag(&raw.add)?.unwrap_or(false),
            edit: flag(&raw.edit)?.unwrap_or(false),
            delete: flag(&raw.delete)?.unwrap_or(false),
            approve: flag(&raw.approve)?.unwrap_or(false),
            print: flag(&raw.print)?.unwrap_or(false),
        };
        // Without a master flag in the record, any granted permission implies access
        cell.access = match flag(&raw.access)? {
            Some(access) => access,
            None => cell.has_any_permission(),
        };

        let column = raw.column_id.map_or_else(|| column_id.to_string(), RawId::into_id);
        let row = raw.row_id.into_id();
        if cell.normalize() {
            warn!(
                "Permission ({}, {}) grants actions without access; dependents cleared",
                column, row
            );
        }
        Ok(CellRecord::new(column, row, cell))
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// Response body: a bare array or `{success?, data, message?}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<Value>),
    Envelope {
        #[serde(default)]
        success: Option<bool>,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Unwrap a list response into its raw items
pub fn unwrap_list(body: &[u8]) -> Result<Vec<Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::Malformed("empty response body".into()));
    }

    let parsed: ListBody =
        serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    match parsed {
        ListBody::Bare(items) => Ok(items),
        ListBody::Envelope {
            success: Some(false),
            message,
            ..
        } => Err(GatewayError::Rejected(
            message.unwrap_or_else(|| "request rejected".into()),
        )),
        ListBody::Envelope { data: Some(Value::Array(items)), .. } => Ok(items),
        ListBody::Envelope { data: Some(Value::Null), .. } => Ok(Vec::new()),
        ListBody::Envelope { data: Some(_), .. } => Err(GatewayError::Malformed("data is not a list".into())),
        ListBody::Envelope { data: None, .. } => Err(GatewayError::Malformed("missing data".into())),
    }
}

/// Check a save acknowledgement; an empty body counts as success
pub fn check_ack(body: &[u8]) -> Result<(), GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }

    match serde_json::from_slice::<ListBody>(body) {
        Ok(ListBody::Envelope {
            success: Some(false),
            message,
            ..
        }) => Err(GatewayError::Rejected(
            message.unwrap_or_else(|| "request rejected".into()),
        )),
        _ => Ok(()),
    }
}

/// Decode each item, logging and skipping the ones that do not convert.
/// A non-empty list with no usable record is `Malformed`.
pub fn decode_items<R, T, F>(items: Vec<Value>, what: &str, convert: F) -> Result<Vec<T>, GatewayError>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, WireError>,
{
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| {
            let raw = match serde_json::from_value::<R>(item) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Rejecting {} record: {}", what, e);
                    return None;
                }
            };
            match convert(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Rejecting {} record: {}", what, e);
                    None
                }
            }
        })
        .collect();

    if total > 0 && decoded.is_empty() {
        return Err(GatewayError::Malformed(format!(
            "no recognizable {} records among {}",
            what, total
        )));
    }
    if decoded.len() < total {
        warn!("Kept {} of {} {} records", decoded.len(), total, what);
    }
    Ok(decoded)
}

/// Save request body
#[derive(Debug, Serialize)]
pub struct SaveRequest<'a, V: Serialize> {
    pub column_id: &'a str,
    pub cells: &'a [CellUpsert<V>],
}
