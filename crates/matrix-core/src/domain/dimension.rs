// ============================================================================
// Matrix Core - Dimension Records
// File: crates/matrix-core/src/domain/dimension.rs
// Description: Column (package / level) and row (duration / menu) records
// ============================================================================

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Backend ids arrive as numbers or UUIDs; both normalize to a string
pub type DimensionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" | "aktif" | "1" => Some(RecordStatus::Active),
            "inactive" | "nonaktif" | "0" => Some(RecordStatus::Inactive),
            _ => None,
        }
    }

    pub fn from_flag(is_active: bool) -> Self {
        if is_active {
            RecordStatus::Active
        } else {
            RecordStatus::Inactive
        }
    }
}

/// Dimension A: a package in the pricing matrix, a level in the access matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ColumnDimension {
    #[validate(length(min = 1, max = 64, message = "Column id must be between 1 and 64 characters"))]
    pub id: DimensionId,

    #[validate(length(min = 1, max = 150, message = "Column name must be between 1 and 150 characters"))]
    pub name: String,

    pub status: RecordStatus,
}

impl ColumnDimension {
    pub fn new(
        id: impl Into<DimensionId>,
        name: impl Into<String>,
        status: RecordStatus,
    ) -> Result<Self, validator::ValidationErrors> {
        let column = Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            status,
        };
        column.validate()?;
        Ok(column)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Dimension B: a duration in the pricing matrix, a menu item in the access matrix.
/// `group` is the module a menu belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RowDimension {
    #[validate(length(min = 1, max = 64, message = "Row id must be between 1 and 64 characters"))]
    pub id: DimensionId,

    #[validate(length(min = 1, max = 150, message = "Row name must be between 1 and 150 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Group key too long"))]
    pub group: Option<String>,

    pub status: RecordStatus,
}

impl RowDimension {
    pub fn new(
        id: impl Into<DimensionId>,
        name: impl Into<String>,
        group: Option<String>,
        status: RecordStatus,
    ) -> Result<Self, validator::ValidationErrors> {
        let row = Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            group: group
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty()),
            status,
        };
        row.validate()?;
        Ok(row)
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        assert_eq!(RecordStatus::from_str("Active"), Some(RecordStatus::Active));
        assert_eq!(RecordStatus::from_str(" inactive "), Some(RecordStatus::Inactive));
        assert_eq!(RecordStatus::from_str("archived"), None);
        assert_eq!(RecordStatus::Inactive.as_str(), "inactive");
    }

    #[test]
    fn test_column_trims_and_validates() {
        let col = ColumnDimension::new(" PKG-1 ", "  Starter ", RecordStatus::Active).unwrap();
        assert_eq!(col.id, "PKG-1");
        assert_eq!(col.name, "Starter");
        assert!(col.is_active());

        assert!(ColumnDimension::new("PKG-2", "   ", RecordStatus::Active).is_err());
    }

    #[test]
    fn test_row_blank_group_becomes_none() {
        let row = RowDimension::new("M1", "Users", Some("  ".to_string()), RecordStatus::Active).unwrap();
        assert!(row.group.is_none());

        let row = RowDimension::new("M2", "Roles", Some("Admin".to_string()), RecordStatus::Inactive).unwrap();
        assert_eq!(row.group.as_deref(), Some("Admin"));
        assert!(!row.is_active());
    }
}
