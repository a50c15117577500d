// ============================================================================
// Matrix Core - Permission Cell
// File: crates/matrix-core/src/domain/permission.rs
// Description: Level x menu permission flags (access matrix)
// ============================================================================

use serde::{Deserialize, Serialize};

use super::cell::CellValue;
use crate::error::MatrixError;

/// Permission flags. `Access` is the master flag gating all others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionFlag {
    Access,
    View,
    Add,
    Edit,
    Delete,
    Approve,
    Print,
}

impl PermissionFlag {
    pub const ALL: [PermissionFlag; 7] = [
        PermissionFlag::Access,
        PermissionFlag::View,
        PermissionFlag::Add,
        PermissionFlag::Edit,
        PermissionFlag::Delete,
        PermissionFlag::Approve,
        PermissionFlag::Print,
    ];

    pub const DEPENDENTS: [PermissionFlag; 6] = [
        PermissionFlag::View,
        PermissionFlag::Add,
        PermissionFlag::Edit,
        PermissionFlag::Delete,
        PermissionFlag::Approve,
        PermissionFlag::Print,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionFlag::Access => "access",
            PermissionFlag::View => "view",
            PermissionFlag::Add => "add",
            PermissionFlag::Edit => "edit",
            PermissionFlag::Delete => "delete",
            PermissionFlag::Approve => "approve",
            PermissionFlag::Print => "print",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let name = s.trim().to_lowercase();
        let name = name.strip_prefix("is_").unwrap_or(&name);
        Self::ALL.into_iter().find(|flag| flag.as_str() == name)
    }
}

/// Permission set of one level on one menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionCell {
    pub access: bool,
    pub view: bool,
    pub add: bool,
    pub edit: bool,
    pub delete: bool,
    pub approve: bool,
    pub print: bool,
}

impl PermissionCell {
    pub fn full_access() -> Self {
        Self {
            access: true,
            view: true,
            add: true,
            edit: true,
            delete: true,
            approve: true,
            print: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            access: true,
            view: true,
            print: true,
            ..Self::default()
        }
    }

    pub fn no_access() -> Self {
        Self::default()
    }

    pub fn get(&self, flag: PermissionFlag) -> bool {
        match flag {
            PermissionFlag::Access => self.access,
            PermissionFlag::View => self.view,
            PermissionFlag::Add => self.add,
            PermissionFlag::Edit => self.edit,
            PermissionFlag::Delete => self.delete,
            PermissionFlag::Approve => self.approve,
            PermissionFlag::Print => self.print,
        }
    }

    fn set(&mut self, flag: PermissionFlag, value: bool) {
        match flag {
            PermissionFlag::Access => self.access = value,
            PermissionFlag::View => self.view = value,
            PermissionFlag::Add => self.add = value,
            PermissionFlag::Edit => self.edit = value,
            PermissionFlag::Delete => self.delete = value,
            PermissionFlag::Approve => self.approve = value,
            PermissionFlag::Print => self.print = value,
        }
    }

    pub fn has_any_permission(&self) -> bool {
        PermissionFlag::ALL.into_iter().any(|flag| self.get(flag))
    }

    fn first_dependent_set(&self) -> Option<PermissionFlag> {
        PermissionFlag::DEPENDENTS.into_iter().find(|flag| self.get(*flag))
    }

    fn clear_dependents(&mut self) {
        for flag in PermissionFlag::DEPENDENTS {
            self.set(flag, false);
        }
    }
}

/// Partial update of a permission cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionPatch {
    pub access: Option<bool>,
    pub view: Option<bool>,
    pub add: Option<bool>,
    pub edit: Option<bool>,
    pub delete: Option<bool>,
    pub approve: Option<bool>,
    pub print: Option<bool>,
}

impl PermissionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: PermissionFlag, value: bool) -> Self {
        let slot = match flag {
            PermissionFlag::Access => &mut self.access,
            PermissionFlag::View => &mut self.view,
            PermissionFlag::Add => &mut self.add,
            PermissionFlag::Edit => &mut self.edit,
            PermissionFlag::Delete => &mut self.delete,
            PermissionFlag::Approve => &mut self.approve,
            PermissionFlag::Print => &mut self.print,
        };
        *slot = Some(value);
        self
    }

    pub fn get(&self, flag: PermissionFlag) -> Option<bool> {
        match flag {
            PermissionFlag::Access => self.access,
            PermissionFlag::View => self.view,
            PermissionFlag::Add => self.add,
            PermissionFlag::Edit => self.edit,
            PermissionFlag::Delete => self.delete,
            PermissionFlag::Approve => self.approve,
            PermissionFlag::Print => self.print,
        }
    }
}

impl CellValue for PermissionCell {
    type Patch = PermissionPatch;

    fn validate(&self) -> Result<(), MatrixError> {
        if !self.access {
            if let Some(flag) = self.first_dependent_set() {
                return Err(MatrixError::DependentWithoutMaster(flag.as_str()));
            }
        }
        Ok(())
    }

    fn merge(&self, patch: &PermissionPatch) -> Result<Self, MatrixError> {
        let mut next = *self;
        for flag in PermissionFlag::ALL {
            if let Some(value) = patch.get(flag) {
                next.set(flag, value);
            }
        }

        if !next.access {
            // Raising a dependent flag without access is refused; revoking access clears the rest
            if let Some(flag) = PermissionFlag::DEPENDENTS
                .into_iter()
                .find(|flag| patch.get(*flag) == Some(true))
            {
                return Err(MatrixError::DependentWithoutMaster(flag.as_str()));
            }
            next.clear_dependents();
        }

        Ok(next)
    }

    fn normalize(&mut self) -> bool {
        if !self.access && self.first_dependent_set().is_some() {
            self.clear_dependents();
            return true;
        }
        false
    }

    fn export_headers() -> &'static [&'static str] {
        &["access", "view", "add", "edit", "delete", "approve", "print"]
    }

    fn export_fields(&self) -> Vec<String> {
        PermissionFlag::ALL
            .into_iter()
            .map(|flag| self.get(flag).to_string())
            .collect()
    }
}

/// Named permission sets applied in bulk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPreset {
    FullAccess,
    ReadOnly,
    NoAccess,
}

impl PermissionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionPreset::FullAccess => "full",
            PermissionPreset::ReadOnly => "read-only",
            PermissionPreset::NoAccess => "none",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" | "full-access" => Some(PermissionPreset::FullAccess),
            "read-only" | "readonly" => Some(PermissionPreset::ReadOnly),
            "none" | "no-access" => Some(PermissionPreset::NoAccess),
            _ => None,
        }
    }

    pub fn cell(&self) -> PermissionCell {
        match self {
            PermissionPreset::FullAccess => PermissionCell::full_access(),
            PermissionPreset::ReadOnly => PermissionCell::read_only(),
            PermissionPreset::NoAccess => PermissionCell::no_access(),
        }
    }
}
