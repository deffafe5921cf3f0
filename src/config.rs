//! Shelf configuration
//!
//! Every field has a default, so an empty `{}` file (or no file at all) is a
//! valid configuration. Unknown keys are rejected.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelf_dragdrop::DndConfig;

use crate::domain::{DomainError, DomainResult, GridKind, GridSpec};
use crate::engine::GridLimits;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefaultGridSettings {
    #[serde(default = "default_grid_name")]
    pub name: String,
    #[serde(default = "default_grid_rows")]
    pub rows: usize,
    #[serde(default = "default_grid_columns")]
    pub columns: usize,
    #[serde(default)]
    pub kind: GridKind,
}

impl Default for DefaultGridSettings {
    fn default() -> Self {
        Self {
            name: default_grid_name(),
            rows: default_grid_rows(),
            columns: default_grid_columns(),
            kind: GridKind::default(),
        }
    }
}

impl DefaultGridSettings {
    pub fn to_spec(&self) -> GridSpec {
        GridSpec {
            name: self.name.clone(),
            rows: self.rows,
            columns: self.columns,
            kind: self.kind,
            style: Default::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShelfConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    #[serde(default)]
    pub default_grid: DefaultGridSettings,
    #[serde(default = "default_drop_debounce_ms")]
    pub drop_debounce_ms: u64,
    #[serde(default = "default_drag_safety_timeout_ms")]
    pub drag_safety_timeout_ms: u64,
    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: i32,
    #[serde(default = "default_storage_quota_bytes")]
    pub storage_quota_bytes: u64,
    /// Usage at or above this share of the quota produces an info notice
    #[serde(default = "default_storage_warning_percent")]
    pub storage_warning_percent: f64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            max_columns: default_max_columns(),
            default_grid: DefaultGridSettings::default(),
            drop_debounce_ms: default_drop_debounce_ms(),
            drag_safety_timeout_ms: default_drag_safety_timeout_ms(),
            drag_threshold_px: default_drag_threshold_px(),
            storage_quota_bytes: default_storage_quota_bytes(),
            storage_warning_percent: default_storage_warning_percent(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl ShelfConfig {
    /// Read a JSON config file; a missing file yields the defaults
    pub fn load(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> DomainResult<Self> {
        let config: ShelfConfig = serde_json::from_str(text)
            .map_err(|e| DomainError::InvalidInput(format!("Bad config: {}", e)))?;
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(DomainError::InvalidInput(issues.join("; ")));
        }
        Ok(config)
    }

    /// Problems that make the configuration unusable
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.max_rows == 0 {
            issues.push("max_rows must be at least 1".to_string());
        }
        if self.max_columns == 0 {
            issues.push("max_columns must be at least 1".to_string());
        }
        if let Err(e) = self.limits().check(self.default_grid.rows, self.default_grid.columns) {
            issues.push(format!("default_grid: {}", e));
        }
        if self.default_grid.name.trim().is_empty() {
            issues.push("default_grid.name cannot be empty".to_string());
        }
        if self.drag_threshold_px < 0 {
            issues.push("drag_threshold_px cannot be negative".to_string());
        }
        if !(0.0..=100.0).contains(&self.storage_warning_percent) {
            issues.push("storage_warning_percent must be between 0 and 100".to_string());
        }
        if self.key_prefix.is_empty() {
            issues.push("key_prefix cannot be empty".to_string());
        }
        issues
    }

    pub fn limits(&self) -> GridLimits {
        GridLimits {
            max_rows: self.max_rows,
            max_columns: self.max_columns,
        }
    }

    pub fn dnd(&self) -> DndConfig {
        DndConfig {
            drag_threshold_px: self.drag_threshold_px,
            drop_debounce: Duration::from_millis(self.drop_debounce_ms),
            safety_timeout: Duration::from_millis(self.drag_safety_timeout_ms),
            ..DndConfig::default()
        }
    }

    pub fn grids_key(&self) -> String {
        format!("{}:grids", self.key_prefix)
    }

    pub fn items_key(&self) -> String {
        format!("{}:items", self.key_prefix)
    }

    pub fn active_grid_key(&self) -> String {
        format!("{}:active-grid", self.key_prefix)
    }
}

fn default_max_rows() -> usize { 5 }

fn default_max_columns() -> usize { 10 }

fn default_grid_name() -> String { "My Bookshelf".to_string() }

fn default_grid_rows() -> usize { 2 }

fn default_grid_columns() -> usize { 4 }

fn default_drop_debounce_ms() -> u64 { 300 }

fn default_drag_safety_timeout_ms() -> u64 { 5000 }

fn default_drag_threshold_px() -> i32 { 5 }

fn default_storage_quota_bytes() -> u64 { 5 * 1024 * 1024 }

fn default_storage_warning_percent() -> f64 { 90.0 }

fn default_key_prefix() -> String { "virtual-shelf".to_string() }
