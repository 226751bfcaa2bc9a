// crates/cartoforge-core/src/core/policy.rs
// ============================================================================
// Module: Cartoforge Generation Policy
// Description: Tenant-scoped policy knobs and per-run option overrides.
// Purpose: Define how permission defaults and failure tolerance apply to a
//          generation run.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The generation policy is declared in the tenant configuration and governs
//! permission defaults, info-permission inheritance, dataset writability, and
//! failure tolerance. Per-run options may override individual knobs without
//! touching the stored configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Generation Policy
// ============================================================================

/// Tenant-scoped generation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPolicy {
    /// Whether a resource without an explicit grant is permitted.
    #[serde(default = "default_true")]
    pub default_allow: bool,
    /// Whether info-service resources inherit map/layer permissions.
    #[serde(default)]
    pub inherit_info_permissions: bool,
    /// Whether all datasets are forced read-only.
    #[serde(default)]
    pub force_readonly_datasets: bool,
    /// Whether recoverable errors are skipped and logged instead of aborting.
    #[serde(default)]
    pub ignore_errors: bool,
    /// Whether assembled documents are validated against their schemas.
    #[serde(default = "default_true")]
    pub validate_schema: bool,
    /// Tenant-declared resource types, appended after built-ins.
    #[serde(default)]
    pub custom_resource_types: Vec<String>,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            default_allow: true,
            inherit_info_permissions: false,
            force_readonly_datasets: false,
            ignore_errors: false,
            validate_schema: true,
            custom_resource_types: Vec::new(),
        }
    }
}

/// Serde default helper returning `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Generation Options
// ============================================================================

/// Output selection for a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTarget {
    /// Generate service configs and the permissions document.
    #[default]
    All,
    /// Generate service configs only.
    ServiceConfigs,
    /// Generate the permissions document only.
    Permissions,
}

impl GenerationTarget {
    /// Returns true when service config documents are generated.
    #[must_use]
    pub const fn includes_service_configs(self) -> bool {
        matches!(self, Self::All | Self::ServiceConfigs)
    }

    /// Returns true when the permissions document is generated.
    #[must_use]
    pub const fn includes_permissions(self) -> bool {
        matches!(self, Self::All | Self::Permissions)
    }
}

/// Per-run overrides applied on top of the tenant policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Whether cached project metadata may be reused.
    #[serde(default)]
    pub use_cached_project_metadata: bool,
    /// Overrides `force_readonly_datasets` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_readonly_datasets: Option<bool>,
    /// Overrides `ignore_errors` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_errors: Option<bool>,
    /// Which documents the run produces.
    #[serde(default)]
    pub target: GenerationTarget,
}

impl GenerationPolicy {
    /// Returns the policy with per-run overrides applied.
    #[must_use]
    pub fn with_overrides(&self, options: &GenerationOptions) -> Self {
        let mut effective = self.clone();
        if let Some(force_readonly) = options.force_readonly_datasets {
            effective.force_readonly_datasets = force_readonly;
        }
        if let Some(ignore_errors) = options.ignore_errors {
            effective.ignore_errors = ignore_errors;
        }
        effective
    }
}
