// crates/cartoforge-core/src/core/tenant.rs
// ============================================================================
// Module: Cartoforge Tenant Configuration Model
// Description: Declarative tenant configuration consumed by a generation run.
// Purpose: Define the tenant policy, declared services, and override blocks.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The tenant configuration declares which services a tenant generates, the
//! opaque config each service carries verbatim into its output document, and
//! optional resource/permission override blocks that bypass the store for a
//! service's resource types. Loading and validation of the on-disk document
//! live in `cartoforge-config`; this module holds the in-memory model.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::TenantId;
use crate::core::permissions::PermissionGrant;
use crate::core::policy::GenerationPolicy;
use crate::core::resource::Resource;

// ============================================================================
// SECTION: Service Declarations
// ============================================================================

/// Tenant-declared resources and grants replacing store data for a service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceOverride {
    /// Declared resource rows.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Declared grant records.
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

/// One declared service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name, e.g. `ogc` or `mapViewer`.
    pub name: String,
    /// Generator-facing settings, not copied into the output document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_config: Option<Value>,
    /// Opaque service config copied verbatim into the output document.
    #[serde(default)]
    pub config: Value,
    /// Schema reference for the assembled document, when registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
    /// Override block replacing store-derived data for this service's types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ServiceOverride>,
}

// ============================================================================
// SECTION: Tenant Configuration
// ============================================================================

/// The in-memory tenant configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Tenant the configuration belongs to.
    pub tenant: TenantId,
    /// Generation policy knobs.
    #[serde(default)]
    pub policy: GenerationPolicy,
    /// Declared services in output order.
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    /// Schema reference for the permissions document, when registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions_schema_url: Option<String>,
}

impl TenantConfig {
    /// Creates a configuration with the default policy and no services.
    #[must_use]
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
            policy: GenerationPolicy::default(),
            services: Vec::new(),
            permissions_schema_url: None,
        }
    }

    /// Returns the declared service with the given name, if any.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|service| service.name == name)
    }
}
