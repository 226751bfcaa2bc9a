// crates/cartoforge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Cartoforge Interfaces
// Description: Backend-agnostic interfaces for store, metadata, and schemas.
// Purpose: Define the collaborator surfaces consumed by a generation run.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Cartoforge integrates with its collaborators without
//! embedding backend-specific details: the relational configuration store,
//! the project-metadata extractor, the tenant-configuration source, and the
//! schema validator. Implementations must be deterministic; collaborator I/O
//! is bounded and treated as a failure source, never retried by the core.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::TenantId;
use crate::core::permissions::Memberships;
use crate::core::permissions::PermissionGrant;
use crate::core::resource::Resource;
use crate::core::tenant::TenantConfig;

// ============================================================================
// SECTION: Resource Store
// ============================================================================

/// Resource store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store query failed.
    #[error("resource store error: {0}")]
    Query(String),
    /// Store query exceeded its time bound.
    #[error("resource store timeout: {0}")]
    Timeout(String),
}

/// Relational store supplying resource and permission rows per tenant.
pub trait ResourceStore {
    /// Fetches all resource rows for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or times out.
    fn fetch_resources(&self, tenant: &TenantId) -> Result<Vec<Resource>, StoreError>;

    /// Fetches all grant records for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or times out.
    fn fetch_grants(&self, tenant: &TenantId) -> Result<Vec<PermissionGrant>, StoreError>;

    /// Fetches user, group, and role memberships for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or times out.
    fn fetch_memberships(&self, tenant: &TenantId) -> Result<Memberships, StoreError>;
}

// ============================================================================
// SECTION: Project Metadata
// ============================================================================

/// A print layout declared by a map project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintLayout {
    /// Layout name.
    pub name: String,
    /// Optional companion legend layout name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_layout: Option<String>,
}

/// A layer or group layer extracted from a map project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Layer name.
    pub name: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Attribute names for leaf layers.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Child layers for group layers.
    #[serde(default)]
    pub sublayers: Vec<LayerMetadata>,
    /// Whether the layer answers feature info queries.
    #[serde(default)]
    pub queryable: bool,
}

impl LayerMetadata {
    /// Returns true when this is a group layer.
    #[must_use]
    pub fn is_group(&self) -> bool {
        !self.sublayers.is_empty()
    }
}

/// Structured metadata for one theme (map project).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeMetadata {
    /// Theme name; matches the `map` resource name.
    pub name: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Root layer of the project layer tree.
    pub root_layer: LayerMetadata,
    /// Print layouts declared by the project.
    #[serde(default)]
    pub print_layouts: Vec<PrintLayout>,
}

/// Project metadata errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The metadata extractor failed or timed out.
    #[error("project metadata unavailable: {0}")]
    Unavailable(String),
    /// The requested theme is not known.
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
}

/// Collaborator supplying structured map-project metadata.
pub trait ProjectMetadataSource {
    /// Returns the theme names available for a tenant, in output order.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the extractor fails.
    fn theme_names(&self, tenant: &TenantId) -> Result<Vec<String>, MetadataError>;

    /// Fetches metadata for one theme.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the theme is unknown or extraction
    /// fails.
    fn fetch_theme(
        &self,
        tenant: &TenantId,
        theme: &str,
        use_cached: bool,
    ) -> Result<ThemeMetadata, MetadataError>;
}

// ============================================================================
// SECTION: Tenant Configuration Source
// ============================================================================

/// Tenant configuration source errors.
#[derive(Debug, Error)]
pub enum TenantConfigError {
    /// The configuration could not be read.
    #[error("tenant config load error: {0}")]
    Load(String),
    /// The configuration was read but is invalid.
    #[error("tenant config invalid: {0}")]
    Invalid(String),
}

/// Collaborator supplying the declarative tenant configuration.
pub trait TenantConfigSource {
    /// Loads the configuration for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`TenantConfigError`] when loading or validation fails.
    fn tenant_config(&self, tenant: &TenantId) -> Result<TenantConfig, TenantConfigError>;
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

/// A single schema violation within an assembled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// JSON pointer to the violating value.
    pub json_path: String,
    /// The violated constraint, as reported by the validator.
    pub constraint: String,
}

/// Schema validator errors (distinct from violations in a valid run).
#[derive(Debug, Error)]
pub enum SchemaAccessError {
    /// No schema is registered under the reference.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
    /// The registered schema itself is invalid.
    #[error("invalid schema '{reference}': {message}")]
    InvalidSchema {
        /// Schema reference.
        reference: String,
        /// Compiler message.
        message: String,
    },
}

/// Pure document validator: document and schema in, violations out.
pub trait SchemaValidator {
    /// Validates a document against the schema registered under `reference`.
    ///
    /// An empty violation list means the document conforms.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaAccessError`] when the schema cannot be used at all.
    fn validate(
        &self,
        document: &Value,
        reference: &str,
    ) -> Result<Vec<SchemaViolation>, SchemaAccessError>;
}
