// crates/cartoforge-config/src/lib.rs
// ============================================================================
// Module: Cartoforge Config Library
// Description: Tenant configuration loading, validation, and schema backend.
// Purpose: Single source of truth for tenantConfig.json semantics.
// Dependencies: cartoforge-core, jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! `cartoforge-config` loads and validates the declarative tenant
//! configuration with strict, fail-closed parsing, and provides the
//! JSON-schema-backed implementation of the core's schema-validation
//! interface.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::FileTenantConfigSource;
pub use config::TENANT_CONFIG_NAME;
pub use config::load_tenant_config;
pub use config::parse_tenant_config;
pub use schema::JsonSchemaValidator;
