// crates/cartoforge-core/src/lib.rs
// ============================================================================
// Module: Cartoforge Core Library
// Description: Public API surface for the Cartoforge core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Cartoforge core generates, per tenant, service configuration documents and
//! a permissions document from a declarative tenant configuration, store-held
//! resource and permission rows, and structured map-project metadata. It is
//! backend-agnostic and integrates through explicit interfaces rather than
//! embedding a store or metadata extractor.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::LayerMetadata;
pub use interfaces::MetadataError;
pub use interfaces::PrintLayout;
pub use interfaces::ProjectMetadataSource;
pub use interfaces::ResourceStore;
pub use interfaces::SchemaAccessError;
pub use interfaces::SchemaValidator;
pub use interfaces::SchemaViolation;
pub use interfaces::StoreError;
pub use interfaces::TenantConfigError;
pub use interfaces::TenantConfigSource;
pub use interfaces::ThemeMetadata;
pub use runtime::AssembleError;
pub use runtime::CancelFlag;
pub use runtime::ConfigAssembler;
pub use runtime::GenerationError;
pub use runtime::GenerationOutcome;
pub use runtime::GenerationPaths;
pub use runtime::GenerationRun;
pub use runtime::InMemoryProjectMetadata;
pub use runtime::InMemoryResourceStore;
pub use runtime::InMemoryTenantConfigs;
pub use runtime::PermissionResolver;
pub use runtime::ResolverError;
pub use runtime::ServiceDocument;
pub use runtime::ServiceKind;
pub use runtime::StagingArea;
pub use runtime::StagingError;
pub use runtime::kebab_service_name;
pub use runtime::service_file_name;
