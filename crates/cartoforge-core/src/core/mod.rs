// crates/cartoforge-core/src/core/mod.rs
// ============================================================================
// Module: Cartoforge Core Types
// Description: Shared data model for resources, permissions, and policy.
// Purpose: Re-export the canonical types used across the workspace.
// Dependencies: crate::core submodules
// ============================================================================

//! ## Overview
//! Core types shared by the resolver, assembler, and task orchestrator:
//! identifiers, the resource model, grants and resolved permission sets, the
//! generation policy, the tenant configuration model, and the collecting log.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod log;
pub mod permissions;
pub mod policy;
pub mod resource;
pub mod tenant;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::PUBLIC_ROLE;
pub use identifiers::ResourceId;
pub use identifiers::RoleName;
pub use identifiers::TaskId;
pub use identifiers::TenantId;
pub use log::GenerationLog;
pub use log::LogEntry;
pub use log::LogLevel;
pub use permissions::GroupMembership;
pub use permissions::Memberships;
pub use permissions::PermissionGrant;
pub use permissions::PermissionsDocument;
pub use permissions::ResolvedPermissionSet;
pub use permissions::ResolvedResource;
pub use permissions::TypeGroup;
pub use permissions::UserMembership;
pub use policy::GenerationOptions;
pub use policy::GenerationPolicy;
pub use policy::GenerationTarget;
pub use resource::BUILTIN_RESOURCE_TYPES;
pub use resource::Resource;
pub use resource::ResourceForest;
pub use resource::ResourceGraphError;
pub use resource::ResourceType;
pub use resource::ResourceTypeRegistry;
pub use tenant::ServiceOverride;
pub use tenant::ServiceSpec;
pub use tenant::TenantConfig;
