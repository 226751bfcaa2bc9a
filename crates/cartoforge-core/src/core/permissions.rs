// crates/cartoforge-core/src/core/permissions.rs
// ============================================================================
// Module: Cartoforge Permission Records
// Description: Grant rows, role memberships, and resolved permission sets.
// Purpose: Define the data carried from the store into the resolver and the
//          shape of the emitted permissions document.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A permission is an explicit grant record `(role, resource)`; absence of a
//! record is not a denial by itself. Resolved permission sets group allowed
//! resources by type in registry order, resources ordered by name, so that
//! identical inputs always serialize to byte-identical documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;

// ============================================================================
// SECTION: Grants and Memberships
// ============================================================================

/// An explicit grant record from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Granted role.
    pub role: RoleName,
    /// Granted resource id.
    pub resource_id: ResourceId,
}

/// A user with its group and role memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMembership {
    /// User name.
    pub name: String,
    /// Group names the user belongs to, ordered by name.
    pub groups: Vec<String>,
    /// Role names assigned to the user, ordered by name.
    pub roles: Vec<String>,
}

/// A group with its role memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Group name.
    pub name: String,
    /// Role names assigned to the group, ordered by name.
    pub roles: Vec<String>,
}

/// Users, groups, and role names known to the store for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Memberships {
    /// Users ordered by name.
    pub users: Vec<UserMembership>,
    /// Groups ordered by name.
    pub groups: Vec<GroupMembership>,
    /// Role names known to the store.
    pub roles: Vec<RoleName>,
}

// ============================================================================
// SECTION: Resolved Permissions
// ============================================================================

/// An allowed resource entry within a resolved permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Resource name.
    pub name: String,
    /// Parent resource name, kept so consumers can rebuild the tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Dataset writability; only emitted for `data_resource` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

/// Allowed resources of one type, in deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeGroup {
    /// Resource type name.
    pub resource_type: String,
    /// Allowed resources ordered by (name, insertion order).
    pub resources: Vec<ResolvedResource>,
}

/// Allowed resources for one role, grouped by type in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermissionSet {
    /// Role the set applies to.
    pub role: RoleName,
    /// Non-empty type groups ordered by `list_order`.
    pub permissions: Vec<TypeGroup>,
}

// ============================================================================
// SECTION: Permissions Document
// ============================================================================

/// The tenant's single permissions document.
///
/// # Invariants
/// - `roles` lists the `public` role first, remaining roles by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsDocument {
    /// Schema reference for the document, when registered.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Tenant the document belongs to.
    pub tenant: String,
    /// Users ordered by name.
    pub users: Vec<UserMembership>,
    /// Groups ordered by name.
    pub groups: Vec<GroupMembership>,
    /// Per-role resolved permission sets.
    pub roles: Vec<ResolvedPermissionSet>,
}
