// crates/cartoforge-core/src/runtime/resolver.rs
// ============================================================================
// Module: Cartoforge Permission Resolver
// Description: Hierarchical role-based resolution of resource permissions.
// Purpose: Compute, per role, the set of resources the role may access.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! For every role the resolver decides, per resource, whether the role may
//! access it: an explicit grant allows, attributes are allowed by default,
//! everything else follows the tenant's default-allow policy, and a denied
//! parent denies the whole subtree regardless of grants below it. With
//! info-permission inheritance enabled, info-service resources without an
//! explicit grant borrow the resolved allowance of their map/layer
//! counterpart. Resolution is memoized per role so parents are settled before
//! children regardless of type interleaving, and output ordering follows the
//! registry and forest orders, making identical inputs serialize to
//! byte-identical documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::identifiers::ResourceId;
use crate::core::identifiers::RoleName;
use crate::core::log::GenerationLog;
use crate::core::permissions::PermissionGrant;
use crate::core::permissions::ResolvedPermissionSet;
use crate::core::permissions::ResolvedResource;
use crate::core::permissions::TypeGroup;
use crate::core::policy::GenerationPolicy;
use crate::core::resource::ATTRIBUTE_TYPE;
use crate::core::resource::DATA_RESOURCE_TYPE;
use crate::core::resource::FEATURE_INFO_LAYER_TYPE;
use crate::core::resource::FEATURE_INFO_SERVICE_TYPE;
use crate::core::resource::LAYER_TYPE;
use crate::core::resource::MAP_TYPE;
use crate::core::resource::Resource;
use crate::core::resource::ResourceForest;
use crate::core::resource::ResourceTypeRegistry;
use crate::runtime::cancel::CancelFlag;

// ============================================================================
// SECTION: Resolver Errors
// ============================================================================

/// Errors raised while preparing the resolver input.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A grant references a resource id not present in the forest.
    #[error("permission row for role '{role}' references unknown resource {resource_id}")]
    UnknownGrantResource {
        /// Role named by the grant.
        role: RoleName,
        /// The missing resource id.
        resource_id: ResourceId,
    },
}

/// Marker returned when resolution observed a cancellation request.
#[derive(Debug, Error)]
#[error("permission resolution cancelled")]
pub struct ResolutionInterrupted;

// ============================================================================
// SECTION: Permission Resolver
// ============================================================================

/// Hierarchical permission resolver over one resource forest.
#[derive(Debug)]
pub struct PermissionResolver<'a> {
    /// Registered resource types in processing order.
    registry: &'a ResourceTypeRegistry,
    /// Validated resource forest.
    forest: &'a ResourceForest,
    /// Effective generation policy.
    policy: &'a GenerationPolicy,
    /// Grant lookup per role.
    grants: BTreeMap<RoleName, BTreeSet<ResourceId>>,
}

impl<'a> PermissionResolver<'a> {
    /// Creates a resolver over the forest and grant rows.
    ///
    /// Grants referencing unknown resources are fatal unless `ignore_errors`
    /// is set in the policy, in which case they are skipped and logged.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnknownGrantResource`] for a dangling grant
    /// in strict mode.
    pub fn new(
        registry: &'a ResourceTypeRegistry,
        forest: &'a ResourceForest,
        policy: &'a GenerationPolicy,
        grant_rows: &[PermissionGrant],
        log: &GenerationLog,
    ) -> Result<Self, ResolverError> {
        let mut grants: BTreeMap<RoleName, BTreeSet<ResourceId>> = BTreeMap::new();
        for grant in grant_rows {
            if forest.get(grant.resource_id).is_none() {
                if policy.ignore_errors {
                    log.warning(format!(
                        "Skipping permission row for role '{}' with unknown resource {}",
                        grant.role, grant.resource_id
                    ));
                    continue;
                }
                return Err(ResolverError::UnknownGrantResource {
                    role: grant.role.clone(),
                    resource_id: grant.resource_id,
                });
            }
            grants.entry(grant.role.clone()).or_default().insert(grant.resource_id);
        }
        Ok(Self {
            registry,
            forest,
            policy,
            grants,
        })
    }

    /// Returns the roles named by grant rows, without the implicit `public`.
    #[must_use]
    pub fn grant_roles(&self) -> Vec<RoleName> {
        self.grants.keys().cloned().collect()
    }

    /// Resolves the permission set for one role.
    ///
    /// Types named in `excluded_types` are skipped entirely; tenant-declared
    /// override blocks are resolved separately against their declared rows.
    /// The cancel flag is checked after each resource type.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionInterrupted`] when cancellation was observed.
    pub fn resolve_role(
        &self,
        role: &RoleName,
        excluded_types: &BTreeSet<String>,
        cancel: &CancelFlag,
    ) -> Result<ResolvedPermissionSet, ResolutionInterrupted> {
        let mut memo: BTreeMap<ResourceId, bool> = BTreeMap::new();
        let mut permissions = Vec::new();
        for resource_type in self.registry.iter_ordered() {
            if cancel.is_requested() {
                return Err(ResolutionInterrupted);
            }
            if excluded_types.contains(&resource_type.name) {
                continue;
            }
            let group = self.resolve_type_group(role, &resource_type.name, &mut memo);
            if !group.resources.is_empty() {
                permissions.push(group);
            }
        }
        Ok(ResolvedPermissionSet {
            role: role.clone(),
            permissions,
        })
    }

    /// Collects the allowed resources of one type for a role.
    fn resolve_type_group(
        &self,
        role: &RoleName,
        type_name: &str,
        memo: &mut BTreeMap<ResourceId, bool>,
    ) -> TypeGroup {
        let mut resources = Vec::new();
        for resource in self.forest.resources_of_type(type_name) {
            if !self.allowance(role, resource, memo) {
                continue;
            }
            resources.push(ResolvedResource {
                name: resource.name.clone(),
                parent: self.forest.parent_of(resource.id).map(|parent| parent.name.clone()),
                writable: self.writable_of(resource),
            });
        }
        TypeGroup {
            resource_type: type_name.to_string(),
            resources,
        }
    }

    /// Returns the emitted writability for a resource, datasets only.
    fn writable_of(&self, resource: &Resource) -> Option<bool> {
        if resource.resource_type != DATA_RESOURCE_TYPE {
            return None;
        }
        if self.policy.force_readonly_datasets {
            return Some(false);
        }
        Some(resource.writable.unwrap_or(true))
    }

    /// Computes the resolved allowance of one resource for a role.
    ///
    /// Memoized per role; a denied parent forces denial of the subtree even
    /// over an explicit grant on the child.
    fn allowance(
        &self,
        role: &RoleName,
        resource: &Resource,
        memo: &mut BTreeMap<ResourceId, bool>,
    ) -> bool {
        if let Some(&known) = memo.get(&resource.id) {
            return known;
        }
        let explicit =
            self.grants.get(role).is_some_and(|granted| granted.contains(&resource.id));
        let own = if explicit {
            true
        } else if let Some(counterpart) = self.inheritance_counterpart(resource) {
            self.allowance(role, counterpart, memo)
        } else if resource.resource_type == ATTRIBUTE_TYPE {
            true
        } else {
            self.policy.default_allow
        };
        let allowed = match resource.parent.and_then(|parent| self.forest.get(parent)) {
            Some(parent) => self.allowance(role, parent, memo) && own,
            None => own,
        };
        memo.insert(resource.id, allowed);
        allowed
    }

    /// Returns the map/layer counterpart an info-scoped resource inherits
    /// from, when inheritance is enabled.
    fn inheritance_counterpart(&self, resource: &Resource) -> Option<&Resource> {
        if !self.policy.inherit_info_permissions {
            return None;
        }
        match resource.resource_type.as_str() {
            FEATURE_INFO_SERVICE_TYPE => {
                self.forest.find_by_type_and_name(MAP_TYPE, &resource.name)
            }
            FEATURE_INFO_LAYER_TYPE => {
                self.forest.find_by_type_and_name(LAYER_TYPE, &resource.name)
            }
            ATTRIBUTE_TYPE => {
                let parent = resource.parent.and_then(|parent| self.forest.get(parent))?;
                if parent.resource_type != FEATURE_INFO_LAYER_TYPE {
                    return None;
                }
                let layer = self.forest.find_by_type_and_name(LAYER_TYPE, &parent.name)?;
                self.forest
                    .find_child(layer.id, ATTRIBUTE_TYPE, &resource.name)
                    .or(Some(layer))
            }
            _ => None,
        }
    }
}
