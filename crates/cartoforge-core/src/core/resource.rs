// crates/cartoforge-core/src/core/resource.rs
// ============================================================================
// Module: Cartoforge Resource Model
// Description: Resource types, the resource forest, and graph validation.
// Purpose: Provide deterministic, cycle-checked access to permissionable
//          resources.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Resources form a forest through optional parent references. The forest is
//! represented as an arena keyed by resource id with parents stored as ids,
//! never as live back-references, and is cycle-checked once at load time.
//! Iteration order is load-bearing: resource types are ordered by
//! `list_order`, resources within a type by name with ties broken by stable
//! insertion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ResourceId;
use crate::core::log::GenerationLog;

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Map project resource type.
pub const MAP_TYPE: &str = "map";
/// Map layer or group layer resource type.
pub const LAYER_TYPE: &str = "layer";
/// Layer attribute resource type.
pub const ATTRIBUTE_TYPE: &str = "attribute";
/// Print layout resource type.
pub const PRINT_TEMPLATE_TYPE: &str = "print_template";
/// Viewer task resource type.
pub const VIEWER_TASK_TYPE: &str = "viewer_task";
/// Editable dataset resource type.
pub const DATA_RESOURCE_TYPE: &str = "data_resource";
/// Feature info service resource type.
pub const FEATURE_INFO_SERVICE_TYPE: &str = "feature_info_service";
/// Feature info layer resource type.
pub const FEATURE_INFO_LAYER_TYPE: &str = "feature_info_layer";
/// Search facet resource type.
pub const SOLR_FACET_TYPE: &str = "solr_facet";

/// Built-in resource type names in their canonical processing order.
pub const BUILTIN_RESOURCE_TYPES: &[(&str, &str)] = &[
    (MAP_TYPE, "Map project"),
    (LAYER_TYPE, "Map layer or group layer"),
    (ATTRIBUTE_TYPE, "Layer attribute"),
    (PRINT_TEMPLATE_TYPE, "Print layout"),
    (VIEWER_TASK_TYPE, "Viewer task"),
    (DATA_RESOURCE_TYPE, "Editable dataset"),
    (FEATURE_INFO_SERVICE_TYPE, "Feature info service"),
    (FEATURE_INFO_LAYER_TYPE, "Feature info layer"),
    (SOLR_FACET_TYPE, "Search facet"),
];

/// Spacing between consecutive `list_order` values.
const LIST_ORDER_STEP: i32 = 10;

/// A registered resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Unique type name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Processing and output order across types; lower first.
    pub list_order: i32,
}

/// Registry of built-in and tenant-declared resource types.
///
/// # Invariants
/// - Types are held sorted by `list_order` with stable registration order for
///   equal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeRegistry {
    /// Registered types sorted by `list_order`.
    types: Vec<ResourceType>,
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResourceTypeRegistry {
    /// Creates a registry holding only the built-in resource types.
    #[must_use]
    pub fn builtin() -> Self {
        let types = BUILTIN_RESOURCE_TYPES
            .iter()
            .enumerate()
            .map(|(index, (name, description))| ResourceType {
                name: (*name).to_string(),
                description: (*description).to_string(),
                list_order: i32::try_from(index + 1).unwrap_or(i32::MAX) * LIST_ORDER_STEP,
            })
            .collect();
        Self {
            types,
        }
    }

    /// Creates a registry with tenant custom types appended after built-ins.
    #[must_use]
    pub fn with_custom(custom: &[String]) -> Self {
        let mut registry = Self::builtin();
        let mut next_order =
            registry.types.last().map_or(LIST_ORDER_STEP, |last| last.list_order);
        for name in custom {
            if registry.contains(name) {
                continue;
            }
            next_order += LIST_ORDER_STEP;
            registry.types.push(ResourceType {
                name: name.clone(),
                description: "Custom resource type".to_string(),
                list_order: next_order,
            });
        }
        registry
    }

    /// Returns the registered type with the given name, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.types.iter().find(|ty| ty.name == name)
    }

    /// Returns true when a type with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates registered types in `list_order`.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter()
    }
}

// ============================================================================
// SECTION: Resources
// ============================================================================

/// A permissionable resource row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier.
    pub id: ResourceId,
    /// Resource type name.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Optional parent resource id; forms a forest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceId>,
    /// Whether the resource is writable; only meaningful for datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
}

/// Errors raised while building or validating the resource forest.
#[derive(Debug, Error)]
pub enum ResourceGraphError {
    /// A parent chain loops back onto itself.
    #[error("malformed resource graph: cycle detected at resource {id} ('{name}')")]
    CycleDetected {
        /// Resource id on the cycle.
        id: ResourceId,
        /// Resource name on the cycle.
        name: String,
    },
    /// A resource references a parent id that does not exist.
    #[error("malformed resource graph: resource {id} ('{name}') references unknown parent {parent}")]
    DanglingParent {
        /// Resource id with the dangling reference.
        id: ResourceId,
        /// Resource name with the dangling reference.
        name: String,
        /// The missing parent id.
        parent: ResourceId,
    },
    /// Two rows share the same resource id.
    #[error("malformed resource graph: duplicate resource id {id}")]
    DuplicateId {
        /// The duplicated id.
        id: ResourceId,
    },
    /// A row references a type that is neither built-in nor tenant-declared.
    #[error("unknown resource type '{type_name}' for resource '{name}'")]
    UnknownType {
        /// The unregistered type name.
        type_name: String,
        /// The offending resource name.
        name: String,
    },
}

/// Arena of resources indexed by id with deterministic per-type ordering.
#[derive(Debug, Clone, Default)]
pub struct ResourceForest {
    /// Arena keyed by resource id.
    resources: BTreeMap<ResourceId, Resource>,
    /// Per-type resource ids ordered by (name, insertion order).
    by_type: BTreeMap<String, Vec<ResourceId>>,
}

impl ResourceForest {
    /// Builds and validates a forest from store rows.
    ///
    /// Rows of unregistered type are fatal unless `ignore_errors` is set, in
    /// which case they are skipped and logged. Cycles and dangling parents
    /// are always fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceGraphError`] when the rows do not form a valid
    /// forest over registered types.
    pub fn build(
        registry: &ResourceTypeRegistry,
        rows: Vec<Resource>,
        ignore_errors: bool,
        log: &GenerationLog,
    ) -> Result<Self, ResourceGraphError> {
        let mut resources: BTreeMap<ResourceId, Resource> = BTreeMap::new();
        let mut insertion: BTreeMap<String, Vec<ResourceId>> = BTreeMap::new();

        for row in rows {
            if !registry.contains(&row.resource_type) {
                if ignore_errors {
                    log.warning(format!(
                        "Skipping resource '{}' with unknown resource type '{}'",
                        row.name, row.resource_type
                    ));
                    continue;
                }
                return Err(ResourceGraphError::UnknownType {
                    type_name: row.resource_type,
                    name: row.name,
                });
            }
            if resources.contains_key(&row.id) {
                return Err(ResourceGraphError::DuplicateId {
                    id: row.id,
                });
            }
            insertion.entry(row.resource_type.clone()).or_default().push(row.id);
            resources.insert(row.id, row);
        }

        // Dangling parents are detected before the cycle walk so the walk can
        // assume every parent id resolves.
        for resource in resources.values() {
            if let Some(parent) = resource.parent
                && !resources.contains_key(&parent)
            {
                return Err(ResourceGraphError::DanglingParent {
                    id: resource.id,
                    name: resource.name.clone(),
                    parent,
                });
            }
        }

        Self::check_cycles(&resources)?;

        let mut by_type = BTreeMap::new();
        for (type_name, mut ids) in insertion {
            ids.sort_by(|a, b| {
                let left = resources.get(a).map(|r| r.name.as_str()).unwrap_or_default();
                let right = resources.get(b).map(|r| r.name.as_str()).unwrap_or_default();
                left.cmp(right)
            });
            by_type.insert(type_name, ids);
        }

        Ok(Self {
            resources,
            by_type,
        })
    }

    /// Walks every parent chain with a visited set, rejecting cycles.
    fn check_cycles(resources: &BTreeMap<ResourceId, Resource>) -> Result<(), ResourceGraphError> {
        let mut settled: BTreeSet<ResourceId> = BTreeSet::new();
        for start in resources.keys() {
            if settled.contains(start) {
                continue;
            }
            let mut path: BTreeSet<ResourceId> = BTreeSet::new();
            let mut current = *start;
            loop {
                if settled.contains(&current) {
                    break;
                }
                if !path.insert(current) {
                    let name = resources
                        .get(&current)
                        .map(|resource| resource.name.clone())
                        .unwrap_or_default();
                    return Err(ResourceGraphError::CycleDetected {
                        id: current,
                        name,
                    });
                }
                match resources.get(&current).and_then(|resource| resource.parent) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            settled.extend(path);
        }
        Ok(())
    }

    /// Returns the resource with the given id, if present.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Returns the parent of a resource, if any.
    #[must_use]
    pub fn parent_of(&self, id: ResourceId) -> Option<&Resource> {
        self.get(id).and_then(|resource| resource.parent).and_then(|parent| self.get(parent))
    }

    /// Iterates resources of a type in deterministic (name, insertion) order.
    pub fn resources_of_type(&self, type_name: &str) -> impl Iterator<Item = &Resource> {
        self.by_type
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.resources.get(id))
    }

    /// Finds the first resource of a type with the given name.
    #[must_use]
    pub fn find_by_type_and_name(&self, type_name: &str, name: &str) -> Option<&Resource> {
        self.resources_of_type(type_name).find(|resource| resource.name == name)
    }

    /// Finds the first resource of a type with the given name and parent.
    #[must_use]
    pub fn find_child(
        &self,
        parent: ResourceId,
        type_name: &str,
        name: &str,
    ) -> Option<&Resource> {
        self.resources_of_type(type_name)
            .find(|resource| resource.name == name && resource.parent == Some(parent))
    }

    /// Returns the number of resources in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when the forest holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
