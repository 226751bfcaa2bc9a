// crates/cartoforge-core/tests/resolver.rs
// ============================================================================
// Module: Permission Resolver Tests
// Description: Tests for hierarchical role-based permission resolution.
// ============================================================================
//! ## Overview
//! Pins the resolution algorithm: explicit grants, attribute permissiveness,
//! default-allow policy, cascading restriction, info-permission inheritance,
//! and byte-identical output for identical input.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::collections::BTreeSet;

use cartoforge_core::CancelFlag;
use cartoforge_core::GenerationLog;
use cartoforge_core::GenerationPolicy;
use cartoforge_core::PermissionGrant;
use cartoforge_core::PermissionResolver;
use cartoforge_core::ResolvedPermissionSet;
use cartoforge_core::Resource;
use cartoforge_core::ResourceForest;
use cartoforge_core::ResourceId;
use cartoforge_core::ResourceTypeRegistry;
use cartoforge_core::RoleName;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a resource row.
fn resource(id: i64, resource_type: &str, name: &str, parent: Option<i64>) -> Resource {
    Resource {
        id: ResourceId::new(id),
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        parent: parent.map(ResourceId::new),
        writable: None,
    }
}

/// Builds a grant record.
fn grant(role: &str, id: i64) -> PermissionGrant {
    PermissionGrant {
        role: RoleName::new(role),
        resource_id: ResourceId::new(id),
    }
}

/// Resolves one role over the given rows, grants, and policy.
fn resolve(
    rows: Vec<Resource>,
    grants: &[PermissionGrant],
    policy: &GenerationPolicy,
    role: &str,
) -> ResolvedPermissionSet {
    let registry = ResourceTypeRegistry::builtin();
    let log = GenerationLog::new();
    let forest = ResourceForest::build(&registry, rows, false, &log).unwrap();
    let resolver = PermissionResolver::new(&registry, &forest, policy, grants, &log).unwrap();
    resolver.resolve_role(&RoleName::new(role), &BTreeSet::new(), &CancelFlag::new()).unwrap()
}

/// Returns the resource names of a type group within a resolved set.
fn names_of(set: &ResolvedPermissionSet, resource_type: &str) -> Vec<String> {
    set.permissions
        .iter()
        .find(|group| group.resource_type == resource_type)
        .map(|group| group.resources.iter().map(|res| res.name.clone()).collect())
        .unwrap_or_default()
}

/// The standard map -> layer -> attribute chain used across tests.
fn chain_rows() -> Vec<Resource> {
    vec![
        resource(1, "map", "mapA", None),
        resource(2, "layer", "layerA", Some(1)),
        resource(3, "attribute", "fieldA", Some(2)),
    ]
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn test_resolution_is_byte_identical_across_runs() {
    let policy = GenerationPolicy {
        default_allow: false,
        ..GenerationPolicy::default()
    };
    let grants = vec![grant("viewer", 1), grant("viewer", 2)];
    let first = resolve(chain_rows(), &grants, &policy, "viewer");
    let second = resolve(chain_rows(), &grants, &policy, "viewer");
    let first_bytes = serde_json::to_vec(&first).unwrap();
    let second_bytes = serde_json::to_vec(&second).unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_type_groups_follow_registry_order() {
    let policy = GenerationPolicy::default();
    let rows = vec![
        resource(1, "solr_facet", "facetA", None),
        resource(2, "map", "mapA", None),
        resource(3, "data_resource", "datasetA", None),
    ];
    let set = resolve(rows, &[], &policy, "public");
    let types: Vec<&str> =
        set.permissions.iter().map(|group| group.resource_type.as_str()).collect();
    assert_eq!(types, vec!["map", "data_resource", "solr_facet"]);
}

// ============================================================================
// SECTION: Cascading Restriction
// ============================================================================

#[test]
fn test_parent_denial_overrides_child_grant() {
    let policy = GenerationPolicy {
        default_allow: false,
        ..GenerationPolicy::default()
    };
    // mapA is granted, layerA is not, fieldA is granted explicitly. The
    // denied layer must pull its attribute down with it.
    let grants = vec![grant("viewer", 1), grant("viewer", 3)];
    let set = resolve(chain_rows(), &grants, &policy, "viewer");
    assert_eq!(names_of(&set, "map"), vec!["mapA"]);
    assert!(names_of(&set, "layer").is_empty());
    assert!(names_of(&set, "attribute").is_empty());
}

#[test]
fn test_flipped_policy_example_denies_subtree() {
    let policy = GenerationPolicy {
        default_allow: false,
        ..GenerationPolicy::default()
    };
    let set = resolve(chain_rows(), &[], &policy, "public");
    assert!(names_of(&set, "map").is_empty());
    assert!(names_of(&set, "layer").is_empty());
    assert!(names_of(&set, "attribute").is_empty());
}

#[test]
fn test_default_allow_permits_whole_chain() {
    let policy = GenerationPolicy::default();
    let set = resolve(chain_rows(), &[], &policy, "public");
    assert_eq!(names_of(&set, "map"), vec!["mapA"]);
    assert_eq!(names_of(&set, "layer"), vec!["layerA"]);
    assert_eq!(names_of(&set, "attribute"), vec!["fieldA"]);
}

// ============================================================================
// SECTION: Attribute Permissiveness
// ============================================================================

#[test]
fn test_attributes_default_to_allowed_under_deny_policy() {
    let policy = GenerationPolicy {
        default_allow: false,
        ..GenerationPolicy::default()
    };
    // Parents granted, attribute carries no grant row of its own.
    let grants = vec![grant("viewer", 1), grant("viewer", 2)];
    let set = resolve(chain_rows(), &grants, &policy, "viewer");
    assert_eq!(names_of(&set, "attribute"), vec!["fieldA"]);
}

#[test]
fn test_attribute_entry_carries_parent_name() {
    let policy = GenerationPolicy::default();
    let set = resolve(chain_rows(), &[], &policy, "public");
    let attribute_group = set
        .permissions
        .iter()
        .find(|group| group.resource_type == "attribute")
        .unwrap();
    assert_eq!(attribute_group.resources[0].parent.as_deref(), Some("layerA"));
}

// ============================================================================
// SECTION: Info Permission Inheritance
// ============================================================================

/// Rows pairing a map/layer chain with info-service resources of the same
/// names.
fn info_rows() -> Vec<Resource> {
    vec![
        resource(1, "map", "mapA", None),
        resource(2, "layer", "layerA", Some(1)),
        resource(3, "attribute", "fieldA", Some(2)),
        resource(4, "feature_info_service", "mapA", None),
        resource(5, "feature_info_layer", "layerA", Some(4)),
        resource(6, "attribute", "fieldA", Some(5)),
    ]
}

#[test]
fn test_info_resources_inherit_map_and_layer_permissions() {
    let policy = GenerationPolicy {
        default_allow: false,
        inherit_info_permissions: true,
        ..GenerationPolicy::default()
    };
    let grants = vec![grant("viewer", 1), grant("viewer", 2)];
    let set = resolve(info_rows(), &grants, &policy, "viewer");
    assert_eq!(names_of(&set, "feature_info_service"), vec!["mapA"]);
    assert_eq!(names_of(&set, "feature_info_layer"), vec!["layerA"]);
    // Both the layer attribute and the inherited info attribute are allowed.
    assert_eq!(names_of(&set, "attribute"), vec!["fieldA", "fieldA"]);
}

#[test]
fn test_info_resources_stay_denied_without_inheritance() {
    let policy = GenerationPolicy {
        default_allow: false,
        inherit_info_permissions: false,
        ..GenerationPolicy::default()
    };
    let grants = vec![grant("viewer", 1), grant("viewer", 2)];
    let set = resolve(info_rows(), &grants, &policy, "viewer");
    assert!(names_of(&set, "feature_info_service").is_empty());
    assert!(names_of(&set, "feature_info_layer").is_empty());
}

#[test]
fn test_explicit_grant_wins_over_inheritance() {
    let policy = GenerationPolicy {
        default_allow: false,
        inherit_info_permissions: true,
        ..GenerationPolicy::default()
    };
    // The info service is granted even though its map counterpart is denied.
    let grants = vec![grant("viewer", 4)];
    let set = resolve(info_rows(), &grants, &policy, "viewer");
    assert_eq!(names_of(&set, "feature_info_service"), vec!["mapA"]);
    assert!(names_of(&set, "map").is_empty());
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

#[test]
fn test_resolution_observes_cancel_flag() {
    let registry = ResourceTypeRegistry::builtin();
    let log = GenerationLog::new();
    let policy = GenerationPolicy::default();
    let forest = ResourceForest::build(&registry, chain_rows(), false, &log).unwrap();
    let resolver = PermissionResolver::new(&registry, &forest, &policy, &[], &log).unwrap();
    let cancel = CancelFlag::new();
    cancel.request();
    let result = resolver.resolve_role(&RoleName::public(), &BTreeSet::new(), &cancel);
    assert!(result.is_err());
}
