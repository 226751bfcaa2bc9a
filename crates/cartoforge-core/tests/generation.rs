// crates/cartoforge-core/tests/generation.rs
// ============================================================================
// Module: Generation Run Tests
// Description: End-to-end tests for staging, publish, overrides, and
//              cancellation.
// ============================================================================
//! ## Overview
//! Runs whole generations against in-memory collaborators and a temporary
//! output directory: document layout, override precedence, strict and
//! tolerant schema failure handling, and cancellation safety.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use std::fs;
use std::path::Path;

use cartoforge_core::CancelFlag;
use cartoforge_core::GenerationError;
use cartoforge_core::GenerationLog;
use cartoforge_core::GenerationOptions;
use cartoforge_core::GenerationPaths;
use cartoforge_core::GenerationPolicy;
use cartoforge_core::GenerationRun;
use cartoforge_core::InMemoryProjectMetadata;
use cartoforge_core::InMemoryResourceStore;
use cartoforge_core::LayerMetadata;
use cartoforge_core::PermissionGrant;
use cartoforge_core::PrintLayout;
use cartoforge_core::Resource;
use cartoforge_core::ResourceId;
use cartoforge_core::RoleName;
use cartoforge_core::SchemaAccessError;
use cartoforge_core::SchemaValidator;
use cartoforge_core::SchemaViolation;
use cartoforge_core::ServiceOverride;
use cartoforge_core::ServiceSpec;
use cartoforge_core::TenantConfig;
use cartoforge_core::ThemeMetadata;
use serde_json::Value;
use serde_json::json;

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

/// Builds a declared service without overrides.
fn service(name: &str, config: Value) -> ServiceSpec {
    ServiceSpec {
        name: name.to_string(),
        generator_config: None,
        config,
        schema_url: None,
        resources: None,
    }
}

/// One theme with a group layer, a leaf layer, and a print layout.
fn demo_theme() -> ThemeMetadata {
    ThemeMetadata {
        name: "mapA".to_string(),
        title: Some("Map A".to_string()),
        root_layer: LayerMetadata {
            name: "root".to_string(),
            title: None,
            attributes: Vec::new(),
            sublayers: vec![LayerMetadata {
                name: "layerA".to_string(),
                title: Some("Layer A".to_string()),
                attributes: vec!["fieldA".to_string()],
                sublayers: Vec::new(),
                queryable: true,
            }],
            queryable: false,
        },
        print_layouts: vec![PrintLayout {
            name: "A4".to_string(),
            legend_layout: None,
        }],
    }
}

/// The standard store fixture: a map/layer/attribute chain plus a dataset
/// and a facet.
fn demo_store() -> InMemoryResourceStore {
    InMemoryResourceStore::new()
        .with_resources(vec![
            resource(1, "map", "mapA", None),
            resource(2, "layer", "layerA", Some(1)),
            resource(3, "attribute", "fieldA", Some(2)),
            resource(4, "data_resource", "datasetA", None),
            resource(5, "solr_facet", "facetA", None),
        ])
        .with_grants(vec![grant("viewer", 1), grant("viewer", 2)])
}

/// The standard tenant configuration with four services.
fn demo_config(tenant: &str) -> TenantConfig {
    TenantConfig {
        tenant: tenant.into(),
        policy: GenerationPolicy::default(),
        services: vec![
            service("ogc", json!({"default_qgis_server_url": "http://localhost:8001/ows/"})),
            service("data", json!({})),
            service("search", json!({})),
            service("adminGui", json!({"title": "Admin"})),
        ],
        permissions_schema_url: None,
    }
}

/// Executes one run and returns the result.
fn run(
    store: &InMemoryResourceStore,
    metadata: &InMemoryProjectMetadata,
    validator: Option<&dyn SchemaValidator>,
    paths: &GenerationPaths,
    config: &TenantConfig,
    options: &GenerationOptions,
    cancel: &CancelFlag,
) -> (Result<Vec<std::path::PathBuf>, GenerationError>, GenerationLog) {
    let log = GenerationLog::new();
    let generation = GenerationRun::new(store, metadata, validator, paths, &log, cancel);
    let result =
        generation.execute(config, options).map(|outcome| outcome.published);
    (result, log)
}

/// Reads a published JSON document.
fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

// ============================================================================
// SECTION: Full Runs
// ============================================================================

#[test]
fn test_successful_run_publishes_all_documents() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let config = demo_config("demo");
    let (result, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    let published = result.unwrap();
    assert_eq!(published.len(), 5);

    let tenant_dir = out.path().join("demo");
    for file_name in [
        "ogcConfig.json",
        "dataConfig.json",
        "searchConfig.json",
        "adminGuiConfig.json",
        "permissions.json",
    ] {
        assert!(tenant_dir.join(file_name).is_file(), "missing {file_name}");
    }

    let ogc = read_json(&tenant_dir.join("ogcConfig.json"));
    assert_eq!(ogc["service"], "ogc");
    assert_eq!(ogc["config"]["default_qgis_server_url"], "http://localhost:8001/ows/");
    assert_eq!(ogc["resources"]["wms_services"][0]["name"], "mapA");

    let admin = read_json(&tenant_dir.join("adminGuiConfig.json"));
    assert_eq!(admin["service"], "admin-gui");
    assert!(admin.get("resources").is_none());

    let permissions = read_json(&tenant_dir.join("permissions.json"));
    let roles = permissions["roles"].as_array().unwrap();
    assert_eq!(roles[0]["role"], "public");
    assert_eq!(roles[1]["role"], "viewer");
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let config = demo_config("demo");

    let (first, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    first.unwrap();
    let permissions_path = out.path().join("demo").join("permissions.json");
    let first_bytes = fs::read(&permissions_path).unwrap();

    let (second, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    second.unwrap();
    let second_bytes = fs::read(&permissions_path).unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_force_readonly_datasets_option() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let config = demo_config("demo");
    let options = GenerationOptions {
        force_readonly_datasets: Some(true),
        ..GenerationOptions::default()
    };
    let (result, _log) =
        run(&store, &metadata, None, &paths, &config, &options, &CancelFlag::new());
    result.unwrap();
    let data = read_json(&out.path().join("demo").join("dataConfig.json"));
    assert_eq!(data["resources"]["datasets"][0]["writable"], false);
}

// ============================================================================
// SECTION: Override Precedence
// ============================================================================

#[test]
fn test_declared_override_replaces_store_rows() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    // The store carries facetA granted to nobody; the tenant declares its
    // own facet rows for the search service.
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let mut config = demo_config("demo");
    config.policy.default_allow = false;
    config.services[2].resources = Some(ServiceOverride {
        resources: vec![resource(100, "solr_facet", "declaredFacet", None)],
        permissions: vec![grant("viewer", 100)],
    });

    let (result, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    result.unwrap();

    let permissions = read_json(&out.path().join("demo").join("permissions.json"));
    let roles = permissions["roles"].as_array().unwrap();
    let viewer = roles.iter().find(|role| role["role"] == "viewer").unwrap();
    let facet_group = viewer["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .find(|group| group["resource_type"] == "solr_facet")
        .unwrap();
    let names: Vec<&str> = facet_group["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    // Only the declared facet appears, never the store-derived facetA.
    assert_eq!(names, vec!["declaredFacet"]);

    let search = read_json(&out.path().join("demo").join("searchConfig.json"));
    assert_eq!(search["resources"]["solr_facet"][0], "declaredFacet");
}

#[test]
fn test_override_beats_inheritance() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    // Inheritance would allow the info service through the granted map, but
    // the tenant-declared override is resolved against its own rows only.
    let store = InMemoryResourceStore::new()
        .with_resources(vec![resource(1, "map", "mapA", None)])
        .with_grants(vec![grant("viewer", 1)]);
    let metadata = InMemoryProjectMetadata::new();
    let mut config = TenantConfig::new("demo");
    config.policy.default_allow = false;
    config.policy.inherit_info_permissions = true;
    config.services = vec![ServiceSpec {
        name: "featureInfo".to_string(),
        generator_config: None,
        config: json!({}),
        schema_url: None,
        resources: Some(ServiceOverride {
            resources: vec![resource(10, "feature_info_service", "mapA", None)],
            permissions: Vec::new(),
        }),
    }];

    let (result, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    result.unwrap();

    let permissions = read_json(&out.path().join("demo").join("permissions.json"));
    let roles = permissions["roles"].as_array().unwrap();
    let viewer = roles.iter().find(|role| role["role"] == "viewer").unwrap();
    let has_info_group = viewer["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .any(|group| group["resource_type"] == "feature_info_service");
    assert!(!has_info_group);
}

#[test]
fn test_duplicate_override_service_is_ambiguous() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let mut config = demo_config("demo");
    let mut duplicate = config.services[2].clone();
    duplicate.resources = Some(ServiceOverride::default());
    config.services.push(duplicate);

    let (result, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    assert!(matches!(result.unwrap_err(), GenerationError::AmbiguousOverride { .. }));
    assert!(!out.path().join("demo").exists());
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

/// Validator fixture rejecting every document with one violation.
#[derive(Debug)]
struct RejectingValidator;

impl SchemaValidator for RejectingValidator {
    fn validate(
        &self,
        _document: &Value,
        _reference: &str,
    ) -> Result<Vec<SchemaViolation>, SchemaAccessError> {
        Ok(vec![SchemaViolation {
            json_path: "/config".to_string(),
            constraint: "config section rejected by fixture".to_string(),
        }])
    }
}

#[test]
fn test_schema_violation_aborts_strict_run() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let mut config = demo_config("demo");
    config.services[0].schema_url = Some("https://example.org/schemas/ogc.json".to_string());

    let validator = RejectingValidator;
    let (result, log) = run(
        &store,
        &metadata,
        Some(&validator),
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    assert!(matches!(
        result.unwrap_err(),
        GenerationError::Assemble(cartoforge_core::AssembleError::SchemaViolations { .. })
    ));
    // Nothing was published and the violation is on record.
    assert!(!out.path().join("demo").exists());
    let entries = log.snapshot();
    assert!(entries.iter().any(|entry| entry.message.contains("/config")));
}

#[test]
fn test_schema_violation_is_skipped_in_tolerant_run() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let mut config = demo_config("demo");
    config.services[0].schema_url = Some("https://example.org/schemas/ogc.json".to_string());
    config.policy.ignore_errors = true;

    let validator = RejectingValidator;
    let (result, _log) = run(
        &store,
        &metadata,
        Some(&validator),
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    result.unwrap();
    let tenant_dir = out.path().join("demo");
    // The failing service document is omitted, everything else published.
    assert!(!tenant_dir.join("ogcConfig.json").exists());
    assert!(tenant_dir.join("dataConfig.json").is_file());
    assert!(tenant_dir.join("permissions.json").is_file());
}

// ============================================================================
// SECTION: Cancellation Safety
// ============================================================================

#[test]
fn test_cancelled_run_leaves_published_output_untouched() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let config = demo_config("demo");

    let (first, _log) = run(
        &store,
        &metadata,
        None,
        &paths,
        &config,
        &GenerationOptions::default(),
        &CancelFlag::new(),
    );
    first.unwrap();
    let permissions_path = out.path().join("demo").join("permissions.json");
    let before = fs::read(&permissions_path).unwrap();

    let cancel = CancelFlag::new();
    cancel.request();
    let (second, _log) =
        run(&store, &metadata, None, &paths, &config, &GenerationOptions::default(), &cancel);
    assert!(matches!(second.unwrap_err(), GenerationError::Cancelled));

    let after = fs::read(&permissions_path).unwrap();
    assert_eq!(before, after);
    assert!(!out.path().join(".staging").join("demo").exists());
}

#[test]
fn test_permissions_only_target_skips_service_configs() {
    let out = tempfile::tempdir().unwrap();
    let paths = GenerationPaths::new(out.path());
    let store = demo_store();
    let metadata = InMemoryProjectMetadata::new().with_themes(vec![demo_theme()]);
    let config = demo_config("demo");
    let options = GenerationOptions {
        target: cartoforge_core::GenerationTarget::Permissions,
        ..GenerationOptions::default()
    };
    let (result, _log) =
        run(&store, &metadata, None, &paths, &config, &options, &CancelFlag::new());
    result.unwrap();
    let tenant_dir = out.path().join("demo");
    assert!(tenant_dir.join("permissions.json").is_file());
    assert!(!tenant_dir.join("ogcConfig.json").exists());
}
