// crates/cartoforge-core/tests/assembler.rs
// ============================================================================
// Module: Config Assembler Tests
// Description: Tests for per-service document construction and splicing.
// ============================================================================
//! ## Overview
//! Validates service classification, file and identifier naming, the
//! metadata-derived resource splices, and verbatim config passthrough.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

use cartoforge_core::ConfigAssembler;
use cartoforge_core::GenerationLog;
use cartoforge_core::GenerationPolicy;
use cartoforge_core::LayerMetadata;
use cartoforge_core::PrintLayout;
use cartoforge_core::Resource;
use cartoforge_core::ResourceForest;
use cartoforge_core::ResourceId;
use cartoforge_core::ResourceTypeRegistry;
use cartoforge_core::ServiceKind;
use cartoforge_core::ServiceSpec;
use cartoforge_core::ThemeMetadata;
use cartoforge_core::kebab_service_name;
use cartoforge_core::service_file_name;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Builds a declared service.
fn service(name: &str, config: serde_json::Value) -> ServiceSpec {
    ServiceSpec {
        name: name.to_string(),
        generator_config: None,
        config,
        schema_url: None,
        resources: None,
    }
}

/// Builds a forest with a dataset row.
fn dataset_forest() -> ResourceForest {
    let registry = ResourceTypeRegistry::builtin();
    let log = GenerationLog::new();
    let rows = vec![Resource {
        id: ResourceId::new(1),
        resource_type: "data_resource".to_string(),
        name: "datasetA".to_string(),
        parent: None,
        writable: Some(false),
    }];
    ResourceForest::build(&registry, rows, false, &log).unwrap()
}

/// One theme with nested layers and a print layout.
fn theme() -> ThemeMetadata {
    ThemeMetadata {
        name: "mapA".to_string(),
        title: None,
        root_layer: LayerMetadata {
            name: "root".to_string(),
            title: None,
            attributes: Vec::new(),
            sublayers: vec![
                LayerMetadata {
                    name: "layerA".to_string(),
                    title: None,
                    attributes: vec!["fieldA".to_string(), "fieldB".to_string()],
                    sublayers: Vec::new(),
                    queryable: true,
                },
                LayerMetadata {
                    name: "layerB".to_string(),
                    title: None,
                    attributes: Vec::new(),
                    sublayers: Vec::new(),
                    queryable: false,
                },
            ],
            queryable: false,
        },
        print_layouts: vec![PrintLayout {
            name: "A4".to_string(),
            legend_layout: Some("A4 legend".to_string()),
        }],
    }
}

// ============================================================================
// SECTION: Naming
// ============================================================================

#[test]
fn test_service_file_names_follow_convention() {
    assert_eq!(service_file_name("ogc"), "ogcConfig.json");
    assert_eq!(service_file_name("mapViewer"), "mapViewerConfig.json");
}

#[test]
fn test_kebab_service_names() {
    assert_eq!(kebab_service_name("ogc"), "ogc");
    assert_eq!(kebab_service_name("mapViewer"), "map-viewer");
    assert_eq!(kebab_service_name("adminGui"), "admin-gui");
}

#[test]
fn test_service_classification() {
    assert_eq!(ServiceKind::from_name("ogc"), ServiceKind::Ogc);
    assert_eq!(ServiceKind::from_name("featureInfo"), ServiceKind::FeatureInfo);
    assert_eq!(ServiceKind::from_name("permalink"), ServiceKind::ConfigOnly);
}

// ============================================================================
// SECTION: Document Assembly
// ============================================================================

#[test]
fn test_config_section_is_copied_verbatim() {
    let policy = GenerationPolicy::default();
    let themes = Vec::new();
    let log = GenerationLog::new();
    let assembler = ConfigAssembler::new(&policy, &themes, None, &log);
    let declared = json!({ "title": "Admin", "nested": { "keep": [1, 2, 3] } });
    let document = assembler
        .assemble_service(&service("adminGui", declared.clone()), &dataset_forest())
        .unwrap();
    assert_eq!(document.config, declared);
    assert_eq!(document.service, "admin-gui");
    assert!(document.resources.is_none());
}

#[test]
fn test_ogc_splice_renders_layer_tree_with_attributes() {
    let policy = GenerationPolicy::default();
    let themes = vec![theme()];
    let log = GenerationLog::new();
    let assembler = ConfigAssembler::new(&policy, &themes, None, &log);
    let document =
        assembler.assemble_service(&service("ogc", json!({})), &dataset_forest()).unwrap();
    let resources = document.resources.unwrap();
    let root = &resources["wms_services"][0]["root_layer"];
    assert_eq!(root["name"], "root");
    assert_eq!(root["layers"][0]["name"], "layerA");
    assert_eq!(root["layers"][0]["attributes"][1], "fieldB");
    assert_eq!(resources["wms_services"][0]["print_templates"][0], "A4");
}

#[test]
fn test_feature_info_splice_lists_queryable_layers_only() {
    let policy = GenerationPolicy::default();
    let themes = vec![theme()];
    let log = GenerationLog::new();
    let assembler = ConfigAssembler::new(&policy, &themes, None, &log);
    let document = assembler
        .assemble_service(&service("featureInfo", json!({})), &dataset_forest())
        .unwrap();
    let resources = document.resources.unwrap();
    let layers = resources["wms_services"][0]["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0], "layerA");
}

#[test]
fn test_print_splice_carries_legend_layouts() {
    let policy = GenerationPolicy::default();
    let themes = vec![theme()];
    let log = GenerationLog::new();
    let assembler = ConfigAssembler::new(&policy, &themes, None, &log);
    let document =
        assembler.assemble_service(&service("print", json!({})), &dataset_forest()).unwrap();
    let resources = document.resources.unwrap();
    assert_eq!(resources["print_templates"][0]["name"], "A4");
    assert_eq!(resources["print_templates"][0]["legend_layout"], "A4 legend");
}

#[test]
fn test_data_splice_respects_row_writability() {
    let policy = GenerationPolicy::default();
    let themes = Vec::new();
    let log = GenerationLog::new();
    let assembler = ConfigAssembler::new(&policy, &themes, None, &log);
    let document =
        assembler.assemble_service(&service("data", json!({})), &dataset_forest()).unwrap();
    let resources = document.resources.unwrap();
    assert_eq!(resources["datasets"][0]["name"], "datasetA");
    assert_eq!(resources["datasets"][0]["writable"], false);
}
