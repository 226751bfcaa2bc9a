// crates/cartoforge-core/src/runtime/assembler.rs
// ============================================================================
// Module: Cartoforge Config Assembler
// Description: Per-service output document construction and validation.
// Purpose: Merge tenant-declared config with resource data and project
//          metadata into one document per service.
// Dependencies: crate::core, crate::interfaces, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each declared service produces one output document: the tenant's opaque
//! `config` copied verbatim, plus a spliced `resources` section derived from
//! project metadata or from the service's resource rows. Splicing is a pure
//! merge; the resolver's output is never mutated. When schema validation is
//! enabled and a schema is registered for the service, the assembled document
//! is checked and violations are reported with their JSON path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::log::GenerationLog;
use crate::core::policy::GenerationPolicy;
use crate::core::resource::ATTRIBUTE_TYPE;
use crate::core::resource::DATA_RESOURCE_TYPE;
use crate::core::resource::FEATURE_INFO_LAYER_TYPE;
use crate::core::resource::FEATURE_INFO_SERVICE_TYPE;
use crate::core::resource::LAYER_TYPE;
use crate::core::resource::MAP_TYPE;
use crate::core::resource::PRINT_TEMPLATE_TYPE;
use crate::core::resource::ResourceForest;
use crate::core::resource::SOLR_FACET_TYPE;
use crate::core::resource::VIEWER_TASK_TYPE;
use crate::core::tenant::ServiceOverride;
use crate::core::tenant::ServiceSpec;
use crate::interfaces::LayerMetadata;
use crate::interfaces::SchemaAccessError;
use crate::interfaces::SchemaValidator;
use crate::interfaces::ThemeMetadata;

// ============================================================================
// SECTION: Service Kinds
// ============================================================================

/// Service classification deciding which resource data gets spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    /// OGC service: theme and layer trees with attributes.
    Ogc,
    /// Map viewer: theme items.
    MapViewer,
    /// Feature info service: queryable layers per theme.
    FeatureInfo,
    /// Print service: print layouts.
    Print,
    /// Data service: editable datasets.
    Data,
    /// Search service: facets.
    Search,
    /// Config-only service: no resource splice.
    ConfigOnly,
}

impl ServiceKind {
    /// Classifies a declared service by name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "ogc" => Self::Ogc,
            "mapViewer" => Self::MapViewer,
            "featureInfo" => Self::FeatureInfo,
            "print" => Self::Print,
            "data" => Self::Data,
            "search" => Self::Search,
            _ => Self::ConfigOnly,
        }
    }

    /// Returns the resource types this service's documents and overrides
    /// cover.
    #[must_use]
    pub const fn relevant_types(self) -> &'static [&'static str] {
        match self {
            Self::Ogc => &[MAP_TYPE, LAYER_TYPE, ATTRIBUTE_TYPE, PRINT_TEMPLATE_TYPE],
            Self::MapViewer => &[MAP_TYPE, VIEWER_TASK_TYPE],
            Self::FeatureInfo => &[FEATURE_INFO_SERVICE_TYPE, FEATURE_INFO_LAYER_TYPE],
            Self::Print => &[PRINT_TEMPLATE_TYPE],
            Self::Data => &[DATA_RESOURCE_TYPE],
            Self::Search => &[SOLR_FACET_TYPE],
            Self::ConfigOnly => &[],
        }
    }
}

/// Returns the output file name for a service, e.g. `ogcConfig.json`.
#[must_use]
pub fn service_file_name(service: &str) -> String {
    format!("{service}Config.json")
}

/// Returns the kebab-case service identifier, e.g. `map-viewer`.
#[must_use]
pub fn kebab_service_name(service: &str) -> String {
    let mut kebab = String::with_capacity(service.len() + 4);
    for ch in service.chars() {
        if ch.is_ascii_uppercase() {
            kebab.push('-');
            kebab.push(ch.to_ascii_lowercase());
        } else {
            kebab.push(ch);
        }
    }
    kebab
}

// ============================================================================
// SECTION: Service Documents
// ============================================================================

/// One assembled service output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDocument {
    /// Schema reference, when registered for the service.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Kebab-case service identifier.
    pub service: String,
    /// Tenant-declared config, copied verbatim.
    pub config: Value,
    /// Spliced resource data, when the service carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
}

/// Assembly errors.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The registered schema could not be used.
    #[error(transparent)]
    SchemaAccess(#[from] SchemaAccessError),
    /// The assembled document failed schema validation.
    #[error("'{service}' service config failed schema validation ({count} violation(s))")]
    SchemaViolations {
        /// Offending service name.
        service: String,
        /// Number of violations found.
        count: usize,
    },
}

// ============================================================================
// SECTION: Config Assembler
// ============================================================================

/// Per-service document assembler for one generation run.
pub struct ConfigAssembler<'a> {
    /// Effective generation policy.
    policy: &'a GenerationPolicy,
    /// Project metadata fetched for the run, in output order.
    themes: &'a [ThemeMetadata],
    /// Optional schema validator.
    validator: Option<&'a dyn SchemaValidator>,
    /// Run log.
    log: &'a GenerationLog,
}

impl<'a> ConfigAssembler<'a> {
    /// Creates an assembler over the run's themes and policy.
    #[must_use]
    pub fn new(
        policy: &'a GenerationPolicy,
        themes: &'a [ThemeMetadata],
        validator: Option<&'a dyn SchemaValidator>,
        log: &'a GenerationLog,
    ) -> Self {
        Self {
            policy,
            themes,
            validator,
            log,
        }
    }

    /// Assembles and validates the output document for one service.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] when the document fails schema validation
    /// or the registered schema is unusable.
    pub fn assemble_service(
        &self,
        spec: &ServiceSpec,
        forest: &ResourceForest,
    ) -> Result<ServiceDocument, AssembleError> {
        let kind = ServiceKind::from_name(&spec.name);
        let resources = match &spec.resources {
            Some(declared) => Some(Self::declared_resources(declared)),
            None => self.spliced_resources(kind, forest),
        };
        let document = ServiceDocument {
            schema: spec.schema_url.clone(),
            service: kebab_service_name(&spec.name),
            config: spec.config.clone(),
            resources,
        };
        self.validate_document(&spec.name, spec.schema_url.as_deref(), &document)?;
        Ok(document)
    }

    /// Validates an assembled document when validation is enabled.
    fn validate_document<T: Serialize>(
        &self,
        service: &str,
        schema_url: Option<&str>,
        document: &T,
    ) -> Result<(), AssembleError> {
        if !self.policy.validate_schema {
            return Ok(());
        }
        let (Some(validator), Some(reference)) = (self.validator, schema_url) else {
            return Ok(());
        };
        let value = serde_json::to_value(document).unwrap_or(Value::Null);
        let violations = match validator.validate(&value, reference) {
            Ok(violations) => violations,
            Err(err) if self.policy.ignore_errors => {
                self.log.warning(format!(
                    "Could not validate '{service}' config against schema: {err}"
                ));
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        if violations.is_empty() {
            self.log.debug(format!("'{service}' service config validates against schema"));
            return Ok(());
        }
        for violation in &violations {
            self.log.error(format!(
                "Validation error in '{service}' config at '{}': {}",
                violation.json_path, violation.constraint
            ));
        }
        Err(AssembleError::SchemaViolations {
            service: service.to_string(),
            count: violations.len(),
        })
    }

    /// Validates the permissions document against its registered schema.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] when the document fails schema validation
    /// or the registered schema is unusable.
    pub fn validate_permissions<T: Serialize>(
        &self,
        schema_url: Option<&str>,
        document: &T,
    ) -> Result<(), AssembleError> {
        self.validate_document("permissions", schema_url, document)
    }

    /// Builds the resources section from a tenant-declared override block.
    ///
    /// Declared rows are grouped by type and listed by name, bypassing both
    /// the store and project metadata for this service.
    fn declared_resources(declared: &ServiceOverride) -> Value {
        let mut by_type: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for resource in &declared.resources {
            by_type.entry(resource.resource_type.as_str()).or_default().push(&resource.name);
        }
        let mut section = serde_json::Map::new();
        for (type_name, mut names) in by_type {
            names.sort_unstable();
            section.insert(type_name.to_string(), json!(names));
        }
        Value::Object(section)
    }

    /// Builds the service-kind-specific resources section.
    fn spliced_resources(&self, kind: ServiceKind, forest: &ResourceForest) -> Option<Value> {
        match kind {
            ServiceKind::Ogc => Some(json!({
                "wms_services": self
                    .themes
                    .iter()
                    .map(|theme| {
                        json!({
                            "name": theme.name,
                            "root_layer": layer_tree(&theme.root_layer),
                            "print_templates": theme
                                .print_layouts
                                .iter()
                                .map(|layout| layout.name.clone())
                                .collect::<Vec<_>>(),
                        })
                    })
                    .collect::<Vec<_>>(),
            })),
            ServiceKind::MapViewer => Some(json!({
                "themes": {
                    "items": self
                        .themes
                        .iter()
                        .map(|theme| {
                            json!({
                                "name": theme.name,
                                "title": theme.title.clone().unwrap_or_else(|| theme.name.clone()),
                            })
                        })
                        .collect::<Vec<_>>(),
                },
            })),
            ServiceKind::FeatureInfo => Some(json!({
                "wms_services": self
                    .themes
                    .iter()
                    .map(|theme| {
                        let mut layers = Vec::new();
                        collect_queryable_layers(&theme.root_layer, &mut layers);
                        json!({ "name": theme.name, "layers": layers })
                    })
                    .collect::<Vec<_>>(),
            })),
            ServiceKind::Print => Some(json!({
                "print_templates": self
                    .themes
                    .iter()
                    .flat_map(|theme| theme.print_layouts.iter())
                    .map(|layout| {
                        let mut template = serde_json::Map::new();
                        template.insert("name".to_string(), json!(layout.name));
                        if let Some(legend) = &layout.legend_layout {
                            template.insert("legend_layout".to_string(), json!(legend));
                        }
                        Value::Object(template)
                    })
                    .collect::<Vec<_>>(),
            })),
            ServiceKind::Data => Some(json!({
                "datasets": forest
                    .resources_of_type(DATA_RESOURCE_TYPE)
                    .map(|resource| {
                        let writable = if self.policy.force_readonly_datasets {
                            false
                        } else {
                            resource.writable.unwrap_or(true)
                        };
                        json!({ "name": resource.name, "writable": writable })
                    })
                    .collect::<Vec<_>>(),
            })),
            ServiceKind::Search => Some(json!({
                "facets": forest
                    .resources_of_type(SOLR_FACET_TYPE)
                    .map(|resource| resource.name.clone())
                    .collect::<Vec<_>>(),
            })),
            ServiceKind::ConfigOnly => None,
        }
    }
}

// ============================================================================
// SECTION: Layer Tree Helpers
// ============================================================================

/// Renders a layer subtree as a JSON value.
fn layer_tree(layer: &LayerMetadata) -> Value {
    let mut node = serde_json::Map::new();
    node.insert("name".to_string(), json!(layer.name));
    if let Some(title) = &layer.title {
        node.insert("title".to_string(), json!(title));
    }
    if layer.is_group() {
        node.insert(
            "layers".to_string(),
            json!(layer.sublayers.iter().map(layer_tree).collect::<Vec<_>>()),
        );
    } else {
        node.insert("queryable".to_string(), json!(layer.queryable));
        if !layer.attributes.is_empty() {
            node.insert("attributes".to_string(), json!(layer.attributes));
        }
    }
    Value::Object(node)
}

/// Collects the names of queryable leaf layers in tree order.
fn collect_queryable_layers(layer: &LayerMetadata, into: &mut Vec<String>) {
    if layer.is_group() {
        for sublayer in &layer.sublayers {
            collect_queryable_layers(sublayer, into);
        }
        return;
    }
    if layer.queryable {
        into.push(layer.name.clone());
    }
}
