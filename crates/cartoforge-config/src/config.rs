// crates/cartoforge-config/src/config.rs
// ============================================================================
// Module: Cartoforge Tenant Configuration Loading
// Description: Strict, fail-closed loading of tenantConfig.json documents.
// Purpose: Parse and validate the declarative tenant configuration with hard
//          limits.
// Dependencies: cartoforge-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Tenant configuration is loaded from a JSON file with strict size and path
//! limits. Missing or invalid configuration fails closed: nothing is
//! generated from a document that does not validate. The on-disk shape keeps
//! a `config` section carrying the tenant name and policy knobs next to the
//! declared `services` array.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use cartoforge_core::GenerationPolicy;
use cartoforge_core::ServiceSpec;
use cartoforge_core::TenantConfig;
use cartoforge_core::TenantConfigError;
use cartoforge_core::TenantConfigSource;
use cartoforge_core::TenantId;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of a tenant configuration document.
pub const TENANT_CONFIG_NAME: &str = "tenantConfig.json";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a tenant name used as a path component.
pub(crate) const MAX_TENANT_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Tenant configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("config io error: {0}")]
    Io(String),
    /// Parsing the configuration failed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The configuration is invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for TenantConfigError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(message) => Self::Load(message),
            ConfigError::Parse(message) | ConfigError::Invalid(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Document Shape
// ============================================================================

/// The `config` section of a tenant configuration document.
#[derive(Debug, Deserialize)]
struct GeneratorSection {
    /// Tenant the document belongs to.
    tenant: String,
    /// Policy knobs, all optional with defaults.
    #[serde(flatten)]
    policy: GenerationPolicy,
}

/// On-disk tenant configuration document.
#[derive(Debug, Deserialize)]
struct TenantConfigDoc {
    /// Generator section with tenant name and policy.
    config: GeneratorSection,
    /// Declared services in output order.
    #[serde(default)]
    services: Vec<ServiceSpec>,
    /// Schema reference for the permissions document.
    #[serde(default)]
    permissions_schema_url: Option<String>,
    /// Opaque themes configuration consumed by the metadata collaborator.
    #[serde(default, rename = "themesConfig")]
    themes_config: Option<Value>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a tenant configuration document.
///
/// # Errors
///
/// Returns [`ConfigError`] when reading, parsing, or validation fails.
pub fn load_tenant_config(path: &Path) -> Result<TenantConfig, ConfigError> {
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
    parse_tenant_config(content)
}

/// Parses and validates a tenant configuration document from a string.
///
/// # Errors
///
/// Returns [`ConfigError`] when parsing or validation fails.
pub fn parse_tenant_config(content: &str) -> Result<TenantConfig, ConfigError> {
    let doc: TenantConfigDoc =
        serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
    validate_doc(&doc)?;
    Ok(TenantConfig {
        tenant: TenantId::new(doc.config.tenant),
        policy: doc.config.policy,
        services: doc.services,
        permissions_schema_url: doc.permissions_schema_url,
    })
}

/// Validates the parsed document before conversion.
fn validate_doc(doc: &TenantConfigDoc) -> Result<(), ConfigError> {
    validate_tenant_name(&doc.config.tenant)?;
    if let Some(themes) = &doc.themes_config
        && !themes.is_object()
    {
        return Err(ConfigError::Invalid("themesConfig must be an object".to_string()));
    }
    let mut seen = BTreeSet::new();
    for service in &doc.services {
        if service.name.is_empty() {
            return Err(ConfigError::Invalid("service name must not be empty".to_string()));
        }
        if !seen.insert(service.name.as_str()) && service_has_override(doc, &service.name) {
            return Err(ConfigError::Invalid(format!(
                "ambiguous override: service '{}' is declared more than once",
                service.name
            )));
        }
    }
    for custom in &doc.config.policy.custom_resource_types {
        if custom.is_empty() {
            return Err(ConfigError::Invalid(
                "custom resource type name must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Returns true when any declaration of the service carries an override.
fn service_has_override(doc: &TenantConfigDoc, name: &str) -> bool {
    doc.services
        .iter()
        .filter(|service| service.name == name)
        .any(|service| service.resources.is_some())
}

/// Validates a tenant name used as a single path component.
fn validate_tenant_name(tenant: &str) -> Result<(), ConfigError> {
    if tenant.is_empty() {
        return Err(ConfigError::Invalid("tenant name must not be empty".to_string()));
    }
    if tenant.len() > MAX_TENANT_NAME_LENGTH {
        return Err(ConfigError::Invalid("tenant name exceeds length limit".to_string()));
    }
    if tenant == "." || tenant == ".." {
        return Err(ConfigError::Invalid("tenant name must not be a dot segment".to_string()));
    }
    if tenant.chars().any(|ch| ch == '/' || ch == '\\' || ch == '\0') {
        return Err(ConfigError::Invalid(
            "tenant name must not contain path separators".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: File Source
// ============================================================================

/// Tenant configuration source reading `tenantConfig.json` per tenant from
/// an input base directory.
#[derive(Debug, Clone)]
pub struct FileTenantConfigSource {
    /// Base directory holding one directory per tenant.
    input_base: PathBuf,
}

impl FileTenantConfigSource {
    /// Creates a source rooted at the given input base directory.
    #[must_use]
    pub fn new(input_base: impl Into<PathBuf>) -> Self {
        Self {
            input_base: input_base.into(),
        }
    }

    /// Returns the configuration path for a tenant.
    #[must_use]
    pub fn config_path(&self, tenant: &TenantId) -> PathBuf {
        self.input_base.join(tenant.as_str()).join(TENANT_CONFIG_NAME)
    }
}

impl TenantConfigSource for FileTenantConfigSource {
    fn tenant_config(&self, tenant: &TenantId) -> Result<TenantConfig, TenantConfigError> {
        validate_tenant_name(tenant.as_str()).map_err(TenantConfigError::from)?;
        let config = load_tenant_config(&self.config_path(tenant))?;
        if config.tenant != *tenant {
            return Err(TenantConfigError::Invalid(format!(
                "config declares tenant '{}' but was loaded for tenant '{tenant}'",
                config.tenant
            )));
        }
        Ok(config)
    }
}
