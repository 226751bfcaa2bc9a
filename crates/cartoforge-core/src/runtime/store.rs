// crates/cartoforge-core/src/runtime/store.rs
// ============================================================================
// Module: Cartoforge In-Memory Collaborators
// Description: Simple in-memory collaborator implementations for tests and
//              examples.
// Purpose: Provide deterministic store, metadata, and config sources without
//          external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides simple in-memory implementations of the collaborator
//! interfaces for tests and local demos. They are not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::TenantId;
use crate::core::permissions::Memberships;
use crate::core::permissions::PermissionGrant;
use crate::core::resource::Resource;
use crate::core::tenant::TenantConfig;
use crate::interfaces::MetadataError;
use crate::interfaces::ProjectMetadataSource;
use crate::interfaces::ResourceStore;
use crate::interfaces::StoreError;
use crate::interfaces::TenantConfigError;
use crate::interfaces::TenantConfigSource;
use crate::interfaces::ThemeMetadata;

// ============================================================================
// SECTION: In-Memory Resource Store
// ============================================================================

/// In-memory resource store for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceStore {
    /// Resource rows returned for every tenant.
    resources: Vec<Resource>,
    /// Grant records returned for every tenant.
    grants: Vec<PermissionGrant>,
    /// Memberships returned for every tenant.
    memberships: Memberships,
}

impl InMemoryResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the resource rows.
    #[must_use]
    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    /// Replaces the grant records.
    #[must_use]
    pub fn with_grants(mut self, grants: Vec<PermissionGrant>) -> Self {
        self.grants = grants;
        self
    }

    /// Replaces the memberships.
    #[must_use]
    pub fn with_memberships(mut self, memberships: Memberships) -> Self {
        self.memberships = memberships;
        self
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn fetch_resources(&self, _tenant: &TenantId) -> Result<Vec<Resource>, StoreError> {
        Ok(self.resources.clone())
    }

    fn fetch_grants(&self, _tenant: &TenantId) -> Result<Vec<PermissionGrant>, StoreError> {
        Ok(self.grants.clone())
    }

    fn fetch_memberships(&self, _tenant: &TenantId) -> Result<Memberships, StoreError> {
        Ok(self.memberships.clone())
    }
}

// ============================================================================
// SECTION: In-Memory Project Metadata
// ============================================================================

/// In-memory project metadata source for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectMetadata {
    /// Themes in output order.
    themes: Vec<ThemeMetadata>,
}

impl InMemoryProjectMetadata {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the themes, keeping the given order.
    #[must_use]
    pub fn with_themes(mut self, themes: Vec<ThemeMetadata>) -> Self {
        self.themes = themes;
        self
    }
}

impl ProjectMetadataSource for InMemoryProjectMetadata {
    fn theme_names(&self, _tenant: &TenantId) -> Result<Vec<String>, MetadataError> {
        Ok(self.themes.iter().map(|theme| theme.name.clone()).collect())
    }

    fn fetch_theme(
        &self,
        _tenant: &TenantId,
        theme: &str,
        _use_cached: bool,
    ) -> Result<ThemeMetadata, MetadataError> {
        self.themes
            .iter()
            .find(|candidate| candidate.name == theme)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownTheme(theme.to_string()))
    }
}

// ============================================================================
// SECTION: In-Memory Tenant Configs
// ============================================================================

/// In-memory tenant configuration source for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantConfigs {
    /// Configurations keyed by tenant.
    configs: BTreeMap<TenantId, TenantConfig>,
}

impl InMemoryTenantConfigs {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tenant configuration.
    #[must_use]
    pub fn with_config(mut self, config: TenantConfig) -> Self {
        self.configs.insert(config.tenant.clone(), config);
        self
    }
}

impl TenantConfigSource for InMemoryTenantConfigs {
    fn tenant_config(&self, tenant: &TenantId) -> Result<TenantConfig, TenantConfigError> {
        self.configs
            .get(tenant)
            .cloned()
            .ok_or_else(|| TenantConfigError::Load(format!("no config for tenant '{tenant}'")))
    }
}
