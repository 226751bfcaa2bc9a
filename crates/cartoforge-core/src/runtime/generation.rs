// crates/cartoforge-core/src/runtime/generation.rs
// ============================================================================
// Module: Cartoforge Generation Run
// Description: One cancellable generation of configs and permissions.
// Purpose: Wire the store, metadata, resolver, and assembler into the single
//          canonical execution path.
// Dependencies: crate::core, crate::interfaces, crate::runtime, thiserror
// ============================================================================

//! ## Overview
//! A generation run loads resource and permission rows, resolves per-role
//! permission sets, assembles one document per declared service plus the
//! permissions document into a staging area, and atomically publishes the
//! staging area on full success. The cancel flag is observed after each
//! resource type resolved and after each service assembled; a cancelled or
//! failed run discards its staging area and leaves the previously published
//! output untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::identifiers::RoleName;
use crate::core::log::GenerationLog;
use crate::core::log::LogLevel;
use crate::core::permissions::Memberships;
use crate::core::permissions::PermissionGrant;
use crate::core::permissions::PermissionsDocument;
use crate::core::permissions::ResolvedPermissionSet;
use crate::core::permissions::TypeGroup;
use crate::core::policy::GenerationOptions;
use crate::core::policy::GenerationPolicy;
use crate::core::resource::ResourceForest;
use crate::core::resource::ResourceGraphError;
use crate::core::resource::ResourceTypeRegistry;
use crate::core::tenant::ServiceSpec;
use crate::core::tenant::TenantConfig;
use crate::interfaces::MetadataError;
use crate::interfaces::ProjectMetadataSource;
use crate::interfaces::ResourceStore;
use crate::interfaces::SchemaValidator;
use crate::interfaces::StoreError;
use crate::interfaces::ThemeMetadata;
use crate::runtime::assembler::AssembleError;
use crate::runtime::assembler::ConfigAssembler;
use crate::runtime::assembler::ServiceKind;
use crate::runtime::assembler::service_file_name;
use crate::runtime::cancel::CancelFlag;
use crate::runtime::resolver::PermissionResolver;
use crate::runtime::resolver::ResolverError;
use crate::runtime::staging::GenerationPaths;
use crate::runtime::staging::StagingArea;
use crate::runtime::staging::StagingError;

// ============================================================================
// SECTION: Errors and Outcome
// ============================================================================

/// File name of the permissions document.
const PERMISSIONS_FILE_NAME: &str = "permissions.json";

/// Generation run errors.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The resource rows do not form a valid forest.
    #[error(transparent)]
    Graph(#[from] ResourceGraphError),
    /// The grant rows reference unknown resources.
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    /// The configuration store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Project metadata extraction failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// Document assembly or schema validation failed.
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    /// Staging or publish failed.
    #[error(transparent)]
    Staging(#[from] StagingError),
    /// A service name with an override block is declared more than once.
    #[error("ambiguous override: service '{service}' is declared more than once")]
    AmbiguousOverride {
        /// The duplicated service name.
        service: String,
    },
    /// A critical error was recorded; output was not published.
    #[error("a critical error occurred while processing the configuration")]
    CriticalLogged,
    /// Cancellation was observed; not a failure. The orchestrator maps this
    /// to the cancelled task state.
    #[error("generation cancelled")]
    Cancelled,
}

/// Result of a successful generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Published file paths in write order.
    pub published: Vec<PathBuf>,
}

// ============================================================================
// SECTION: Override Plan
// ============================================================================

/// Per-service override data resolved against declared rows only.
struct OverridePlan {
    /// Service declaring the override.
    service: String,
    /// Resource types the override covers.
    types: BTreeSet<String>,
    /// Forest built from the declared rows.
    forest: ResourceForest,
    /// Declared grant records.
    grants: Vec<PermissionGrant>,
}

// ============================================================================
// SECTION: Generation Run
// ============================================================================

/// One cancellable generation run for a tenant.
pub struct GenerationRun<'a> {
    /// Configuration store collaborator.
    store: &'a dyn ResourceStore,
    /// Project metadata collaborator.
    metadata: &'a dyn ProjectMetadataSource,
    /// Optional schema validator collaborator.
    validator: Option<&'a dyn SchemaValidator>,
    /// Resolved output locations.
    paths: &'a GenerationPaths,
    /// Run log.
    log: &'a GenerationLog,
    /// Cooperative cancellation flag.
    cancel: &'a CancelFlag,
}

impl<'a> GenerationRun<'a> {
    /// Creates a run over the given collaborators.
    #[must_use]
    pub fn new(
        store: &'a dyn ResourceStore,
        metadata: &'a dyn ProjectMetadataSource,
        validator: Option<&'a dyn SchemaValidator>,
        paths: &'a GenerationPaths,
        log: &'a GenerationLog,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            store,
            metadata,
            validator,
            paths,
            log,
            cancel,
        }
    }

    /// Executes the run for one tenant configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the run fails or observes a
    /// cancellation request; the previously published output is untouched in
    /// both cases.
    pub fn execute(
        &self,
        config: &TenantConfig,
        options: &GenerationOptions,
    ) -> Result<GenerationOutcome, GenerationError> {
        let tenant = &config.tenant;
        self.log.info(format!("Using tenant '{tenant}'"));
        let policy = config.policy.with_overrides(options);
        let registry = ResourceTypeRegistry::with_custom(&policy.custom_resource_types);

        let services = self.unique_services(config)?;

        let rows = self.store.fetch_resources(tenant)?;
        let grants = self.store.fetch_grants(tenant)?;
        let memberships = normalized_memberships(self.store.fetch_memberships(tenant)?);
        self.check_cancel()?;

        let forest = ResourceForest::build(&registry, rows, policy.ignore_errors, self.log)?;
        let resolver =
            PermissionResolver::new(&registry, &forest, &policy, &grants, self.log)?;

        let themes = self.load_themes(config, &services, options)?;
        self.check_cancel()?;

        let overrides = self.build_override_plans(&registry, &policy, &services)?;
        let excluded_types: BTreeSet<String> =
            overrides.iter().flat_map(|plan| plan.types.iter().cloned()).collect();

        let roles = ordered_roles(&resolver, &overrides, &memberships);
        let mut resolved = Vec::with_capacity(roles.len());
        for role in &roles {
            let store_set = resolver
                .resolve_role(role, &excluded_types, self.cancel)
                .map_err(|_| GenerationError::Cancelled)?;
            let set =
                self.merge_override_groups(&registry, &policy, store_set, &overrides, role)?;
            resolved.push(set);
        }

        let assembler = ConfigAssembler::new(&policy, &themes, self.validator, self.log);
        let mut staging = StagingArea::create(self.paths, tenant)?;
        let staged = self.assemble_all(
            config,
            &services,
            &policy,
            &assembler,
            &forest,
            &memberships,
            resolved,
            options,
            &mut staging,
        );
        if let Err(err) = staged {
            staging.discard();
            return Err(err);
        }

        if self.log.has_level(LogLevel::Critical) {
            staging.discard();
            self.log.critical("The configuration files were not updated!");
            return Err(GenerationError::CriticalLogged);
        }

        let published = staging.publish(&self.paths.published_dir(tenant))?;
        self.log.info("The generation of the configuration files was successful");
        if self.log.has_level(LogLevel::Warning) {
            self.log.info(
                "Some problems were ignored, check the log to resolve them in \
                 configuration or projects",
            );
        }
        Ok(GenerationOutcome {
            published,
        })
    }

    /// Returns the declared services with duplicates rejected or skipped.
    ///
    /// A duplicated name is fatal when any duplicate declares an override
    /// block; otherwise later duplicates are skipped with a warning.
    fn unique_services<'c>(
        &self,
        config: &'c TenantConfig,
    ) -> Result<Vec<&'c ServiceSpec>, GenerationError> {
        let mut seen: BTreeMap<&str, &ServiceSpec> = BTreeMap::new();
        let mut unique = Vec::new();
        for spec in &config.services {
            if let Some(first) = seen.get(spec.name.as_str()) {
                if first.resources.is_some() || spec.resources.is_some() {
                    return Err(GenerationError::AmbiguousOverride {
                        service: spec.name.clone(),
                    });
                }
                self.log.warning(format!(
                    "Service '{}' is declared more than once, keeping the first declaration",
                    spec.name
                ));
                continue;
            }
            seen.insert(spec.name.as_str(), spec);
            unique.push(spec);
        }
        Ok(unique)
    }

    /// Loads project metadata for every theme when any service needs it.
    fn load_themes(
        &self,
        config: &TenantConfig,
        services: &[&ServiceSpec],
        options: &GenerationOptions,
    ) -> Result<Vec<ThemeMetadata>, GenerationError> {
        let needs_metadata = options.target.includes_service_configs()
            && services.iter().any(|spec| {
                spec.resources.is_none()
                    && matches!(
                        ServiceKind::from_name(&spec.name),
                        ServiceKind::Ogc
                            | ServiceKind::MapViewer
                            | ServiceKind::FeatureInfo
                            | ServiceKind::Print
                    )
            });
        if !needs_metadata {
            return Ok(Vec::new());
        }
        let mut themes = Vec::new();
        for name in self.metadata.theme_names(&config.tenant)? {
            self.log.debug(format!("Loading project metadata for theme '{name}'"));
            themes.push(self.metadata.fetch_theme(
                &config.tenant,
                &name,
                options.use_cached_project_metadata,
            )?);
        }
        Ok(themes)
    }

    /// Builds the override resolution plan for services declaring overrides.
    fn build_override_plans(
        &self,
        registry: &ResourceTypeRegistry,
        policy: &GenerationPolicy,
        services: &[&ServiceSpec],
    ) -> Result<Vec<OverridePlan>, GenerationError> {
        let mut plans: Vec<OverridePlan> = Vec::new();
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        for spec in services {
            let Some(declared) = &spec.resources else {
                continue;
            };
            let kind = ServiceKind::from_name(&spec.name);
            let mut types = BTreeSet::new();
            for type_name in kind.relevant_types() {
                match claimed.get(*type_name) {
                    Some(owner) => self.log.warning(format!(
                        "Resource type '{type_name}' is already overridden by service \
                         '{owner}', ignoring the override from '{}'",
                        spec.name
                    )),
                    None => {
                        claimed.insert((*type_name).to_string(), spec.name.clone());
                        types.insert((*type_name).to_string());
                    }
                }
            }
            let forest = ResourceForest::build(
                registry,
                declared.resources.clone(),
                policy.ignore_errors,
                self.log,
            )?;
            plans.push(OverridePlan {
                service: spec.name.clone(),
                types,
                forest,
                grants: declared.permissions.clone(),
            });
        }
        Ok(plans)
    }

    /// Merges override-resolved type groups into a role's store-resolved set,
    /// keeping the registry type order.
    fn merge_override_groups(
        &self,
        registry: &ResourceTypeRegistry,
        policy: &GenerationPolicy,
        store_set: ResolvedPermissionSet,
        overrides: &[OverridePlan],
        role: &RoleName,
    ) -> Result<ResolvedPermissionSet, GenerationError> {
        if overrides.is_empty() {
            return Ok(store_set);
        }
        let mut groups: BTreeMap<String, TypeGroup> = store_set
            .permissions
            .into_iter()
            .map(|group| (group.resource_type.clone(), group))
            .collect();
        for plan in overrides {
            let resolver = PermissionResolver::new(
                registry,
                &plan.forest,
                policy,
                &plan.grants,
                self.log,
            )?;
            let excluded: BTreeSet<String> = registry
                .iter_ordered()
                .map(|ty| ty.name.clone())
                .filter(|name| !plan.types.contains(name))
                .collect();
            self.log.debug(format!(
                "Resolving declared resources of service '{}' for role '{role}'",
                plan.service
            ));
            let declared_set = resolver
                .resolve_role(role, &excluded, self.cancel)
                .map_err(|_| GenerationError::Cancelled)?;
            for group in declared_set.permissions {
                groups.insert(group.resource_type.clone(), group);
            }
        }
        let mut permissions = Vec::new();
        for resource_type in registry.iter_ordered() {
            if let Some(group) = groups.remove(&resource_type.name)
                && !group.resources.is_empty()
            {
                permissions.push(group);
            }
        }
        Ok(ResolvedPermissionSet {
            role: role.clone(),
            permissions,
        })
    }

    /// Assembles every requested document into the staging area.
    #[allow(clippy::too_many_arguments, reason = "One call site wiring run state through.")]
    fn assemble_all(
        &self,
        config: &TenantConfig,
        services: &[&ServiceSpec],
        policy: &GenerationPolicy,
        assembler: &ConfigAssembler<'_>,
        forest: &ResourceForest,
        memberships: &Memberships,
        resolved: Vec<ResolvedPermissionSet>,
        options: &GenerationOptions,
        staging: &mut StagingArea,
    ) -> Result<(), GenerationError> {
        if options.target.includes_service_configs() {
            for spec in services {
                self.log.info(format!("Generating '{}' service config", spec.name));
                match assembler.assemble_service(spec, forest) {
                    Ok(document) => {
                        let file_name = service_file_name(&spec.name);
                        staging.write_document(&file_name, &document)?;
                        self.log.info(format!("Wrote '{file_name}' service config file"));
                    }
                    Err(AssembleError::SchemaViolations {
                        service,
                        count,
                    }) if policy.ignore_errors => {
                        self.log.warning(format!(
                            "Skipping '{service}' service config after {count} schema \
                             violation(s)"
                        ));
                    }
                    Err(err) => return Err(err.into()),
                }
                self.check_cancel()?;
            }
        }

        if options.target.includes_permissions() {
            let document = PermissionsDocument {
                schema: config.permissions_schema_url.clone(),
                tenant: config.tenant.to_string(),
                users: memberships.users.clone(),
                groups: memberships.groups.clone(),
                roles: resolved,
            };
            match assembler
                .validate_permissions(config.permissions_schema_url.as_deref(), &document)
            {
                Ok(()) => {}
                Err(AssembleError::SchemaViolations {
                    count, ..
                }) if policy.ignore_errors => {
                    self.log.warning(format!(
                        "Permissions document has {count} schema violation(s), writing it \
                         anyway"
                    ));
                }
                Err(err) => return Err(err.into()),
            }
            staging.write_document(PERMISSIONS_FILE_NAME, &document)?;
            self.log.info(format!("Wrote '{PERMISSIONS_FILE_NAME}' permissions file"));
            self.check_cancel()?;
        }

        Ok(())
    }

    /// Returns `Cancelled` when the flag was raised.
    fn check_cancel(&self) -> Result<(), GenerationError> {
        if self.cancel.is_requested() {
            self.log.info("Cancellation requested, stopping generation");
            return Err(GenerationError::Cancelled);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Role and Membership Ordering
// ============================================================================

/// Returns every role the run resolves: `public` first, the rest by name.
fn ordered_roles(
    resolver: &PermissionResolver<'_>,
    overrides: &[OverridePlan],
    memberships: &Memberships,
) -> Vec<RoleName> {
    let mut names: BTreeSet<RoleName> = BTreeSet::new();
    names.extend(resolver.grant_roles());
    names.extend(memberships.roles.iter().cloned());
    for plan in overrides {
        names.extend(plan.grants.iter().map(|grant| grant.role.clone()));
    }
    names.remove(&RoleName::public());
    let mut roles = vec![RoleName::public()];
    roles.extend(names);
    roles
}

/// Sorts memberships so identical store content serializes identically.
fn normalized_memberships(mut memberships: Memberships) -> Memberships {
    memberships.users.sort_by(|a, b| a.name.cmp(&b.name));
    for user in &mut memberships.users {
        user.groups.sort_unstable();
        user.roles.sort_unstable();
    }
    memberships.groups.sort_by(|a, b| a.name.cmp(&b.name));
    for group in &mut memberships.groups {
        group.roles.sort_unstable();
    }
    memberships.roles.sort();
    memberships
}
