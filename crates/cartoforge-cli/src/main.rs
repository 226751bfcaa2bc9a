// crates/cartoforge-cli/src/main.rs
// ============================================================================
// Module: Cartoforge CLI Entry Point
// Description: Command dispatcher for generation and config validation.
// Purpose: Provide a thin, localizable CLI over the generation orchestrator.
// Dependencies: cartoforge-config, cartoforge-core, cartoforge-tasks, clap,
//               serde, tokio
// ============================================================================

//! ## Overview
//! The Cartoforge CLI loads a tenant configuration, wires the in-memory
//! collaborators from an optional seed file, and runs a streaming generation
//! while printing each log entry as it is produced. Production deployments
//! replace the seed-backed collaborators with real store and metadata
//! integrations behind the same interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use cartoforge_config::load_tenant_config;
use cartoforge_core::GenerationOptions;
use cartoforge_core::GenerationPaths;
use cartoforge_core::GenerationTarget;
use cartoforge_core::GroupMembership;
use cartoforge_core::InMemoryProjectMetadata;
use cartoforge_core::InMemoryResourceStore;
use cartoforge_core::InMemoryTenantConfigs;
use cartoforge_core::LogEntry;
use cartoforge_core::Memberships;
use cartoforge_core::PermissionGrant;
use cartoforge_core::Resource;
use cartoforge_core::RoleName;
use cartoforge_core::ThemeMetadata;
use cartoforge_core::UserMembership;
use cartoforge_tasks::GenerationEnvironment;
use cartoforge_tasks::Orchestrator;
use cartoforge_tasks::TaskStatus;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a seed data file in bytes.
const MAX_SEED_BYTES: usize = 16 * 1024 * 1024;
/// Capacity of the log streaming channel.
const LOG_CHANNEL_CAPACITY: usize = 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "cartoforge", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate service configs and permissions for a tenant.
    Generate(GenerateCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a tenant configuration file.
    Validate(ConfigValidateCommand),
}

/// Output selection for the generate command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetArg {
    /// Service configs and the permissions document.
    All,
    /// Service configs only.
    ServiceConfigs,
    /// The permissions document only.
    Permissions,
}

impl From<TargetArg> for GenerationTarget {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::All => Self::All,
            TargetArg::ServiceConfigs => Self::ServiceConfigs,
            TargetArg::Permissions => Self::Permissions,
        }
    }
}

/// Configuration for the `generate` command.
#[derive(Args, Debug)]
struct GenerateCommand {
    /// Path to the tenant configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    /// Optional seed file with resources, permissions, and themes.
    #[arg(long, value_name = "PATH")]
    seed: Option<PathBuf>,
    /// Output base directory holding one published directory per tenant.
    #[arg(long, value_name = "DIR")]
    output: PathBuf,
    /// Which documents to generate.
    #[arg(long, value_enum, default_value = "all")]
    target: TargetArg,
    /// Reuse cached project metadata when available.
    #[arg(long)]
    use_cached_project_metadata: bool,
    /// Force all datasets read-only for this run.
    #[arg(long)]
    force_readonly_datasets: bool,
    /// Skip recoverable errors instead of aborting.
    #[arg(long)]
    ignore_errors: bool,
}

/// Configuration for the `config validate` command.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Path to the tenant configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

// ============================================================================
// SECTION: Seed Data
// ============================================================================

/// Collaborator seed data for the in-memory store and metadata source.
#[derive(Debug, Default, Deserialize)]
struct SeedData {
    /// Resource rows.
    #[serde(default)]
    resources: Vec<Resource>,
    /// Grant records.
    #[serde(default)]
    permissions: Vec<PermissionGrant>,
    /// Users with memberships.
    #[serde(default)]
    users: Vec<UserMembership>,
    /// Groups with role memberships.
    #[serde(default)]
    groups: Vec<GroupMembership>,
    /// Role names known to the store.
    #[serde(default)]
    roles: Vec<RoleName>,
    /// Theme metadata in output order.
    #[serde(default)]
    themes: Vec<ThemeMetadata>,
}

// ============================================================================
// SECTION: CLI Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// User-facing message.
    message: String,
}

impl CliError {
    /// Creates an error from a message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Generate(command) => run_generate(&command),
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => run_config_validate(&command),
    };
    match outcome {
        Ok(code) => code,
        Err(err) => {
            let _ = write_stderr_line(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Runs a streaming generation, printing log entries as they are produced.
fn run_generate(command: &GenerateCommand) -> CliResult<ExitCode> {
    let tenant_config = load_tenant_config(&command.config)
        .map_err(|err| CliError::new(format!("error loading tenant config: {err}")))?;
    let tenant = tenant_config.tenant.clone();
    let seed = load_seed(command.seed.as_deref())?;
    let options = GenerationOptions {
        use_cached_project_metadata: command.use_cached_project_metadata,
        force_readonly_datasets: command.force_readonly_datasets.then_some(true),
        ignore_errors: command.ignore_errors.then_some(true),
        target: command.target.into(),
    };

    let env = GenerationEnvironment {
        store: Arc::new(
            InMemoryResourceStore::new()
                .with_resources(seed.resources)
                .with_grants(seed.permissions)
                .with_memberships(Memberships {
                    users: seed.users,
                    groups: seed.groups,
                    roles: seed.roles,
                }),
        ),
        metadata: Arc::new(InMemoryProjectMetadata::new().with_themes(seed.themes)),
        validator: None,
        configs: Arc::new(InMemoryTenantConfigs::new().with_config(tenant_config)),
        paths: GenerationPaths::new(&command.output),
    };
    let orchestrator = Orchestrator::new(env);

    let (sender, mut receiver) = mpsc::channel::<LogEntry>(LOG_CHANNEL_CAPACITY);
    let printer = thread::spawn(move || {
        while let Some(entry) = receiver.blocking_recv() {
            let _ = write_stdout_line(&format!(
                "{}: {}",
                entry.level.as_str().to_uppercase(),
                entry.message
            ));
        }
    });

    let snapshot = orchestrator
        .stream(tenant, options, sender)
        .map_err(|err| CliError::new(err.to_string()))?;
    drop(orchestrator);
    let _ = printer.join();

    match snapshot.status {
        TaskStatus::Succeeded => Ok(ExitCode::SUCCESS),
        status => {
            let _ = write_stderr_line(&format!("generation finished as '{}'", status.as_str()));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Validates a tenant configuration file.
fn run_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    match load_tenant_config(&command.config) {
        Ok(config) => {
            let _ = write_stdout_line(&format!(
                "tenant config for '{}' is valid ({} service(s))",
                config.tenant,
                config.services.len()
            ));
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let _ = write_stderr_line(&format!("invalid tenant config: {err}"));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Loads seed data, or returns empty seed when no path was given.
fn load_seed(path: Option<&Path>) -> CliResult<SeedData> {
    let Some(path) = path else {
        return Ok(SeedData::default());
    };
    let bytes = fs::read(path)
        .map_err(|err| CliError::new(format!("error reading seed file: {err}")))?;
    if bytes.len() > MAX_SEED_BYTES {
        return Err(CliError::new("seed file exceeds size limit"));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("error parsing seed file: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}
