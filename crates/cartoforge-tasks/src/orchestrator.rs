// crates/cartoforge-tasks/src/orchestrator.rs
// ============================================================================
// Module: Cartoforge Task Orchestrator
// Description: Task registry, worker execution, cancellation, and streaming.
// Purpose: Run generation as a cancellable, observable background job with
//          single-task-per-tenant exclusion.
// Dependencies: cartoforge-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! The orchestrator starts one worker thread per generation task so the
//! request-handling layer stays responsive. Multiple tenants may generate
//! concurrently, but at most one task per tenant is active; a second start is
//! rejected with `TenantBusy` and creates no task. Cancellation is
//! cooperative: the flag is observed between discrete units of work, staged
//! output is discarded, and previously published output is never touched.
//! The streaming variant runs inline and forwards each log entry through a
//! channel as it is appended.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use cartoforge_core::GenerationError;
use cartoforge_core::GenerationOptions;
use cartoforge_core::GenerationPaths;
use cartoforge_core::GenerationRun;
use cartoforge_core::LogEntry;
use cartoforge_core::ProjectMetadataSource;
use cartoforge_core::ResourceStore;
use cartoforge_core::SchemaValidator;
use cartoforge_core::TaskId;
use cartoforge_core::TenantConfigSource;
use cartoforge_core::TenantId;
use thiserror::Error;
use tokio::sync::mpsc::Sender;

use crate::task::TaskHandle;
use crate::task::TaskSnapshot;
use crate::task::TaskStatus;

// ============================================================================
// SECTION: Environment and Errors
// ============================================================================

/// Shared collaborators every task executes against.
#[derive(Clone)]
pub struct GenerationEnvironment {
    /// Configuration store collaborator.
    pub store: Arc<dyn ResourceStore + Send + Sync>,
    /// Project metadata collaborator.
    pub metadata: Arc<dyn ProjectMetadataSource + Send + Sync>,
    /// Optional schema validator collaborator.
    pub validator: Option<Arc<dyn SchemaValidator + Send + Sync>>,
    /// Tenant configuration source.
    pub configs: Arc<dyn TenantConfigSource + Send + Sync>,
    /// Resolved output locations.
    pub paths: GenerationPaths,
}

/// Task orchestration errors.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The tenant already has a pending or running task.
    #[error("tenant '{0}' already has an active generation task")]
    TenantBusy(TenantId),
    /// No task is registered under the id.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Registry entry pairing a task handle with its sequence number.
struct TaskEntry {
    /// Monotonic sequence used to order tasks per tenant.
    seq: u64,
    /// Shared task state.
    handle: Arc<TaskHandle>,
}

/// Generation task orchestrator.
pub struct Orchestrator {
    /// Shared collaborators.
    env: GenerationEnvironment,
    /// Registered tasks keyed by id.
    tasks: Mutex<BTreeMap<TaskId, TaskEntry>>,
    /// Worker join handles keyed by task id.
    workers: Mutex<BTreeMap<TaskId, JoinHandle<()>>>,
    /// Monotonic task sequence counter.
    next_seq: AtomicU64,
}

impl Orchestrator {
    /// Creates an orchestrator over the given environment.
    #[must_use]
    pub fn new(env: GenerationEnvironment) -> Self {
        Self {
            env,
            tasks: Mutex::new(BTreeMap::new()),
            workers: Mutex::new(BTreeMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Starts a generation task for a tenant on its own worker thread and
    /// returns the task id immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TenantBusy`] when the tenant already has an
    /// active task; no task is created in that case.
    pub fn start(
        &self,
        tenant: impl Into<TenantId>,
        options: GenerationOptions,
    ) -> Result<TaskId, TaskError> {
        let tenant = tenant.into();
        let handle = self.register(&tenant)?;
        let task_id = handle.id.clone();
        let env = self.env.clone();
        let worker_handle = Arc::clone(&handle);
        let worker = thread::spawn(move || {
            execute_task(&env, &worker_handle, &options);
        });
        self.workers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .insert(task_id.clone(), worker);
        Ok(task_id)
    }

    /// Runs a generation inline, forwarding each log entry through the
    /// channel as it is appended, and returns the final snapshot.
    ///
    /// Participates in the same per-tenant exclusion as [`Orchestrator::start`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TenantBusy`] when the tenant already has an
    /// active task.
    pub fn stream(
        &self,
        tenant: impl Into<TenantId>,
        options: GenerationOptions,
        sender: Sender<LogEntry>,
    ) -> Result<TaskSnapshot, TaskError> {
        let tenant = tenant.into();
        let handle = self.register(&tenant)?;
        handle.log.subscribe(move |entry| {
            // A full or closed channel never stalls generation; the entry
            // stays in the collected log either way.
            let _ = sender.try_send(entry.clone());
        });
        execute_task(&self.env, &handle, &options);
        Ok(handle.snapshot())
    }

    /// Returns the current status and accumulated log of a task.
    ///
    /// Non-blocking; safe to call repeatedly and concurrently with execution.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for an unregistered id.
    pub fn status(&self, task_id: &TaskId) -> Result<TaskSnapshot, TaskError> {
        let tasks = self.tasks.lock().unwrap_or_else(|poison| poison.into_inner());
        tasks
            .get(task_id)
            .map(|entry| entry.handle.snapshot())
            .ok_or_else(|| TaskError::UnknownTask(task_id.clone()))
    }

    /// Requests cooperative cancellation of a task.
    ///
    /// The worker observes the flag at its next checkpoint, discards staged
    /// output, and transitions to `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for an unregistered id.
    pub fn cancel(&self, task_id: &TaskId) -> Result<(), TaskError> {
        let tasks = self.tasks.lock().unwrap_or_else(|poison| poison.into_inner());
        let entry =
            tasks.get(task_id).ok_or_else(|| TaskError::UnknownTask(task_id.clone()))?;
        entry.handle.cancel.request();
        Ok(())
    }

    /// Blocks until the task's worker finished and returns the final
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::UnknownTask`] for an unregistered id.
    pub fn wait(&self, task_id: &TaskId) -> Result<TaskSnapshot, TaskError> {
        let worker = self
            .workers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .remove(task_id);
        if let Some(worker) = worker {
            let _ = worker.join();
        }
        self.status(task_id)
    }

    /// Removes terminal tasks superseded by a newer task for the same
    /// tenant and returns how many were pruned.
    pub fn prune(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut latest_seq: BTreeMap<TenantId, u64> = BTreeMap::new();
        for entry in tasks.values() {
            let seq = latest_seq.entry(entry.handle.tenant.clone()).or_insert(entry.seq);
            if entry.seq > *seq {
                *seq = entry.seq;
            }
        }
        let removable: Vec<TaskId> = tasks
            .iter()
            .filter(|(_, entry)| {
                !entry.handle.status().is_active()
                    && latest_seq
                        .get(&entry.handle.tenant)
                        .is_some_and(|latest| entry.seq < *latest)
            })
            .map(|(id, _)| id.clone())
            .collect();
        let mut workers = self.workers.lock().unwrap_or_else(|poison| poison.into_inner());
        for id in &removable {
            tasks.remove(id);
            workers.remove(id);
        }
        removable.len()
    }

    /// Registers a pending task for a tenant under the exclusion rule.
    fn register(&self, tenant: &TenantId) -> Result<Arc<TaskHandle>, TaskError> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poison| poison.into_inner());
        if tasks
            .values()
            .any(|entry| entry.handle.tenant == *tenant && entry.handle.status().is_active())
        {
            return Err(TaskError::TenantBusy(tenant.clone()));
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let task_id = TaskId::new(format!("task-{seq}"));
        let handle = Arc::new(TaskHandle::new(task_id.clone(), tenant.clone()));
        tasks.insert(
            task_id,
            TaskEntry {
                seq,
                handle: Arc::clone(&handle),
            },
        );
        Ok(handle)
    }
}

// ============================================================================
// SECTION: Worker Body
// ============================================================================

/// Executes one task to a terminal state. Never leaves the task `running`.
fn execute_task(
    env: &GenerationEnvironment,
    handle: &TaskHandle,
    options: &GenerationOptions,
) {
    handle.set_status(TaskStatus::Running);
    let config = match env.configs.tenant_config(&handle.tenant) {
        Ok(config) => config,
        Err(err) => {
            handle.log.critical(format!("Error loading tenant config: {err}"));
            handle.set_error(err.to_string());
            handle.set_status(TaskStatus::Failed);
            return;
        }
    };
    let store: &dyn ResourceStore = env.store.as_ref();
    let metadata: &dyn ProjectMetadataSource = env.metadata.as_ref();
    let validator: Option<&dyn SchemaValidator> = match env.validator.as_ref() {
        Some(validator) => Some(validator.as_ref()),
        None => None,
    };
    let run = GenerationRun::new(
        store,
        metadata,
        validator,
        &env.paths,
        &handle.log,
        &handle.cancel,
    );
    match run.execute(&config, options) {
        Ok(outcome) => {
            handle.set_published(outcome.published);
            handle.set_status(TaskStatus::Succeeded);
        }
        Err(GenerationError::Cancelled) => {
            handle.log.info("Generation task cancelled");
            handle.set_status(TaskStatus::Cancelled);
        }
        Err(err) => {
            handle.log.error(format!("Generation failed: {err}"));
            handle.set_error(err.to_string());
            handle.set_status(TaskStatus::Failed);
        }
    }
}
