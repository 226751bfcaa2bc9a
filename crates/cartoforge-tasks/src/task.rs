// crates/cartoforge-tasks/src/task.rs
// ============================================================================
// Module: Cartoforge Task State
// Description: Generation task records, status, and snapshots.
// Purpose: Track one cancellable generation run per task with an append-only
//          log.
// Dependencies: cartoforge-core, serde
// ============================================================================

//! ## Overview
//! A generation task moves `pending -> running` and ends in exactly one of
//! `succeeded`, `failed`, or `cancelled`. Terminal states are final; a task
//! is never reused. The task's log is written only by its worker; status
//! readers receive snapshots of a monotonically growing prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use cartoforge_core::CancelFlag;
use cartoforge_core::GenerationLog;
use cartoforge_core::LogEntry;
use cartoforge_core::TaskId;
use cartoforge_core::TenantId;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Task Status
// ============================================================================

/// Lifecycle state of a generation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, worker not yet running.
    Pending,
    /// Worker executing the generation run.
    Running,
    /// Run completed and output was published.
    Succeeded,
    /// Run failed; previous output untouched.
    Failed,
    /// Cancellation was observed; previous output untouched.
    Cancelled,
}

impl TaskStatus {
    /// Returns true for a state the task can still leave.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Returns a stable lowercase label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Point-in-time view of a task returned to status callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task identifier.
    pub task_id: TaskId,
    /// Tenant the task generates for.
    pub tenant: TenantId,
    /// Status at snapshot time.
    pub status: TaskStatus,
    /// Log prefix accumulated so far.
    pub log: Vec<LogEntry>,
    /// Published file paths on success.
    pub published: Vec<PathBuf>,
    /// Error text on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Task Handle
// ============================================================================

/// Shared mutable state of one task, owned by the orchestrator registry.
#[derive(Debug)]
pub(crate) struct TaskHandle {
    /// Task identifier.
    pub(crate) id: TaskId,
    /// Tenant the task generates for.
    pub(crate) tenant: TenantId,
    /// Current status; written only by the worker and the registry.
    pub(crate) status: Mutex<TaskStatus>,
    /// Run log shared with the worker.
    pub(crate) log: Arc<GenerationLog>,
    /// Cooperative cancellation flag.
    pub(crate) cancel: CancelFlag,
    /// Published file paths, set once on success.
    pub(crate) published: Mutex<Vec<PathBuf>>,
    /// Error text, set once on failure.
    pub(crate) error: Mutex<Option<String>>,
}

impl TaskHandle {
    /// Creates a pending handle for a tenant.
    pub(crate) fn new(id: TaskId, tenant: TenantId) -> Self {
        Self {
            id,
            tenant,
            status: Mutex::new(TaskStatus::Pending),
            log: Arc::new(GenerationLog::new()),
            cancel: CancelFlag::new(),
            published: Mutex::new(Vec::new()),
            error: Mutex::new(None),
        }
    }

    /// Returns the current status.
    pub(crate) fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Moves the task into a new status.
    pub(crate) fn set_status(&self, status: TaskStatus) {
        *self.status.lock().unwrap_or_else(|poison| poison.into_inner()) = status;
    }

    /// Records the published paths of a successful run.
    pub(crate) fn set_published(&self, paths: Vec<PathBuf>) {
        *self.published.lock().unwrap_or_else(|poison| poison.into_inner()) = paths;
    }

    /// Records the error text of a failed run.
    pub(crate) fn set_error(&self, message: String) {
        *self.error.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(message);
    }

    /// Takes a point-in-time snapshot for status callers.
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id.clone(),
            tenant: self.tenant.clone(),
            status: self.status(),
            log: self.log.snapshot(),
            published: self
                .published
                .lock()
                .unwrap_or_else(|poison| poison.into_inner())
                .clone(),
            error: self.error.lock().unwrap_or_else(|poison| poison.into_inner()).clone(),
        }
    }
}
