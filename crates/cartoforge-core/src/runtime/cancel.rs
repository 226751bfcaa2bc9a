// crates/cartoforge-core/src/runtime/cancel.rs
// ============================================================================
// Module: Cartoforge Cancellation Flag
// Description: Cooperative cancellation primitive for generation runs.
// Purpose: Let the orchestrator request a stop that workers observe at
//          checkpoints.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Cancellation is cooperative and advisory: a run checks the flag between
//! discrete units of work (after each resource type resolved, after each
//! service assembled) and stops promptly when it observes a request. It is
//! never preemptive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

// ============================================================================
// SECTION: Cancel Flag
// ============================================================================

/// Shared cancellation flag for one generation run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    /// Set once a cancellation was requested.
    requested: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a flag with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
