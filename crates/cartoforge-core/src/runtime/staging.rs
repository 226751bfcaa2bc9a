// crates/cartoforge-core/src/runtime/staging.rs
// ============================================================================
// Module: Cartoforge Output Staging
// Description: Staging area and atomic publish for generated documents.
// Purpose: Guarantee readers never observe a half-written generation.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Documents are written into a staging directory keyed by service name and
//! only swapped into the published tenant directory once the whole run
//! succeeded. The swap is a rename pair (published to `.prev`, staging to
//! published) with rollback, so a failed or cancelled run leaves the previous
//! published output byte-identical. The staging directory lives next to the
//! published one to keep renames on a single filesystem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Paths and Errors
// ============================================================================

/// Directory name holding staging areas under the output base.
const STAGING_DIR_NAME: &str = ".staging";
/// Suffix for the previous published directory during a swap.
const PREV_SUFFIX: &str = ".prev";

/// Resolved absolute locations for one tenant's generation output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPaths {
    /// Base directory holding one published directory per tenant.
    pub output_base: PathBuf,
}

impl GenerationPaths {
    /// Creates paths rooted at the given output base.
    #[must_use]
    pub fn new(output_base: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
        }
    }

    /// Returns the published directory for a tenant.
    #[must_use]
    pub fn published_dir(&self, tenant: &TenantId) -> PathBuf {
        self.output_base.join(tenant.as_str())
    }

    /// Returns the staging directory for a tenant.
    #[must_use]
    pub fn staging_dir(&self, tenant: &TenantId) -> PathBuf {
        self.output_base.join(STAGING_DIR_NAME).join(tenant.as_str())
    }
}

/// Staging and publish errors.
#[derive(Debug, Error)]
pub enum StagingError {
    /// Creating or clearing the staging directory failed.
    #[error("could not prepare staging directory '{path}': {message}")]
    Prepare {
        /// Staging directory path.
        path: PathBuf,
        /// Underlying I/O message.
        message: String,
    },
    /// Writing a staged document failed.
    #[error("could not write staged document '{file_name}': {message}")]
    Write {
        /// Staged file name.
        file_name: String,
        /// Underlying I/O or serialization message.
        message: String,
    },
    /// The publish swap failed.
    #[error("could not publish staged output to '{path}': {message}")]
    Publish {
        /// Published directory path.
        path: PathBuf,
        /// Underlying I/O message.
        message: String,
    },
}

// ============================================================================
// SECTION: Staging Area
// ============================================================================

/// Staging area for one tenant's generation run.
#[derive(Debug)]
pub struct StagingArea {
    /// Staging directory the run writes into.
    dir: PathBuf,
    /// Staged file names in write order.
    files: Vec<String>,
}

impl StagingArea {
    /// Creates a fresh staging directory, clearing any leftover from an
    /// earlier aborted run.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::Prepare`] when the directory cannot be set up.
    pub fn create(paths: &GenerationPaths, tenant: &TenantId) -> Result<Self, StagingError> {
        let dir = paths.staging_dir(tenant);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|err| StagingError::Prepare {
                path: dir.clone(),
                message: err.to_string(),
            })?;
        }
        fs::create_dir_all(&dir).map_err(|err| StagingError::Prepare {
            path: dir.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    /// Writes a document into the staging area as 2-space-indented JSON with
    /// a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::Write`] when serialization or I/O fails.
    pub fn write_document<T: Serialize>(
        &mut self,
        file_name: &str,
        document: &T,
    ) -> Result<PathBuf, StagingError> {
        let path = self.dir.join(file_name);
        let write_error = |message: String| StagingError::Write {
            file_name: file_name.to_string(),
            message,
        };
        let mut file = fs::File::create(&path).map_err(|err| write_error(err.to_string()))?;
        serde_json::to_writer_pretty(&mut file, document)
            .map_err(|err| write_error(err.to_string()))?;
        file.write_all(b"\n").map_err(|err| write_error(err.to_string()))?;
        self.files.push(file_name.to_string());
        Ok(path)
    }

    /// Returns the staged file names in write order.
    #[must_use]
    pub fn staged_files(&self) -> &[String] {
        &self.files
    }

    /// Discards the staging area, removing every staged file.
    pub fn discard(self) {
        // Best effort: a leftover staging directory is cleared by the next
        // run's `create`.
        let _ = fs::remove_dir_all(&self.dir);
    }

    /// Atomically replaces the published directory with the staged one.
    ///
    /// # Errors
    ///
    /// Returns [`StagingError::Publish`] when the swap fails; the previous
    /// published directory is restored in that case.
    pub fn publish(self, published: &Path) -> Result<Vec<PathBuf>, StagingError> {
        let publish_error = |message: String| StagingError::Publish {
            path: published.to_path_buf(),
            message,
        };
        if let Some(parent) = published.parent() {
            fs::create_dir_all(parent).map_err(|err| publish_error(err.to_string()))?;
        }
        let previous = previous_path(published);
        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|err| publish_error(err.to_string()))?;
        }
        let had_previous = published.exists();
        if had_previous {
            fs::rename(published, &previous).map_err(|err| publish_error(err.to_string()))?;
        }
        if let Err(err) = fs::rename(&self.dir, published) {
            if had_previous {
                let _ = fs::rename(&previous, published);
            }
            return Err(publish_error(err.to_string()));
        }
        if had_previous {
            let _ = fs::remove_dir_all(&previous);
        }
        Ok(self.files.iter().map(|file_name| published.join(file_name)).collect())
    }
}

/// Returns the sibling path holding the previous output during a swap.
fn previous_path(published: &Path) -> PathBuf {
    let mut name = published.file_name().map_or_else(
        || "output".to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    name.push_str(PREV_SUFFIX);
    published.with_file_name(name)
}
