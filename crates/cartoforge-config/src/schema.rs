// crates/cartoforge-config/src/schema.rs
// ============================================================================
// Module: Cartoforge Schema Validator
// Description: JSON-schema-backed implementation of the validator interface.
// Purpose: Check assembled documents against registered service schemas.
// Dependencies: cartoforge-core, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Schemas are compiled once at registration and looked up by reference when
//! a document is validated. Validation is a pure function: document and
//! schema in, violations out, each violation carrying the JSON pointer to the
//! offending value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use cartoforge_core::SchemaAccessError;
use cartoforge_core::SchemaValidator;
use cartoforge_core::SchemaViolation;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;

// ============================================================================
// SECTION: JSON Schema Validator
// ============================================================================

/// Schema validator over compiled JSON schemas keyed by reference.
#[derive(Default)]
pub struct JsonSchemaValidator {
    /// Compiled schemas keyed by their registered reference.
    schemas: BTreeMap<String, Validator>,
}

impl JsonSchemaValidator {
    /// Creates a validator with no registered schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and registers a schema under a reference.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaAccessError::InvalidSchema`] when compilation fails.
    pub fn register(
        &mut self,
        reference: impl Into<String>,
        schema: &Value,
    ) -> Result<(), SchemaAccessError> {
        let reference = reference.into();
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| SchemaAccessError::InvalidSchema {
                reference: reference.clone(),
                message: err.to_string(),
            })?;
        self.schemas.insert(reference, compiled);
        Ok(())
    }

    /// Returns true when a schema is registered under the reference.
    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.schemas.contains_key(reference)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(
        &self,
        document: &Value,
        reference: &str,
    ) -> Result<Vec<SchemaViolation>, SchemaAccessError> {
        let validator = self
            .schemas
            .get(reference)
            .ok_or_else(|| SchemaAccessError::UnknownSchema(reference.to_string()))?;
        Ok(validator
            .iter_errors(document)
            .map(|err| SchemaViolation {
                json_path: err.instance_path().to_string(),
                constraint: err.to_string(),
            })
            .collect())
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}
