use anyhow::{Context, Result};
use async_trait::async_trait;
use jsonschema::{ValidationError, Validator, error::ValidationErrorKind, validator_for};
use serde_json::Value;

use crate::domain::{FieldErrors, FormValues};

use super::{FormBackend, FormRequest, SubmitResponse, TransportError};

/// Validates forms locally against a JSON Schema instead of a server.
pub struct SchemaBackend {
    validator: Validator,
}

impl std::fmt::Debug for SchemaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaBackend").finish_non_exhaustive()
    }
}

impl SchemaBackend {
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = validator_for(schema).context("failed to compile JSON schema")?;
        Ok(Self { validator })
    }

    /// First error per top-level field for the whole document.
    pub fn collect_errors(&self, data: &FormValues) -> FieldErrors {
        let value = data.to_json();
        let mut errors = FieldErrors::new();
        for error in self.validator.iter_errors(&value) {
            let Some(field) = field_for(&error) else {
                tracing::debug!("schema error without field: {error}");
                continue;
            };
            if !errors.contains(&field) {
                errors.insert(field, error.to_string());
            }
        }
        errors
    }
}

#[async_trait]
impl FormBackend for SchemaBackend {
    async fn validate(
        &self,
        request: &FormRequest,
        fields: &[String],
    ) -> Result<FieldErrors, TransportError> {
        Ok(self.collect_errors(&request.data).restricted_to(fields))
    }

    async fn submit(&self, request: &FormRequest) -> Result<SubmitResponse, TransportError> {
        let errors = self.collect_errors(&request.data);
        if errors.is_empty() {
            Ok(SubmitResponse::Accepted(request.data.to_json()))
        } else {
            Ok(SubmitResponse::Rejected(errors))
        }
    }
}

fn field_for(error: &ValidationError<'_>) -> Option<String> {
    let pointer = error.instance_path.to_string();
    if let Some(segment) = pointer
        .strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .filter(|segment| !segment.is_empty())
    {
        return Some(segment.replace("~1", "/").replace("~0", "~"));
    }
    match &error.kind {
        ValidationErrorKind::Required { property } => property.as_str().map(str::to_string),
        _ => None,
    }
}
