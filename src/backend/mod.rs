use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{FieldErrors, FormValues};

#[cfg(feature = "http")]
mod http;
mod schema;

#[cfg(feature = "http")]
pub use http::PrecognitionBackend;
pub use schema::SchemaBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported request method '{0}'")]
pub struct UnknownMethod(pub String);

impl FromStr for RequestMethod {
    type Err = UnknownMethod;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(RequestMethod::Get),
            "post" => Ok(RequestMethod::Post),
            "put" => Ok(RequestMethod::Put),
            "patch" => Ok(RequestMethod::Patch),
            "delete" => Ok(RequestMethod::Delete),
            _ => Err(UnknownMethod(raw.to_string())),
        }
    }
}

/// Everything a backend needs to validate or submit one form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRequest {
    pub form_id: String,
    pub method: RequestMethod,
    pub url: String,
    pub data: FormValues,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResponse {
    /// Opaque success payload (`Value::Null` when the server sent no body).
    Accepted(Value),
    Rejected(FieldErrors),
}

/// Failure to obtain an answer from the backend at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Server-side validation capability a form controller talks to.
#[async_trait]
pub trait FormBackend: Send + Sync {
    /// Validates the listed fields against the full form data. Returns the
    /// errors reported for the request; an empty map means they passed.
    async fn validate(
        &self,
        request: &FormRequest,
        fields: &[String],
    ) -> Result<FieldErrors, TransportError>;

    async fn submit(&self, request: &FormRequest) -> Result<SubmitResponse, TransportError>;
}
