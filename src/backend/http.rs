use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::ACCEPT};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{FieldErrors, FieldValue};

use super::{FormBackend, FormRequest, RequestMethod, SubmitResponse, TransportError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const PRECOGNITION: &str = "Precognition";
const PRECOGNITION_VALIDATE_ONLY: &str = "Precognition-Validate-Only";

/// Talks the Laravel Precognition protocol: validation requests carry
/// `Precognition` headers and succeed with 2xx, failures come back as 422
/// with an `errors` object.
#[derive(Debug, Clone)]
pub struct PrecognitionBackend {
    client: Client,
}

impl PrecognitionBackend {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(network)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn request(&self, request: &FormRequest) -> RequestBuilder {
        let builder = self
            .client
            .request(http_method(request.method), &request.url)
            .header(ACCEPT, "application/json");
        match request.method {
            RequestMethod::Get => builder.query(&query_pairs(request)),
            _ => builder.json(&request.data.to_json()),
        }
    }
}

#[async_trait]
impl FormBackend for PrecognitionBackend {
    async fn validate(
        &self,
        request: &FormRequest,
        fields: &[String],
    ) -> Result<FieldErrors, TransportError> {
        let response = self
            .request(request)
            .header(PRECOGNITION, "true")
            .header(PRECOGNITION_VALIDATE_ONLY, fields.join(","))
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(FieldErrors::new());
        }
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.map_err(network)?;
            return parse_error_envelope(&body);
        }
        Err(status_error(response).await)
    }

    async fn submit(&self, request: &FormRequest) -> Result<SubmitResponse, TransportError> {
        let response = self.request(request).send().await.map_err(network)?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(network)?;
            return Ok(SubmitResponse::Accepted(opaque_body(&body)));
        }
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().await.map_err(network)?;
            return parse_error_envelope(&body).map(SubmitResponse::Rejected);
        }
        Err(status_error(response).await)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: IndexMap<String, Messages>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Messages {
    One(String),
    Many(Vec<String>),
}

/// Reads a 422 body, keeping the first message reported for each field.
pub(crate) fn parse_error_envelope(body: &str) -> Result<FieldErrors, TransportError> {
    let envelope: ErrorEnvelope =
        serde_json::from_str(body).map_err(|err| TransportError::Decode(err.to_string()))?;
    Ok(envelope
        .errors
        .into_iter()
        .filter_map(|(field, messages)| match messages {
            Messages::One(message) => Some((field, message)),
            Messages::Many(list) => list.into_iter().next().map(|message| (field, message)),
        })
        .collect())
}

fn opaque_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn query_pairs(request: &FormRequest) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(request.data.len());
    for (name, value) in request.data.iter() {
        let encoded = match value {
            FieldValue::Null => continue,
            FieldValue::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
            FieldValue::Number(number) => number.to_string(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Range(range) => {
                pairs.push((format!("{name}[start]"), range.start.clone()));
                pairs.push((format!("{name}[end]"), range.end.clone()));
                continue;
            }
        };
        pairs.push((name.to_string(), encoded));
    }
    pairs
}

fn http_method(method: RequestMethod) -> Method {
    match method {
        RequestMethod::Get => Method::GET,
        RequestMethod::Post => Method::POST,
        RequestMethod::Put => Method::PUT,
        RequestMethod::Patch => Method::PATCH,
        RequestMethod::Delete => Method::DELETE,
    }
}

async fn status_error(response: Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    TransportError::Status { status, body }
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}
