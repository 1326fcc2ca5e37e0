use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::domain::FormValues;

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).with_context(|| "failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).with_context(|| "failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => contents
            .parse::<toml::Value>()
            .with_context(|| "failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Parse a document into initial form values. The top level must be an object
/// of scalars and `{start, end}` ranges.
pub fn parse_form_values(contents: &str, format: DocumentFormat) -> Result<FormValues> {
    let value = parse_document_str(contents, format)?;
    form_values_from_value(&value)
}

pub fn form_values_from_value(value: &Value) -> Result<FormValues> {
    FormValues::from_json(value).map_err(|message| anyhow!(message))
}

/// Parse a `name=value` assignment. The value is read as JSON when possible
/// and as a plain string otherwise.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}
