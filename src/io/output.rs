use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    backend::FormBackend,
    domain::{FieldErrors, FormValues},
    form::FormController,
};

use super::DocumentFormat;

/// Destination for serialized reports.
#[derive(Debug, Clone)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    pub fn file(path: impl AsRef<Path>) -> Self {
        OutputDestination::File(path.as_ref().to_path_buf())
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: DocumentFormat,
    pub pretty: bool,
    pub destinations: Vec<OutputDestination>,
}

impl OutputOptions {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            pretty: true,
            destinations: vec![OutputDestination::Stdout],
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<OutputDestination>) -> Self {
        self.destinations = destinations;
        self
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(DocumentFormat::Json)
    }
}

/// Snapshot of a controller suitable for printing or persisting.
#[derive(Debug, Clone, Serialize)]
pub struct FormReport {
    pub id: String,
    pub dirty: bool,
    pub processing: bool,
    pub touched: Vec<String>,
    pub errors: FieldErrors,
    pub data: FormValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl FormReport {
    pub fn capture<B: FormBackend + 'static>(controller: &FormController<B>) -> Self {
        Self {
            id: controller.id().to_string(),
            dirty: controller.is_dirty(),
            processing: controller.is_processing(),
            touched: controller.touched().into_iter().collect(),
            errors: controller.errors(),
            data: controller.data(),
            outcome: None,
        }
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }
}

pub fn emit<T: Serialize>(report: &T, options: &OutputOptions) -> Result<()> {
    if options.destinations.is_empty() {
        return Ok(());
    }
    let payload = serialize(report, options)?;
    for destination in &options.destinations {
        write_payload(destination, &payload).with_context(|| match destination {
            OutputDestination::Stdout => "failed to write to stdout".to_string(),
            OutputDestination::File(path) => {
                format!("failed to write to file {}", path.display())
            }
        })?;
    }
    Ok(())
}

fn serialize<T: Serialize>(report: &T, options: &OutputOptions) -> Result<String> {
    match options.format {
        DocumentFormat::Json => {
            if options.pretty {
                serde_json::to_string_pretty(report).context("failed to serialize JSON")
            } else {
                serde_json::to_string(report).context("failed to serialize JSON")
            }
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(report).context("failed to serialize YAML"),
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => {
            if options.pretty {
                toml::to_string_pretty(report).context("failed to serialize TOML")
            } else {
                toml::to_string(report).context("failed to serialize TOML")
            }
        }
    }
}

fn write_payload(destination: &OutputDestination, payload: &str) -> Result<()> {
    match destination {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout
                .write_all(payload.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("failed to write stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
        OutputDestination::File(path) => {
            let mut file = File::create(path)?;
            file.write_all(payload.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::RequestMethod, backend::SchemaBackend, form::FormOptions};
    use serde_json::json;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn controller() -> FormController<SchemaBackend> {
        let backend = SchemaBackend::new(&json!({"type": "object"})).unwrap();
        FormController::with_options(
            "contact-form",
            RequestMethod::Post,
            "/contacts",
            FormValues::new().with("email", "ada@example.com"),
            backend,
            FormOptions::default(),
        )
    }

    #[test]
    fn report_reflects_controller_state() {
        let controller = controller();
        controller.set_data("email", "grace@example.com").unwrap();
        controller.touch("email").unwrap();
        let report = FormReport::capture(&controller).with_outcome("validated");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["id"], json!("contact-form"));
        assert_eq!(value["dirty"], json!(true));
        assert_eq!(value["touched"], json!(["email"]));
        assert_eq!(value["data"]["email"], json!("grace@example.com"));
        assert_eq!(value["outcome"], json!("validated"));
    }

    #[test]
    fn empty_destinations_are_a_noop() {
        let options = OutputOptions::default().with_destinations(Vec::new());
        emit(&json!({"ok": true}), &options).unwrap();
    }

    #[test]
    fn writes_to_file_destination() {
        let filename = format!(
            "formbridge-test-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        let path = std::env::temp_dir().join(filename);
        let options = OutputOptions::default()
            .with_pretty(false)
            .with_destinations(vec![OutputDestination::file(&path)]);
        let report = FormReport::capture(&controller());
        emit(&report, &options).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"contact-form\""));
        let _ = fs::remove_file(path);
    }
}
