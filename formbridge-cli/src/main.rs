use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use formbridge::{
    DateFormat, FieldValue, FormBackend, FormController, FormOptions, FormValues,
    PrecognitionBackend, RequestMethod, SchemaBackend, SubmitError, SubmitOptions,
    ValidationOutcome,
    io::{
        DocumentFormat, FormReport, OutputDestination, OutputOptions, emit,
        form_values_from_value, parse_assignment, parse_document_str,
    },
};

const LOCAL_URL: &str = "schema://local";

#[derive(Debug, Parser)]
#[command(
    name = "formbridge",
    version,
    about = "Drive a form session against a validation endpoint or a local JSON Schema"
)]
struct Cli {
    /// Initial form data: file path, inline payload, or "-" for stdin
    #[arg(short = 'd', long = "data", value_name = "SPEC")]
    data: String,

    /// Endpoint receiving validation and submit requests
    #[arg(long = "url", value_name = "URL", required_unless_present = "schema", conflicts_with = "schema")]
    url: Option<String>,

    /// HTTP method used for every request
    #[arg(short = 'm', long = "method", value_name = "METHOD", default_value = "post")]
    method: RequestMethod,

    /// Validate locally against a JSON Schema (file path, inline payload, or "-")
    #[arg(short = 's', long = "schema", value_name = "SPEC")]
    schema: Option<String>,

    /// Change a field as a user would ("name=value"; value read as JSON, else text)
    #[arg(long = "set", value_name = "NAME=VALUE", action = ArgAction::Append)]
    set: Vec<String>,

    /// Blur a field, marking it touched and validating it
    #[arg(long = "blur", value_name = "NAME", action = ArgAction::Append)]
    blur: Vec<String>,

    /// Validate a field explicitly
    #[arg(long = "validate", value_name = "NAME", action = ArgAction::Append)]
    validate: Vec<String>,

    /// Validate every field of the form
    #[arg(long = "validate-all")]
    validate_all: bool,

    /// Submit the form after all other steps
    #[arg(long = "submit")]
    submit: bool,

    /// Display pattern for date fields (defaults to $APP_DATE_FORMAT or yyyy-MM-dd)
    #[arg(long = "date-format", value_name = "PATTERN")]
    date_format: Option<String>,

    /// Wait this long after a change before validating it
    #[arg(long = "debounce-ms", value_name = "MS", default_value_t = 0)]
    debounce_ms: u64,

    /// Report destinations ("-" writes to stdout). Defaults to stdout.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Emit compact output rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut diagnostics = DiagnosticCollector::default();
    if cli.data == "-" && cli.schema.as_deref() == Some("-") {
        diagnostics.push_input(
            "data/schema",
            "cannot read data and schema from stdin simultaneously; provide inline content or files",
        );
    }
    let initial = load_labeled(&cli.data, "data", &mut diagnostics)
        .and_then(|value| match form_values_from_value(&value) {
            Ok(values) => Some(values),
            Err(err) => {
                diagnostics.push_input("data", err.to_string());
                None
            }
        });
    let schema = cli
        .schema
        .as_deref()
        .and_then(|spec| load_labeled(spec, "schema", &mut diagnostics));
    let output = build_output_options(&cli, &mut diagnostics);
    let options = build_form_options(&cli, &mut diagnostics);
    diagnostics.into_result()?;

    let initial = initial.ok_or_else(|| eyre!("no form data loaded"))?;
    let session = Session {
        cli: &cli,
        initial,
        options,
        output,
    };
    match schema {
        Some(schema) => {
            let backend = SchemaBackend::new(&schema).map_err(|err| eyre!("{err:#}"))?;
            session.run(backend, LOCAL_URL).await
        }
        None => {
            let url = cli.url.as_deref().ok_or_else(|| eyre!("provide --url or --schema"))?;
            let backend = PrecognitionBackend::new().wrap_err("failed to build HTTP client")?;
            session.run(backend, url).await
        }
    }
}

struct Session<'a> {
    cli: &'a Cli,
    initial: FormValues,
    options: FormOptions,
    output: OutputOptions,
}

impl Session<'_> {
    async fn run<B: FormBackend + 'static>(self, backend: B, url: &str) -> Result<ExitCode> {
        let cli = self.cli;
        tracing::debug!(%url, method = %cli.method, "starting form session");
        let form = FormController::with_options("cli", cli.method, url, self.initial, backend, self.options);
        let mut outcome = Outcome::default();

        for raw in &cli.set {
            let (name, value) = parse_assignment(raw).map_err(|err| eyre!("{err:#}"))?;
            let value = FieldValue::from_json(&value)
                .ok_or_else(|| eyre!("--set {name}: value must be a scalar or {{start, end}} range"))?;
            let pending = form.set_value(&name, value).wrap_err_with(|| format!("--set {name}"))?;
            outcome.validation(pending.await);
        }
        if !cli.blur.is_empty() {
            let names: Vec<&str> = cli.blur.iter().map(String::as_str).collect();
            outcome.validation(form.blur(&names)?.await);
        }
        if !cli.validate.is_empty() {
            let names: Vec<&str> = cli.validate.iter().map(String::as_str).collect();
            outcome.validation(form.validate_fields(&names)?.await);
        }
        if cli.validate_all {
            outcome.validation(form.validate_all().await);
        }
        if cli.submit {
            outcome.submission(form.submit(SubmitOptions::new()).await);
        }

        let report = FormReport::capture(&form).with_outcome(outcome.label());
        emit(&report, &self.output).map_err(|err| eyre!("{err:#}"))?;
        Ok(if outcome.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    }
}

#[derive(Debug, Default)]
struct Outcome {
    label: Option<String>,
    failed: bool,
}

impl Outcome {
    fn validation(&mut self, outcome: ValidationOutcome) {
        if let ValidationOutcome::Failed(err) = &outcome {
            self.failed = true;
            self.label = Some(format!("validation failed: {err}"));
        } else if self.label.is_none() && outcome.is_settled() {
            self.label = Some("validated".into());
        }
    }

    fn submission(&mut self, result: Result<Value, SubmitError>) {
        match result {
            Ok(_) => self.label = Some("submitted".into()),
            Err(err) => {
                self.failed = true;
                self.label = Some(match err {
                    SubmitError::Rejected(_) => "rejected".to_string(),
                    other => format!("submit failed: {other}"),
                });
            }
        }
    }

    fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| "unchanged".into())
    }
}

fn build_form_options(cli: &Cli, diagnostics: &mut DiagnosticCollector) -> FormOptions {
    let mut options = FormOptions::default().with_debounce(Duration::from_millis(cli.debounce_ms));
    if let Some(pattern) = cli.date_format.as_deref() {
        match DateFormat::parse(pattern) {
            Ok(format) => options = options.with_date_format(format),
            Err(err) => diagnostics.push_input("date-format", err.to_string()),
        }
    }
    options
}

fn load_labeled(spec: &str, label: &str, diagnostics: &mut DiagnosticCollector) -> Option<Value> {
    let format = if spec == "-" {
        DocumentFormat::default()
    } else {
        DocumentFormat::from_path(Path::new(spec)).unwrap_or_default()
    };
    match load_value(spec, format, label) {
        Ok(value) => Some(value),
        Err(err) => {
            diagnostics.push_input(label, format!("{err:#}"));
            None
        }
    }
}

fn load_value(spec: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return parse_contents(&contents, format, label);
    }

    let path = PathBuf::from(spec);
    match read_from_source(&InputSource::File(path.clone())) {
        Ok(contents) => parse_contents(&contents, format, label),
        Err(err) => {
            if is_not_found(&err) {
                let inline_label = format!("inline {label}");
                return parse_contents(spec, format, &inline_label);
            }
            Err(err.wrap_err(format!("failed to load {label} from {}", path.display())))
        }
    }
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

fn is_not_found(err: &Report) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    match parse_document_str(contents, format) {
        Ok(value) => Ok(value),
        Err(primary) => {
            for candidate in DocumentFormat::available_formats() {
                if candidate == format {
                    continue;
                }
                if let Ok(value) = parse_document_str(contents, candidate) {
                    return Ok(value);
                }
            }
            Err(eyre!(
                "failed to parse {label}: tried {} (first error: {primary:#})",
                format_list()
            ))
        }
    }
}

fn format_list() -> String {
    let items: Vec<String> = DocumentFormat::available_formats()
        .into_iter()
        .map(|fmt| fmt.to_string())
        .collect();
    items.join(", ")
}

fn build_output_options(cli: &Cli, diagnostics: &mut DiagnosticCollector) -> OutputOptions {
    let mut destinations = Vec::new();
    let mut format: Option<DocumentFormat> = None;
    for raw in &cli.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
            continue;
        }
        if raw == "-" {
            destinations.push(OutputDestination::Stdout);
            continue;
        }
        let path = PathBuf::from(raw);
        match (DocumentFormat::from_path(&path), format) {
            (None, _) => diagnostics.push_output(format!(
                "cannot infer format from output file {}; use one of {}",
                path.display(),
                format_list()
            )),
            (Some(found), Some(existing)) if found != existing => {
                diagnostics.push_output(format!(
                    "output file {} uses {found} but other destinations use {existing}; align extensions",
                    path.display()
                ))
            }
            (Some(found), _) => format = Some(found),
        }
        destinations.push(OutputDestination::File(path));
    }
    if destinations.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }
    OutputOptions::new(format.unwrap_or_default())
        .with_pretty(!cli.no_pretty)
        .with_destinations(destinations)
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}
