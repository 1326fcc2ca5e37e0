use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
    backend::{FormBackend, FormRequest, RequestMethod, SubmitResponse},
    domain::{FieldErrors, FieldKind, FieldValue, FormValues, TouchedSet},
};

use super::{
    actions::InputChange,
    convert::coerce_text,
    error::{FormError, SubmitError},
    options::{FormOptions, SubmitOptions},
    pending::{InFlightGuard, PendingSubmit, PendingValidation, SubmissionGuard, ValidationOutcome},
    state::{Baseline, FormState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Change,
    Blur,
    Explicit,
}

/// Owns the values, errors and touched set of one form session and bridges
/// every field to the backend's validation endpoint.
pub struct FormController<B> {
    id: String,
    method: RequestMethod,
    url: String,
    options: FormOptions,
    baseline: Arc<Baseline>,
    state: Arc<Mutex<FormState>>,
    backend: Arc<B>,
}

impl<B> fmt::Debug for FormController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("options", &self.options)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl<B: FormBackend + 'static> FormController<B> {
    pub fn new(
        id: impl Into<String>,
        method: RequestMethod,
        url: impl Into<String>,
        initial: FormValues,
        backend: B,
    ) -> Self {
        Self::with_options(id, method, url, initial, backend, FormOptions::default())
    }

    pub fn with_options(
        id: impl Into<String>,
        method: RequestMethod,
        url: impl Into<String>,
        initial: FormValues,
        backend: B,
        options: FormOptions,
    ) -> Self {
        Self::with_shared_backend(id, method, url, initial, Arc::new(backend), options)
    }

    /// Builds a controller over a backend shared with other forms.
    pub fn with_shared_backend(
        id: impl Into<String>,
        method: RequestMethod,
        url: impl Into<String>,
        initial: FormValues,
        backend: Arc<B>,
        options: FormOptions,
    ) -> Self {
        let id = id.into();
        let url = url.into();
        tracing::debug!(form = %id, %method, %url, fields = initial.len(), "form controller created");
        Self {
            id,
            method,
            url,
            options,
            baseline: Arc::new(Baseline::capture(&initial)),
            state: Arc::new(Mutex::new(FormState::new(initial))),
            backend,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn initial(&self) -> &FormValues {
        &self.baseline.values
    }

    pub fn data(&self) -> FormValues {
        self.state.lock().values.clone()
    }

    pub fn value(&self, name: &str) -> Option<FieldValue> {
        self.state.lock().values.get(name).cloned()
    }

    pub fn errors(&self) -> FieldErrors {
        self.state.lock().errors.clone()
    }

    pub fn error(&self, name: &str) -> Option<String> {
        self.state.lock().errors.get(name).map(str::to_string)
    }

    pub fn has_errors(&self) -> bool {
        !self.state.lock().errors.is_empty()
    }

    pub fn touched(&self) -> TouchedSet {
        self.state.lock().touched.clone()
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.state.lock().touched.contains(name)
    }

    /// Deep comparison against the values captured at construction.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().values != self.baseline.values
    }

    pub fn is_processing(&self) -> bool {
        self.state.lock().is_processing()
    }

    pub fn is_validating(&self, name: &str) -> bool {
        self.state.lock().is_validating(name)
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub(crate) fn kind_of(&self, name: &str) -> Result<FieldKind, FormError> {
        self.baseline
            .kinds
            .get(name)
            .copied()
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Type-checked write without touching or validating the field.
    pub fn set_data(&self, name: &str, value: impl Into<FieldValue>) -> Result<(), FormError> {
        self.write(name, value.into(), false)
    }

    /// Writes the value, marks the field touched and validates it.
    pub fn set_value(
        &self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<PendingValidation, FormError> {
        self.write(name, value.into(), true)?;
        Ok(self.dispatch(vec![name.to_string()], Trigger::Change))
    }

    /// Applies a change reported by a named input control.
    pub fn handle_input(&self, change: InputChange) -> Result<PendingValidation, FormError> {
        let name = change.name().to_string();
        let kind = self.kind_of(&name)?;
        let value = match change {
            InputChange::Text { value, .. } => coerce_text(&name, kind, &value)?,
            InputChange::Checked { checked, .. } => FieldValue::Bool(checked),
        };
        self.set_value(&name, value)
    }

    pub fn touch(&self, name: &str) -> Result<(), FormError> {
        self.kind_of(name)?;
        self.state.lock().touched.insert(name.to_string());
        Ok(())
    }

    /// Marks the fields touched and validates them as a blur would.
    pub fn blur(&self, names: &[&str]) -> Result<PendingValidation, FormError> {
        let fields = self.known_fields(names)?;
        Ok(self.blur_fields(fields))
    }

    pub fn set_errors(&self, errors: FieldErrors) {
        self.state.lock().errors = errors;
    }

    pub fn clear_errors(&self) {
        self.state.lock().errors.clear();
    }

    /// Restores the initial values and clears errors. Touched fields stay
    /// touched; answers to validations still in flight are ignored.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.supersede_all();
        state.values = self.baseline.values.clone();
        state.errors.clear();
    }

    /// Detaches the controller: answers arriving from now on are ignored.
    pub fn dispose(&self) {
        self.state.lock().disposed = true;
        tracing::debug!(form = %self.id, "form controller disposed");
    }

    pub fn validate(&self, name: &str) -> Result<PendingValidation, FormError> {
        self.validate_fields(&[name])
    }

    pub fn validate_fields(&self, names: &[&str]) -> Result<PendingValidation, FormError> {
        let fields = self.known_fields(names)?;
        Ok(self.dispatch(fields, Trigger::Explicit))
    }

    pub fn validate_all(&self) -> PendingValidation {
        let fields = self.baseline.kinds.keys().cloned().collect();
        self.dispatch(fields, Trigger::Explicit)
    }

    /// Sends the whole form. Calling again while a submission is pending
    /// resolves to [`SubmitError::InFlight`] without contacting the backend.
    pub fn submit(&self, options: SubmitOptions) -> PendingSubmit {
        let (id, data) = {
            let mut state = self.state.lock();
            if state.disposed {
                return PendingSubmit::ready(Err(SubmitError::Disposed));
            }
            let Some(id) = state.begin_submission() else {
                tracing::debug!(form = %self.id, "submit ignored: already in flight");
                return PendingSubmit::ready(Err(SubmitError::InFlight));
            };
            (id, state.values.clone())
        };
        tracing::debug!(form = %self.id, method = %self.method, url = %self.url, "submitting form");

        let guard = SubmissionGuard::new(Arc::downgrade(&self.state), id);
        let weak = Arc::downgrade(&self.state);
        let backend = Arc::clone(&self.backend);
        let baseline = Arc::clone(&self.baseline);
        let request = self.request(data);
        PendingSubmit::new(async move {
            let _guard = guard;
            let response = backend.submit(&request).await;
            let Some(shared) = weak.upgrade() else {
                return Err(SubmitError::Disposed);
            };
            let outcome = {
                let mut state = shared.lock();
                if state.disposed {
                    return Err(SubmitError::Disposed);
                }
                state.end_submission(id);
                match response {
                    Ok(SubmitResponse::Accepted(body)) => {
                        state.errors.clear();
                        if options.reset_on_success {
                            state.supersede_all();
                            state.values = baseline.values.clone();
                        } else {
                            state.supersede_before(id);
                        }
                        Ok(body)
                    }
                    Ok(SubmitResponse::Rejected(errors)) => {
                        tracing::debug!(form = %request.form_id, count = errors.len(), "submission rejected");
                        state.supersede_before(id);
                        state.errors = errors.clone();
                        Err(SubmitError::Rejected(errors))
                    }
                    Err(err) => {
                        tracing::warn!(form = %request.form_id, "submission failed: {err}");
                        Err(SubmitError::Transport(err))
                    }
                }
            };
            if let (Ok(body), Some(callback)) = (&outcome, options.on_success) {
                callback(body);
            }
            outcome
        })
    }

    pub(crate) fn check_kind(&self, name: &str, value: &FieldValue) -> Result<(), FormError> {
        let expected = self.kind_of(name)?;
        if expected.accepts(value) {
            Ok(())
        } else {
            Err(FormError::TypeMismatch {
                field: name.to_string(),
                expected,
                found: value.kind(),
            })
        }
    }

    pub(crate) fn write(&self, name: &str, value: FieldValue, touch: bool) -> Result<(), FormError> {
        self.check_kind(name, &value)?;
        let mut state = self.state.lock();
        state.values.replace(name, value);
        if touch {
            state.touched.insert(name.to_string());
        }
        Ok(())
    }

    pub(crate) fn blur_fields(&self, fields: Vec<String>) -> PendingValidation {
        {
            let mut state = self.state.lock();
            for field in &fields {
                state.touched.insert(field.clone());
            }
        }
        self.dispatch(fields, Trigger::Blur)
    }

    /// Allocates tickets now; the request itself runs when the returned
    /// future is polled.
    pub(crate) fn dispatch(&self, fields: Vec<String>, trigger: Trigger) -> PendingValidation {
        let enabled = match trigger {
            Trigger::Change => self.options.validate_on_change,
            Trigger::Blur => self.options.validate_on_blur,
            Trigger::Explicit => true,
        };
        if !enabled || fields.is_empty() {
            return PendingValidation::ready(fields, ValidationOutcome::Skipped);
        }

        let (tickets, data) = {
            let mut state = self.state.lock();
            if state.disposed {
                return PendingValidation::ready(fields, ValidationOutcome::Discarded);
            }
            (state.issue_tickets(&fields), state.values.clone())
        };
        tracing::debug!(form = %self.id, ?fields, ?trigger, "validation dispatched");

        let guard = InFlightGuard::new(Arc::downgrade(&self.state), tickets.clone());
        let weak = Arc::downgrade(&self.state);
        let backend = Arc::clone(&self.backend);
        let debounce = self.options.debounce;
        let mut request = self.request(data);
        let only = fields.clone();
        PendingValidation::new(fields, async move {
            let _guard = guard;
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
                let Some(shared) = weak.upgrade() else {
                    return ValidationOutcome::Discarded;
                };
                let state = shared.lock();
                if state.disposed {
                    return ValidationOutcome::Discarded;
                }
                if tickets.iter().all(|ticket| !state.is_latest(ticket)) {
                    tracing::debug!(form = %request.form_id, fields = ?only, "debounced validation replaced");
                    return ValidationOutcome::Settled {
                        applied: Vec::new(),
                        superseded: only,
                    };
                }
                request.data = state.values.clone();
            }

            let response = backend.validate(&request, &only).await;

            let Some(shared) = weak.upgrade() else {
                return ValidationOutcome::Discarded;
            };
            let mut state = shared.lock();
            if state.disposed {
                return ValidationOutcome::Discarded;
            }
            match response {
                Ok(errors) => {
                    let (applied, superseded) = state.apply_validation(&tickets, &errors);
                    if !superseded.is_empty() {
                        tracing::debug!(form = %request.form_id, ?superseded, "stale validation response ignored");
                    }
                    ValidationOutcome::Settled {
                        applied,
                        superseded,
                    }
                }
                Err(err) => {
                    tracing::warn!(form = %request.form_id, fields = ?only, "validation failed: {err}");
                    ValidationOutcome::Failed(err)
                }
            }
        })
    }

    fn known_fields(&self, names: &[&str]) -> Result<Vec<String>, FormError> {
        names
            .iter()
            .map(|name| self.kind_of(name).map(|_| name.to_string()))
            .collect()
    }

    fn request(&self, data: FormValues) -> FormRequest {
        FormRequest {
            form_id: self.id.clone(),
            method: self.method,
            url: self.url.clone(),
            data,
        }
    }
}
