use std::{fmt, time::Duration};

use serde_json::Value;

use crate::date::DateFormat;

#[derive(Debug, Clone)]
pub struct FormOptions {
    pub debounce: Duration,
    pub validate_on_change: bool,
    pub validate_on_blur: bool,
    pub date_format: DateFormat,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::ZERO,
            validate_on_change: true,
            validate_on_blur: true,
            date_format: DateFormat::from_env(),
        }
    }
}

impl FormOptions {
    /// Delay before a validation request is sent; a newer change to the same
    /// field within the window replaces the pending request.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    pub fn with_validate_on_blur(mut self, enabled: bool) -> Self {
        self.validate_on_blur = enabled;
        self
    }

    pub fn with_date_format(mut self, date_format: DateFormat) -> Self {
        self.date_format = date_format;
        self
    }
}

type SuccessCallback = Box<dyn FnOnce(&Value) + Send + 'static>;

#[derive(Default)]
pub struct SubmitOptions {
    pub(crate) reset_on_success: bool,
    pub(crate) on_success: Option<SuccessCallback>,
}

impl fmt::Debug for SubmitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitOptions")
            .field("reset_on_success", &self.reset_on_success)
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the initial values once the backend accepts the submission.
    pub fn with_reset_on_success(mut self, reset: bool) -> Self {
        self.reset_on_success = reset;
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }
}
