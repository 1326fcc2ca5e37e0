//! Field bindings handed to presentation controls.
//!
//! A binding is a snapshot of one field (or field pair) taken when it is
//! registered, plus handlers that route changes back through the controller.
//! Controls never touch values or errors directly; register again after a
//! change to observe the new state.

use crate::{
    backend::FormBackend,
    domain::{DateRange, FieldKind, FieldValue},
};

use super::{
    controller::{FormController, Trigger},
    convert::coerce_text,
    error::FormError,
    pending::PendingValidation,
};

/// Binding for scalar inputs (text, number, select, combo box).
#[derive(Debug)]
pub struct FieldBinding<'a, B> {
    controller: &'a FormController<B>,
    pub name: String,
    pub value: FieldValue,
    pub error: Option<String>,
}

impl<B: FormBackend + 'static> FieldBinding<'_, B> {
    pub fn on_change(
        &self,
        value: impl Into<FieldValue>,
    ) -> Result<PendingValidation, FormError> {
        self.controller.set_value(&self.name, value)
    }

    pub fn on_blur(&self) -> PendingValidation {
        self.controller.blur_fields(vec![self.name.clone()])
    }
}

/// Binding for controls that report raw text, coerced by the field's kind.
#[derive(Debug)]
pub struct TextBinding<'a, B> {
    controller: &'a FormController<B>,
    kind: FieldKind,
    pub name: String,
    pub value: String,
    pub error: Option<String>,
}

impl<B: FormBackend + 'static> TextBinding<'_, B> {
    pub fn on_input(&self, raw: &str) -> Result<PendingValidation, FormError> {
        let value = coerce_text(&self.name, self.kind, raw)?;
        self.controller.set_value(&self.name, value)
    }

    pub fn on_blur(&self) -> PendingValidation {
        self.controller.blur_fields(vec![self.name.clone()])
    }
}

/// Binding for checkboxes and switches. `checked` and `is_selected` carry the
/// same flag for controls reading either property.
#[derive(Debug)]
pub struct CheckboxBinding<'a, B> {
    controller: &'a FormController<B>,
    pub name: String,
    pub checked: bool,
    pub is_selected: bool,
    pub has_error: bool,
    pub error: Option<String>,
}

impl<B: FormBackend + 'static> CheckboxBinding<'_, B> {
    pub fn on_change(&self, checked: bool) -> Result<PendingValidation, FormError> {
        self.controller.set_value(&self.name, checked)
    }

    pub fn on_blur(&self) -> PendingValidation {
        self.controller.blur_fields(vec![self.name.clone()])
    }
}

/// Single date picker. `value` is canonical ISO; the field stores the
/// application display format.
#[derive(Debug)]
pub struct DateBinding<'a, B> {
    controller: &'a FormController<B>,
    pub name: String,
    pub value: Option<String>,
    pub error: Option<String>,
}

impl<B: FormBackend + 'static> DateBinding<'_, B> {
    pub fn on_change(&self, iso: Option<&str>) -> Result<PendingValidation, FormError> {
        let stored = self.controller.display_value(iso);
        self.controller.set_value(&self.name, stored)
    }

    pub fn on_blur(&self) -> PendingValidation {
        self.controller.blur_fields(vec![self.name.clone()])
    }
}

/// Two scalar date fields presented as one range picker.
#[derive(Debug)]
pub struct DateRangeBinding<'a, B> {
    controller: &'a FormController<B>,
    start: String,
    end: String,
    pub name: String,
    /// Both ends in ISO, or `None` unless both parse.
    pub value: Option<DateRange>,
    pub error: Option<String>,
}

impl<B: FormBackend + 'static> DateRangeBinding<'_, B> {
    pub fn start_field(&self) -> &str {
        &self.start
    }

    pub fn end_field(&self) -> &str {
        &self.end
    }

    /// Writes both ends (or clears both) and validates each of them.
    pub fn on_change(&self, range: Option<DateRange>) -> Result<PendingValidation, FormError> {
        let (start, end) = match range {
            Some(range) => (
                self.controller.display_value(Some(&range.start)),
                self.controller.display_value(Some(&range.end)),
            ),
            None => (FieldValue::Null, FieldValue::Null),
        };
        self.controller.check_kind(&self.start, &start)?;
        self.controller.check_kind(&self.end, &end)?;
        self.controller.write(&self.start, start, true)?;
        self.controller.write(&self.end, end, true)?;
        let first = self
            .controller
            .dispatch(vec![self.start.clone()], Trigger::Change);
        let second = self
            .controller
            .dispatch(vec![self.end.clone()], Trigger::Change);
        Ok(first.then(second))
    }

    pub fn on_blur(&self) -> PendingValidation {
        let first = self.controller.blur_fields(vec![self.start.clone()]);
        let second = self.controller.blur_fields(vec![self.end.clone()]);
        first.then(second)
    }
}

impl<B: FormBackend + 'static> FormController<B> {
    pub fn register(&self, name: &str) -> Result<FieldBinding<'_, B>, FormError> {
        self.kind_of(name)?;
        Ok(FieldBinding {
            controller: self,
            name: name.to_string(),
            value: self.value(name).unwrap_or(FieldValue::Null),
            error: self.error(name),
        })
    }

    pub fn register_text(&self, name: &str) -> Result<TextBinding<'_, B>, FormError> {
        let kind = self.kind_of(name)?;
        if kind == FieldKind::Range {
            return Err(mismatch(name, FieldKind::Text, kind));
        }
        let value = match self.value(name) {
            Some(FieldValue::Text(text)) => text,
            Some(FieldValue::Number(number)) => number.to_string(),
            Some(FieldValue::Bool(flag)) => flag.to_string(),
            _ => String::new(),
        };
        Ok(TextBinding {
            controller: self,
            kind,
            name: name.to_string(),
            value,
            error: self.error(name),
        })
    }

    pub fn register_checkbox(&self, name: &str) -> Result<CheckboxBinding<'_, B>, FormError> {
        let kind = self.kind_of(name)?;
        if !matches!(kind, FieldKind::Bool | FieldKind::Null) {
            return Err(mismatch(name, FieldKind::Bool, kind));
        }
        let checked = self.value(name).is_some_and(|value| value.is_truthy());
        let error = self.error(name);
        Ok(CheckboxBinding {
            controller: self,
            name: name.to_string(),
            checked,
            is_selected: checked,
            has_error: error.is_some(),
            error,
        })
    }

    pub fn register_date(&self, name: &str) -> Result<DateBinding<'_, B>, FormError> {
        self.expect_date_field(name)?;
        Ok(DateBinding {
            controller: self,
            name: name.to_string(),
            value: self.iso_value(name),
            error: self.error(name),
        })
    }

    pub fn register_date_range(
        &self,
        start: &str,
        end: &str,
    ) -> Result<DateRangeBinding<'_, B>, FormError> {
        self.expect_date_field(start)?;
        self.expect_date_field(end)?;
        let value = match (self.iso_value(start), self.iso_value(end)) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        };
        Ok(DateRangeBinding {
            controller: self,
            start: start.to_string(),
            end: end.to_string(),
            name: format!("{start}_{end}"),
            value,
            error: self.error(start).or_else(|| self.error(end)),
        })
    }

    fn expect_date_field(&self, name: &str) -> Result<(), FormError> {
        let kind = self.kind_of(name)?;
        if matches!(kind, FieldKind::Text | FieldKind::Null) {
            Ok(())
        } else {
            Err(mismatch(name, FieldKind::Text, kind))
        }
    }

    fn iso_value(&self, name: &str) -> Option<String> {
        let value = self.value(name)?;
        self.options().date_format.to_iso(value.as_str()?)
    }

    fn display_value(&self, iso: Option<&str>) -> FieldValue {
        match iso {
            Some(iso) if !iso.is_empty() => {
                FieldValue::Text(self.options().date_format.from_iso(iso))
            }
            _ => FieldValue::Null,
        }
    }
}

fn mismatch(name: &str, expected: FieldKind, found: FieldKind) -> FormError {
    FormError::TypeMismatch {
        field: name.to_string(),
        expected,
        found,
    }
}
