mod actions;
mod binding;
mod controller;
mod convert;
mod error;
mod options;
mod pending;
mod state;

pub use actions::InputChange;
pub use binding::{CheckboxBinding, DateBinding, DateRangeBinding, FieldBinding, TextBinding};
pub use controller::FormController;
pub use error::{FormError, SubmitError};
pub use options::{FormOptions, SubmitOptions};
pub use pending::{PendingSubmit, PendingValidation, ValidationOutcome};
