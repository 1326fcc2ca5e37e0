#![deny(rust_2018_idioms)]

pub mod backend;
pub mod date;
pub mod domain;
pub mod form;
pub mod io;

pub use backend::{FormBackend, FormRequest, RequestMethod, SchemaBackend, SubmitResponse, TransportError};
#[cfg(feature = "http")]
pub use backend::PrecognitionBackend;
pub use date::DateFormat;
pub use domain::{DateRange, FieldErrors, FieldKind, FieldValue, FormValues};
pub use form::{
    FormController, FormError, FormOptions, InputChange, PendingSubmit, PendingValidation,
    SubmitError, SubmitOptions, ValidationOutcome,
};

pub mod prelude {
    pub use super::{
        DateFormat, DateRange, FieldValue, FormBackend, FormController, FormOptions, FormValues,
        RequestMethod, SubmitOptions,
    };
}
