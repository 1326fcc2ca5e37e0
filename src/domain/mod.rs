mod value;
mod values;

pub use value::{DateRange, FieldKind, FieldValue};
pub use values::{FieldErrors, FormValues, TouchedSet};
