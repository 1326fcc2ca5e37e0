mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{form_values_from_value, parse_assignment, parse_document_str, parse_form_values};
pub use output::{FormReport, OutputDestination, OutputOptions, emit};
