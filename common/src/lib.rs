pub mod logger;

use validator::ValidationErrors;

/// Flattens every field error message into a single `; `-separated line.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, errs)| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>();
    messages.sort();
    messages.join("; ")
}
