//! Validation Utilities

use validator::ValidationErrors;

use super::error::EventError;

/// Convert validation errors to an event error reported back to the sender.
pub fn validation_error(errors: ValidationErrors) -> EventError {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, detail)
            })
        })
        .next()
        .unwrap_or_else(|| "Validation failed".into());

    EventError::Validation(message)
}
