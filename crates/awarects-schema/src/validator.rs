use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Maximum number of violations reported in one error message.
const MAX_REPORTED: usize = 4;

pub(crate) fn validate_value(event: &str, value: &Value, validator: &Validator) -> Result<()> {
    let mut errors = validator.iter_errors(value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(MAX_REPORTED - 1) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(SchemaError::ValidationFailed {
            event: event.to_string(),
            message,
        });
    }

    Ok(())
}
