/// Errors that can occur during event schema validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema could not be compiled.
    #[error("failed to compile schema: {0}")]
    CompileFailed(String),

    /// The event data failed schema validation.
    #[error("event {event} violates its contract: {message}")]
    ValidationFailed { event: String, message: String },

    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema registered for the event name.
    #[error("no schema registered for event {0}")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
