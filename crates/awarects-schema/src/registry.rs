use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use awarects_snippet::SnippetEvent;
use jsonschema::Validator;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::contracts;
use crate::error::{Result, SchemaError};
use crate::validator::validate_value;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Event-name-keyed registry of compiled JSON Schema validators.
pub struct SchemaRegistry {
    validators: HashMap<String, Validator>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            validators: HashMap::new(),
            config,
        }
    }

    /// Registry holding the built-in event contracts.
    pub fn builtin() -> Result<Self> {
        Self::builtin_with_config(RegistryConfig::default())
    }

    /// Built-in event contracts with explicit config.
    pub fn builtin_with_config(config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        for (event, schema) in contracts::builtin() {
            registry.register_value(event, &schema)?;
        }
        Ok(registry)
    }

    /// Register a schema for an event from a JSON string.
    pub fn register(&mut self, event: &str, schema_json: &str) -> Result<()> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(event, &schema)
    }

    /// Register a schema for an event from a JSON value, replacing any existing one.
    pub fn register_value(&mut self, event: &str, schema: &Value) -> Result<()> {
        let mut schema_to_compile = schema.clone();
        if self.config.strict_mode {
            apply_strict_mode(&mut schema_to_compile);
        }

        let compiled = jsonschema::validator_for(&schema_to_compile)
            .map_err(|err| SchemaError::CompileFailed(format!("{event}: {err}")))?;

        self.validators.insert(event.to_string(), compiled);
        Ok(())
    }

    /// Load `<event>.schema.json` files from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        registry.load_directory(path)?;
        Ok(registry)
    }

    /// Add or override schemas from a directory. Returns how many were loaded.
    pub fn load_directory(&mut self, path: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        let mut loaded = 0usize;
        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(stem) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };

            let entry_path = entry.path();
            let metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            if metadata.file_type().is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !metadata.is_file() {
                continue;
            }
            if !is_event_name(stem) {
                return Err(SchemaError::LoadFailed(format!(
                    "unrecognized schema filename: {file_name}"
                )));
            }

            loaded = loaded.saturating_add(1);
            if loaded > self.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({})",
                    self.config.max_schemas_from_directory
                )));
            }

            let content = read_limited(&entry_path, self.config.max_schema_file_size)?;
            self.register(stem, &content)?;
            debug!(event = stem, path = %entry_path.display(), "loaded event schema");
        }

        Ok(loaded)
    }

    /// Validate an event's data object against its contract.
    pub fn validate(&self, event: &str, data: &Value) -> Result<()> {
        match self.validators.get(event) {
            Some(validator) => validate_value(event, data, validator),
            None if self.config.fail_on_missing_schema => {
                Err(SchemaError::NoSchema(event.to_string()))
            }
            None => Ok(()),
        }
    }

    /// Validate raw JSON bytes as the data of `event`.
    pub fn validate_payload(&self, event: &str, payload: &[u8]) -> Result<()> {
        let value: Value = serde_json::from_slice(payload)?;
        self.validate(event, &value)
    }

    /// Validate a received snippet event.
    pub fn validate_event(&self, event: &SnippetEvent) -> Result<()> {
        self.validate(&event.name, &Value::Object(event.data.clone()))
    }

    /// Check if an event has a registered schema.
    pub fn has_schema(&self, event: &str) -> bool {
        self.validators.contains_key(event)
    }

    /// Event names that have registered schemas, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("events", &self.events())
            .field("config", &self.config)
            .finish()
    }
}

fn is_event_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn read_limited(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let len = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?
        .len();
    if len > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({len} bytes): {}",
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file grew while reading: {}",
            path.display()
        )));
    }
    Ok(content)
}

/// Subschema keywords whose value is a map of schemas.
const MAP_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "dependentSchemas",
    "$defs",
    "definitions",
];

/// Subschema keywords whose value is a single schema or a list of schemas.
const SCHEMA_KEYWORDS: [&str; 15] = [
    "propertyNames",
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "contains",
    "additionalItems",
    "unevaluatedItems",
    "not",
    "if",
    "then",
    "else",
    "prefixItems",
    "allOf",
    "anyOf",
    "oneOf",
];

fn apply_strict_mode(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            for keyword in MAP_KEYWORDS {
                if let Some(Value::Object(children)) = map.get_mut(keyword) {
                    children.values_mut().for_each(apply_strict_mode);
                }
            }
            for keyword in SCHEMA_KEYWORDS {
                if let Some(child) = map.get_mut(keyword) {
                    apply_strict_mode(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(apply_strict_mode),
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("object")),
        _ => map.contains_key("properties") || map.contains_key("required"),
    }
}
