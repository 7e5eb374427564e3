// this_file: src/prefs.rs
//! File-backed preference store.
//!
//! Preferences are a flat JSON object on disk. Reads never fail: a
//! missing file, unreadable JSON, or a value of the wrong shape all
//! fall back to the caller-supplied default, so callers always hold a
//! usable value.

use std::path::Path;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A loaded preference set
#[derive(Debug, Clone, Default)]
pub struct Preferences {
    values: Map<String, Value>,
}

impl Preferences {
    /// An empty store; every lookup returns its default
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load preferences from a JSON file
    ///
    /// Absent or malformed files yield an empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("no preference file at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        let store = Self::from_json(&text);
        if store.values.is_empty() {
            debug!("preference file {} holds no usable entries", path.display());
        }
        store
    }

    /// Parse preferences from JSON text
    ///
    /// Anything other than a JSON object yields an empty store.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(values)) => Self { values },
            Ok(other) => {
                warn!(
                    "preference data must be a JSON object, found {}",
                    type_name(&other)
                );
                Self::default()
            }
            Err(e) => {
                warn!("unreadable preference data: {}", e);
                Self::default()
            }
        }
    }

    /// Fetch a typed value, falling back to the default when the key is
    /// absent or its value does not fit the requested type
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.values.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(typed) => typed,
                Err(e) => {
                    warn!("preference '{}' has unexpected shape ({}), using default", key, e);
                    default
                }
            },
            None => default,
        }
    }

    /// Whether the store holds a value for the key
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
