use std::collections::BTreeMap;

use serde_json::Value;

/// Reserved key for errors that belong to the whole form.
pub const GLOBAL: &str = "_global";

/// Per-field error messages for a form, with `_global` for the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn global(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(GLOBAL, message);
        errors
    }

    /// Interpret a rejected request's body.
    ///
    /// `message.fieldErrors` populates per-field errors; otherwise a string
    /// `message` (or `error`) becomes the global error; otherwise `fallback`.
    /// A failure without a body always takes the fallback.
    pub fn from_error_body(body: Option<&Value>, fallback: &str) -> Self {
        let Some(body) = body else {
            return Self::global(fallback);
        };

        if let Some(Value::Object(map)) = body.get("message").and_then(|m| m.get("fieldErrors")) {
            let mut errors = Self::default();
            for (field, messages) in map {
                match messages {
                    Value::String(s) => errors.push(field, s.clone()),
                    Value::Array(items) => {
                        for item in items.iter().filter_map(Value::as_str) {
                            errors.push(field, item);
                        }
                    }
                    _ => {}
                }
            }
            if !errors.is_empty() {
                return errors;
            }
        }

        match error_message(Some(body)) {
            Some(message) => Self::global(message),
            None => Self::global(fallback),
        }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// All messages for `name` joined with spaces.
    pub fn joined(&self, name: &str) -> Option<String> {
        self.field(name).map(|msgs| msgs.join(" "))
    }

    pub fn global_message(&self) -> Option<String> {
        self.joined(GLOBAL)
    }
}

/// The single human-readable message in an error body: `message` when it is a
/// string, else `error`.
pub fn error_message(body: Option<&Value>) -> Option<String> {
    let body = body?;
    ["message", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(String::from)
}
