use std::collections::BTreeMap;

use secrecy::{ExposeSecret, Secret};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

/// Validation failures keyed by the name of the offending field.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Default, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records the error of `result` under `field`, if any, and hands
    /// back the parsed value otherwise.
    pub fn check<T>(
        &mut self,
        field: &str,
        result: Result<T, String>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, messages.join(" "))?;
            first = false;
        }
        Ok(())
    }
}

/// A present, non-blank string with surrounding whitespace removed.
pub fn required(value: Option<String>) -> Result<String, String> {
    let value = value.ok_or_else(|| REQUIRED.to_string())?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BLANK.to_string());
    }
    Ok(trimmed.to_string())
}

/// Same as [`required`] but leaves the secret untouched.
pub fn required_secret(
    value: Option<Secret<String>>,
) -> Result<Secret<String>, String> {
    let value = value.ok_or_else(|| REQUIRED.to_string())?;
    if value.expose_secret().trim().is_empty() {
        return Err(BLANK.to_string());
    }
    Ok(value)
}

/// Absent and null are fine, blank is not.
pub fn optional(value: Option<String>) -> Result<Option<String>, String> {
    value.map(|v| required(Some(v))).transpose()
}
