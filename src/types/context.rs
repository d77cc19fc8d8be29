// ABOUTME: External status context key validation.
// ABOUTME: The opaque key under which a goal's status is reported to the sink.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusContextError {
    #[error("status context cannot be empty")]
    Empty,

    #[error("status context exceeds maximum length of 255 characters")]
    TooLong,

    #[error("status context cannot contain whitespace: '{0}'")]
    Whitespace(char),
}

/// The external key a goal's status is reported under, e.g. `"deploy/staging"`.
///
/// Opaque to the status sink; the propagator uses it to map incoming
/// status events back to goals. Unknown contexts are ignored, so the
/// value is never interpreted beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatusContext(String);

impl StatusContext {
    pub fn new(value: &str) -> Result<Self, StatusContextError> {
        if value.is_empty() {
            return Err(StatusContextError::Empty);
        }
        if value.len() > 255 {
            return Err(StatusContextError::TooLong);
        }
        if let Some(c) = value.chars().find(|c| c.is_whitespace()) {
            return Err(StatusContextError::Whitespace(c));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for StatusContext {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        StatusContext::new(&value).map_err(serde::de::Error::custom)
    }
}
