use std::{fmt, str::FromStr};

use serde::Deserialize;
use shorty_error::ValidationError;

/// Logical partition of the identifier space.
///
/// Non-empty, lowercase ASCII letters, digits, `_` and `-` only, so it can
/// prefix a store key without ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct Namespace(String);

impl Namespace {
    pub const USER: &'static str = "user";
    pub const API_KEY: &'static str = "apikey";
    pub const URL_CODE: &'static str = "urlcode";

    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::InvalidNamespace {
                namespace: name,
                reason: "must not be empty",
            });
        }
        let valid = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !valid {
            return Err(ValidationError::InvalidNamespace {
                namespace: name,
                reason: "only [a-z0-9_-] are allowed",
            });
        }
        Ok(Self(name))
    }

    pub fn user() -> Self {
        Self(Self::USER.to_string())
    }

    pub fn api_key() -> Self {
        Self(Self::API_KEY.to_string())
    }

    pub fn url_code() -> Self {
        Self(Self::URL_CODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key of the record `id` in this namespace: `<namespace>:<id>`.
    pub fn key(
        &self,
        id: &str,
    ) -> String {
        format!("{}:{id}", self.0)
    }

    /// Store key of the sequential counter of this namespace.
    pub fn counter_key(&self) -> String {
        format!("counter:{}", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Namespace {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}
