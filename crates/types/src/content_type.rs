//! MIME content-type validation.

use std::fmt;
use std::str::FromStr;

/// Content type assumed when a writer does not provide one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Errors raised while validating a content type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentTypeError {
    #[error("Invalid Content-Type: value is empty")]
    Empty,

    /// The main type is not of the form `type/subtype`
    #[error("Invalid Content-Type: {0:?} is not of the form type/subtype")]
    Malformed(String),

    /// The value contains a null byte, carriage return or line feed
    #[error("Invalid Content-Type: contains control characters")]
    ControlCharacters,
}

/// A validated MIME content type such as `text/plain` or `text/html; charset=utf-8`.
///
/// Only the main type is checked structurally; parameters after `;` are kept verbatim
/// but not otherwise validated. Null bytes, carriage returns and line feeds are always
/// rejected so the value can be echoed in a response header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType(String);

impl ContentType {
    /// Validates a raw content-type string.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentTypeError`] if the value is empty, contains control
    /// characters, or its main type does not split into exactly two non-empty parts
    /// on `/`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ContentTypeError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ContentTypeError::Empty);
        }

        if raw.contains(['\0', '\r', '\n']) {
            return Err(ContentTypeError::ControlCharacters);
        }

        let main_type = raw.split(';').next().unwrap_or_default().trim();
        let mut parts = main_type.split('/');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(kind), Some(subtype), None) if !kind.is_empty() && !subtype.is_empty()
        );
        if !well_formed {
            return Err(ContentTypeError::Malformed(raw));
        }

        Ok(Self(raw))
    }

    /// The `application/octet-stream` default.
    pub fn octet_stream() -> Self {
        Self(DEFAULT_CONTENT_TYPE.to_owned())
    }

    /// Returns the full value, parameters included.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::octet_stream()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentType {
    type Err = ContentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ContentType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ContentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ContentType::parse(s).map_err(serde::de::Error::custom)
    }
}
