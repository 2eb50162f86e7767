//! Secret string handling for sensitive configuration values.
//!
//! [`SecretString`] keeps credentials such as the identity provider's client
//! secret out of logs, `Debug` dumps of the configuration, and error messages.
//!
//! ```rust
//! use greeting_mcp::SecretString;
//!
//! let secret = SecretString::with_label("sk_live_123", "SK_CLIENT_SECRET");
//! assert_eq!(format!("{:?}", secret), "[SK_CLIENT_SECRET]");
//! assert_eq!(secret.expose(), "sk_live_123");
//! ```

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};

use serde::{Deserialize, Deserializer};

const DEFAULT_LABEL: &str = "REDACTED";

/// A string wrapper that redacts its contents in Debug and Display output.
///
/// Deserializes transparently from a plain string, so it can sit directly in
/// an `envy`-loaded configuration struct.
#[derive(Clone)]
pub struct SecretString {
    value: String,
    label: Cow<'static, str>,
}

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self {
            value: s.into(),
            label: Cow::Borrowed(DEFAULT_LABEL),
        }
    }

    /// Create a new `SecretString` with a custom redaction label.
    pub fn with_label(s: impl Into<String>, label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            value: s.into(),
            label: label.into(),
        }
    }

    /// Expose the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Default for SecretString {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Debug for SecretString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)
    }
}

impl Display for SecretString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label)
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}
