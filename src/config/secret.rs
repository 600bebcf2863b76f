//! Secure credential handling using the secrecy crate
//!
//! Connection strings carry database passwords. They are held in a
//! [`SecretString`], which zeroes its memory on drop, prints as `[REDACTED]`
//! in Debug output and must be read through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use medbundle::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://user:pw@db/mimic".to_string());
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{dsn:?}").contains("pw"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String that can live inside a [`Secret`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }

    /// Connection string with the credentials part replaced by `***`
    pub fn redacted_url(&self) -> String {
        let (scheme, rest) = self
            .0
            .split_once("://")
            .unwrap_or(("postgresql", self.0.as_str()));
        match rest.rsplit_once('@') {
            Some((_, host)) => format!("{scheme}://***@{host}"),
            None => format!("{scheme}://{rest}"),
        }
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string: zeroed on drop, redacted in Debug, explicit access only
pub type SecretString = Secret<SecretValue>;

/// Wrap a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("postgresql://localhost/mimic".to_string());
        assert_eq!(secret.expose_secret(), "postgresql://localhost/mimic");
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("postgresql://admin:hunter2@db/mimic".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_redacted_url() {
        let secret = secret_string("postgresql://admin:hunter2@db:5432/mimic".to_string());
        assert_eq!(
            secret.expose_secret().redacted_url(),
            "postgresql://***@db:5432/mimic"
        );

        let no_credentials = secret_string("postgres://db/mimic".to_string());
        assert_eq!(
            no_credentials.expose_secret().redacted_url(),
            "postgres://db/mimic"
        );
    }

    #[test]
    fn test_secret_serde() {
        #[derive(Serialize, Deserialize)]
        struct TestConfig {
            connection_string: SecretString,
        }

        let config = TestConfig {
            connection_string: secret_string("postgresql://db/mimic".to_string()),
        };

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            deserialized.connection_string.expose_secret(),
            "postgresql://db/mimic"
        );
    }
}
