use std::fmt;

use anyhow::{Context, Result};

/// Environment variable holding the OKAPI consumer key
pub const CONSUMER_KEY_VAR: &str = "OPENCACHE_CONSUMER_KEY";

/// Environment variable holding the OKAPI consumer secret
pub const CONSUMER_SECRET_VAR: &str = "OPENCACHE_CONSUMER_SECRET";

/// Static application credentials issued by the OKAPI registration process.
///
/// Only the key is sent (as `consumer_key` on every request). The secret is
/// kept for signed requests and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ConsumerCredentials {
    pub key: String,
    pub secret: Option<String>,
}

impl ConsumerCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Resolve credentials, preferring the environment over configured values.
    pub fn resolve(configured_key: Option<&str>, configured_secret: Option<&str>) -> Result<Self> {
        Self::resolve_with(|name| std::env::var(name).ok(), configured_key, configured_secret)
    }

    fn resolve_with(
        lookup: impl Fn(&str) -> Option<String>,
        configured_key: Option<&str>,
        configured_secret: Option<&str>,
    ) -> Result<Self> {
        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };

        let key = lookup(CONSUMER_KEY_VAR)
            .and_then(non_empty)
            .or_else(|| configured_key.map(str::to_string).and_then(non_empty))
            .with_context(|| {
                format!(
                    "No consumer key configured; set {} or consumer_key in the config file",
                    CONSUMER_KEY_VAR
                )
            })?;

        let secret = lookup(CONSUMER_SECRET_VAR)
            .and_then(non_empty)
            .or_else(|| configured_secret.map(str::to_string).and_then(non_empty));

        Ok(Self { key, secret })
    }
}

impl fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides_config() {
        let creds = ConsumerCredentials::resolve_with(
            env(&[(CONSUMER_KEY_VAR, "env-key")]),
            Some("file-key"),
            Some("file-secret"),
        )
        .unwrap();
        assert_eq!(creds.key, "env-key");
        assert_eq!(creds.secret.as_deref(), Some("file-secret"));
    }

    #[test]
    fn test_falls_back_to_config() {
        let creds = ConsumerCredentials::resolve_with(
            env(&[(CONSUMER_KEY_VAR, "  ")]),
            Some("file-key"),
            None,
        )
        .unwrap();
        assert_eq!(creds.key, "file-key");
        assert_eq!(creds.secret, None);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let result = ConsumerCredentials::resolve_with(env(&[]), None, Some("secret"));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ConsumerCredentials::new("abc").with_secret("hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("abc"));
        assert!(!debug.contains("hunter2"));
    }
}
