//! Credential handling for the model provider and web search client.
//!
//! Credentials are wrapped in [`SecretString`] as soon as they are read and
//! only exposed at the point where a request header is set. `Debug` and
//! `Display` never show the value.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("{name} required: set '{config_key}' in config or {env_var} environment variable")]
    Missing {
        name: &'static str,
        config_key: String,
        env_var: String,
    },

    #[error("{name} is empty")]
    Empty { name: &'static str },
}

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from configuration file/JSON
    Config,
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load credential from JSON config, falling back to an environment variable.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, CredentialError> {
        Self::optional_from_config_or_env(config, config_key, env_var, name)?.ok_or_else(|| {
            CredentialError::Missing {
                name,
                config_key: config_key.to_string(),
                env_var: env_var.to_string(),
            }
        })
    }

    /// Like [`ApiCredential::from_config_or_env`] for services that also
    /// accept unauthenticated requests.
    ///
    /// A key that is present but blank is an error rather than "absent".
    pub fn optional_from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Option<Self>, CredentialError> {
        let found = if let Some(value) = config[config_key].as_str() {
            Some(Self::new(value, CredentialSource::Config, name))
        } else {
            std::env::var(env_var)
                .ok()
                .map(|value| Self::new(value, CredentialSource::Environment, name))
        };

        match found {
            Some(cred) if cred.is_empty() => Err(CredentialError::Empty { name }),
            other => Ok(other),
        }
    }

    /// Check if a credential is available (without loading it).
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config[config_key].as_str().is_some() || std::env::var(env_var).is_ok()
    }

    /// Expose the credential value for use in a request header.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted() {
        let secret = "tvly-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Tavily API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Tavily API key from config"));

        assert_eq!(cred.expose(), secret);
    }

    #[test]
    fn test_config_takes_precedence() {
        let config = serde_json::json!({ "api_key": "config-key" });
        let cred = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            "RAGLOOP_TEST_UNSET_VAR_1",
            "Test key",
        )
        .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_missing_credential() {
        let config = serde_json::json!({});
        let err = ApiCredential::from_config_or_env(
            &config,
            "api_key",
            "RAGLOOP_TEST_UNSET_VAR_2",
            "Test key",
        )
        .unwrap_err();

        assert!(matches!(err, CredentialError::Missing { name: "Test key", .. }));
        assert!(err.to_string().contains("RAGLOOP_TEST_UNSET_VAR_2"));
    }

    #[test]
    fn test_optional_credential() {
        let config = serde_json::json!({});
        let cred = ApiCredential::optional_from_config_or_env(
            &config,
            "api_key",
            "RAGLOOP_TEST_UNSET_VAR_3",
            "Test key",
        )
        .unwrap();
        assert!(cred.is_none());

        let blank = serde_json::json!({ "api_key": "  " });
        let err = ApiCredential::optional_from_config_or_env(
            &blank,
            "api_key",
            "RAGLOOP_TEST_UNSET_VAR_3",
            "Test key",
        )
        .unwrap_err();
        assert_eq!(err, CredentialError::Empty { name: "Test key" });
    }
}
