//! Provider configuration resolution.
//!
//! The provider block accepts an optional `endpoint` and an optional `token`.
//! Defaults are applied exactly once, in [`ProviderConfig::resolve`]:
//!
//! - `endpoint` falls back to [`DEFAULT_ENDPOINT`]
//! - `token` falls back to the [`TOKEN_ENV_VAR`] environment variable
//!
//! An empty string counts as unset. A missing token is fatal.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Public portal RPC endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://aidbox.app/rpc";

/// Environment variable consulted when the provider block has no token.
pub const TOKEN_ENV_VAR: &str = "AIDBOX_API_TOKEN";

/// Errors raised while resolving provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the provider block nor the environment supplied a token.
    #[error("No API Token Provided: please provide a 'token' in the provider configuration or through the 'AIDBOX_API_TOKEN' environment variable")]
    MissingToken,

    /// The provider block could not be decoded.
    #[error("invalid provider configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl ConfigError {
    /// Render this error as a host diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::MissingToken => Diagnostic::error("No API Token Provided")
                .with_detail(format!(
                    "Please provide a 'token' in the provider configuration or through the '{}' environment variable.",
                    TOKEN_ENV_VAR
                ))
                .with_attribute("token"),
            Self::Invalid(e) => {
                Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())
            },
        }
    }
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::Configuration(err.to_string())
    }
}

/// Source of environment variables.
///
/// Passed explicitly so resolution never reads ambient process state in tests.
pub trait EnvLookup {
    /// Return the value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// [`EnvLookup`] backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// The provider block as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// RPC endpoint override.
    pub endpoint: Option<String>,
    /// API token.
    pub token: Option<String>,
}

impl ProviderConfig {
    /// Decode the provider block. A null block is an empty configuration.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Apply defaults and the environment fallback.
    pub fn resolve(self, env: &dyn EnvLookup) -> Result<ResolvedConfig, ConfigError> {
        let endpoint = non_empty(self.endpoint).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let token = non_empty(self.token)
            .or_else(|| non_empty(env.var(TOKEN_ENV_VAR)))
            .ok_or(ConfigError::MissingToken)?;

        Ok(ResolvedConfig { endpoint, token })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Fully resolved configuration used to build the RPC client.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// RPC endpoint.
    pub endpoint: String,
    /// API token.
    pub token: String,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "endpoint",
            Attribute::optional_string().with_description("Aidbox RPC API endpoint"),
        )
        .with_attribute(
            "token",
            Attribute::optional_string()
                .with_description("Aidbox API token")
                .sensitive(),
        )
}
