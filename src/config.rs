//! Settings of an authorization flow.
//!
//! The configuration is an immutable value. It is validated once, when the flow is built, and
//! never consulted for changes afterwards.
use chrono::Duration;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::code_grant::error::DESCRIPTION_LIMIT;
use crate::code_grant::redirect::{DefaultRedirectResolver, ExactRedirectResolver, RedirectResolver};
use crate::request::names::USER_OAUTH_APPROVAL;

/// Longest accepted validity of authorization codes, one day.
pub const MAX_CODE_VALIDITY_SECONDS: i64 = 24 * 60 * 60;

/// How candidate redirect uris are matched against the registered ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMatching {
    /// The candidate may extend a registered uri.
    Prefix,

    /// The candidate must equal a registered uri.
    Exact,
}

/// Endpoint settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
    /// Name of the approval page parameter carrying the owner's decision.
    pub approval_parameter: String,

    /// How long an authorization code may be traded for a token.
    pub code_validity_seconds: i64,

    /// Matching rule for redirect uris.
    pub redirect_matching: RedirectMatching,

    /// Longest error description sent to clients.
    pub description_limit: usize,
}

/// A configuration or a flow under construction was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A collaborator the flow can not work without was not provided.
    #[error("missing mandatory collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// A setting has an unusable value.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// The offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The configuration could not be parsed.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            approval_parameter: USER_OAUTH_APPROVAL.to_string(),
            code_validity_seconds: 600,
            redirect_matching: RedirectMatching::Prefix,
            description_limit: DESCRIPTION_LIMIT,
        }
    }
}

impl FlowConfig {
    /// Parse and validate a json configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: FlowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all settings for usable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approval_parameter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "approval_parameter",
                reason: "must not be empty",
            });
        }

        if self.code_validity_seconds <= 0 {
            return Err(ConfigError::Invalid {
                field: "code_validity_seconds",
                reason: "must be positive",
            });
        }

        if self.code_validity_seconds > MAX_CODE_VALIDITY_SECONDS {
            return Err(ConfigError::Invalid {
                field: "code_validity_seconds",
                reason: "must not exceed one day",
            });
        }

        if self.description_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "description_limit",
                reason: "must be positive",
            });
        }

        Ok(())
    }

    /// Validity of issued authorization codes.
    ///
    /// Unvalidated settings are clamped into the accepted range.
    pub fn code_validity(&self) -> Duration {
        Duration::seconds(self.code_validity_seconds.clamp(0, MAX_CODE_VALIDITY_SECONDS))
    }

    pub(crate) fn redirect_resolver(&self) -> Box<dyn RedirectResolver + Send + Sync> {
        match self.redirect_matching {
            RedirectMatching::Prefix => Box::new(DefaultRedirectResolver),
            RedirectMatching::Exact => Box::new(ExactRedirectResolver),
        }
    }
}
