//! The authorization flow controller.
//!
//! An `AuthorizationFlow` owns its collaborators and configuration, both fixed when it is built.
//! Each call processes one interaction and ends in exactly one [`Outcome`]: a redirect carrying
//! a code, a token or an encoded error, a hand-off to the approval page, or an error that must
//! be shown to the user agent directly.
//!
//! The approval handshake spans two interactions. The first leg returns a [`PendingApproval`]
//! which the caller stores, for example sealed with an [`Assertion`] in a hidden form field, and
//! hands back to [`approve_or_deny`] together with the owner's answer.
//!
//! [`Outcome`]: enum.Outcome.html
//! [`PendingApproval`]: struct.PendingApproval.html
//! [`Assertion`]: ../primitives/generator/struct.Assertion.html
//! [`approve_or_deny`]: struct.AuthorizationFlow.html#method.approve_or_deny
use std::fmt;

use url::Url;

use crate::code_grant::error::{AuthorizationError, ErrorKind};
use crate::code_grant::redirect::{Encoding, RedirectResolver};
use crate::config::{ConfigError, FlowConfig};
use crate::primitives::approval::{ApprovalPolicy, NeverPreApproved};
use crate::primitives::authorizer::{AuthMap, CodeStore};
use crate::primitives::generator::RandomGenerator;
use crate::primitives::issuer::TokenGranter;
use crate::primitives::registrar::ClientDirectory;

mod access_token;
mod authorization;

#[cfg(test)]
mod tests;

pub use self::authorization::PendingApproval;

/// Drives authorization requests through validation, approval and issuance.
pub struct AuthorizationFlow {
    clients: Box<dyn ClientDirectory + Send + Sync>,
    codes: Box<dyn CodeStore + Send + Sync>,
    tokens: Box<dyn TokenGranter + Send + Sync>,
    approval: Box<dyn ApprovalPolicy + Send + Sync>,
    resolver: Box<dyn RedirectResolver + Send + Sync>,
    config: FlowConfig,
}

/// Collects collaborators and configuration of a flow.
///
/// The client directory and the token granter are mandatory. Codes are kept in an in-memory
/// `AuthMap` and every request needs the owner's approval unless configured otherwise.
#[derive(Default)]
pub struct FlowBuilder {
    clients: Option<Box<dyn ClientDirectory + Send + Sync>>,
    codes: Option<Box<dyn CodeStore + Send + Sync>>,
    tokens: Option<Box<dyn TokenGranter + Send + Sync>>,
    approval: Option<Box<dyn ApprovalPolicy + Send + Sync>>,
    resolver: Option<Box<dyn RedirectResolver + Send + Sync>>,
    config: FlowConfig,
}

/// The result of one interaction with the flow.
#[must_use]
#[derive(Debug)]
pub enum Outcome {
    /// Send the user agent to this target.
    ///
    /// The target carries either a code, a token or an encoded error.
    Redirect(RedirectOutcome),

    /// Ask the resource owner, then continue with `approve_or_deny`.
    ApprovalNeeded(PendingApproval),

    /// Report an error to the user agent itself, the client is not trusted with it.
    DirectError(DirectError),
}

/// A redirect to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectOutcome {
    uri: Url,
    encoding: Encoding,
}

/// An error that must not be sent to the redirect target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectError {
    error: AuthorizationError,
}

impl AuthorizationFlow {
    /// Start configuring a new flow.
    pub fn builder() -> FlowBuilder {
        FlowBuilder::default()
    }

    /// The configuration the flow was built with.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }
}

impl FlowBuilder {
    /// Use a client directory. Mandatory.
    pub fn clients<C>(mut self, clients: C) -> Self
    where
        C: ClientDirectory + Send + Sync + 'static,
    {
        self.clients = Some(Box::new(clients));
        self
    }

    /// Use a code store instead of the in-memory default.
    pub fn codes<S>(mut self, codes: S) -> Self
    where
        S: CodeStore + Send + Sync + 'static,
    {
        self.codes = Some(Box::new(codes));
        self
    }

    /// Use a token granter. Mandatory.
    pub fn tokens<T>(mut self, tokens: T) -> Self
    where
        T: TokenGranter + Send + Sync + 'static,
    {
        self.tokens = Some(Box::new(tokens));
        self
    }

    /// Use an approval policy instead of always asking the owner.
    pub fn approval<P>(mut self, approval: P) -> Self
    where
        P: ApprovalPolicy + Send + Sync + 'static,
    {
        self.approval = Some(Box::new(approval));
        self
    }

    /// Use a custom redirect resolver instead of the one selected by the configuration.
    pub fn redirect_resolver<R>(mut self, resolver: R) -> Self
    where
        R: RedirectResolver + Send + Sync + 'static,
    {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and check that all mandatory collaborators are present.
    pub fn build(self) -> Result<AuthorizationFlow, ConfigError> {
        self.config.validate()?;

        let clients = self
            .clients
            .ok_or(ConfigError::MissingCollaborator("client directory"))?;
        let tokens = self
            .tokens
            .ok_or(ConfigError::MissingCollaborator("token granter"))?;
        let codes = self
            .codes
            .unwrap_or_else(|| Box::new(AuthMap::new(RandomGenerator::new(16))));
        let approval = self.approval.unwrap_or_else(|| Box::new(NeverPreApproved));
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => self.config.redirect_resolver(),
        };

        Ok(AuthorizationFlow {
            clients,
            codes,
            tokens,
            approval,
            resolver,
            config: self.config,
        })
    }
}

impl RedirectOutcome {
    pub(crate) fn new(uri: Url, encoding: Encoding) -> Self {
        RedirectOutcome { uri, encoding }
    }

    /// The redirect target including all response parameters.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Take the redirect target.
    pub fn into_uri(self) -> Url {
        self.uri
    }

    /// Where the response parameters were placed.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether the response parameters are in the fragment.
    pub fn is_fragment_encoded(&self) -> bool {
        self.encoding == Encoding::Fragment
    }

    /// The response parameters, from the query or fragment as appropriate.
    pub fn parameters(&self) -> Vec<(String, String)> {
        match self.encoding {
            Encoding::Query => self.uri.query_pairs().into_owned().collect(),
            Encoding::Fragment => {
                let fragment = self.uri.fragment().unwrap_or("");
                url::form_urlencoded::parse(fragment.as_bytes())
                    .into_owned()
                    .collect()
            }
        }
    }

    /// The single value of a response parameter.
    pub fn parameter(&self, key: &str) -> Option<String> {
        self.parameters()
            .into_iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl DirectError {
    pub(crate) fn new(error: AuthorizationError) -> Self {
        DirectError { error }
    }

    /// The formal kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// The public error parameters.
    pub fn error(&self) -> &AuthorizationError {
        &self.error
    }
}

impl fmt::Display for DirectError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.error.kind(), self.error.description())
    }
}

impl std::error::Error for DirectError {}
