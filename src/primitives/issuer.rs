//! Grants access tokens for approved authorizations.
//!
//! The flow asks a `TokenGranter` for a token whenever one has to be delivered: directly in the
//! redirect fragment for the implicit flow, or at the token endpoint in exchange for a code.
//! A granter may decline a grant type it does not support by returning no token.
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde_derive::{Deserialize, Serialize};

use super::authorizer::ApprovedAuthorization;
use super::generator::TagGrant;
use super::registrar::grant_types;
use super::scope::Scope;
use super::{PrimitiveError, Time};

/// Grants access tokens.
pub trait TokenGranter {
    /// Create a token for the approved authorization using the named grant type.
    ///
    /// `Ok(None)` means that the granter does not issue tokens in this situation, which the flow
    /// reports to the client as a denial.
    fn grant(
        &self, grant_type: &str, grant: &ApprovedAuthorization,
    ) -> Result<Option<AccessToken>, PrimitiveError>;
}

/// Token parameters returned to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    /// The access token itself.
    pub value: String,

    /// The type of the token.
    pub token_type: TokenType,

    /// Expiration timestamp (Utc), if the token expires at all.
    pub until: Option<Time>,

    /// The scope the token is valid for.
    pub scope: Scope,

    /// A refresh token, never delivered through a redirect.
    pub refresh: Option<String>,
}

/// The type of token, describing proper usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// A bearer token used on its own in an Authorization header.
    ///
    /// For this variant and its usage see RFC 6750.
    Bearer,
}

#[derive(Serialize)]
struct SerdeToken<'a> {
    access_token: &'a str,
    token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl AccessToken {
    /// A bearer token without expiry or refresh token.
    pub fn bearer<S: Into<String>>(value: S, scope: Scope) -> Self {
        AccessToken {
            value: value.into(),
            token_type: TokenType::Bearer,
            until: None,
            scope,
            refresh: None,
        }
    }

    /// Seconds until expiry, counted from now and never negative.
    pub fn expires_in(&self) -> Option<i64> {
        self.until
            .map(|until| until.signed_duration_since(Utc::now()).num_seconds().max(0))
    }

    /// Key value pairs for delivery in a redirect fragment.
    ///
    /// The refresh token is never part of these.
    pub fn fragment_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("access_token", self.value.clone()),
            ("token_type", self.token_type.to_string()),
        ];
        if let Some(expires_in) = self.expires_in() {
            pairs.push(("expires_in", expires_in.to_string()));
        }
        if !self.scope.is_empty() {
            pairs.push(("scope", self.scope.to_string()));
        }
        pairs
    }

    /// The json body of a token endpoint response.
    pub fn to_json(&self) -> String {
        let serde_token = SerdeToken {
            access_token: &self.value,
            token_type: self.token_type,
            expires_in: self.expires_in(),
            refresh_token: self.refresh.as_deref(),
            scope: Some(self.scope.to_string()).filter(|scope| !scope.is_empty()),
        };

        // A struct of strings and integers always serializes.
        serde_json::to_string(&serde_token).unwrap_or_default()
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenType::Bearer => f.write_str("bearer"),
        }
    }
}

/// Keeps track of access tokens by a hash-map.
///
/// The generator is itself trait based and can be chosen during construction. Only the
/// configured grant types are served, any other request yields no token.
pub struct TokenMap<G: TagGrant = Box<dyn TagGrant + Send + Sync + 'static>> {
    duration: Duration,
    grant_types: BTreeSet<String>,
    inner: Mutex<Tokens<G>>,
}

struct Tokens<G> {
    generator: G,
    usage: u64,
    access: HashMap<String, ApprovedAuthorization>,
}

impl<G: TagGrant> TokenMap<G> {
    /// Construct a `TokenMap` serving the code and implicit grants, valid for one hour.
    pub fn new(generator: G) -> Self {
        TokenMap {
            duration: Duration::hours(1),
            grant_types: [grant_types::AUTHORIZATION_CODE, grant_types::IMPLICIT]
                .iter()
                .map(|grant| grant.to_string())
                .collect(),
            inner: Mutex::new(Tokens {
                generator,
                usage: 0,
                access: HashMap::new(),
            }),
        }
    }

    /// Set the validity of all issued tokens to the specified duration.
    pub fn valid_for(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Replace the set of grant types that are served.
    pub fn supporting<S: AsRef<str>>(mut self, grant_types: &[S]) -> Self {
        self.grant_types = grant_types.iter().map(|grant| grant.as_ref().to_string()).collect();
        self
    }

    /// Get the authorization behind an unexpired token.
    pub fn recover_token(&self, token: &str) -> Result<Option<ApprovedAuthorization>, PrimitiveError> {
        let inner = self.inner.lock().map_err(|_| PrimitiveError::Unavailable)?;
        Ok(inner
            .access
            .get(token)
            .filter(|grant| !grant.is_expired_at(Utc::now()))
            .cloned())
    }

    /// Unconditionally delete the authorization associated with the token.
    pub fn revoke(&self, token: &str) -> Result<(), PrimitiveError> {
        let mut inner = self.inner.lock().map_err(|_| PrimitiveError::Unavailable)?;
        inner.access.remove(token);
        Ok(())
    }
}

impl<G: TagGrant> TokenGranter for TokenMap<G> {
    fn grant(
        &self, grant_type: &str, grant: &ApprovedAuthorization,
    ) -> Result<Option<AccessToken>, PrimitiveError> {
        if !self.grant_types.contains(grant_type) {
            return Ok(None);
        }

        let until = Utc::now() + self.duration;
        let stored = ApprovedAuthorization::new(grant.request().clone(), grant.owner_id(), until);

        let mut guard = self.inner.lock().map_err(|_| PrimitiveError::Unavailable)?;
        let inner = &mut *guard;
        let next_usage = inner.usage.wrapping_add(1);
        let value = inner
            .generator
            .tag(inner.usage, &stored)
            .map_err(|()| PrimitiveError::Unavailable)?;
        inner.access.insert(value.clone(), stored);
        inner.usage = next_usage;

        Ok(Some(AccessToken {
            value,
            token_type: TokenType::Bearer,
            until: Some(until),
            scope: grant.request().scope().clone(),
            refresh: None,
        }))
    }
}

impl<'s, T: TokenGranter + ?Sized> TokenGranter for &'s T {
    fn grant(
        &self, grant_type: &str, grant: &ApprovedAuthorization,
    ) -> Result<Option<AccessToken>, PrimitiveError> {
        (**self).grant(grant_type, grant)
    }
}

impl<T: TokenGranter + ?Sized> TokenGranter for Box<T> {
    fn grant(
        &self, grant_type: &str, grant: &ApprovedAuthorization,
    ) -> Result<Option<AccessToken>, PrimitiveError> {
        (**self).grant(grant_type, grant)
    }
}

impl<T: TokenGranter + ?Sized> TokenGranter for Arc<T> {
    fn grant(
        &self, grant_type: &str, grant: &ApprovedAuthorization,
    ) -> Result<Option<AccessToken>, PrimitiveError> {
        (**self).grant(grant_type, grant)
    }
}
