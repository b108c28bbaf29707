//! Resolution of the redirect target and encoding of response parameters into it.
//!
//! The redirect uri sent by a client is only a candidate. It must match one of the uris the
//! client registered, otherwise any party could receive codes or tokens in the name of the
//! client. Once a target is resolved, the response parameters are appended to it either as
//! query parameters or inside the fragment.
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use url::{form_urlencoded, Url};

use super::error::ErrorKind;

/// Selects the final redirect target of a request.
pub trait RedirectResolver {
    /// Validate the optional candidate against the registered uris.
    ///
    /// Implementations must be pure functions of their inputs.
    fn resolve(&self, candidate: Option<&str>, registered: &[Url]) -> Result<Url, RedirectError>;
}

/// Reasons why no redirect target could be resolved.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    /// The candidate does not match any registered uri.
    #[error("redirect uri does not match a registered uri")]
    Mismatch,

    /// No candidate was given and several uris are registered.
    #[error("a redirect uri must be chosen among several registered ones")]
    Ambiguous,

    /// The client registered no redirect uri at all.
    #[error("no redirect uri registered")]
    NoneRegistered,

    /// The candidate is not an absolute uri.
    #[error("redirect uri is not a valid uri")]
    Invalid,
}

impl RedirectError {
    /// Every resolution failure is reported as a redirect mismatch.
    pub fn kind(self) -> ErrorKind {
        ErrorKind::RedirectMismatch
    }
}

/// Accepts candidates that extend a registered uri.
///
/// Scheme, host and port must be equal and the candidate path must start with the registered
/// path. Query and fragment of the candidate are kept.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRedirectResolver;

/// Accepts only candidates equal to a registered uri.
///
/// This is the matching motivated in the rfc. Uris are compared after parsing, so that
/// `http://example.com` and `http://example.com/` are considered equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactRedirectResolver;

/// Where response parameters are placed in the redirect target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// As query parameters, used by the code flow.
    Query,

    /// Inside the fragment, used by the implicit flow.
    Fragment,
}

impl DefaultRedirectResolver {
    fn matches(candidate: &Url, registered: &Url) -> bool {
        if candidate.scheme() != registered.scheme()
            || candidate.host_str() != registered.host_str()
            || candidate.port_or_known_default() != registered.port_or_known_default()
        {
            return false;
        }

        candidate.path().starts_with(registered.path())
    }
}

fn resolve_with<F>(
    candidate: Option<&str>, registered: &[Url], matches: F,
) -> Result<Url, RedirectError>
where
    F: Fn(&Url, &Url) -> bool,
{
    let candidate = match candidate {
        None => {
            return match registered {
                [] => Err(RedirectError::NoneRegistered),
                [single] => Ok(single.clone()),
                _ => Err(RedirectError::Ambiguous),
            }
        }
        Some(candidate) => candidate.parse::<Url>().map_err(|_| RedirectError::Invalid)?,
    };

    if registered.is_empty() {
        return Err(RedirectError::NoneRegistered);
    }

    if registered.iter().any(|uri| matches(&candidate, uri)) {
        Ok(candidate)
    } else {
        Err(RedirectError::Mismatch)
    }
}

impl RedirectResolver for DefaultRedirectResolver {
    fn resolve(&self, candidate: Option<&str>, registered: &[Url]) -> Result<Url, RedirectError> {
        resolve_with(candidate, registered, DefaultRedirectResolver::matches)
    }
}

impl RedirectResolver for ExactRedirectResolver {
    fn resolve(&self, candidate: Option<&str>, registered: &[Url]) -> Result<Url, RedirectError> {
        resolve_with(candidate, registered, |candidate, uri| candidate == uri)
    }
}

/// Append key value pairs to the redirect target.
///
/// With `Encoding::Query` the pairs are added to existing query parameters. With
/// `Encoding::Fragment` they form the fragment, an existing fragment is extended with `&`.
pub fn append_pairs<I, K, V>(uri: &mut Url, encoding: Encoding, pairs: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    match encoding {
        Encoding::Query => {
            let mut query = uri.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }
        Encoding::Fragment => {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, value) in pairs {
                serializer.append_pair(key.as_ref(), value.as_ref());
            }
            let encoded = serializer.finish();
            let fragment = match uri.fragment() {
                Some(existing) if !existing.is_empty() => format!("{}&{}", existing, encoded),
                _ => encoded,
            };
            uri.set_fragment(Some(&fragment));
        }
    }
}
