//! Errors defined in [rfc6749] and their encoding into redirects.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749#section-4.1.2.1
use std::borrow::Cow;
use std::fmt;
use std::vec;

use serde_derive::{Deserialize, Serialize};
use url::Url;

use super::redirect::{append_pairs, Encoding};

/// Longest error description sent to a client, in characters.
pub const DESCRIPTION_LIMIT: usize = 256;

/// Error kinds of the authorization and token endpoints.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request is missing a required parameter, includes an invalid parameter value, includes
    /// a parameter more than once, or is otherwise malformed.
    InvalidRequest,

    /// The client is unknown. Never redirected, since the redirect target can not be trusted.
    InvalidClient,

    /// The client is not authorized to request a response using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support obtaining a response using this method.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The redirect uri does not match the registration. Never redirected.
    RedirectMismatch,

    /// The authorization server encountered an unexpected condition that prevented it from
    /// fulfilling the request. (This error code is needed because a 500 Internal Server Error HTTP
    /// status code cannot be returned to the client via an HTTP redirect.)
    ServerError,

    /// The provided authorization grant is invalid, expired, revoked, does not match the
    /// redirection URI used in the authorization request, or was issued to another client.
    InvalidGrant,

    /// The authorization grant type is not supported by the authorization server.
    UnsupportedGrantType,
}

impl ErrorKind {
    /// The error code as it appears on the wire.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidClient => "invalid_client",
            ErrorKind::UnauthorizedClient => "unauthorized_client",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::UnsupportedResponseType => "unsupported_response_type",
            ErrorKind::InvalidScope => "invalid_scope",
            ErrorKind::RedirectMismatch => "redirect_uri_mismatch",
            ErrorKind::ServerError => "server_error",
            ErrorKind::InvalidGrant => "invalid_grant",
            ErrorKind::UnsupportedGrantType => "unsupported_grant_type",
        }
    }

    /// Public description used when no more specific one was given.
    pub fn default_description(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "The request is malformed",
            ErrorKind::InvalidClient => "Unknown client",
            ErrorKind::UnauthorizedClient => "The client is not authorized for this grant type",
            ErrorKind::AccessDenied => "User denied access",
            ErrorKind::UnsupportedResponseType => "Unsupported response type",
            ErrorKind::InvalidScope => "Invalid scope",
            ErrorKind::RedirectMismatch => "Invalid redirect uri",
            ErrorKind::ServerError => "Internal error",
            ErrorKind::InvalidGrant => "Invalid authorization grant",
            ErrorKind::UnsupportedGrantType => "Unsupported grant type",
        }
    }

    /// Whether the error may be delivered to the redirect target.
    ///
    /// An unknown client or a mismatching redirect uri means the target is not trusted, so these
    /// must be reported to the user agent directly.
    pub fn is_redirectable(self) -> bool {
        !matches!(self, ErrorKind::InvalidClient | ErrorKind::RedirectMismatch)
    }
}

impl AsRef<str> for ErrorKind {
    fn as_ref(&self) -> &str {
        self.code()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Represents parameters of an error in an [Authorization Error Response][Authorization Error].
///
/// [Authorization Error]: https://tools.ietf.org/html/rfc6749#section-4.2.2.1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationError {
    error: ErrorKind,
    description: Option<Cow<'static, str>>,
    uri: Option<Cow<'static, str>>,
}

#[derive(Serialize)]
struct SerdeError<'a> {
    error: &'static str,
    error_description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_uri: Option<&'a str>,
}

impl AuthorizationError {
    /// An error of the given kind with its default description.
    pub fn new(error: ErrorKind) -> Self {
        AuthorizationError {
            error,
            description: None,
            uri: None,
        }
    }

    /// Get the formal kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.error
    }

    /// Set the error type.
    pub fn set_kind(&mut self, new_kind: ErrorKind) {
        self.error = new_kind;
    }

    /// Provide a short text explanation for the error.
    ///
    /// The text is public, it must not contain internal details.
    pub fn explain<D: Into<Cow<'static, str>>>(&mut self, description: D) {
        self.description = Some(description.into())
    }

    /// A uri identifying a resource explaining the error in detail.
    pub fn explain_uri(&mut self, uri: Url) {
        self.uri = Some(String::from(uri).into())
    }

    /// The public description, explained or default.
    pub fn description(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or_else(|| self.error.default_description())
    }

    /// Cut the description to at most `limit` characters.
    pub fn bound_description(&mut self, limit: usize) {
        if let Some(description) = self.description.as_mut() {
            let cut = description.char_indices().nth(limit).map(|(cut, _)| cut);
            if let Some(cut) = cut {
                description.to_mut().truncate(cut);
            }
        }
    }

    /// The json body of a token endpoint error response.
    pub fn to_json(&self) -> String {
        let serde_error = SerdeError {
            error: self.error.code(),
            error_description: self.description(),
            error_uri: self.uri.as_deref(),
        };

        serde_json::to_string(&serde_error).unwrap_or_default()
    }

    /// Iterate over the key value pairs that describe this error.
    ///
    /// These pairs must be added to the detailed description of an error. To this end the pairs
    /// appear as part of a form urlencoded query component or the fragment of the redirect.
    pub fn iter(&self) -> <&Self as IntoIterator>::IntoIter {
        self.into_iter()
    }
}

impl From<ErrorKind> for AuthorizationError {
    fn from(kind: ErrorKind) -> Self {
        AuthorizationError::new(kind)
    }
}

impl<'a> IntoIterator for &'a AuthorizationError {
    type Item = (&'static str, Cow<'a, str>);
    type IntoIter = vec::IntoIter<(&'static str, Cow<'a, str>)>;

    fn into_iter(self) -> Self::IntoIter {
        let mut vec = vec![
            ("error", Cow::Borrowed(self.error.code())),
            ("error_description", Cow::Borrowed(self.description())),
        ];
        if let Some(uri) = self.uri.as_ref() {
            vec.push(("error_uri", Cow::Borrowed(&**uri)));
        }
        vec.into_iter()
    }
}

/// Encapsulates a redirect to a valid redirect_uri with an error response.
#[derive(Clone, Debug)]
pub struct ErrorUrl {
    base_uri: Url,
    state: Option<String>,
    error: AuthorizationError,
    encoding: Encoding,
    limit: usize,
}

impl ErrorUrl {
    /// Construct a new error, already fixing the state parameter if it exists.
    pub fn new<S: Into<String>>(
        base_uri: Url, state: Option<S>, error: AuthorizationError, encoding: Encoding,
    ) -> Self {
        ErrorUrl {
            base_uri,
            state: state.map(Into::into),
            error,
            encoding,
            limit: DESCRIPTION_LIMIT,
        }
    }

    /// Change the longest description that is sent.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Modify the contained description.
    pub fn description(&mut self) -> &mut AuthorizationError {
        &mut self.error
    }

    /// The encoding of the error parameters.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Append `error`, `error_description`, `error_uri` and `state`, in that order.
    pub fn into_url(self) -> Url {
        let ErrorUrl {
            mut base_uri,
            state,
            mut error,
            encoding,
            limit,
        } = self;

        error.bound_description(limit);
        let pairs = error
            .iter()
            .chain(state.as_deref().map(|state| ("state", Cow::Borrowed(state))));
        append_pairs(&mut base_uri, encoding, pairs);
        base_uri
    }
}

impl From<ErrorUrl> for Url {
    fn from(error: ErrorUrl) -> Url {
        error.into_url()
    }
}
