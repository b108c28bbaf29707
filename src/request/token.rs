use serde_derive::{Deserialize, Serialize};

use super::names::{CODE, GRANT_TYPE, REDIRECT_URI};
use super::{OAuthRequest, RequestParameters};
use crate::primitives::scope::Scope;

/// A request to the token endpoint.
///
/// Like an authorization request it keeps the received parameters untouched next to its working
/// state. The client is expected to have been authenticated by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    token_parameters: RequestParameters,
    working: OAuthRequest,
    grant_type: Option<String>,
}

impl TokenRequest {
    /// Freeze the parameters and derive the working state.
    pub fn new(parameters: RequestParameters) -> Self {
        let working = OAuthRequest::from_parameters(&parameters);
        let grant_type = parameters.get(GRANT_TYPE).map(str::to_string);
        TokenRequest {
            token_parameters: parameters,
            working,
            grant_type,
        }
    }

    /// The parameters as originally received.
    pub fn token_parameters(&self) -> &RequestParameters {
        &self.token_parameters
    }

    /// The working state.
    pub fn request(&self) -> &OAuthRequest {
        &self.working
    }

    /// Mutable access to the working state.
    pub fn request_mut(&mut self) -> &mut OAuthRequest {
        &mut self.working
    }

    /// The requested grant type.
    pub fn grant_type(&self) -> Option<&str> {
        self.grant_type.as_deref()
    }

    /// The client requesting a token.
    pub fn client_id(&self) -> Option<&str> {
        self.working.client_id()
    }

    /// Requested scope of the token.
    pub fn scope(&self) -> &Scope {
        self.working.scope()
    }

    /// The authorization code being traded.
    pub fn code(&self) -> Option<&str> {
        self.token_parameters.get(CODE)
    }

    /// The redirect uri repeated from the authorization request.
    pub fn redirect_uri(&self) -> Option<&str> {
        self.token_parameters.get(REDIRECT_URI)
    }
}
