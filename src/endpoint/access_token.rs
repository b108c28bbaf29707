use log::{debug, error, warn};

use super::AuthorizationFlow;
use crate::code_grant::error::{AuthorizationError, ErrorKind};
use crate::primitives::issuer::AccessToken;
use crate::primitives::registrar::{grant_types, LookupError};
use crate::primitives::PrimitiveError;
use crate::request::TokenRequest;

impl AuthorizationFlow {
    /// Trade an authorization code for an access token.
    ///
    /// The client must already be authenticated by the caller. Errors are meant for the response
    /// body of the token endpoint, see `AuthorizationError::to_json`.
    pub fn exchange_code(&self, request: &TokenRequest) -> Result<AccessToken, AuthorizationError> {
        if request.grant_type() != Some(grant_types::AUTHORIZATION_CODE) {
            return Err(ErrorKind::UnsupportedGrantType.into());
        }

        let client_id = request
            .client_id()
            .ok_or_else(|| invalid(ErrorKind::InvalidClient, "A client id must be provided"))?;

        let client = match self.clients.lookup(client_id) {
            Ok(client) => client,
            Err(LookupError::NotFound) => {
                warn!("Token request of unknown client {}", client_id);
                return Err(invalid(ErrorKind::InvalidClient, "Unknown client"));
            }
            Err(LookupError::Unavailable) => {
                error!("Client directory unavailable while looking up {}", client_id);
                return Err(ErrorKind::ServerError.into());
            }
        };

        if !client.is_authorized_for(grant_types::AUTHORIZATION_CODE) {
            return Err(invalid(
                ErrorKind::UnauthorizedClient,
                "Unauthorized grant type: authorization_code",
            ));
        }

        let code = request
            .code()
            .ok_or_else(|| invalid(ErrorKind::InvalidRequest, "A code must be supplied"))?;

        let grant = match self.codes.consume(code) {
            Ok(grant) => grant,
            Err(PrimitiveError::Unknown) => {
                debug!("Client {} presented an unknown code", client_id);
                return Err(invalid(ErrorKind::InvalidGrant, "Invalid authorization code"));
            }
            Err(PrimitiveError::Rejected(kind)) => return Err(kind.into()),
            Err(PrimitiveError::Unavailable) => {
                error!("Code store unavailable");
                return Err(ErrorKind::ServerError.into());
            }
        };

        if grant.request().client_id() != Some(client_id) {
            warn!("Client {} presented a code issued to another client", client_id);
            return Err(invalid(ErrorKind::InvalidGrant, "Code was issued to another client"));
        }

        if let Some(original) = grant.request().requested_redirect_uri() {
            if request.redirect_uri() != Some(original) {
                return Err(invalid(ErrorKind::InvalidGrant, "Redirect uri does not match"));
            }
        }

        match self.tokens.grant(grant_types::AUTHORIZATION_CODE, &grant) {
            Ok(Some(token)) => {
                debug!("Exchanged code for token of client {}", client_id);
                Ok(token)
            }
            Ok(None) => Err(invalid(ErrorKind::InvalidGrant, "No token granted")),
            Err(PrimitiveError::Rejected(kind)) => Err(kind.into()),
            Err(err) => {
                error!("Granting a token failed: {}", err);
                Err(ErrorKind::ServerError.into())
            }
        }
    }
}

fn invalid(kind: ErrorKind, description: &'static str) -> AuthorizationError {
    let mut error = AuthorizationError::new(kind);
    error.explain(description);
    error
}
