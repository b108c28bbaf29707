use std::collections::BTreeMap;
use std::iter;

use chrono::Utc;
use log::{debug, error, warn};
use serde_derive::{Deserialize, Serialize};
use url::Url;

use super::{AuthorizationFlow, DirectError, Outcome, RedirectOutcome};
use crate::code_grant::approval::{ApprovalCoordinator, ApprovalState};
use crate::code_grant::error::{AuthorizationError, ErrorKind, ErrorUrl};
use crate::code_grant::redirect::{append_pairs, Encoding};
use crate::primitives::authorizer::ApprovedAuthorization;
use crate::primitives::generator::{Assertion, SealError};
use crate::primitives::registrar::{grant_types, ClientDetails, LookupError};
use crate::primitives::scope::Scope;
use crate::primitives::PrimitiveError;
use crate::request::names::{CLIENT_ID, REDIRECT_URI, RESPONSE_TYPE, SCOPE, STATE};
use crate::request::{AuthorizationRequest, RequestParameters};

const RESPONSE_CODE: &str = "code";
const RESPONSE_TOKEN: &str = "token";
const SEAL_TAG: &str = "pending_approval";

/// An authorization request waiting for the resource owner's decision.
///
/// This is the continuation between the two legs of the approval handshake. It is serializable
/// so that it can be kept in any storage between the interactions, and it can be sealed into a
/// tamper proof string.
///
/// It is deliberately not `Clone`, a pending request is decided once.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    request: AuthorizationRequest,
}

impl PendingApproval {
    /// Continue with a request restored from elsewhere.
    ///
    /// The flow validates client and redirect target of the request again when the decision is
    /// made.
    pub fn from_request(request: AuthorizationRequest) -> Self {
        PendingApproval { request }
    }

    /// The request to be decided.
    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// The client asking for access, to be displayed on the approval page.
    pub fn client_id(&self) -> Option<&str> {
        self.request.client_id()
    }

    /// The scope the client asks for, to be displayed on the approval page.
    pub fn scope(&self) -> &Scope {
        self.request.scope()
    }

    /// Where the response will be sent.
    pub fn redirect_uri(&self) -> Option<&Url> {
        self.request.resolved_redirect_uri()
    }

    /// Take the request.
    pub fn into_request(self) -> AuthorizationRequest {
        self.request
    }

    /// Seal into a signed string, for example for a hidden form field.
    pub fn seal(&self, assertion: &Assertion) -> Result<String, SealError> {
        assertion.sign(SEAL_TAG, self)
    }

    /// Restore from a string produced by `seal` with the same key.
    pub fn unseal(assertion: &Assertion, sealed: &str) -> Result<Self, SealError> {
        assertion.verify(SEAL_TAG, sealed)
    }
}

impl AuthorizationFlow {
    /// First leg: process a request as received at the authorization endpoint.
    ///
    /// `owner_id` identifies the authenticated resource owner.
    pub fn authorize(&self, parameters: RequestParameters, owner_id: &str) -> Outcome {
        let mut request = AuthorizationRequest::new(parameters);

        let client = match self.client_of(&request) {
            Ok(client) => client,
            Err(direct) => return direct,
        };

        if request.authorization_parameters().is_ambiguous(REDIRECT_URI) {
            warn!("Rejected request with duplicate redirect_uri for client {}", client.client_id());
            return direct_error(ErrorKind::InvalidRequest, "Parameter redirect_uri given more than once");
        }

        let redirect_uri = match self
            .resolver
            .resolve(request.requested_redirect_uri(), client.registered_redirect_uris())
        {
            Ok(uri) => uri,
            Err(err) => {
                warn!("Redirect uri rejected for client {}: {}", client.client_id(), err);
                return direct_error(err.kind(), "Invalid redirect uri");
            }
        };
        request.set_resolved_redirect_uri(redirect_uri);

        let encoding = response_encoding(&request);
        if let Err(error) = validate(&mut request, &client) {
            debug!("Invalid request from client {}: {}", client.client_id(), error.kind());
            return self.error_redirect(&request, error, encoding);
        }

        request.set_resource_ids_and_authorities_from_client_details(&client);

        match self.coordinator().check(&mut request, owner_id) {
            ApprovalState::Pending => {
                debug!("Request of client {} needs approval", client.client_id());
                Outcome::ApprovalNeeded(PendingApproval { request })
            }
            _ => self.finish(request, owner_id, encoding),
        }
    }

    /// Second leg: apply the owner's decision to a pending request.
    ///
    /// `approval_parameters` are the fields submitted from the approval page. The client and
    /// the redirect target are checked again, so a continuation restored from an untrusted
    /// store can not redirect anywhere the client did not register.
    pub fn approve_or_deny(
        &self, pending: PendingApproval, approval_parameters: BTreeMap<String, String>,
        owner_id: &str,
    ) -> Outcome {
        let mut request = pending.into_request();

        let redirect_uri = match request.resolved_redirect_uri() {
            Some(uri) => uri.clone(),
            None => {
                warn!("Approval without redirect uri");
                return direct_error(ErrorKind::InvalidRequest, "A redirect_uri must be supplied");
            }
        };

        let client = match self.client_of(&request) {
            Ok(client) => client,
            Err(direct) => return direct,
        };

        if let Err(err) = self
            .resolver
            .resolve(Some(redirect_uri.as_str()), client.registered_redirect_uris())
        {
            warn!("Approval for client {} with unregistered redirect: {}", client.client_id(), err);
            return direct_error(err.kind(), "Invalid redirect uri");
        }

        let encoding = response_encoding(&request);
        match self
            .coordinator()
            .decide(&mut request, approval_parameters, owner_id)
        {
            ApprovalState::Approved => self.finish(request, owner_id, encoding),
            _ => {
                debug!("Owner denied access to client {}", client.client_id());
                self.error_redirect(&request, ErrorKind::AccessDenied.into(), encoding)
            }
        }
    }

    fn coordinator(&self) -> ApprovalCoordinator<'_> {
        ApprovalCoordinator::new(&*self.approval, &self.config.approval_parameter)
    }

    fn client_of(&self, request: &AuthorizationRequest) -> Result<ClientDetails, Outcome> {
        if request.authorization_parameters().is_ambiguous(CLIENT_ID) {
            warn!("Rejected request with duplicate client_id");
            return Err(direct_error(ErrorKind::InvalidRequest, "Parameter client_id given more than once"));
        }

        let client_id = match request.client_id() {
            Some(client_id) => client_id,
            None => {
                warn!("Rejected request without client_id");
                return Err(direct_error(ErrorKind::InvalidClient, "A client id must be provided"));
            }
        };

        match self.clients.lookup(client_id) {
            Ok(client) => Ok(client),
            Err(LookupError::NotFound) => {
                warn!("Rejected request of unknown client {}", client_id);
                Err(direct_error(ErrorKind::InvalidClient, "Unknown client"))
            }
            Err(LookupError::Unavailable) => {
                error!("Client directory unavailable while looking up {}", client_id);
                Err(direct_error(ErrorKind::ServerError, "Internal error"))
            }
        }
    }

    /// Issue the code or token of an approved request.
    fn finish(&self, request: AuthorizationRequest, owner_id: &str, encoding: Encoding) -> Outcome {
        let redirect_uri = match request.resolved_redirect_uri() {
            Some(uri) => uri.clone(),
            None => return direct_error(ErrorKind::InvalidRequest, "A redirect_uri must be supplied"),
        };

        let state = request.state().map(str::to_string);
        let until = match Utc::now().checked_add_signed(self.config.code_validity()) {
            Some(until) => until,
            None => return self.primitive_failure(PrimitiveError::Unavailable, redirect_uri, state, encoding),
        };

        let grant = ApprovedAuthorization::new(request, owner_id, until);
        let client_id = grant.request().client_id().unwrap_or_default().to_string();

        if grant.request().has_response_type(RESPONSE_CODE) {
            match self.codes.issue(grant) {
                Ok(code) => {
                    debug!("Issued authorization code to client {}", client_id);
                    let pairs = iter::once(("code", code)).chain(state.map(|state| ("state", state)));
                    let mut uri = redirect_uri;
                    append_pairs(&mut uri, Encoding::Query, pairs);
                    Outcome::Redirect(RedirectOutcome::new(uri, Encoding::Query))
                }
                Err(err) => self.primitive_failure(err, redirect_uri, state, Encoding::Query),
            }
        } else {
            match self.tokens.grant(grant_types::IMPLICIT, &grant) {
                Ok(Some(token)) => {
                    debug!("Granted implicit token to client {}", client_id);
                    let pairs = token
                        .fragment_pairs()
                        .into_iter()
                        .chain(state.map(|state| ("state", state)));
                    let mut uri = redirect_uri;
                    append_pairs(&mut uri, Encoding::Fragment, pairs);
                    Outcome::Redirect(RedirectOutcome::new(uri, Encoding::Fragment))
                }
                Ok(None) => {
                    debug!("No implicit token granted to client {}", client_id);
                    let mut error = AuthorizationError::new(ErrorKind::AccessDenied);
                    error.explain("No token granted");
                    self.encode(redirect_uri, state, error, encoding)
                }
                Err(err) => self.primitive_failure(err, redirect_uri, state, encoding),
            }
        }
    }

    fn primitive_failure(
        &self, err: PrimitiveError, redirect_uri: Url, state: Option<String>, encoding: Encoding,
    ) -> Outcome {
        let kind = match err {
            PrimitiveError::Rejected(kind) => kind,
            PrimitiveError::Unknown | PrimitiveError::Unavailable => {
                error!("Issuing a grant failed: {}", err);
                ErrorKind::ServerError
            }
        };

        if !kind.is_redirectable() {
            return direct_error(kind, kind.default_description());
        }

        self.encode(redirect_uri, state, AuthorizationError::new(kind), encoding)
    }

    fn error_redirect(
        &self, request: &AuthorizationRequest, error: AuthorizationError, encoding: Encoding,
    ) -> Outcome {
        match request.resolved_redirect_uri() {
            Some(uri) => self.encode(
                uri.clone(),
                request.state().map(str::to_string),
                error,
                encoding,
            ),
            None => Outcome::DirectError(DirectError::new(error)),
        }
    }

    fn encode(
        &self, redirect_uri: Url, state: Option<String>, error: AuthorizationError, encoding: Encoding,
    ) -> Outcome {
        let uri = ErrorUrl::new(redirect_uri, state, error, encoding)
            .with_limit(self.config.description_limit)
            .into_url();
        Outcome::Redirect(RedirectOutcome::new(uri, encoding))
    }
}

/// Implicit responses travel in the fragment, everything else in the query.
fn response_encoding(request: &AuthorizationRequest) -> Encoding {
    if request.has_response_type(RESPONSE_TOKEN) && !request.has_response_type(RESPONSE_CODE) {
        Encoding::Fragment
    } else {
        Encoding::Query
    }
}

/// Checks on a request whose redirect target is already trusted.
fn validate(request: &mut AuthorizationRequest, client: &ClientDetails) -> Result<(), AuthorizationError> {
    for key in &[RESPONSE_TYPE, SCOPE, STATE] {
        if request.authorization_parameters().is_ambiguous(key) {
            return Err(explained(
                ErrorKind::InvalidRequest,
                format!("Parameter {} given more than once", key),
            ));
        }
    }

    if request.request().response_types().is_empty() {
        return Err(explained(ErrorKind::InvalidRequest, "A response_type must be supplied"));
    }

    let code = request.has_response_type(RESPONSE_CODE);
    let token = request.has_response_type(RESPONSE_TOKEN);
    if !code && !token {
        return Err(ErrorKind::UnsupportedResponseType.into());
    }

    if code && !client.is_authorized_for(grant_types::AUTHORIZATION_CODE) {
        return Err(explained(
            ErrorKind::UnauthorizedClient,
            "Unauthorized grant type: authorization_code",
        ));
    }

    if token && !client.is_authorized_for(grant_types::IMPLICIT) {
        return Err(explained(ErrorKind::UnauthorizedClient, "Unauthorized grant type: implicit"));
    }

    if let Some(raw) = request.authorization_parameters().get(SCOPE) {
        if raw.parse::<Scope>().is_err() {
            return Err(explained(ErrorKind::InvalidScope, "Malformed scope"));
        }
    }

    if request.scope().is_empty() {
        request.set_scope(client.scope().iter());
    }

    if !client.scope().is_empty() && !request.scope().allow_access(client.scope()) {
        return Err(explained(
            ErrorKind::InvalidScope,
            format!("Invalid scope: {}", request.scope()),
        ));
    }

    Ok(())
}

fn explained<D: Into<std::borrow::Cow<'static, str>>>(kind: ErrorKind, description: D) -> AuthorizationError {
    let mut error = AuthorizationError::new(kind);
    error.explain(description);
    error
}

fn direct_error(kind: ErrorKind, description: &'static str) -> Outcome {
    Outcome::DirectError(DirectError::new(explained(kind, description)))
}
