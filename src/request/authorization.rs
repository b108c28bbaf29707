use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};
use url::Url;

use super::names::REDIRECT_URI;
use super::{OAuthRequest, RequestParameters};
use crate::primitives::registrar::ClientDetails;
use crate::primitives::scope::Scope;

/// A request to the authorization endpoint.
///
/// The original parameters are kept exactly as received. All changes made while processing the
/// request, whether by normalization, by policy or by the resource owner, go to the working
/// state and never to the original parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    authorization_parameters: RequestParameters,
    working: OAuthRequest,
    approval_parameters: BTreeMap<String, String>,
    resolved_redirect_uri: Option<Url>,
}

impl AuthorizationRequest {
    /// Freeze the parameters and derive the initial working state from them.
    ///
    /// The scope and response types are parsed from their delimited form into sorted sets. A
    /// syntactically valid `redirect_uri` becomes the provisional redirect target until the
    /// redirect resolver confirms or replaces it.
    pub fn new(parameters: RequestParameters) -> Self {
        let working = OAuthRequest::from_parameters(&parameters);
        let resolved_redirect_uri = parameters
            .get(REDIRECT_URI)
            .and_then(|uri| uri.parse().ok());

        AuthorizationRequest {
            authorization_parameters: parameters,
            working,
            approval_parameters: BTreeMap::new(),
            resolved_redirect_uri,
        }
    }

    /// A request for a client and scope, as if only those parameters had been sent.
    pub fn for_client<S: AsRef<str>>(client_id: &str, scope: &[S]) -> Self {
        let scope = scope.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
        let parameters = vec![("client_id", client_id), ("scope", scope.as_str())]
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();
        AuthorizationRequest::new(parameters)
    }

    /// The parameters as originally received.
    pub fn authorization_parameters(&self) -> &RequestParameters {
        &self.authorization_parameters
    }

    /// The working state.
    pub fn request(&self) -> &OAuthRequest {
        &self.working
    }

    /// Mutable access to the working state.
    pub fn request_mut(&mut self) -> &mut OAuthRequest {
        &mut self.working
    }

    /// The requesting client.
    pub fn client_id(&self) -> Option<&str> {
        self.working.client_id()
    }

    /// The normalized scope.
    pub fn scope(&self) -> &Scope {
        self.working.scope()
    }

    /// Replace the scope, see [`OAuthRequest::set_scope`].
    ///
    /// [`OAuthRequest::set_scope`]: struct.OAuthRequest.html#method.set_scope
    pub fn set_scope<I, S>(&mut self, candidate: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.working.set_scope(candidate)
    }

    /// The opaque state of the client.
    pub fn state(&self) -> Option<&str> {
        self.working.state()
    }

    /// Change the state value.
    pub fn set_state<S: Into<String>>(&mut self, state: Option<S>) {
        self.working.set_state(state)
    }

    /// Whether a specific response type was requested.
    pub fn has_response_type(&self, response_type: &str) -> bool {
        self.working.has_response_type(response_type)
    }

    /// Whether the request is approved.
    pub fn is_approved(&self) -> bool {
        self.working.is_approved()
    }

    pub(crate) fn set_approved(&mut self, approved: bool) {
        self.working.set_approved(approved)
    }

    /// Inherit resources and authorities from the client registration.
    pub fn set_resource_ids_and_authorities_from_client_details(&mut self, client: &ClientDetails) {
        self.working
            .set_resource_ids_and_authorities_from_client_details(client)
    }

    /// The parameters submitted from the approval page.
    pub fn approval_parameters(&self) -> &BTreeMap<String, String> {
        &self.approval_parameters
    }

    pub(crate) fn set_approval_parameters(&mut self, parameters: BTreeMap<String, String>) {
        self.approval_parameters = parameters;
    }

    /// The redirect uri as sent by the client, if any.
    pub fn requested_redirect_uri(&self) -> Option<&str> {
        self.authorization_parameters.get(REDIRECT_URI)
    }

    /// The redirect target the response will be sent to.
    pub fn resolved_redirect_uri(&self) -> Option<&Url> {
        self.resolved_redirect_uri.as_ref()
    }

    /// Fix the redirect target.
    pub fn set_resolved_redirect_uri(&mut self, uri: Url) {
        self.resolved_redirect_uri = Some(uri);
    }
}
