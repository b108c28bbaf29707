//! The request model shared by the authorization and token endpoints.
//!
//! A request consists of two parts. The original parameters are frozen at construction and are
//! never changed afterwards. The working state (scope, state, approval and so on) starts out as
//! a normalized copy of those parameters and is refined by the flow.
use std::collections::{BTreeSet, HashMap};

use indexmap::IndexSet;
use serde_derive::{Deserialize, Serialize};

use crate::primitives::registrar::ClientDetails;
use crate::primitives::scope::{parse_parameter_list, Scope};

mod authorization;
mod parameters;
mod token;

pub use self::authorization::AuthorizationRequest;
pub use self::parameters::RequestParameters;
pub use self::token::TokenRequest;

/// Wire names of the standard parameters.
pub mod names {
    /// Identifier of the requesting client.
    pub const CLIENT_ID: &str = "client_id";
    /// Opaque value echoed back to the client.
    pub const STATE: &str = "state";
    /// Requested scope, space delimited.
    pub const SCOPE: &str = "scope";
    /// Candidate redirect target.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Requested response types, space delimited.
    pub const RESPONSE_TYPE: &str = "response_type";
    /// Grant type at the token endpoint.
    pub const GRANT_TYPE: &str = "grant_type";
    /// Authorization code at the token endpoint.
    pub const CODE: &str = "code";
    /// Default name of the owner's decision on the approval page.
    pub const USER_OAUTH_APPROVAL: &str = "user_oauth_approval";
}

/// The working state common to authorization and token requests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OAuthRequest {
    client_id: Option<String>,
    scope: Scope,
    resource_ids: BTreeSet<String>,
    authorities: BTreeSet<String>,
    approved: bool,
    state: Option<String>,
    response_types: IndexSet<String>,
    extension_properties: HashMap<String, serde_json::Value>,
}

impl OAuthRequest {
    /// An empty request without client.
    pub fn new() -> Self {
        OAuthRequest::default()
    }

    /// The requesting client, if known.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Change the client.
    pub fn set_client_id<S: Into<String>>(&mut self, client_id: Option<S>) {
        self.client_id = client_id.map(Into::into);
    }

    /// The normalized scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Replace the scope.
    ///
    /// A single candidate value containing a space or comma is treated as a delimited list and
    /// split. See [`Scope::normalize`].
    ///
    /// [`Scope::normalize`]: ../primitives/scope/struct.Scope.html#method.normalize
    pub fn set_scope<I, S>(&mut self, candidate: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = Scope::normalize(candidate);
    }

    /// Resources that the issued token will be valid for.
    pub fn resource_ids(&self) -> &BTreeSet<String> {
        &self.resource_ids
    }

    /// Authorities inherited from the client.
    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    /// Inherit resources and authorities from the client registration.
    ///
    /// Applying the same client twice has no further effect.
    pub fn set_resource_ids_and_authorities_from_client_details(&mut self, client: &ClientDetails) {
        self.resource_ids.extend(client.resource_ids().iter().cloned());
        self.authorities.extend(client.authorities().iter().cloned());
    }

    /// Whether the resource owner approved the request, explicitly or by policy.
    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub(crate) fn set_approved(&mut self, approved: bool) {
        self.approved = approved;
    }

    /// The opaque state value of the client.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Change the state value.
    pub fn set_state<S: Into<String>>(&mut self, state: Option<S>) {
        self.state = state.map(Into::into);
    }

    /// The requested response types.
    pub fn response_types(&self) -> &IndexSet<String> {
        &self.response_types
    }

    /// Whether a specific response type was requested.
    pub fn has_response_type(&self, response_type: &str) -> bool {
        self.response_types.contains(response_type)
    }

    /// Replace the requested response types.
    pub fn set_response_types<I, S>(&mut self, response_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_types = response_types.into_iter().map(Into::into).collect();
    }

    /// Values attached by protocol extensions.
    pub fn extension_properties(&self) -> &HashMap<String, serde_json::Value> {
        &self.extension_properties
    }

    /// Attach a value for a protocol extension.
    pub fn set_extension_property<S: Into<String>>(&mut self, key: S, value: serde_json::Value) {
        self.extension_properties.insert(key.into(), value);
    }

    fn from_parameters(parameters: &RequestParameters) -> Self {
        use self::names::*;

        let mut request = OAuthRequest::new();
        request.set_client_id(parameters.get(CLIENT_ID));
        request.set_state(parameters.get(STATE));
        if let Some(scope) = parameters.get(SCOPE) {
            request.set_scope(parse_parameter_list(scope));
        }
        if let Some(response_type) = parameters.get(RESPONSE_TYPE) {
            request.set_response_types(parse_parameter_list(response_type));
        }
        request
    }
}

/// Extension properties are not part of the identity of a request.
impl PartialEq for OAuthRequest {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
            && self.scope == other.scope
            && self.resource_ids == other.resource_ids
            && self.authorities == other.authorities
            && self.approved == other.approved
            && self.state == other.state
            && self.response_types == other.response_types
    }
}

impl Eq for OAuthRequest {}
