//! Registrars answer questions about registered clients.
//!
//! The flow only ever reads client metadata: which redirect uris a client has registered, which
//! scope it may ask for, which grant types it was authorized to use and the resources and
//! authorities it carries. Managing the registrations themselves is left to the directory.
use std::collections::{BTreeSet, HashMap};
use std::iter::FromIterator;
use std::rc::Rc;
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::scope::Scope;

/// Grant type names as they appear in client registrations.
pub mod grant_types {
    /// Trading an authorization code at the token endpoint.
    pub const AUTHORIZATION_CODE: &str = "authorization_code";

    /// Receiving an access token directly in the redirect fragment.
    pub const IMPLICIT: &str = "implicit";

    /// A client acting on its own behalf.
    pub const CLIENT_CREDENTIALS: &str = "client_credentials";

    /// Refreshing an issued token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Looks up the metadata of registered clients.
pub trait ClientDirectory {
    /// Retrieve the registration of a client.
    ///
    /// Implementations return `LookupError::NotFound` for unknown ids. Any other failure to
    /// answer is `LookupError::Unavailable`.
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError>;
}

/// Reasons why a client registration could not be retrieved.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No client with this id is registered.
    #[error("no client registered under the requested id")]
    NotFound,

    /// The directory could not be consulted.
    #[error("client directory unavailable")]
    Unavailable,
}

/// Metadata of a registered client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDetails {
    client_id: String,

    #[serde(default)]
    registered_redirect_uris: Vec<Url>,

    #[serde(default)]
    scope: Scope,

    #[serde(default)]
    authorized_grant_types: BTreeSet<String>,

    #[serde(default)]
    resource_ids: BTreeSet<String>,

    #[serde(default)]
    authorities: BTreeSet<String>,
}

impl ClientDetails {
    /// A client without any registered redirect uris, scope or grant types.
    pub fn new<S: Into<String>>(client_id: S) -> Self {
        ClientDetails {
            client_id: client_id.into(),
            registered_redirect_uris: Vec::new(),
            scope: Scope::new(),
            authorized_grant_types: BTreeSet::new(),
            resource_ids: BTreeSet::new(),
            authorities: BTreeSet::new(),
        }
    }

    /// Register an additional redirect uri.
    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        if !self.registered_redirect_uris.contains(&uri) {
            self.registered_redirect_uris.push(uri);
        }
        self
    }

    /// Restrict the scope the client may request.
    ///
    /// An empty scope places no restriction on requests.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Authorize the client for some grant types.
    pub fn with_grant_types<S: AsRef<str>>(mut self, grant_types: &[S]) -> Self {
        self.authorized_grant_types
            .extend(grant_types.iter().map(|grant| grant.as_ref().to_string()));
        self
    }

    /// Name the resources that tokens for this client are valid for.
    pub fn with_resource_ids<S: AsRef<str>>(mut self, resource_ids: &[S]) -> Self {
        self.resource_ids
            .extend(resource_ids.iter().map(|id| id.as_ref().to_string()));
        self
    }

    /// Attach authorities to the client.
    pub fn with_authorities<S: AsRef<str>>(mut self, authorities: &[S]) -> Self {
        self.authorities
            .extend(authorities.iter().map(|authority| authority.as_ref().to_string()));
        self
    }

    /// The identifier of the client.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// All redirect uris in order of registration.
    pub fn registered_redirect_uris(&self) -> &[Url] {
        &self.registered_redirect_uris
    }

    /// The scope the client is allowed to request, empty when unrestricted.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Whether the client may use a grant type.
    pub fn is_authorized_for(&self, grant_type: &str) -> bool {
        self.authorized_grant_types.contains(grant_type)
    }

    /// The grant types the client may use.
    pub fn authorized_grant_types(&self) -> &BTreeSet<String> {
        &self.authorized_grant_types
    }

    /// Resources that tokens for this client are valid for.
    pub fn resource_ids(&self) -> &BTreeSet<String> {
        &self.resource_ids
    }

    /// Authorities granted to the client itself.
    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }
}

/// A very simple, in-memory hash map of client ids to their registration.
#[derive(Clone, Debug, Default)]
pub struct ClientMap {
    clients: HashMap<String, ClientDetails>,
}

impl ClientMap {
    /// Create an empty map without any clients in it.
    pub fn new() -> ClientMap {
        ClientMap::default()
    }

    /// Insert or update the client record.
    pub fn register_client(&mut self, client: ClientDetails) {
        self.clients.insert(client.client_id.clone(), client);
    }

    /// Remove a registration, returning it if it existed.
    pub fn unregister_client(&mut self, client_id: &str) -> Option<ClientDetails> {
        self.clients.remove(client_id)
    }
}

impl Extend<ClientDetails> for ClientMap {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = ClientDetails>,
    {
        iter.into_iter().for_each(|client| self.register_client(client))
    }
}

impl FromIterator<ClientDetails> for ClientMap {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ClientDetails>,
    {
        let mut into = ClientMap::new();
        into.extend(iter);
        into
    }
}

impl ClientDirectory for ClientMap {
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError> {
        self.clients.get(client_id).cloned().ok_or(LookupError::NotFound)
    }
}

impl<'s, R: ClientDirectory + ?Sized> ClientDirectory for &'s R {
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError> {
        (**self).lookup(client_id)
    }
}

impl<R: ClientDirectory + ?Sized> ClientDirectory for Box<R> {
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError> {
        (**self).lookup(client_id)
    }
}

impl<R: ClientDirectory + ?Sized> ClientDirectory for Rc<R> {
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError> {
        (**self).lookup(client_id)
    }
}

impl<R: ClientDirectory + ?Sized> ClientDirectory for Arc<R> {
    fn lookup(&self, client_id: &str) -> Result<ClientDetails, LookupError> {
        (**self).lookup(client_id)
    }
}
