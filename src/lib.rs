//! The OAuth2 authorization flow as a state machine.
//!
//! An authorization request goes through a fixed sequence of steps: the raw parameters are
//! normalized into a request model, the redirect target is resolved against the client
//! registration, the approval state is determined, and finally a code or token is issued. Each
//! step may fail with one of the protocol errors defined in [rfc6749], which are either encoded
//! into the redirect target or surfaced directly when no trusted target exists.
//!
//! The crate is split into the same layers:
//!
//! * [`request`] holds the frozen original parameters and the mutable working state of a request.
//! * [`primitives`] declares the collaborators consulted by the flow (client directory, code
//!   store, token granter, approval policy) together with in-memory implementations.
//! * [`code_grant`] contains the pure decision logic: redirect resolution, approval transitions
//!   and error encoding.
//! * [`endpoint`] wires everything into the [`AuthorizationFlow`] controller.
//! * [`config`] holds the immutable endpoint settings.
//!
//! ```
//! # use authflow::endpoint::{AuthorizationFlow, Outcome};
//! # use authflow::primitives::prelude::*;
//! # use authflow::request::{AuthorizationRequest, RequestParameters};
//! let mut clients = ClientMap::new();
//! clients.register_client(ClientDetails::new("foo")
//!     .with_redirect_uri("http://anywhere.com".parse().unwrap())
//!     .with_grant_types(&["authorization_code"]));
//!
//! let flow = AuthorizationFlow::builder()
//!     .clients(clients)
//!     .tokens(TokenMap::new(RandomGenerator::new(16)))
//!     .approval(FnPolicy(|_: &AuthorizationRequest, _: &str| true))
//!     .build()
//!     .unwrap();
//!
//! let parameters = RequestParameters::from_query("client_id=foo&response_type=code&state=xyz");
//! match flow.authorize(parameters, "marissa") {
//!     Outcome::Redirect(redirect) => assert!(redirect.uri().query().unwrap().contains("code=")),
//!     other => panic!("Expected a code redirect: {:?}", other),
//! }
//! ```
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749
#![warn(missing_docs)]

pub mod code_grant;
pub mod config;
pub mod endpoint;
pub mod primitives;
pub mod request;

pub use crate::config::FlowConfig;
pub use crate::endpoint::{AuthorizationFlow, Outcome};
