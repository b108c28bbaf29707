use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use url::Url;

use super::{AuthorizationFlow, DirectError, FlowBuilder, Outcome, PendingApproval, RedirectOutcome};
use crate::code_grant::error::{AuthorizationError, ErrorKind};
use crate::config::{ConfigError, FlowConfig, RedirectMatching, MAX_CODE_VALIDITY_SECONDS};
use crate::primitives::prelude::*;
use crate::primitives::registrar::grant_types;
use crate::request::names::USER_OAUTH_APPROVAL;
use crate::request::{AuthorizationRequest, RequestParameters};

/// Test the authorization leg and the approval handshake.
mod authorization;

pub mod defaults {
    pub const EXAMPLE_CLIENT_ID: &str = "foo";
    pub const EXAMPLE_OWNER_ID: &str = "marissa";
    pub const EXAMPLE_REDIRECT_URI: &str = "http://anywhere.com";
    pub const EXAMPLE_STATE: &str = "mystate";
    pub const EXAMPLE_SCOPE: &str = "read write";
    pub const EXAMPLE_CODE: &str = "thecode";
    pub const EXAMPLE_TOKEN: &str = "thetoken";
}

use self::defaults::*;

/// Hands out the same tag every time.
struct TestGenerator(String);

impl TagGrant for TestGenerator {
    fn tag(&mut self, _: u64, _: &ApprovedAuthorization) -> Result<String, ()> {
        Ok(self.0.clone())
    }
}

/// A code store that always fails with the same error.
struct FailingCodes(PrimitiveError);

impl CodeStore for FailingCodes {
    fn issue(&self, _: ApprovedAuthorization) -> Result<String, PrimitiveError> {
        Err(self.0)
    }

    fn consume(&self, _: &str) -> Result<ApprovedAuthorization, PrimitiveError> {
        Err(self.0)
    }
}

/// A token granter that never grants.
struct NoTokens;

impl TokenGranter for NoTokens {
    fn grant(&self, _: &str, _: &ApprovedAuthorization) -> Result<Option<AccessToken>, PrimitiveError> {
        Ok(None)
    }
}

/// A client directory that can not be reached.
struct Unreachable;

impl ClientDirectory for Unreachable {
    fn lookup(&self, _: &str) -> Result<ClientDetails, LookupError> {
        Err(LookupError::Unavailable)
    }
}

fn example_client() -> ClientDetails {
    ClientDetails::new(EXAMPLE_CLIENT_ID)
        .with_redirect_uri(EXAMPLE_REDIRECT_URI.parse().unwrap())
        .with_scope(EXAMPLE_SCOPE.parse().unwrap())
        .with_grant_types(&[grant_types::AUTHORIZATION_CODE, grant_types::IMPLICIT])
}

fn clients_with(client: ClientDetails) -> ClientMap {
    let mut clients = ClientMap::new();
    clients.register_client(client);
    clients
}

fn test_codes() -> Arc<AuthMap<TestGenerator>> {
    Arc::new(AuthMap::new(TestGenerator(EXAMPLE_CODE.to_string())))
}

fn test_tokens() -> TokenMap<TestGenerator> {
    TokenMap::new(TestGenerator(EXAMPLE_TOKEN.to_string()))
}

/// A flow for the example client with deterministic codes and tokens.
fn builder() -> FlowBuilder {
    AuthorizationFlow::builder()
        .clients(clients_with(example_client()))
        .codes(test_codes())
        .tokens(test_tokens())
}

fn pre_approving(builder: FlowBuilder) -> FlowBuilder {
    builder.approval(FnPolicy(|_: &AuthorizationRequest, _: &str| true))
}

fn query(pairs: &[(&str, &str)]) -> RequestParameters {
    pairs.iter().cloned().collect()
}

fn approval(value: &str) -> BTreeMap<String, String> {
    let mut parameters = BTreeMap::new();
    parameters.insert(USER_OAUTH_APPROVAL.to_string(), value.to_string());
    parameters
}

fn expect_redirect(outcome: Outcome) -> RedirectOutcome {
    match outcome {
        Outcome::Redirect(redirect) => redirect,
        other => panic!("Expected a redirect, got {:?}", other),
    }
}

fn expect_pending(outcome: Outcome) -> PendingApproval {
    match outcome {
        Outcome::ApprovalNeeded(pending) => pending,
        other => panic!("Expected a pending approval, got {:?}", other),
    }
}

fn expect_direct(outcome: Outcome) -> DirectError {
    match outcome {
        Outcome::DirectError(error) => error,
        other => panic!("Expected a direct error, got {:?}", other),
    }
}

fn expect_error_redirect(outcome: Outcome, kind: ErrorKind) -> RedirectOutcome {
    let redirect = expect_redirect(outcome);
    assert_eq!(redirect.parameter("error").as_deref(), Some(kind.code()), "{}", redirect.uri());
    redirect
}

fn base_uri(redirect: &RedirectOutcome) -> Url {
    let mut uri = redirect.uri().clone();
    uri.set_query(None);
    uri.set_fragment(None);
    uri
}
