use super::defaults::*;
use super::*;

fn code_request() -> RequestParameters {
    query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
    ])
}

fn approved(flow: &AuthorizationFlow, parameters: RequestParameters) -> Outcome {
    let pending = expect_pending(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    flow.approve_or_deny(pending, approval("true"), EXAMPLE_OWNER_ID)
}

#[test]
fn unapproved_code_request_is_pending() {
    let flow = builder().build().unwrap();
    let pending = expect_pending(flow.authorize(code_request(), EXAMPLE_OWNER_ID));

    assert_eq!(pending.client_id(), Some(EXAMPLE_CLIENT_ID));
    assert_eq!(
        pending.redirect_uri(),
        Some(&EXAMPLE_REDIRECT_URI.parse::<Url>().unwrap())
    );
    assert!(!pending.request().is_approved());
    assert_eq!(pending.scope(), &EXAMPLE_SCOPE.parse::<Scope>().unwrap());
}

#[test]
fn approval_issues_code() {
    let flow = builder().build().unwrap();
    let redirect = expect_redirect(approved(&flow, code_request()));

    assert!(!redirect.is_fragment_encoded());
    // An empty path is normalized to `/`.
    assert_eq!(redirect.uri().as_str(), "http://anywhere.com/?code=thecode");
}

#[test]
fn pre_approved_code_request_with_state() {
    let flow = pre_approving(builder()).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("state", EXAMPLE_STATE),
    ]);

    let redirect = expect_redirect(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(
        redirect.uri(),
        &"http://anywhere.com/?code=thecode&state=mystate".parse::<Url>().unwrap()
    );
}

#[test]
fn implicit_scope_outside_client_scope() {
    let client = ClientDetails::new(EXAMPLE_CLIENT_ID)
        .with_redirect_uri(EXAMPLE_REDIRECT_URI.parse().unwrap())
        .with_scope("smallscope".parse().unwrap())
        .with_grant_types(&[grant_types::AUTHORIZATION_CODE, grant_types::IMPLICIT]);
    let flow = pre_approving(builder().clients(clients_with(client)))
        .build()
        .unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "token"),
        ("scope", "bigscope"),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidScope,
    );
    assert!(redirect.is_fragment_encoded());
    assert_eq!(redirect.uri().query(), None);
    assert_eq!(base_uri(&redirect), EXAMPLE_REDIRECT_URI.parse::<Url>().unwrap());
}

#[test]
fn denial_is_encoded_in_query() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("state", EXAMPLE_STATE),
    ]);
    let pending = expect_pending(flow.authorize(parameters, EXAMPLE_OWNER_ID));

    let redirect = expect_error_redirect(
        flow.approve_or_deny(pending, approval("false"), EXAMPLE_OWNER_ID),
        ErrorKind::AccessDenied,
    );
    assert!(!redirect.is_fragment_encoded());
    assert_eq!(redirect.parameter("state").as_deref(), Some(EXAMPLE_STATE));
    assert_eq!(redirect.parameter("code"), None);
    assert_eq!(base_uri(&redirect), EXAMPLE_REDIRECT_URI.parse::<Url>().unwrap());
}

#[test]
fn rejection_by_code_store_is_encoded() {
    let flow = pre_approving(builder().codes(FailingCodes(PrimitiveError::Rejected(
        ErrorKind::InvalidScope,
    ))))
    .build()
    .unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("state", EXAMPLE_STATE),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidScope,
    );
    let query = redirect.uri().query().unwrap();
    assert!(query.starts_with("error=invalid_scope&"), "{}", query);
    assert!(query.ends_with("&state=mystate"), "{}", query);
}

#[test]
fn unavailable_code_store_is_server_error() {
    let flow = pre_approving(builder().codes(FailingCodes(PrimitiveError::Unavailable)))
        .build()
        .unwrap();

    expect_error_redirect(
        flow.authorize(code_request(), EXAMPLE_OWNER_ID),
        ErrorKind::ServerError,
    );
}

#[test]
fn candidate_fragment_is_kept() {
    let flow = pre_approving(builder()).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("redirect_uri", "http://anywhere.com#bar"),
    ]);

    let redirect = expect_redirect(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(
        redirect.uri(),
        &"http://anywhere.com/?code=thecode#bar".parse::<Url>().unwrap()
    );
}

#[test]
fn implicit_token_in_fragment() {
    let flow = pre_approving(builder()).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "token"),
        ("state", EXAMPLE_STATE),
    ]);

    let redirect = expect_redirect(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert!(redirect.is_fragment_encoded());
    assert_eq!(redirect.uri().query(), None);
    assert_eq!(redirect.parameter("access_token").as_deref(), Some(EXAMPLE_TOKEN));
    assert_eq!(redirect.parameter("token_type").as_deref(), Some("bearer"));
    assert!(redirect.parameter("expires_in").is_some());
    assert_eq!(redirect.parameter("scope").as_deref(), Some("read write"));

    let fragment = redirect.uri().fragment().unwrap();
    assert!(fragment.ends_with("&state=mystate"), "{}", fragment);
}

#[test]
fn implicit_without_token_is_denied() {
    let flow = pre_approving(builder().tokens(NoTokens)).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "token"),
        ("state", EXAMPLE_STATE),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::AccessDenied,
    );
    let fragment = redirect.uri().fragment().unwrap();
    assert!(fragment.starts_with("error=access_denied"), "{}", fragment);
    assert!(fragment.ends_with("&state=mystate"), "{}", fragment);
}

#[test]
fn code_wins_over_token() {
    let flow = pre_approving(builder()).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code token"),
    ]);

    let redirect = expect_redirect(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert!(!redirect.is_fragment_encoded());
    assert_eq!(redirect.parameter("code").as_deref(), Some(EXAMPLE_CODE));
}

#[test]
fn unknown_extra_response_type_is_ignored() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code other"),
    ]);

    expect_pending(flow.authorize(parameters, EXAMPLE_OWNER_ID));
}

#[test]
fn unsupported_response_type() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "other"),
        ("state", EXAMPLE_STATE),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::UnsupportedResponseType,
    );
    assert!(!redirect.is_fragment_encoded());
    assert_eq!(redirect.parameter("state").as_deref(), Some(EXAMPLE_STATE));
}

#[test]
fn missing_response_type() {
    let flow = builder().build().unwrap();
    let parameters = query(&[("client_id", EXAMPLE_CLIENT_ID)]);

    expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidRequest,
    );
}

#[test]
fn grant_type_not_authorized_for_client() {
    let client = ClientDetails::new(EXAMPLE_CLIENT_ID)
        .with_redirect_uri(EXAMPLE_REDIRECT_URI.parse().unwrap())
        .with_grant_types(&[grant_types::CLIENT_CREDENTIALS]);
    let flow = builder().clients(clients_with(client)).build().unwrap();

    expect_error_redirect(
        flow.authorize(code_request(), EXAMPLE_OWNER_ID),
        ErrorKind::UnauthorizedClient,
    );
}

#[test]
fn every_requested_type_must_be_authorized() {
    let client = ClientDetails::new(EXAMPLE_CLIENT_ID)
        .with_redirect_uri(EXAMPLE_REDIRECT_URI.parse().unwrap())
        .with_grant_types(&[grant_types::AUTHORIZATION_CODE]);
    let flow = pre_approving(builder().clients(clients_with(client)))
        .build()
        .unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code token"),
    ]);

    expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::UnauthorizedClient,
    );
}

#[test]
fn malformed_scope_is_invalid() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("scope", "read \"write\""),
    ]);

    expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidScope,
    );
}

#[test]
fn client_without_scope_allows_any() {
    let client = ClientDetails::new(EXAMPLE_CLIENT_ID)
        .with_redirect_uri(EXAMPLE_REDIRECT_URI.parse().unwrap())
        .with_grant_types(&[grant_types::AUTHORIZATION_CODE]);
    let flow = builder().clients(clients_with(client)).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("scope", "anything"),
    ]);

    let pending = expect_pending(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(pending.scope(), &"anything".parse::<Scope>().unwrap());
}

#[test]
fn unknown_client_is_direct() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", "bar"),
        ("response_type", "code"),
        ("redirect_uri", EXAMPLE_REDIRECT_URI),
    ]);

    let error = expect_direct(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::InvalidClient);
}

#[test]
fn missing_client_is_direct() {
    let flow = builder().build().unwrap();
    let parameters = query(&[("response_type", "code")]);

    let error = expect_direct(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::InvalidClient);
}

#[test]
fn unreachable_directory_is_server_error() {
    let flow = builder().clients(Unreachable).build().unwrap();

    let error = expect_direct(flow.authorize(code_request(), EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::ServerError);
}

#[test]
fn unregistered_redirect_is_direct() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("redirect_uri", "http://elsewhere.com"),
        ("state", EXAMPLE_STATE),
    ]);

    let error = expect_direct(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::RedirectMismatch);
    assert_eq!(error.error().kind().code(), "redirect_uri_mismatch");
}

#[test]
fn ambiguous_default_redirect_is_direct() {
    let client = example_client().with_redirect_uri("http://other.com".parse().unwrap());
    let flow = builder().clients(clients_with(client)).build().unwrap();

    let error = expect_direct(flow.authorize(code_request(), EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::RedirectMismatch);
}

#[test]
fn duplicate_client_id_is_direct() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
    ]);

    let error = expect_direct(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn duplicate_state_is_encoded() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("state", "a"),
        ("state", "b"),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidRequest,
    );
    assert_eq!(redirect.parameter("state"), None);
}

#[test]
fn exact_matching_rejects_extended_redirect() {
    let config = FlowConfig {
        redirect_matching: RedirectMatching::Exact,
        ..FlowConfig::default()
    };
    let flow = builder().config(config).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("redirect_uri", "http://anywhere.com/callback"),
    ]);

    let error = expect_direct(flow.authorize(parameters, EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::RedirectMismatch);
}

#[test]
fn code_validity_is_bounded() {
    let config = FlowConfig {
        code_validity_seconds: 1_000_000_000_000_000,
        ..FlowConfig::default()
    };
    match builder().config(config).build() {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "code_validity_seconds"),
        Err(other) => panic!("Unexpected error {}", other),
        Ok(_) => panic!("Built a flow with an overlong code validity"),
    }

    let config = FlowConfig {
        code_validity_seconds: MAX_CODE_VALIDITY_SECONDS,
        ..FlowConfig::default()
    };
    let codes = test_codes();
    let flow = builder().codes(codes.clone()).config(config).build().unwrap();
    let redirect = expect_redirect(approved(&flow, code_request()));
    assert_eq!(redirect.parameter("code").as_deref(), Some(EXAMPLE_CODE));

    let grant = codes.consume(EXAMPLE_CODE).unwrap();
    assert!(grant.until() <= Utc::now() + Duration::seconds(MAX_CODE_VALIDITY_SECONDS));
    assert!(!grant.is_expired_at(Utc::now() + Duration::hours(23)));
}

#[test]
fn long_descriptions_are_bounded() {
    let config = FlowConfig {
        description_limit: 10,
        ..FlowConfig::default()
    };
    let flow = builder().config(config).build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
        ("scope", "this is far too much scope"),
    ]);

    let redirect = expect_error_redirect(
        flow.authorize(parameters, EXAMPLE_OWNER_ID),
        ErrorKind::InvalidScope,
    );
    let description = redirect.parameter("error_description").unwrap();
    assert!(description.chars().count() <= 10, "{}", description);
}

#[test]
fn original_parameters_survive_the_flow() {
    let flow = builder().build().unwrap();
    let parameters = query(&[
        ("client_id", EXAMPLE_CLIENT_ID),
        ("response_type", "code"),
    ]);

    let pending = expect_pending(flow.authorize(parameters.clone(), EXAMPLE_OWNER_ID));
    assert_eq!(pending.request().authorization_parameters(), &parameters);
    assert_eq!(pending.request().authorization_parameters().get("scope"), None);
}

#[test]
fn approval_without_redirect_is_invalid() {
    let flow = builder().build().unwrap();
    let request = AuthorizationRequest::for_client(EXAMPLE_CLIENT_ID, &["read"]);
    let pending = PendingApproval::from_request(request);

    let error = expect_direct(flow.approve_or_deny(pending, approval("true"), EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::InvalidRequest);
}

#[test]
fn forged_redirect_is_rejected_on_approval() {
    let flow = builder().build().unwrap();
    let mut request = AuthorizationRequest::new(code_request());
    request.set_resolved_redirect_uri("http://evil.com".parse().unwrap());
    let pending = PendingApproval::from_request(request);

    let error = expect_direct(flow.approve_or_deny(pending, approval("true"), EXAMPLE_OWNER_ID));
    assert_eq!(error.kind(), ErrorKind::RedirectMismatch);
}

#[test]
fn remembered_approval_skips_the_page() {
    let flow = builder().approval(ApprovalMemory::new()).build().unwrap();

    let redirect = expect_redirect(approved(&flow, code_request()));
    assert_eq!(redirect.parameter("code").as_deref(), Some(EXAMPLE_CODE));

    let redirect = expect_redirect(flow.authorize(code_request(), EXAMPLE_OWNER_ID));
    assert_eq!(redirect.parameter("code").as_deref(), Some(EXAMPLE_CODE));

    expect_pending(flow.authorize(code_request(), "someone else"));
}

#[test]
fn sealed_continuation() {
    let flow = builder().build().unwrap();
    let assertion = Assertion::new(b"a very secret key");
    let pending = expect_pending(flow.authorize(code_request(), EXAMPLE_OWNER_ID));

    let sealed = pending.seal(&assertion).unwrap();
    let restored = PendingApproval::unseal(&assertion, &sealed).unwrap();
    assert_eq!(restored, pending);

    let middle = sealed.len() / 2;
    let replacement = if &sealed[middle..middle + 1] == "A" { "B" } else { "A" };
    let tampered = format!("{}{}{}", &sealed[..middle], replacement, &sealed[middle + 1..]);
    assert!(PendingApproval::unseal(&assertion, &tampered).is_err());
    assert!(PendingApproval::unseal(&Assertion::new(b"another key"), &sealed).is_err());

    let redirect = expect_redirect(flow.approve_or_deny(restored, approval("true"), EXAMPLE_OWNER_ID));
    assert_eq!(redirect.parameter("code").as_deref(), Some(EXAMPLE_CODE));
}

#[test]
fn sealed_continuation_keeps_split_scope() {
    let mut request = AuthorizationRequest::for_client(EXAMPLE_CLIENT_ID, &[] as &[&str]);
    request.set_scope(vec!["one two", "three"]);
    let pending = PendingApproval::from_request(request);
    assert_eq!(pending.scope().len(), 3);

    let assertion = Assertion::new(b"a very secret key");
    let sealed = pending.seal(&assertion).unwrap();
    let restored = PendingApproval::unseal(&assertion, &sealed).unwrap();
    assert_eq!(restored, pending);
    assert_eq!(restored.scope().iter().collect::<Vec<_>>(), vec!["one", "two", "three"]);
}
