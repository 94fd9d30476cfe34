#![cfg(feature = "reqwest")]

mod common;

// self
use common::*;

/// Runs authorize + upstream callback and returns the relay code delivered to the RP.
async fn obtain_code(broker: &ReqwestBroker, issued: &IssuedClient) -> String {
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let callback = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect("Upstream callback should succeed.");

	query_param(&callback.location, "code").expect("Callback redirect should carry a code.")
}

#[tokio::test]
async fn double_hop_flow_issues_relay_tokens_bound_to_upstream_credentials() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let upstream_pairs: HashMap<_, _> = redirect.location.query_pairs().into_owned().collect();

	assert_eq!(redirect.location.path(), "/authorize");
	assert_eq!(upstream_pairs.get("client_id"), Some(&UPSTREAM_CLIENT_ID.into()));
	assert_eq!(upstream_pairs.get("redirect_uri"), Some(&RELAY_CALLBACK_URL.into()));
	assert_eq!(upstream_pairs.get("state"), Some(&redirect.state_token));
	assert_eq!(upstream_pairs.get("scope"), Some(&UPSTREAM_SCOPE.into()));
	assert_eq!(upstream_pairs.get("code_challenge_method"), Some(&"S256".into()));
	assert_ne!(upstream_pairs.get("code_challenge"), Some(&RP_CHALLENGE.into()));
	assert_ne!(redirect.state_token, RP_STATE);
	assert!(
		!redirect.location.as_str().contains("rp.example"),
		"The relying party's redirect URI must never be sent upstream."
	);

	let session = broker
		.stores()
		.sessions
		.get_by_session_id(redirect.session_id.as_ref())
		.await
		.expect("Session lookup should succeed.")
		.expect("Authorize should create a session.");

	assert!(!session.is_bound());
	assert!(matches!(
		broker.resolve_credential(session.access_token.expose()).await,
		Err(Error::Unauthorized)
	));

	let upstream_challenge = upstream_pairs
		.get("code_challenge")
		.cloned()
		.expect("Upstream authorize URL should carry a code challenge.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", UPSTREAM_CODE)
				.form_urlencoded_tuple("redirect_uri", RELAY_CALLBACK_URL)
				.is_true(move |req| {
					form_field(&req.body_string(), "code_verifier")
						.is_some_and(|verifier| pkce::s256_challenge(&verifier) == upstream_challenge)
				});
			then.status(200)
				.header("content-type", "application/json")
				.body(upstream_token_body(3600));
		})
		.await;
	let callback = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token.clone()),
			..Default::default()
		})
		.await
		.expect("Upstream callback should succeed.");

	mock.assert_async().await;

	assert!(callback.location.as_str().starts_with(RP_REDIRECT_URI));
	assert_eq!(query_param(&callback.location, "state").as_deref(), Some(RP_STATE));

	let code = query_param(&callback.location, "code").expect("Callback should carry a code.");
	let credential = broker
		.resolve_credential(session.access_token.expose())
		.await
		.expect("Bound session should resolve.");

	assert_eq!(credential.access_token.expose(), "upstream-access");
	assert_eq!(credential.refresh_token.as_ref().map(|token| token.expose()), Some("upstream-refresh"));
	assert_eq!(credential.expires_at, test_epoch() + Duration::hours(1));

	let response =
		broker.token(token_request(&issued, &code)).await.expect("Token exchange should succeed.");

	assert_eq!(response.token_type, "Bearer");
	assert_eq!(response.access_token, session.access_token);
	assert_eq!(response.refresh_token, session.refresh_token);
	assert!(response.expires_in > 0 && response.expires_in <= 3600);
	assert!(response.scope.contains(UPSTREAM_SCOPE));

	let replay = broker
		.token(token_request(&issued, &code))
		.await
		.expect_err("Replayed codes must be rejected.");

	assert!(matches!(replay, Error::InvalidGrant));
}

#[tokio::test]
async fn callback_without_rp_state_omits_the_state_parameter() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let _mock = mock_upstream_token(&server, 3600).await;
	let redirect = broker
		.authorize(AuthorizeRequest { state: None, ..authorize_request(issued.client.client_id.as_ref()) })
		.await
		.expect("Authorization without state should succeed.");
	let callback = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect("Upstream callback should succeed.");

	assert!(query_param(&callback.location, "code").is_some());
	assert!(query_param(&callback.location, "state").is_none());
}

#[tokio::test]
async fn authorize_rejects_invalid_requests() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let client_id = issued.client.client_id.to_string();
	let cases = [
		(
			AuthorizeRequest {
				code_challenge_method: Some("plain".into()),
				..authorize_request(&client_id)
			},
			OAuthErrorCode::UnsupportedCodeChallengeMethod,
		),
		(
			AuthorizeRequest { code_challenge_method: None, ..authorize_request(&client_id) },
			OAuthErrorCode::UnsupportedCodeChallengeMethod,
		),
		(
			AuthorizeRequest { client_id: Some("unknown".into()), ..authorize_request(&client_id) },
			OAuthErrorCode::InvalidClient,
		),
		(
			AuthorizeRequest {
				redirect_uri: Some("https://evil.example/cb".into()),
				..authorize_request(&client_id)
			},
			OAuthErrorCode::InvalidRedirectUri,
		),
		(
			AuthorizeRequest { code_challenge: None, ..authorize_request(&client_id) },
			OAuthErrorCode::InvalidRequest,
		),
		(
			AuthorizeRequest { code_challenge: Some("short".into()), ..authorize_request(&client_id) },
			OAuthErrorCode::InvalidRequest,
		),
		(
			AuthorizeRequest { response_type: Some("token".into()), ..authorize_request(&client_id) },
			OAuthErrorCode::InvalidRequest,
		),
		(
			AuthorizeRequest {
				resource: Some("https://other.example/".into()),
				..authorize_request(&client_id)
			},
			OAuthErrorCode::InvalidTarget,
		),
	];

	for (request, expected) in cases {
		let err = broker.authorize(request).await.expect_err("Invalid request should be rejected.");

		assert_eq!(err.oauth_code(), expected, "Unexpected error {err:?}.");
		assert_eq!(err.http_status(), 400);
	}

	let sessions = broker
		.stores()
		.sessions
		.get_by_client_id(&client_id)
		.await
		.expect("Session listing should succeed.");

	assert!(sessions.is_empty(), "Rejected requests must not create sessions.");

	broker
		.authorize(AuthorizeRequest {
			resource: Some(format!("{RELAY_BASE_URL}/")),
			..authorize_request(&client_id)
		})
		.await
		.expect("The relay's own resource indicator should be accepted.");
}

#[tokio::test]
async fn callback_state_is_single_use() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let mock = mock_upstream_token(&server, 3600).await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let params = CallbackParams {
		code: Some(UPSTREAM_CODE.into()),
		state: Some(redirect.state_token),
		..Default::default()
	};

	broker.upstream_callback(params.clone()).await.expect("First callback should succeed.");

	let err = broker
		.upstream_callback(params)
		.await
		.expect_err("Replayed callbacks must be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn upstream_error_consumes_the_pending_attempt() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let mock = mock_upstream_token(&server, 3600).await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let err = broker
		.upstream_callback(CallbackParams {
			state: Some(redirect.state_token.clone()),
			error: Some("access_denied".into()),
			..Default::default()
		})
		.await
		.expect_err("Upstream errors should fail the attempt.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::InvalidRequest);

	let err = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect_err("A denied attempt cannot be resumed.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn upstream_failures_are_classified() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let mut rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"Code was already redeemed.\"}");
		})
		.await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let err = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect_err("Upstream rejections should fail the callback.");

	assert!(matches!(err, Error::Upstream { ref error, .. } if error == "invalid_grant"));
	assert_eq!(err.http_status(), 500);
	assert!(!err.is_retryable());

	rejected.delete_async().await;

	let _unavailable = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503)
				.header("content-type", "application/json")
				.header("retry-after", "30")
				.body("{\"error\":\"temporarily_unavailable\"}");
		})
		.await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let err = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect_err("Unavailable upstream should fail the callback.");

	assert!(err.is_retryable());
	assert_eq!(err.http_status(), 503);
	assert_eq!(err.oauth_code(), OAuthErrorCode::UpstreamError);
}

#[tokio::test]
async fn non_positive_upstream_expiry_is_an_upstream_error() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let issued = register_rp(&broker).await;
	let mock = mock_upstream_token(&server, 0).await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");
	let err = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect_err("A zero upstream lifetime should fail the callback.");

	mock.assert_async().await;

	assert!(matches!(
		err,
		Error::Upstream { ref error, status: Some(200), .. } if error == "invalid_token_response"
	));
	assert_eq!(err.oauth_code(), OAuthErrorCode::UpstreamError);
	assert!(!err.is_retryable());
}

#[tokio::test]
async fn callback_replaces_code_and_state_already_in_the_redirect_uri() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let redirect_uri = "https://rp.example/cb?tenant=acme&code=stale&state=stale";
	let issued = broker
		.register(ClientRegistration {
			redirect_uris: vec![Url::parse(redirect_uri).expect("Redirect fixture should parse.")],
			..Default::default()
		})
		.await
		.expect("Registration should never fail.");
	let redirect = broker
		.authorize(AuthorizeRequest {
			redirect_uri: Some(redirect_uri.into()),
			..authorize_request(issued.client.client_id.as_ref())
		})
		.await
		.expect("Authorization request should succeed.");
	let callback = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect("Upstream callback should succeed.");
	let pairs = callback.location.query_pairs().into_owned().collect::<Vec<_>>();
	let values = |key: &str| {
		pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect::<Vec<_>>()
	};

	assert_eq!(values("tenant"), ["acme"]);
	assert_eq!(values("state"), [RP_STATE]);
	assert_eq!(values("code").len(), 1);
	assert_ne!(values("code"), ["stale"]);
}

#[tokio::test]
async fn token_rejects_codes_presented_by_another_client() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let owner = register_rp(&broker).await;
	let intruder = register_rp(&broker).await;
	let code = obtain_code(&broker, &owner).await;
	let err = broker
		.token(token_request(&intruder, &code))
		.await
		.expect_err("Codes issued to another client must be rejected.");

	assert!(matches!(err, Error::InvalidGrant));

	let err = broker
		.token(token_request(&owner, &code))
		.await
		.expect_err("A code presented by the wrong client is burned.");

	assert!(matches!(err, Error::InvalidGrant));
}

#[tokio::test]
async fn token_checks_redirect_against_the_code_not_the_presenter() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let owner = register_rp(&broker).await;
	let intruder = broker
		.register(ClientRegistration::default())
		.await
		.expect("Registration should never fail.");

	assert!(!intruder.client.redirect_uris.iter().any(|uri| uri.as_str() == RP_REDIRECT_URI));

	let code = obtain_code(&broker, &owner).await;
	let err = broker
		.token(token_request(&intruder, &code))
		.await
		.expect_err("Codes issued to another client must be rejected.");

	assert!(matches!(err, Error::InvalidGrant));

	let err = broker
		.token(token_request(&owner, &code))
		.await
		.expect_err("The code should be burned by the failed attempt.");

	assert!(matches!(err, Error::InvalidGrant));

	let code = obtain_code(&broker, &owner).await;
	let err = broker
		.token(TokenRequest {
			redirect_uri: Some("https://rp.example/other".into()),
			..token_request(&owner, &code)
		})
		.await
		.expect_err("A redirect URI differing from the authorize one must be rejected.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::InvalidGrant);
}

#[tokio::test]
async fn token_validates_client_and_grant_parameters() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let issued = register_rp(&broker).await;
	let code = obtain_code(&broker, &issued).await;
	let err = broker
		.token(TokenRequest { grant_type: Some("refresh_token".into()), ..token_request(&issued, &code) })
		.await
		.expect_err("Only authorization_code is supported.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::UnsupportedGrantType);

	let err = broker
		.token(TokenRequest { client_secret: Some("wrong".into()), ..token_request(&issued, &code) })
		.await
		.expect_err("Bad secrets must be rejected.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::InvalidClient);

	let err = broker
		.token(TokenRequest {
			client_secret: Some(format!(" {} ", issued.client_secret.expose())),
			..token_request(&issued, &code)
		})
		.await
		.expect_err("Secrets are compared verbatim.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::InvalidClient);

	let err = broker
		.token(TokenRequest { client_secret: None, ..token_request(&issued, &code) })
		.await
		.expect_err("Missing secrets must be rejected.");

	assert_eq!(err.oauth_code(), OAuthErrorCode::InvalidClient);

	let err = broker
		.token(TokenRequest {
			code_verifier: Some("wrong-verifier-wrong-verifier-wrong-verifier-00".into()),
			..token_request(&issued, &code)
		})
		.await
		.expect_err("A failing PKCE verifier must be rejected.");

	assert!(matches!(err, Error::InvalidGrant));

	let code = obtain_code(&broker, &issued).await;
	let response = broker
		.token(TokenRequest { code_verifier: None, redirect_uri: None, ..token_request(&issued, &code) })
		.await
		.expect("Verifier and redirect URI are optional at the token endpoint.");

	assert_eq!(response.token_type, "Bearer");
}

#[tokio::test]
async fn expired_state_is_invisible_before_any_sweep() {
	let server = MockServer::start_async().await;
	let (broker, clock) = build_reqwest_test_broker(&server);
	let mock = mock_upstream_token(&server, 3600).await;
	let issued = register_rp(&broker).await;
	let redirect = broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");

	clock.advance(Duration::minutes(10) + Duration::seconds(1));

	let err = broker
		.upstream_callback(CallbackParams {
			code: Some(UPSTREAM_CODE.into()),
			state: Some(redirect.state_token),
			..Default::default()
		})
		.await
		.expect_err("Expired attempts must be treated as unknown.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	mock.assert_hits_async(0).await;

	let code = obtain_code(&broker, &issued).await;

	clock.advance(Duration::minutes(11));

	let err = broker
		.token(token_request(&issued, &code))
		.await
		.expect_err("Expired codes must be rejected.");

	assert!(matches!(err, Error::InvalidGrant));
}

#[tokio::test]
async fn token_fails_once_the_upstream_token_lapsed() {
	let server = MockServer::start_async().await;
	let (broker, clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 60).await;
	let issued = register_rp(&broker).await;
	let code = obtain_code(&broker, &issued).await;

	clock.advance(Duration::seconds(61));

	let err = broker
		.token(token_request(&issued, &code))
		.await
		.expect_err("Sessions whose upstream token lapsed cannot be exchanged.");

	assert!(matches!(err, Error::InvalidGrant));
}

#[tokio::test]
async fn sweep_removes_every_expired_entry() {
	let server = MockServer::start_async().await;
	let (broker, clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let issued = register_rp(&broker).await;

	obtain_code(&broker, &issued).await;
	broker
		.authorize(authorize_request(issued.client.client_id.as_ref()))
		.await
		.expect("Authorization request should succeed.");

	let report = broker.sweep_expired().await.expect("Sweep should succeed.");

	assert_eq!(report.total(), 0);

	clock.advance(Duration::days(7) + Duration::seconds(1));

	let report = broker.sweep_expired().await.expect("Sweep should succeed.");

	assert_eq!(report.clients, 1);
	assert_eq!(report.challenges, 1);
	assert_eq!(report.sessions, 2);
	assert_eq!(report.codes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemption_succeeds_exactly_once() {
	let server = MockServer::start_async().await;
	let (broker, _clock) = build_reqwest_test_broker(&server);
	let _mock = mock_upstream_token(&server, 3600).await;
	let issued = register_rp(&broker).await;
	let code = obtain_code(&broker, &issued).await;
	let attempts = (0..16)
		.map(|_| {
			let broker = broker.clone();
			let request = token_request(&issued, &code);

			tokio::spawn(async move { broker.token(request).await })
		})
		.collect::<Vec<_>>();
	let mut successes = 0;

	for attempt in attempts {
		match attempt.await.expect("Redemption task should not panic.") {
			Ok(_) => successes += 1,
			Err(err) => assert!(matches!(err, Error::InvalidGrant)),
		}
	}

	assert_eq!(successes, 1);
}
