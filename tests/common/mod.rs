//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
pub use std::{collections::HashMap, sync::Arc};
// crates.io
pub use httpmock::{Mock, prelude::*};
pub use time::{Duration, OffsetDateTime, macros::datetime};
pub use url::Url;
// self
pub use oauth2_relay::{
	auth::{ClientRegistration, IssuedClient, ProviderId, ScopeSet, pkce},
	broker::{AuthorizeRequest, CallbackParams, ReqwestBroker, TokenRequest},
	clock::ManualClock,
	config::{BrokerConfig, UpstreamConfig},
	error::{Error, OAuthErrorCode},
	http::ReqwestHttpClient,
	provider::{ClientAuthMethod, ProviderDescriptor},
	store::BrokerStores,
};

pub const RELAY_BASE_URL: &str = "https://relay.example";
pub const UPSTREAM_CLIENT_ID: &str = "relay-upstream";
pub const UPSTREAM_CLIENT_SECRET: &str = "relay-upstream-secret";
pub const UPSTREAM_SCOPE: &str = "tagmanager.readonly";
pub const RP_REDIRECT_URI: &str = "https://rp.example/cb";
pub const RP_STATE: &str = "rp-opaque-state";
/// RFC 7636 appendix B verifier.
pub const RP_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
/// S256 challenge of [`RP_VERIFIER`].
pub const RP_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
pub const UPSTREAM_CODE: &str = "upstream-code";

pub fn test_epoch() -> OffsetDateTime {
	datetime!(2025-11-10 12:00 UTC)
}

pub fn test_config(upstream: &MockServer) -> BrokerConfig {
	let descriptor = ProviderDescriptor::builder(
		ProviderId::new("mock-upstream").expect("Provider identifier fixture should be valid."),
	)
	.authorization_endpoint(
		Url::parse(&upstream.url("/authorize"))
			.expect("Mock authorization endpoint should parse successfully."),
	)
	.token_endpoint(
		Url::parse(&upstream.url("/token")).expect("Mock token endpoint should parse successfully."),
	)
	.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
	.build()
	.expect("Provider descriptor should build successfully.");
	let upstream = UpstreamConfig::new(descriptor, UPSTREAM_CLIENT_ID, UPSTREAM_CLIENT_SECRET)
		.with_scopes(ScopeSet::new([UPSTREAM_SCOPE]).expect("Scope fixture should be valid."));

	BrokerConfig::builder(
		Url::parse(RELAY_BASE_URL).expect("Relay base URL should parse successfully."),
		upstream,
	)
	.build()
	.expect("Relay configuration should build successfully.")
}

/// Broker with in-memory stores driven by a manual clock starting at [`test_epoch`].
pub fn build_reqwest_test_broker(upstream: &MockServer) -> (Arc<ReqwestBroker>, ManualClock) {
	let clock = ManualClock::new(test_epoch());
	let config = test_config(upstream);
	let stores = BrokerStores::in_memory(clock.shared(), &config);
	let broker =
		ReqwestBroker::with_parts(config, stores, clock.shared(), ReqwestHttpClient::default())
			.expect("Relay broker should build successfully.");

	(Arc::new(broker), clock)
}

pub async fn register_rp(broker: &ReqwestBroker) -> IssuedClient {
	let registration = ClientRegistration {
		redirect_uris: vec![Url::parse(RP_REDIRECT_URI).expect("RP redirect should parse.")],
		..Default::default()
	};

	broker.register(registration).await.expect("Registration should never fail.")
}

pub fn authorize_request(client_id: &str) -> AuthorizeRequest {
	AuthorizeRequest {
		response_type: Some("code".into()),
		client_id: Some(client_id.into()),
		redirect_uri: Some(RP_REDIRECT_URI.into()),
		state: Some(RP_STATE.into()),
		code_challenge: Some(RP_CHALLENGE.into()),
		code_challenge_method: Some("S256".into()),
		resource: None,
	}
}

pub fn token_request(issued: &IssuedClient, code: &str) -> TokenRequest {
	TokenRequest {
		grant_type: Some("authorization_code".into()),
		code: Some(code.into()),
		client_id: Some(issued.client.client_id.to_string()),
		client_secret: Some(issued.client_secret.expose().into()),
		redirect_uri: Some(RP_REDIRECT_URI.into()),
		code_verifier: Some(RP_VERIFIER.into()),
	}
}

pub fn upstream_token_body(expires_in: u32) -> String {
	format!(
		"{{\"access_token\":\"upstream-access\",\"refresh_token\":\"upstream-refresh\",\"token_type\":\"Bearer\",\"expires_in\":{expires_in},\"scope\":\"{UPSTREAM_SCOPE}\"}}"
	)
}

/// Relay callback URL derived from [`RELAY_BASE_URL`].
pub const RELAY_CALLBACK_URL: &str = "https://relay.example/callback";

/// Mocks a successful upstream code exchange for [`UPSTREAM_CODE`].
///
/// Only matches exchanges that carry the relay's own callback and a PKCE verifier.
pub async fn mock_upstream_token<'a>(server: &'a MockServer, expires_in: u32) -> Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", UPSTREAM_CODE)
				.form_urlencoded_tuple("client_id", UPSTREAM_CLIENT_ID)
				.form_urlencoded_tuple("redirect_uri", RELAY_CALLBACK_URL)
				.form_urlencoded_tuple_exists("code_verifier");
			then.status(200)
				.header("content-type", "application/json")
				.body(upstream_token_body(expires_in));
		})
		.await
}

/// Extracts a form field from an upstream request body.
pub fn form_field(body: &str, key: &str) -> Option<String> {
	url::form_urlencoded::parse(body.as_bytes())
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
}

/// Extracts a query parameter from a redirect location.
pub fn query_param(location: &Url, key: &str) -> Option<String> {
	location.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}
