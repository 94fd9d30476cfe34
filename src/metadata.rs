//! Discovery documents (RFC 8414 and RFC 9728) derived from [`BrokerConfig`].

// self
use crate::{_prelude::*, auth::TOKEN_ENDPOINT_AUTH_METHOD, config::BrokerConfig};

/// Path of the authorization endpoint, relative to the base URL.
pub const AUTHORIZE_PATH: &str = "authorize";
/// Path of the upstream callback, relative to the base URL.
pub const CALLBACK_PATH: &str = "callback";
/// Path of the registration endpoint, relative to the base URL.
pub const REGISTER_PATH: &str = "register";
/// Path of the token endpoint, relative to the base URL.
pub const TOKEN_PATH: &str = "token";
/// Well-known path of the authorization server metadata.
pub const AUTHORIZATION_SERVER_PATH: &str = ".well-known/oauth-authorization-server";
/// Well-known path of the protected resource metadata.
pub const PROTECTED_RESOURCE_PATH: &str = ".well-known/oauth-protected-resource";

/// RFC 8414 authorization server metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
	/// Issuer identifier.
	pub issuer: String,
	/// Authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// Dynamic registration endpoint.
	pub registration_endpoint: Url,
	/// Supported scopes.
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub scopes_supported: Vec<String>,
	/// Always `["code"]`.
	pub response_types_supported: Vec<String>,
	/// Grant types clients may register.
	pub grant_types_supported: Vec<String>,
	/// Client authentication methods accepted at the token endpoint.
	pub token_endpoint_auth_methods_supported: Vec<String>,
	/// Always `["S256"]`.
	pub code_challenge_methods_supported: Vec<String>,
}
impl AuthorizationServerMetadata {
	/// Builds the document for `config`.
	pub fn from_config(config: &BrokerConfig) -> Self {
		Self {
			issuer: config.issuer(),
			authorization_endpoint: config.endpoint(AUTHORIZE_PATH),
			token_endpoint: config.endpoint(TOKEN_PATH),
			registration_endpoint: config.endpoint(REGISTER_PATH),
			scopes_supported: config.upstream.scopes.iter().map(str::to_owned).collect(),
			response_types_supported: vec!["code".into()],
			grant_types_supported: vec!["authorization_code".into()],
			token_endpoint_auth_methods_supported: vec![
				TOKEN_ENDPOINT_AUTH_METHOD.into(),
				"client_secret_basic".into(),
			],
			code_challenge_methods_supported: vec!["S256".into()],
		}
	}
}

/// RFC 9728 protected resource metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
	/// Protected resource identifier.
	pub resource: Url,
	/// Authorization servers able to issue tokens for the resource.
	pub authorization_servers: Vec<String>,
	/// Always `["header"]`.
	pub bearer_methods_supported: Vec<String>,
	/// Scopes the resource understands.
	#[serde(skip_serializing_if = "Vec::is_empty", default)]
	pub scopes_supported: Vec<String>,
}
impl ProtectedResourceMetadata {
	/// Builds the document for `config`.
	pub fn from_config(config: &BrokerConfig) -> Self {
		Self {
			resource: config.resource.clone(),
			authorization_servers: vec![config.issuer()],
			bearer_methods_supported: vec!["header".into()],
			scopes_supported: config.upstream.scopes.iter().map(str::to_owned).collect(),
		}
	}
}
