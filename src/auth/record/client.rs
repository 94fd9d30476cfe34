//! Dynamically registered relying-party clients.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, SecretDigest, TokenSecret},
};

/// Grant type every registration is granted when none is requested.
pub const DEFAULT_GRANT_TYPES: [&str; 1] = ["authorization_code"];
/// Response type every registration is granted when none is requested.
pub const DEFAULT_RESPONSE_TYPES: [&str; 1] = ["code"];
/// Token endpoint authentication method advertised to registered clients.
pub const TOKEN_ENDPOINT_AUTH_METHOD: &str = "client_secret_post";

/// Registration request after lenient parsing.
///
/// Unusable fields become empty/absent and the registry substitutes its defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientRegistration {
	/// Requested redirect URIs that parsed as absolute URLs.
	pub redirect_uris: Vec<Url>,
	/// Requested grant types.
	pub grant_types: Vec<String>,
	/// Requested response types.
	pub response_types: Vec<String>,
	/// Requested scope, when a non-empty one was supplied.
	pub scope: Option<ScopeSet>,
	/// Human-readable client name.
	pub client_name: Option<String>,
}
impl ClientRegistration {
	/// Parses an RFC 7591 style payload without ever rejecting it.
	///
	/// A single string is accepted where an array is expected, non-string entries and
	/// unparsable URIs are skipped, and anything that is not a JSON object yields the defaults.
	pub fn from_json_lenient(payload: &Value) -> Self {
		let redirect_uris = string_list(payload.get("redirect_uris"))
			.into_iter()
			.filter_map(|raw| Url::parse(&raw).ok())
			.collect();
		let scope = payload
			.get("scope")
			.and_then(Value::as_str)
			.map(|raw| ScopeSet::parse_lenient(raw, ' '))
			.filter(|scope| !scope.is_empty());
		let client_name = payload
			.get("client_name")
			.and_then(Value::as_str)
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_owned);

		Self {
			redirect_uris,
			grant_types: string_list(payload.get("grant_types")),
			response_types: string_list(payload.get("response_types")),
			scope,
			client_name,
		}
	}
}

fn string_list(value: Option<&Value>) -> Vec<String> {
	let mut out = Vec::new();

	match value {
		Some(Value::String(single)) => out.push(single.trim().to_owned()),
		Some(Value::Array(items)) =>
			out.extend(items.iter().filter_map(Value::as_str).map(|s| s.trim().to_owned())),
		_ => {},
	}

	out.retain(|s| !s.is_empty());
	out.dedup();

	out
}

/// Stored relying-party registration. The plaintext secret is never retained.
#[derive(Clone)]
pub struct RegisteredClient {
	/// Unique identifier.
	pub client_id: ClientId,
	/// Optional display name.
	pub client_name: Option<String>,
	/// Digest of the issued client secret.
	pub secret_digest: SecretDigest,
	/// Registered redirect URIs; authorize/token redirect URIs must be members.
	pub redirect_uris: Vec<Url>,
	/// Granted grant types.
	pub grant_types: Vec<String>,
	/// Granted response types.
	pub response_types: Vec<String>,
	/// Granted scope.
	pub scope: ScopeSet,
	/// Registration instant.
	pub issued_at: OffsetDateTime,
	/// Instant after which the secret, and the registration, stop being valid.
	pub secret_expires_at: OffsetDateTime,
}
impl RegisteredClient {
	/// Returns `true` if `redirect_uri` exactly matches a registered URI.
	pub fn allows_redirect(&self, redirect_uri: &Url) -> bool {
		self.redirect_uris.iter().any(|registered| registered == redirect_uri)
	}

	/// Returns `true` once the registration has lapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.secret_expires_at
	}

	/// Constant-time secret check.
	pub fn verify_secret(&self, candidate: &str) -> bool {
		self.secret_digest.verify(candidate)
	}
}
impl Debug for RegisteredClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisteredClient")
			.field("client_id", &self.client_id)
			.field("client_name", &self.client_name)
			.field("redirect_uris", &self.redirect_uris.iter().map(Url::as_str).collect::<Vec<_>>())
			.field("grant_types", &self.grant_types)
			.field("response_types", &self.response_types)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("secret_expires_at", &self.secret_expires_at)
			.finish_non_exhaustive()
	}
}

/// Result of a registration: the stored client plus its one-time plaintext secret.
#[derive(Clone, Debug)]
pub struct IssuedClient {
	/// Stored registration.
	pub client: RegisteredClient,
	/// Plaintext secret, returned exactly once.
	pub client_secret: TokenSecret,
}
impl IssuedClient {
	/// Builds the RFC 7591 registration response body.
	pub fn to_response(&self) -> RegistrationResponse {
		let client = &self.client;

		RegistrationResponse {
			client_id: client.client_id.clone(),
			client_secret: self.client_secret.expose().to_owned(),
			client_id_issued_at: client.issued_at.unix_timestamp(),
			client_secret_expires_at: client.secret_expires_at.unix_timestamp(),
			client_name: client.client_name.clone(),
			redirect_uris: client.redirect_uris.iter().map(|uri| uri.to_string()).collect(),
			grant_types: client.grant_types.clone(),
			response_types: client.response_types.clone(),
			scope: client.scope.normalized(),
			token_endpoint_auth_method: TOKEN_ENDPOINT_AUTH_METHOD,
		}
	}
}

/// Wire form of a successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistrationResponse {
	/// Issued client identifier.
	pub client_id: ClientId,
	/// Issued client secret.
	pub client_secret: String,
	/// Registration instant (Unix seconds).
	pub client_id_issued_at: i64,
	/// Secret expiry (Unix seconds).
	pub client_secret_expires_at: i64,
	/// Display name, if one was supplied.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub client_name: Option<String>,
	/// Registered redirect URIs.
	pub redirect_uris: Vec<String>,
	/// Granted grant types.
	pub grant_types: Vec<String>,
	/// Granted response types.
	pub response_types: Vec<String>,
	/// Granted scope (space-delimited).
	pub scope: String,
	/// Preferred token endpoint authentication method.
	pub token_endpoint_auth_method: &'static str,
}
