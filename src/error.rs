//! Relay-level error types shared across the broker, upstream facade, and stores.
//!
//! Every variant maps onto an OAuth 2.0 wire error via [`Error::oauth_code`] and an HTTP
//! status via [`Error::http_status`], so transport layers never have to re-classify
//! failures themselves.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS) while calling the upstream provider.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Request is missing a parameter or carries a malformed one.
	#[error("{reason}")]
	InvalidRequest {
		/// Human-readable reason returned as `error_description`.
		reason: String,
	},
	/// Client is unknown, expired, or failed authentication.
	#[error("{reason}")]
	InvalidClient {
		/// Human-readable reason returned as `error_description`.
		reason: String,
	},
	/// Redirect URI is not registered for the client.
	#[error("The redirect_uri is not registered for this client.")]
	InvalidRedirectUri,
	/// Authorization code is unknown, expired, replayed, or bound to another client.
	///
	/// The description is deliberately uniform so callers cannot tell the causes apart.
	#[error("The authorization grant is invalid, expired, or was issued to another client.")]
	InvalidGrant,
	/// Token endpoint received a grant type other than `authorization_code`.
	#[error("Grant type `{grant_type}` is not supported.")]
	UnsupportedGrantType {
		/// Grant type supplied by the caller.
		grant_type: String,
	},
	/// Authorization request used a PKCE method other than `S256`.
	#[error("Code challenge method `{method}` is not supported; use S256.")]
	UnsupportedCodeChallengeMethod {
		/// Method supplied by the caller.
		method: String,
	},
	/// Resource indicator does not name this relay's protected resource.
	#[error("Resource `{resource}` is not served by this authorization server.")]
	InvalidTarget {
		/// Resource indicator supplied by the caller.
		resource: String,
	},
	/// Bearer token does not resolve to a session with upstream credentials.
	#[error("The access token is missing, expired, or not yet authorized upstream.")]
	Unauthorized,
	/// Upstream provider rejected the authorization or code exchange.
	#[error("Upstream provider rejected the request: {error}.")]
	Upstream {
		/// OAuth `error` returned by the upstream provider.
		error: String,
		/// OAuth `error_description` returned by the upstream provider, if any.
		description: Option<String>,
		/// HTTP status returned by the upstream provider, if known.
		status: Option<u16>,
	},
}
impl Error {
	/// Builds an [`Error::InvalidRequest`] from any displayable reason.
	pub fn invalid_request(reason: impl Into<String>) -> Self {
		Self::InvalidRequest { reason: reason.into() }
	}

	/// Builds an [`Error::InvalidClient`] from any displayable reason.
	pub fn invalid_client(reason: impl Into<String>) -> Self {
		Self::InvalidClient { reason: reason.into() }
	}

	/// OAuth error code surfaced on the wire.
	pub fn oauth_code(&self) -> OAuthErrorCode {
		match self {
			Self::InvalidRequest { .. } => OAuthErrorCode::InvalidRequest,
			Self::InvalidClient { .. } => OAuthErrorCode::InvalidClient,
			Self::InvalidRedirectUri => OAuthErrorCode::InvalidRedirectUri,
			Self::InvalidGrant => OAuthErrorCode::InvalidGrant,
			Self::UnsupportedGrantType { .. } => OAuthErrorCode::UnsupportedGrantType,
			Self::UnsupportedCodeChallengeMethod { .. } =>
				OAuthErrorCode::UnsupportedCodeChallengeMethod,
			Self::InvalidTarget { .. } => OAuthErrorCode::InvalidTarget,
			Self::Unauthorized => OAuthErrorCode::Unauthorized,
			Self::Upstream { .. } | Self::Transient(_) | Self::Transport(_) =>
				OAuthErrorCode::UpstreamError,
			Self::Storage(_) | Self::Config(_) => OAuthErrorCode::ServerError,
		}
	}

	/// HTTP status code that accompanies the error on the wire.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Unauthorized => 401,
			Self::Transient(_) | Self::Transport(_) => 503,
			Self::Upstream { .. } | Self::Storage(_) | Self::Config(_) => 500,
			_ => 400,
		}
	}

	/// Returns `true` when the caller may retry the same request later.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}

	/// `error_description` safe to hand to a relying party.
	///
	/// Client errors echo their message; server-side failures collapse to a generic text so
	/// internal configuration or storage details never leave the process.
	pub fn description(&self) -> String {
		match self {
			Self::Storage(_) | Self::Config(_) =>
				"The authorization server encountered an unexpected error.".into(),
			Self::Transient(_) | Self::Transport(_) =>
				"The upstream identity provider is temporarily unavailable; retry later.".into(),
			Self::Upstream { .. } => "The upstream identity provider rejected the request.".into(),
			other => other.to_string(),
		}
	}
}

/// OAuth 2.0 error codes produced by the relay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
	/// Missing or malformed parameter.
	InvalidRequest,
	/// Unknown client, bad secret, or expired registration.
	InvalidClient,
	/// Redirect URI not registered for the client.
	InvalidRedirectUri,
	/// Bad, expired, or replayed authorization code.
	InvalidGrant,
	/// Grant type other than `authorization_code`.
	UnsupportedGrantType,
	/// PKCE method other than `S256`.
	UnsupportedCodeChallengeMethod,
	/// Resource indicator mismatch.
	InvalidTarget,
	/// Bearer credential could not be resolved.
	Unauthorized,
	/// Failure while talking to the upstream provider.
	UpstreamError,
	/// Unexpected local failure.
	ServerError,
}
impl OAuthErrorCode {
	/// Returns the RFC-style identifier for the error code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::InvalidRedirectUri => "invalid_redirect_uri",
			Self::InvalidGrant => "invalid_grant",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::UnsupportedCodeChallengeMethod => "unsupported_code_challenge_method",
			Self::InvalidTarget => "invalid_target",
			Self::Unauthorized => "unauthorized",
			Self::UpstreamError => "upstream_error",
			Self::ServerError => "server_error",
		}
	}
}
impl Display for OAuthErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Base URL cannot act as a prefix for relay endpoints.
	#[error("Base URL `{url}` cannot carry endpoint paths.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Required environment variable is absent.
	#[error("Environment variable `{name}` is required.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{name}` is invalid: {reason}.")]
	InvalidVariable {
		/// Variable name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Upstream returned an unexpected but non-fatal response.
	#[error("Upstream token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Upstream responded with malformed JSON that could not be parsed.
	#[error("Upstream token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn client_errors_map_to_bad_request() {
		let cases = [
			(Error::invalid_request("missing code"), "invalid_request"),
			(Error::invalid_client("unknown client"), "invalid_client"),
			(Error::InvalidRedirectUri, "invalid_redirect_uri"),
			(Error::InvalidGrant, "invalid_grant"),
			(
				Error::UnsupportedGrantType { grant_type: "password".into() },
				"unsupported_grant_type",
			),
			(
				Error::UnsupportedCodeChallengeMethod { method: "plain".into() },
				"unsupported_code_challenge_method",
			),
			(Error::InvalidTarget { resource: "https://other".into() }, "invalid_target"),
		];

		for (error, code) in cases {
			assert_eq!(error.oauth_code().as_str(), code);
			assert_eq!(error.http_status(), 400, "{code} should be a client error.");
		}
	}

	#[test]
	fn server_side_failures_hide_details() {
		let error: Error =
			crate::store::StoreError::Backend { message: "redis exploded".into() }.into();

		assert_eq!(error.oauth_code(), OAuthErrorCode::ServerError);
		assert_eq!(error.http_status(), 500);
		assert!(!error.description().contains("redis"));
	}

	#[test]
	fn transient_upstream_failures_are_retryable() {
		let error: Error = TransientError::TokenEndpoint {
			message: "timeout".into(),
			status: None,
			retry_after: None,
		}
		.into();

		assert!(error.is_retryable());
		assert_eq!(error.http_status(), 503);
		assert_eq!(error.oauth_code(), OAuthErrorCode::UpstreamError);
		assert!(!Error::InvalidGrant.is_retryable());
		assert_eq!(Error::Unauthorized.http_status(), 401);
	}

	#[test]
	fn oauth_codes_serialize_as_snake_case() {
		let payload = serde_json::to_string(&OAuthErrorCode::UnsupportedCodeChallengeMethod)
			.expect("Error code should serialize to JSON.");

		assert_eq!(payload, "\"unsupported_code_challenge_method\"");
	}
}
