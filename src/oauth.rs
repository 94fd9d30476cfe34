//! Upstream OAuth client facade: authorization URL construction and code exchange.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret, UpstreamGrant},
	config::UpstreamConfig,
	error::{ConfigError, TransientError},
	http::{ResponseMetadata, ResponseMetadataSlot, UpstreamHttpClient},
	provider::{ClientAuthMethod, ProviderDescriptor},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// OAuth error codes that signal a temporary upstream condition.
const TRANSIENT_OAUTH_ERRORS: [&str; 2] = ["temporarily_unavailable", "server_error"];

/// The relay acting as an OAuth client of the upstream provider.
pub struct UpstreamFacade<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	descriptor: ProviderDescriptor,
	client_id: String,
	redirect_uri: Url,
	scopes: ScopeSet,
}
impl<C> UpstreamFacade<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Builds the facade for `upstream`, with `redirect_uri` as the relay callback.
	pub fn new(upstream: &UpstreamConfig, redirect_uri: &Url, http_client: Arc<C>) -> Result<Self> {
		let descriptor = &upstream.descriptor;
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(upstream.client_id.clone()))
			.set_client_secret(ClientSecret::new(upstream.client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client,
			descriptor: descriptor.clone(),
			client_id: upstream.client_id.clone(),
			redirect_uri: redirect_uri.clone(),
			scopes: upstream.scopes.clone(),
		})
	}

	/// Upstream authorization URL carrying the relay's `state_token` and callback.
	///
	/// The relying party's own redirect URI and state never appear here.
	pub fn authorize_url(&self, state_token: &str, pkce_challenge: Option<&str>) -> Url {
		let mut url = self.descriptor.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.client_id);
		pairs.append_pair("redirect_uri", self.redirect_uri.as_str());

		if !self.scopes.is_empty() {
			pairs.append_pair("scope", &self.scopes.join(self.descriptor.quirks.scope_delimiter));
		}

		pairs.append_pair("state", state_token);

		if let Some(challenge) = pkce_challenge {
			pairs.append_pair("code_challenge", challenge);
			pairs.append_pair("code_challenge_method", "S256");
		}
		for (key, value) in &self.descriptor.quirks.authorization_params {
			pairs.append_pair(key, value);
		}

		drop(pairs);

		url
	}

	/// Returns `true` when the provider descriptor enables the upstream PKCE leg.
	pub fn uses_pkce(&self) -> bool {
		self.descriptor.quirks.pkce
	}

	/// Exchanges an upstream authorization code at the upstream token endpoint.
	///
	/// Callers must not hold store locks across this call.
	pub fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		pkce_verifier: Option<&'a str>,
	) -> FacadeFuture<'a, UpstreamGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let mut request = self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

			if let Some(verifier) = pkce_verifier {
				request = request.set_pkce_verifier(PkceCodeVerifier::new(verifier.to_owned()));
			}

			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| self.map_request_error(meta.take(), err))?;
			let expires_in = match response.expires_in() {
				Some(raw) => {
					let secs = i64::try_from(raw.as_secs())
						.ok()
						.filter(|secs| *secs > 0)
						.ok_or_else(|| invalid_expires_in(meta.take().as_ref()))?;

					Some(Duration::seconds(secs))
				},
				None => None,
			};
			let scope = response
				.scopes()
				.and_then(|scopes| ScopeSet::new(scopes.iter().map(|s| s.to_string())).ok());

			Ok(UpstreamGrant {
				access_token: TokenSecret::new(response.access_token().secret().to_owned()),
				refresh_token: response
					.refresh_token()
					.map(|token| TokenSecret::new(token.secret().to_owned())),
				expires_in,
				scope,
			})
		})
	}

	fn map_request_error(
		&self,
		meta: Option<ResponseMetadata>,
		err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
	) -> Error {
		let meta = meta.as_ref();

		match err {
			RequestTokenError::ServerResponse(response) => map_server_response(response, meta),
			RequestTokenError::Request(error) => self.http_client.map_transport_error(meta, error),
			RequestTokenError::Parse(source, _body) =>
				TransientError::TokenResponseParse { source, status: meta.and_then(|m| m.status) }
					.into(),
			RequestTokenError::Other(message) => TransientError::TokenEndpoint {
				message,
				status: meta.and_then(|m| m.status),
				retry_after: meta.and_then(|m| m.retry_after),
			}
			.into(),
		}
	}
}
impl<C> Debug for UpstreamFacade<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("UpstreamFacade")
			.field("provider", &self.descriptor.id)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.finish_non_exhaustive()
	}
}

fn invalid_expires_in(meta: Option<&ResponseMetadata>) -> Error {
	Error::Upstream {
		error: "invalid_token_response".into(),
		description: Some("The upstream expires_in must be a positive number of seconds.".into()),
		status: meta.and_then(|m| m.status),
	}
}

fn map_server_response(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	let error = response.error().as_ref().to_owned();
	let status = meta.and_then(|m| m.status);
	let transient = TRANSIENT_OAUTH_ERRORS.contains(&error.as_str())
		|| status.is_some_and(|code| code == 429 || code >= 500);

	if transient {
		return TransientError::TokenEndpoint {
			message: format!("upstream returned `{error}`"),
			status,
			retry_after: meta.and_then(|m| m.retry_after),
		}
		.into();
	}

	Error::Upstream { error, description: response.error_description().cloned(), status }
}
