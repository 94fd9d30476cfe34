// self
use crate::{
	_prelude::*,
	auth::{ChallengeRequest, PkceMethod, PkcePair, SessionId, TokenSecret, pkce},
	broker::{AuthorizationBroker, non_empty, observe, reject, required},
	http::UpstreamHttpClient,
	obs::FlowKind,
};

const KIND: FlowKind = FlowKind::Authorize;

/// Relying-party authorization request as received on the query string.
///
/// Every field is optional on the wire so that missing parameters become `invalid_request`
/// rather than a deserialization failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
	/// Must be `code` when present.
	pub response_type: Option<String>,
	/// Registered client identifier.
	pub client_id: Option<String>,
	/// Registered redirect URI the final code is delivered to.
	pub redirect_uri: Option<String>,
	/// Relying party's opaque state, returned verbatim.
	pub state: Option<String>,
	/// PKCE challenge.
	pub code_challenge: Option<String>,
	/// PKCE method; only `S256` is accepted and an absent method means `plain`.
	pub code_challenge_method: Option<String>,
	/// RFC 8707 resource indicator.
	pub resource: Option<String>,
}

/// Redirect to the upstream provider produced by a successful authorization request.
#[derive(Clone, Debug)]
pub struct AuthorizeRedirect {
	/// Upstream authorization URL.
	pub location: Url,
	/// Relay state token sent upstream.
	pub state_token: String,
	/// Session created for the attempt.
	pub session_id: SessionId,
}

impl<C> AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Validates a relying-party authorization request and starts the upstream handshake.
	///
	/// On success a session and a pending challenge exist, and the caller redirects the user
	/// agent to [`AuthorizeRedirect::location`]. Validation failures are returned as errors and
	/// must be rendered as an error page, never as a redirect.
	pub async fn authorize(&self, request: AuthorizeRequest) -> Result<AuthorizeRedirect> {
		observe(KIND, "authorize", async move {
			let client_id = required(&request.client_id, "client_id")?;
			let client = self.stores.clients.lookup(client_id).await?.ok_or_else(|| {
				reject(
					KIND,
					"unknown_client",
					Error::invalid_client("Client is unknown or its registration expired."),
				)
			})?;
			let redirect_uri = required(&request.redirect_uri, "redirect_uri")?;
			let redirect_uri = Url::parse(redirect_uri)
				.ok()
				.filter(|uri| client.allows_redirect(uri))
				.ok_or_else(|| reject(KIND, "redirect_not_registered", Error::InvalidRedirectUri))?;

			if non_empty(&request.response_type).is_some_and(|kind| kind != "code") {
				return Err(reject(
					KIND,
					"unsupported_response_type",
					Error::invalid_request("response_type must be `code`."),
				));
			}

			let code_challenge = required(&request.code_challenge, "code_challenge")?;
			let code_challenge_method = non_empty(&request.code_challenge_method)
				.unwrap_or("plain")
				.parse::<PkceMethod>()
				.map_err(|e| reject(KIND, "unsupported_challenge_method", e))?;

			pkce::validate_challenge(code_challenge)?;

			if let Some(resource) =
				non_empty(&request.resource).filter(|resource| !self.config.matches_resource(resource))
			{
				return Err(reject(
					KIND,
					"resource_mismatch",
					Error::InvalidTarget { resource: resource.to_owned() },
				));
			}

			let session = self.stores.sessions.create(&client.client_id, client.scope.clone()).await?;
			let (verifier, challenge) = PkcePair::generate().into_parts();
			let state_token = self
				.stores
				.challenges
				.begin(ChallengeRequest {
					client_id: client.client_id,
					session_id: session.id.clone(),
					redirect_uri,
					original_state: request.state.clone().filter(|state| !state.is_empty()),
					code_challenge: code_challenge.to_owned(),
					code_challenge_method,
					upstream_verifier: TokenSecret::new(verifier),
				})
				.await?;
			let location = self
				.upstream
				.authorize_url(&state_token, self.upstream.uses_pkce().then_some(challenge.as_str()));

			Ok(AuthorizeRedirect { location, state_token, session_id: session.id })
		})
		.await
	}
}
