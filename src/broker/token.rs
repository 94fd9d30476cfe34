// self
use crate::{
	_prelude::*,
	auth::{RedeemOutcome, ScopeSet, Session, TokenSecret},
	broker::{AuthorizationBroker, non_empty, observe, reject, required, verbatim},
	http::UpstreamHttpClient,
	obs::FlowKind,
	store::ClientVerdict,
};

const KIND: FlowKind = FlowKind::Token;
const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// Token endpoint request, merged from the body and any HTTP Basic credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	/// Must be `authorization_code`.
	pub grant_type: Option<String>,
	/// Relay authorization code.
	pub code: Option<String>,
	/// Client identifier.
	pub client_id: Option<String>,
	/// Client secret.
	pub client_secret: Option<String>,
	/// Redirect URI used at authorize time.
	pub redirect_uri: Option<String>,
	/// PKCE verifier for the challenge presented at authorize time.
	pub code_verifier: Option<String>,
}
impl Debug for TokenRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRequest")
			.field("grant_type", &self.grant_type)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("code_verifier_set", &self.code_verifier.is_some())
			.finish_non_exhaustive()
	}
}

/// Successful token endpoint response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
	/// Relay access token.
	pub access_token: TokenSecret,
	/// Relay refresh token.
	pub refresh_token: TokenSecret,
	/// Always `Bearer`.
	pub token_type: &'static str,
	/// Remaining lifetime of the upstream access token, in seconds.
	pub expires_in: i64,
	/// Granted scope.
	#[serde(skip_serializing_if = "ScopeSet::is_empty")]
	pub scope: ScopeSet,
}
impl TokenResponse {
	fn from_session(session: Session, expires_in: i64) -> Self {
		Self {
			access_token: session.access_token,
			refresh_token: session.refresh_token,
			token_type: "Bearer",
			expires_in,
			scope: session.scope,
		}
	}
}

impl<C> AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Exchanges a relay authorization code for the session's relay tokens.
	///
	/// Every code-related failure surfaces as the same [`Error::InvalidGrant`]; the distinct
	/// cause is only logged. `expires_in` mirrors the remaining upstream lifetime.
	pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse> {
		observe(KIND, "token", async move {
			let grant_type = required(&request.grant_type, "grant_type")?;

			if grant_type != GRANT_AUTHORIZATION_CODE {
				return Err(reject(
					KIND,
					"unsupported_grant_type",
					Error::UnsupportedGrantType { grant_type: grant_type.to_owned() },
				));
			}

			let (Some(client_id), Some(client_secret)) =
				(verbatim(&request.client_id), verbatim(&request.client_secret))
			else {
				return Err(reject(
					KIND,
					"missing_client_credentials",
					Error::invalid_client("Client authentication is required."),
				));
			};
			let code = required(&request.code, "code")?;
			let client = match self.stores.clients.validate(client_id, client_secret, None).await? {
				ClientVerdict::Valid(client) => client,
				ClientVerdict::UnknownClient =>
					return Err(reject(KIND, "unknown_client", client_auth_failed())),
				ClientVerdict::SecretMismatch =>
					return Err(reject(KIND, "client_secret_mismatch", client_auth_failed())),
				ClientVerdict::Expired =>
					return Err(reject(KIND, "client_expired", client_auth_failed())),
				ClientVerdict::RedirectMismatch =>
					return Err(reject(KIND, "redirect_not_registered", Error::InvalidGrant)),
			};
			// The code is burned before any request binding is checked.
			let issued = match self.stores.codes.redeem(code, client.client_id.as_ref()).await? {
				RedeemOutcome::Redeemed(issued) => issued,
				RedeemOutcome::Unknown =>
					return Err(reject(KIND, "unknown_code", Error::InvalidGrant)),
				RedeemOutcome::ClientMismatch { .. } =>
					return Err(reject(KIND, "code_client_mismatch", Error::InvalidGrant)),
			};

			if non_empty(&request.redirect_uri).is_some_and(|raw| {
				Url::parse(raw).ok().is_none_or(|uri| uri != issued.grant.redirect_uri)
			}) {
				return Err(reject(KIND, "code_redirect_mismatch", Error::InvalidGrant));
			}
			if non_empty(&request.code_verifier).is_some_and(|verifier| !issued.verify_pkce(verifier))
			{
				return Err(reject(KIND, "pkce_verification_failed", Error::InvalidGrant));
			}

			let session = self
				.stores
				.sessions
				.get_by_session_id(issued.grant.session_id.as_ref())
				.await?
				.ok_or_else(|| reject(KIND, "session_expired", Error::InvalidGrant))?;
			let expires_in = session
				.upstream_remaining(self.clock.now())
				.ok_or_else(|| reject(KIND, "session_unbound", Error::InvalidGrant))?
				.whole_seconds();

			if expires_in <= 0 {
				return Err(reject(KIND, "upstream_expired", Error::InvalidGrant));
			}

			Ok(TokenResponse::from_session(session, expires_in))
		})
		.await
	}
}

fn client_auth_failed() -> Error {
	Error::invalid_client("Client authentication failed.")
}
