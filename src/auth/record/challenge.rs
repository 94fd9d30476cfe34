//! Pending authorization attempts awaiting the upstream callback.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PkceMethod, SessionId, TokenSecret},
};

/// Everything the relay must remember between `/authorize` and `/callback`.
#[derive(Clone, Debug)]
pub struct ChallengeRequest {
	/// Relying-party client that started the attempt.
	pub client_id: ClientId,
	/// Session created for the attempt.
	pub session_id: SessionId,
	/// Relying-party redirect URI the final code is delivered to.
	pub redirect_uri: Url,
	/// Relying party's own `state`, echoed back verbatim.
	pub original_state: Option<String>,
	/// Relying party's PKCE challenge, carried onto the issued code.
	pub code_challenge: String,
	/// Relying party's PKCE method.
	pub code_challenge_method: PkceMethod,
	/// Verifier for the relay's own upstream PKCE leg.
	pub upstream_verifier: TokenSecret,
}

/// Stored authorization attempt keyed by the relay-issued `state_token`.
#[derive(Clone, Debug)]
pub struct PkceChallenge {
	/// Relay-issued state sent upstream; never the relying party's own state.
	pub state_token: String,
	/// Attempt details recorded at authorize time.
	pub request: ChallengeRequest,
	/// Creation instant.
	pub created_at: OffsetDateTime,
}
impl PkceChallenge {
	/// Relying-party client that started the attempt.
	pub fn client_id(&self) -> &ClientId {
		&self.request.client_id
	}

	/// Session created for the attempt.
	pub fn session_id(&self) -> &SessionId {
		&self.request.session_id
	}

	/// Relying party's own `state`.
	pub fn original_state(&self) -> Option<&str> {
		self.request.original_state.as_deref()
	}
}
