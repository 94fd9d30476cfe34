//! Relay sessions and the upstream credentials bound to them.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, SessionId, TokenSecret},
};

/// Upstream token response, normalized and still relative to the exchange instant.
#[derive(Clone, Debug)]
pub struct UpstreamGrant {
	/// Upstream access token.
	pub access_token: TokenSecret,
	/// Upstream refresh token, if issued.
	pub refresh_token: Option<TokenSecret>,
	/// Upstream `expires_in`; the store applies its default when absent.
	pub expires_in: Option<Duration>,
	/// Scope the upstream provider reported, if any.
	pub scope: Option<ScopeSet>,
}

/// Upstream credentials bound to a session, with an absolute expiry.
#[derive(Clone, Debug)]
pub struct UpstreamTokens {
	/// Upstream access token.
	pub access_token: TokenSecret,
	/// Upstream refresh token, if issued.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute upstream expiry.
	pub expires_at: OffsetDateTime,
	/// Scope the upstream provider reported, if any.
	pub scope: Option<ScopeSet>,
}

/// Relay session owned by one relying-party client.
///
/// `access_token` and `refresh_token` are relay-issued and independent of each other and of
/// the upstream tokens.
#[derive(Clone, Debug)]
pub struct Session {
	/// Session identifier.
	pub id: SessionId,
	/// Owning relying-party client.
	pub client_id: ClientId,
	/// Scope granted to the relying party.
	pub scope: ScopeSet,
	/// Relay-issued access token.
	pub access_token: TokenSecret,
	/// Relay-issued refresh token.
	pub refresh_token: TokenSecret,
	/// Upstream credentials; absent until the upstream handshake completes.
	pub upstream: Option<UpstreamTokens>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Session expiry, independent of the upstream expiry.
	pub expires_at: OffsetDateTime,
}
impl Session {
	/// Returns `true` once the upstream handshake bound tokens to the session.
	pub fn is_bound(&self) -> bool {
		self.upstream.is_some()
	}

	/// Remaining upstream lifetime at `instant`, or `None` before binding.
	pub fn upstream_remaining(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.upstream.as_ref().map(|upstream| upstream.expires_at - instant)
	}

	/// Projects the session onto the credential handed to resource handlers.
	pub fn credential(&self) -> Option<UpstreamCredential> {
		let upstream = self.upstream.as_ref()?;

		Some(UpstreamCredential {
			session_id: self.id.clone(),
			client_id: self.client_id.clone(),
			access_token: upstream.access_token.clone(),
			refresh_token: upstream.refresh_token.clone(),
			expires_at: upstream.expires_at,
		})
	}
}

/// Upstream credential resolved from a relay access token.
#[derive(Clone, Debug)]
pub struct UpstreamCredential {
	/// Session the credential belongs to.
	pub session_id: SessionId,
	/// Relying-party client that owns the session.
	pub client_id: ClientId,
	/// Upstream access token to present to the wrapped API.
	pub access_token: TokenSecret,
	/// Upstream refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Upstream expiry; callers decide whether to refresh.
	pub expires_at: OffsetDateTime,
}
impl UpstreamCredential {
	/// Returns `true` if the upstream access token has lapsed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}
}
