//! One-time relay authorization codes.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, PkceMethod, SessionId, pkce},
};

/// Bindings recorded when a code is issued.
#[derive(Clone, Debug)]
pub struct CodeGrant {
	/// Client the code is issued to.
	pub client_id: ClientId,
	/// Session the code unlocks.
	pub session_id: SessionId,
	/// Redirect URI the code was delivered to.
	pub redirect_uri: Url,
	/// Relying party's PKCE challenge from the authorize request.
	pub code_challenge: String,
	/// Relying party's PKCE method.
	pub code_challenge_method: PkceMethod,
}

/// Issued authorization code.
#[derive(Clone, Debug)]
pub struct AuthorizationCode {
	/// Opaque code value.
	pub code: String,
	/// Bindings recorded at issue time.
	pub grant: CodeGrant,
	/// Issue instant.
	pub created_at: OffsetDateTime,
}
impl AuthorizationCode {
	/// Checks a presented PKCE verifier against the bound challenge.
	pub fn verify_pkce(&self, verifier: &str) -> bool {
		match self.grant.code_challenge_method {
			PkceMethod::S256 => pkce::verify_s256(verifier, &self.grant.code_challenge),
		}
	}
}

/// Result of redeeming a code.
///
/// The unknown and client-mismatch cases stay distinct for logging; callers map both onto
/// the same `invalid_grant` response.
#[derive(Clone, Debug)]
pub enum RedeemOutcome {
	/// Code was valid and issued to the presenting client.
	Redeemed(AuthorizationCode),
	/// Code was unknown, expired, or already redeemed.
	Unknown,
	/// Code existed but was issued to another client; it is burned regardless.
	ClientMismatch {
		/// Client the code was actually issued to.
		issued_to: ClientId,
	},
}
