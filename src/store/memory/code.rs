// self
use crate::{
	_prelude::*,
	auth::{AuthorizationCode, CodeGrant, RedeemOutcome, SECRET_BYTES, random_token},
	clock::SharedClock,
	store::{AuthorizationCodeStore, ClockedStore, StoreFuture, memory::mint},
};

/// In-memory [`AuthorizationCodeStore`].
#[derive(Debug)]
pub struct MemoryAuthorizationCodeStore {
	codes: ClockedStore<String, AuthorizationCode>,
	ttl: Duration,
}
impl MemoryAuthorizationCodeStore {
	/// Creates an empty store whose codes expire after `ttl`.
	pub fn new(clock: SharedClock, ttl: Duration) -> Self {
		Self { codes: ClockedStore::new(clock), ttl }
	}

	fn issue_now(&self, grant: CodeGrant) -> String {
		let created_at = self.codes.now();
		let (code, _) = mint(&self.codes, self.ttl, || random_token(SECRET_BYTES), |code| {
			AuthorizationCode { code: code.clone(), grant: grant.clone(), created_at }
		});

		code
	}

	fn redeem_now(&self, code: &str, client_id: &str) -> RedeemOutcome {
		match self.codes.consume(code) {
			None => RedeemOutcome::Unknown,
			Some(issued) if issued.grant.client_id.as_ref() != client_id =>
				RedeemOutcome::ClientMismatch { issued_to: issued.grant.client_id },
			Some(issued) => RedeemOutcome::Redeemed(issued),
		}
	}
}
impl AuthorizationCodeStore for MemoryAuthorizationCodeStore {
	fn issue(&self, grant: CodeGrant) -> StoreFuture<'_, String> {
		Box::pin(async move { Ok(self.issue_now(grant)) })
	}

	fn redeem<'a>(&'a self, code: &'a str, client_id: &'a str) -> StoreFuture<'a, RedeemOutcome> {
		Box::pin(async move { Ok(self.redeem_now(code, client_id)) })
	}

	fn sweep(&self) -> StoreFuture<'_, usize> {
		Box::pin(async move { Ok(self.codes.sweep()) })
	}
}
