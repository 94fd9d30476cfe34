// self
use crate::{
	_prelude::*,
	auth::{ChallengeRequest, PkceChallenge, SECRET_BYTES, random_token},
	clock::SharedClock,
	store::{ClockedStore, PkceChallengeStore, StoreFuture, memory::mint},
};

/// In-memory [`PkceChallengeStore`] keyed by relay-issued state tokens.
#[derive(Debug)]
pub struct MemoryPkceChallengeStore {
	challenges: ClockedStore<String, PkceChallenge>,
	ttl: Duration,
}
impl MemoryPkceChallengeStore {
	/// Creates an empty store whose attempts expire after `ttl`.
	pub fn new(clock: SharedClock, ttl: Duration) -> Self {
		Self { challenges: ClockedStore::new(clock), ttl }
	}

	fn begin_now(&self, request: ChallengeRequest) -> String {
		let created_at = self.challenges.now();
		let (state_token, _) =
			mint(&self.challenges, self.ttl, || random_token(SECRET_BYTES), |state_token| {
				PkceChallenge { state_token: state_token.clone(), request: request.clone(), created_at }
			});

		state_token
	}
}
impl PkceChallengeStore for MemoryPkceChallengeStore {
	fn begin(&self, request: ChallengeRequest) -> StoreFuture<'_, String> {
		Box::pin(async move { Ok(self.begin_now(request)) })
	}

	fn consume<'a>(&'a self, state_token: &'a str) -> StoreFuture<'a, Option<PkceChallenge>> {
		Box::pin(async move { Ok(self.challenges.consume(state_token)) })
	}

	fn sweep(&self) -> StoreFuture<'_, usize> {
		Box::pin(async move { Ok(self.challenges.sweep()) })
	}
}
