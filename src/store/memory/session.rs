// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, Session, SessionId, TokenSecret, UpstreamGrant, UpstreamTokens},
	clock::SharedClock,
	store::{ClockedStore, SessionStore, StoreFuture, memory::mint},
};

/// In-memory [`SessionStore`] with a hash index from relay access token to session id.
#[derive(Debug)]
pub struct MemorySessionStore {
	sessions: ClockedStore<SessionId, Session>,
	by_access_token: ClockedStore<String, SessionId>,
	ttl: Duration,
	default_upstream_expires_in: Duration,
}
impl MemorySessionStore {
	/// Creates an empty store.
	///
	/// `default_upstream_expires_in` applies when the upstream provider omits `expires_in`.
	pub fn new(clock: SharedClock, ttl: Duration, default_upstream_expires_in: Duration) -> Self {
		Self {
			sessions: ClockedStore::new(clock.clone()),
			by_access_token: ClockedStore::new(clock),
			ttl,
			default_upstream_expires_in,
		}
	}

	fn create_now(&self, client_id: &ClientId, scope: ScopeSet) -> Session {
		let created_at = self.sessions.now();
		let access_token = TokenSecret::generate();
		let refresh_token = TokenSecret::generate();
		let (_, session) = mint(&self.sessions, self.ttl, SessionId::generate, |id| Session {
			id: id.clone(),
			client_id: client_id.clone(),
			scope: scope.clone(),
			access_token: access_token.clone(),
			refresh_token: refresh_token.clone(),
			upstream: None,
			created_at,
			expires_at: created_at + self.ttl,
		});

		self.by_access_token.insert(
			session.access_token.expose().to_owned(),
			session.id.clone(),
			self.ttl,
		);

		session
	}

	fn bind_now(&self, session_id: &SessionId, grant: UpstreamGrant) -> Option<Session> {
		let expires_at =
			self.sessions.now() + grant.expires_in.unwrap_or(self.default_upstream_expires_in);
		let upstream = UpstreamTokens {
			access_token: grant.access_token,
			refresh_token: grant.refresh_token,
			expires_at,
			scope: grant.scope,
		};

		self.sessions.update(session_id, move |session| {
			session.upstream = Some(upstream);

			session.clone()
		})
	}

	fn by_access_token_now(&self, access_token: &str) -> Option<Session> {
		let session_id = self.by_access_token.get(access_token)?;

		self.sessions.get(&session_id).filter(|session| session.access_token.matches(access_token))
	}

	fn remove_now(&self, session_id: &str) -> Option<Session> {
		let session = self.sessions.remove(session_id)?;

		self.by_access_token.remove(session.access_token.expose());

		Some(session)
	}
}
impl SessionStore for MemorySessionStore {
	fn create<'a>(&'a self, client_id: &'a ClientId, scope: ScopeSet) -> StoreFuture<'a, Session> {
		Box::pin(async move { Ok(self.create_now(client_id, scope)) })
	}

	fn bind_upstream_tokens<'a>(
		&'a self,
		session_id: &'a SessionId,
		grant: UpstreamGrant,
	) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.bind_now(session_id, grant)) })
	}

	fn get_by_session_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.sessions.get(session_id)) })
	}

	fn get_by_broker_access_token<'a>(
		&'a self,
		access_token: &'a str,
	) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.by_access_token_now(access_token)) })
	}

	fn get_by_client_id<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Vec<Session>> {
		Box::pin(async move {
			Ok(self.sessions.values_where(|session| session.client_id.as_ref() == client_id))
		})
	}

	fn remove<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Session>> {
		Box::pin(async move { Ok(self.remove_now(session_id)) })
	}

	fn sweep(&self) -> StoreFuture<'_, usize> {
		Box::pin(async move {
			let removed = self.sessions.sweep();

			self.by_access_token.sweep();

			Ok(removed)
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn store() -> (MemorySessionStore, ManualClock) {
		let clock = ManualClock::new(datetime!(2025-11-10 12:00 UTC));

		(MemorySessionStore::new(clock.shared(), Duration::days(7), Duration::hours(1)), clock)
	}

	fn client() -> ClientId {
		ClientId::new("client-1").expect("Client fixture should be valid.")
	}

	fn grant(access: &str, expires_in: Option<Duration>) -> UpstreamGrant {
		UpstreamGrant {
			access_token: TokenSecret::new(access),
			refresh_token: Some(TokenSecret::new("upstream-refresh")),
			expires_in,
			scope: None,
		}
	}

	#[tokio::test]
	async fn sessions_mint_independent_tokens() {
		let (store, _) = store();
		let a = store.create(&client(), ScopeSet::default()).await.expect("Create should succeed.");
		let b = store.create(&client(), ScopeSet::default()).await.expect("Create should succeed.");

		assert_ne!(a.id, b.id);
		assert_ne!(a.access_token, a.refresh_token);
		assert_ne!(a.access_token, b.access_token);
		assert!(a.upstream.is_none());
		assert_eq!(
			store.get_by_client_id("client-1").await.expect("Listing should succeed.").len(),
			2
		);
	}

	#[tokio::test]
	async fn binding_defaults_missing_expires_in() {
		let (store, clock) = store();
		let session =
			store.create(&client(), ScopeSet::default()).await.expect("Create should succeed.");
		let bound = store
			.bind_upstream_tokens(&session.id, grant("upstream-1", None))
			.await
			.expect("Bind should not fail.")
			.expect("Live session should bind.");

		assert_eq!(bound.upstream_remaining(clock.shared().now()), Some(Duration::hours(1)));

		let rebound = store
			.bind_upstream_tokens(&session.id, grant("upstream-2", Some(Duration::seconds(120))))
			.await
			.expect("Bind should not fail.")
			.expect("Binding is an idempotent overwrite.");
		let upstream = rebound.upstream.expect("Rebound session should carry upstream tokens.");

		assert_eq!(upstream.access_token.expose(), "upstream-2");
		assert_eq!(upstream.expires_at, datetime!(2025-11-10 12:02 UTC));

		let by_token = store
			.get_by_broker_access_token(session.access_token.expose())
			.await
			.expect("Lookup should not fail.")
			.expect("Access token should resolve to the session.");

		assert_eq!(by_token.id, session.id);
		assert!(by_token.is_bound());
	}

	#[tokio::test]
	async fn expired_sessions_are_absent_from_every_index() {
		let (store, clock) = store();
		let session =
			store.create(&client(), ScopeSet::default()).await.expect("Create should succeed.");

		clock.advance(Duration::days(7));

		assert!(store.get_by_session_id(&session.id).await.expect("Lookup should not fail.").is_none());
		assert!(
			store
				.get_by_broker_access_token(session.access_token.expose())
				.await
				.expect("Lookup should not fail.")
				.is_none()
		);
		assert!(store.get_by_client_id("client-1").await.expect("Listing should succeed.").is_empty());
		assert!(
			store
				.bind_upstream_tokens(&session.id, grant("late", None))
				.await
				.expect("Bind should not fail.")
				.is_none()
		);
	}

	#[tokio::test]
	async fn remove_drops_token_index() {
		let (store, _) = store();
		let session =
			store.create(&client(), ScopeSet::default()).await.expect("Create should succeed.");

		assert!(store.remove(&session.id).await.expect("Remove should not fail.").is_some());
		assert!(
			store
				.get_by_broker_access_token(session.access_token.expose())
				.await
				.expect("Lookup should not fail.")
				.is_none()
		);
		assert_eq!(store.sweep().await.expect("Sweep should not fail."), 0);
	}
}
