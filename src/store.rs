//! Storage contracts for the four relay stores and their built-in in-memory implementations.
//!
//! The broker only depends on these traits, so a deployment can back any of them with an
//! external key-value store. Every implementation must keep `consume`/`redeem` atomic per key
//! and treat expired entries as absent.

pub mod clocked;
pub mod memory;

pub use clocked::{ClockedStore, Freshness};
pub use memory::{
	MemoryAuthorizationCodeStore, MemoryClientRegistry, MemoryPkceChallengeStore,
	MemorySessionStore,
};

// self
use crate::{
	_prelude::*,
	auth::{
		ChallengeRequest, ClientId, ClientRegistration, CodeGrant, IssuedClient, PkceChallenge,
		RedeemOutcome, RegisteredClient, ScopeSet, Session, SessionId, UpstreamGrant,
	},
	clock::SharedClock,
	config::BrokerConfig,
	sweep::{Sweep, SweepFuture, SweepReport},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Registry of dynamically registered relying-party clients.
pub trait ClientRegistry
where
	Self: Send + Sync,
{
	/// Registers a client, applying defaults to anything the request left out.
	fn register(&self, registration: ClientRegistration) -> StoreFuture<'_, IssuedClient>;

	/// Returns the live registration for `client_id`.
	fn lookup<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Option<RegisteredClient>>;

	/// Authenticates a client and, when supplied, checks the redirect URI against its registration.
	fn validate<'a>(
		&'a self,
		client_id: &'a str,
		client_secret: &'a str,
		redirect_uri: Option<&'a Url>,
	) -> StoreFuture<'a, ClientVerdict>;

	/// Purges lapsed registrations, returning how many were removed.
	fn sweep(&self) -> StoreFuture<'_, usize>;
}

/// Outcome of [`ClientRegistry::validate`].
#[derive(Clone, Debug)]
pub enum ClientVerdict {
	/// Credentials (and redirect URI, if supplied) are valid.
	Valid(RegisteredClient),
	/// No registration exists for the identifier.
	UnknownClient,
	/// Registration exists but the secret does not match.
	SecretMismatch,
	/// Registration lapsed.
	Expired,
	/// Secret matched but the redirect URI is not registered.
	RedirectMismatch,
}

/// Short-lived store binding a relay `state_token` to a pending authorization attempt.
pub trait PkceChallengeStore
where
	Self: Send + Sync,
{
	/// Stores the attempt under a freshly generated `state_token` and returns it.
	fn begin(&self, request: ChallengeRequest) -> StoreFuture<'_, String>;

	/// Removes and returns the attempt; expired or unknown tokens yield `None`.
	fn consume<'a>(&'a self, state_token: &'a str) -> StoreFuture<'a, Option<PkceChallenge>>;

	/// Purges abandoned attempts, returning how many were removed.
	fn sweep(&self) -> StoreFuture<'_, usize>;
}

/// Store of relay sessions, indexed by session id and by relay access token.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Creates a session for `client_id` with fresh, independent relay tokens.
	fn create<'a>(&'a self, client_id: &'a ClientId, scope: ScopeSet) -> StoreFuture<'a, Session>;

	/// Atomically replaces the upstream tokens of a live session.
	///
	/// Returns the updated session, or `None` if it does not exist or expired.
	fn bind_upstream_tokens<'a>(
		&'a self,
		session_id: &'a SessionId,
		grant: UpstreamGrant,
	) -> StoreFuture<'a, Option<Session>>;

	/// Looks up a live session by id.
	fn get_by_session_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Session>>;

	/// Looks up a live session by relay access token in constant time.
	fn get_by_broker_access_token<'a>(
		&'a self,
		access_token: &'a str,
	) -> StoreFuture<'a, Option<Session>>;

	/// Lists every live session owned by `client_id`.
	fn get_by_client_id<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Vec<Session>>;

	/// Deletes a session and its token index entry.
	fn remove<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<Session>>;

	/// Purges expired sessions, returning how many were removed.
	fn sweep(&self) -> StoreFuture<'_, usize>;
}

/// Store of one-time relay authorization codes.
pub trait AuthorizationCodeStore
where
	Self: Send + Sync,
{
	/// Issues a fresh code bound to `grant` and returns its value.
	fn issue(&self, grant: CodeGrant) -> StoreFuture<'_, String>;

	/// Atomically consumes `code`; at most one concurrent caller observes it.
	fn redeem<'a>(&'a self, code: &'a str, client_id: &'a str) -> StoreFuture<'a, RedeemOutcome>;

	/// Purges unredeemed codes past their lifetime, returning how many were removed.
	fn sweep(&self) -> StoreFuture<'_, usize>;
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// The four stores the broker depends on.
#[derive(Clone)]
pub struct BrokerStores {
	/// Client registry.
	pub clients: Arc<dyn ClientRegistry>,
	/// Pending authorization attempts.
	pub challenges: Arc<dyn PkceChallengeStore>,
	/// Relay sessions.
	pub sessions: Arc<dyn SessionStore>,
	/// One-time authorization codes.
	pub codes: Arc<dyn AuthorizationCodeStore>,
}
impl BrokerStores {
	/// Builds in-memory stores sharing `clock`, with lifetimes and defaults from `config`.
	pub fn in_memory(clock: SharedClock, config: &BrokerConfig) -> Self {
		let ttl = &config.ttl;

		Self {
			clients: Arc::new(MemoryClientRegistry::new(
				clock.clone(),
				memory::RegistrationDefaults {
					redirect_uri: config.callback_url.clone(),
					scope: config.upstream.scopes.clone(),
					secret_ttl: ttl.client_secret,
				},
			)),
			challenges: Arc::new(MemoryPkceChallengeStore::new(clock.clone(), ttl.challenge)),
			sessions: Arc::new(MemorySessionStore::new(
				clock.clone(),
				ttl.session,
				ttl.upstream_default_expires_in,
			)),
			codes: Arc::new(MemoryAuthorizationCodeStore::new(clock, ttl.code)),
		}
	}

	/// Runs one sweep over every store.
	pub async fn sweep_expired(&self) -> Result<SweepReport, StoreError> {
		Ok(SweepReport {
			clients: self.clients.sweep().await?,
			challenges: self.challenges.sweep().await?,
			sessions: self.sessions.sweep().await?,
			codes: self.codes.sweep().await?,
		})
	}
}
impl Sweep for BrokerStores {
	fn sweep(&self) -> SweepFuture<'_> {
		Box::pin(async move { Ok(self.sweep_expired().await?) })
	}
}
impl Debug for BrokerStores {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrokerStores").finish_non_exhaustive()
	}
}
