//! The double-hop authorization broker.
//!
//! [`AuthorizationBroker`] is an authorization server towards relying parties and an OAuth
//! client towards the upstream provider. One attempt moves through
//! `authorize → upstream redirect → upstream_callback → code issued → token`, and each step
//! reads or writes exactly one of the four stores. No store entry is held across the upstream
//! code exchange.
//!
//! Two distinct state values are in flight during an attempt: the relying party's own
//! `original_state`, echoed back untouched on the final redirect, and the relay-minted
//! `state_token` that travels to the upstream provider and keys the pending challenge.

mod authorize;
mod callback;
mod token;

pub use authorize::*;
pub use callback::*;
pub use token::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientRegistration, IssuedClient, UpstreamCredential},
	clock::{SharedClock, SystemClock},
	config::BrokerConfig,
	http::UpstreamHttpClient,
	oauth::UpstreamFacade,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::BrokerStores,
	sweep::{self, Sweep, SweepFuture, SweepReport, SweeperHandle},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Broker specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestBroker = AuthorizationBroker<ReqwestHttpClient>;

/// Orchestrates the relying-party and upstream handshakes over injected stores.
pub struct AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	config: Arc<BrokerConfig>,
	stores: BrokerStores,
	clock: SharedClock,
	upstream: UpstreamFacade<C>,
}
impl<C> AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Assembles a broker from explicit stores, clock, and upstream transport.
	pub fn with_parts(
		config: BrokerConfig,
		stores: BrokerStores,
		clock: SharedClock,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let upstream =
			UpstreamFacade::new(&config.upstream, &config.callback_url, http_client.into())?;

		Ok(Self { config: Arc::new(config), stores, clock, upstream })
	}

	/// Builds a broker with in-memory stores and the system clock.
	pub fn with_http_client(config: BrokerConfig, http_client: impl Into<Arc<C>>) -> Result<Self> {
		let clock = SystemClock::shared();
		let stores = BrokerStores::in_memory(clock.clone(), &config);

		Self::with_parts(config, stores, clock, http_client)
	}

	/// Validated configuration the broker runs with.
	pub fn config(&self) -> &BrokerConfig {
		&self.config
	}

	/// Stores the broker reads and writes.
	pub fn stores(&self) -> &BrokerStores {
		&self.stores
	}

	/// Current instant according to the injected clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}

	/// Registers a relying-party client and returns its one-time plaintext secret.
	///
	/// Registration never fails on request content; unusable fields fall back to defaults.
	pub async fn register(&self, registration: ClientRegistration) -> Result<IssuedClient> {
		observe(FlowKind::Register, "register", async move {
			Ok(self.stores.clients.register(registration).await?)
		})
		.await
	}

	/// Resolves a relay access token to the upstream credential bound to its session.
	///
	/// Unknown tokens, expired sessions, and sessions without upstream tokens all yield
	/// [`Error::Unauthorized`]. The upstream token itself may already be stale; callers check
	/// [`UpstreamCredential::is_expired_at`].
	pub async fn resolve_credential(&self, bearer_token: &str) -> Result<UpstreamCredential> {
		const KIND: FlowKind = FlowKind::Resolve;

		observe(KIND, "resolve_credential", async move {
			self.stores
				.sessions
				.get_by_broker_access_token(bearer_token)
				.await?
				.and_then(|session| session.credential())
				.ok_or_else(|| reject(KIND, "unresolved_bearer", Error::Unauthorized))
		})
		.await
	}

	/// Removes expired entries from every store and reports how many were dropped.
	pub async fn sweep_expired(&self) -> Result<SweepReport> {
		observe(FlowKind::Sweep, "sweep_expired", async move {
			let report = self.stores.sweep_expired().await?;

			report.record();

			Ok(report)
		})
		.await
	}

	/// Starts the background sweeper at the configured interval.
	pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
		sweep::spawn(Arc::clone(self), self.config.sweep_interval.unsigned_abs())
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizationBroker<ReqwestHttpClient> {
	/// Builds a broker with in-memory stores and a reqwest transport honoring
	/// [`BrokerConfig::upstream_timeout`].
	pub fn new(config: BrokerConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.upstream_timeout.unsigned_abs())?;

		Self::with_http_client(config, http_client)
	}
}
impl<C> Sweep for AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	fn sweep(&self) -> SweepFuture<'_> {
		Box::pin(self.sweep_expired())
	}
}
impl<C> Debug for AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationBroker")
			.field("issuer", &self.config.issuer())
			.field("upstream", &self.upstream)
			.field("stores", &self.stores)
			.finish_non_exhaustive()
	}
}

async fn observe<T, F>(kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
	}

	result
}

fn reject(kind: FlowKind, reason: &'static str, error: Error) -> Error {
	obs::record_rejection(kind, reason, &error);

	error
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Like [`non_empty`] but hands back the value untrimmed, for credentials compared verbatim.
fn verbatim(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|value| !value.trim().is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
	non_empty(value).ok_or_else(|| Error::invalid_request(format!("Missing `{name}` parameter.")))
}
