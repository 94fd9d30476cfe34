// self
use crate::{
	_prelude::*,
	auth::{
		ClientId, ClientRegistration, DEFAULT_GRANT_TYPES, DEFAULT_RESPONSE_TYPES, IssuedClient,
		RegisteredClient, ScopeSet, SecretDigest, TokenSecret,
	},
	clock::SharedClock,
	store::{
		ClientRegistry, ClientVerdict, ClockedStore, Freshness, StoreFuture, memory::mint,
	},
};

/// Values substituted for anything a registration request leaves out.
#[derive(Clone, Debug)]
pub struct RegistrationDefaults {
	/// Redirect URI used when none is supplied (the relay's own callback).
	pub redirect_uri: Url,
	/// Scope granted when none is requested.
	pub scope: ScopeSet,
	/// Lifetime of an issued client secret.
	pub secret_ttl: Duration,
}

/// In-memory [`ClientRegistry`].
#[derive(Debug)]
pub struct MemoryClientRegistry {
	clients: ClockedStore<ClientId, RegisteredClient>,
	defaults: RegistrationDefaults,
}
impl MemoryClientRegistry {
	/// Creates an empty registry.
	pub fn new(clock: SharedClock, defaults: RegistrationDefaults) -> Self {
		Self { clients: ClockedStore::new(clock), defaults }
	}

	fn register_now(&self, registration: ClientRegistration) -> IssuedClient {
		let ClientRegistration { redirect_uris, grant_types, response_types, scope, client_name } =
			registration;
		let redirect_uris = if redirect_uris.is_empty() {
			vec![self.defaults.redirect_uri.clone()]
		} else {
			redirect_uris
		};
		let grant_types = or_defaults(grant_types, &DEFAULT_GRANT_TYPES);
		let response_types = or_defaults(response_types, &DEFAULT_RESPONSE_TYPES);
		let scope = scope.unwrap_or_else(|| self.defaults.scope.clone());
		let client_secret = TokenSecret::generate();
		let issued_at = self.clients.now();
		let (_, client) =
			mint(&self.clients, self.defaults.secret_ttl, ClientId::generate, |client_id| {
				RegisteredClient {
					client_id: client_id.clone(),
					client_name: client_name.clone(),
					secret_digest: SecretDigest::of(client_secret.expose()),
					redirect_uris: redirect_uris.clone(),
					grant_types: grant_types.clone(),
					response_types: response_types.clone(),
					scope: scope.clone(),
					issued_at,
					secret_expires_at: issued_at + self.defaults.secret_ttl,
				}
			});

		IssuedClient { client, client_secret }
	}

	fn validate_now(
		&self,
		client_id: &str,
		client_secret: &str,
		redirect_uri: Option<&Url>,
	) -> ClientVerdict {
		let client = match self.clients.lookup(client_id) {
			Freshness::Live(client) => client,
			Freshness::Expired => return ClientVerdict::Expired,
			Freshness::Missing => return ClientVerdict::UnknownClient,
		};

		if client.is_expired_at(self.clients.now()) {
			return ClientVerdict::Expired;
		}
		if !client.verify_secret(client_secret) {
			return ClientVerdict::SecretMismatch;
		}
		if redirect_uri.is_some_and(|uri| !client.allows_redirect(uri)) {
			return ClientVerdict::RedirectMismatch;
		}

		ClientVerdict::Valid(client)
	}
}
impl ClientRegistry for MemoryClientRegistry {
	fn register(&self, registration: ClientRegistration) -> StoreFuture<'_, IssuedClient> {
		Box::pin(async move { Ok(self.register_now(registration)) })
	}

	fn lookup<'a>(&'a self, client_id: &'a str) -> StoreFuture<'a, Option<RegisteredClient>> {
		Box::pin(async move { Ok(self.clients.get(client_id)) })
	}

	fn validate<'a>(
		&'a self,
		client_id: &'a str,
		client_secret: &'a str,
		redirect_uri: Option<&'a Url>,
	) -> StoreFuture<'a, ClientVerdict> {
		Box::pin(async move { Ok(self.validate_now(client_id, client_secret, redirect_uri)) })
	}

	fn sweep(&self) -> StoreFuture<'_, usize> {
		Box::pin(async move { Ok(self.clients.sweep()) })
	}
}

fn or_defaults(requested: Vec<String>, defaults: &[&str]) -> Vec<String> {
	if requested.is_empty() { defaults.iter().map(|s| (*s).to_owned()).collect() } else { requested }
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::clock::ManualClock;

	fn registry() -> (MemoryClientRegistry, ManualClock) {
		let clock = ManualClock::new(datetime!(2025-11-10 12:00 UTC));
		let defaults = RegistrationDefaults {
			redirect_uri: Url::parse("https://relay.example/callback")
				.expect("Callback fixture should parse."),
			scope: ScopeSet::new(["tagmanager.readonly"]).expect("Scope fixture should be valid."),
			secret_ttl: Duration::days(7),
		};

		(MemoryClientRegistry::new(clock.shared(), defaults), clock)
	}

	#[tokio::test]
	async fn empty_registration_receives_defaults() {
		let (registry, _) = registry();
		let issued = registry
			.register(ClientRegistration::default())
			.await
			.expect("Registration should always succeed.");
		let client = &issued.client;

		assert_eq!(client.redirect_uris[0].as_str(), "https://relay.example/callback");
		assert_eq!(client.grant_types, vec!["authorization_code"]);
		assert_eq!(client.response_types, vec!["code"]);
		assert_eq!(client.scope.normalized(), "tagmanager.readonly");
		assert_eq!(client.secret_expires_at - client.issued_at, Duration::days(7));
		assert_eq!(issued.client_secret.expose().len(), 43);
	}

	#[tokio::test]
	async fn validate_distinguishes_failures() {
		let (registry, clock) = registry();
		let cb = Url::parse("https://rp.example/cb").expect("Redirect fixture should parse.");
		let other = Url::parse("https://evil.example/cb").expect("Redirect fixture should parse.");
		let issued = registry
			.register(ClientRegistration { redirect_uris: vec![cb.clone()], ..Default::default() })
			.await
			.expect("Registration should always succeed.");
		let id = issued.client.client_id.as_ref();
		let secret = issued.client_secret.expose();

		assert!(matches!(
			registry.validate(id, secret, Some(&cb)).await,
			Ok(ClientVerdict::Valid(_))
		));
		assert!(matches!(
			registry.validate(id, "wrong", Some(&cb)).await,
			Ok(ClientVerdict::SecretMismatch)
		));
		assert!(matches!(
			registry.validate(id, secret, Some(&other)).await,
			Ok(ClientVerdict::RedirectMismatch)
		));
		assert!(matches!(
			registry.validate("nobody", secret, None).await,
			Ok(ClientVerdict::UnknownClient)
		));

		clock.advance(Duration::days(7));

		assert!(matches!(registry.validate(id, secret, None).await, Ok(ClientVerdict::Expired)));
		assert!(
			registry.lookup(id).await.expect("Lookup should not fail.").is_none(),
			"Expired registrations must be observably absent."
		);
	}
}
