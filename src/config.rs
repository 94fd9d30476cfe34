//! Relay configuration: externally visible URLs, upstream provider, lifetimes, and intervals.
//!
//! Build a [`BrokerConfig`] with [`BrokerConfig::builder`] or load it from the process
//! environment with [`BrokerConfig::from_env`]. Environment variables:
//!
//! | Variable | Required | Meaning |
//! |---|---|---|
//! | `RELAY_BASE_URL` | yes | Externally visible base URL of the relay. |
//! | `RELAY_RESOURCE_URL` | no | Protected resource identifier (defaults to the base URL). |
//! | `UPSTREAM_CLIENT_ID` | yes | Relay's client id at the upstream provider. |
//! | `UPSTREAM_CLIENT_SECRET` | yes | Relay's client secret at the upstream provider. |
//! | `UPSTREAM_AUTHORIZE_URL` | yes | Upstream authorization endpoint. |
//! | `UPSTREAM_TOKEN_URL` | yes | Upstream token endpoint. |
//! | `UPSTREAM_PROVIDER_ID` | no | Label for the upstream provider (default `upstream`). |
//! | `UPSTREAM_SCOPES` | no | Space-separated scopes requested upstream. |
//! | `UPSTREAM_CLIENT_AUTH` | no | `client_secret_basic` (default) or `client_secret_post`. |
//! | `UPSTREAM_AUTHORIZATION_PARAMS` | no | Extra authorize query, e.g. `access_type=offline`. |
//! | `RELAY_SWEEP_INTERVAL_SECS` | no | Sweep interval in seconds (default 60). |
//! | `UPSTREAM_TIMEOUT_SECS` | no | Upstream request timeout in seconds (default 30). |

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, TokenSecret},
	error::ConfigError,
	metadata::CALLBACK_PATH,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

const DEFAULT_PROVIDER_ID: &str = "upstream";

/// Lifetimes applied by the stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
	/// Lifetime of a registered client's secret (and registration).
	pub client_secret: Duration,
	/// Lifetime of a pending authorization attempt.
	pub challenge: Duration,
	/// Lifetime of a relay session.
	pub session: Duration,
	/// Lifetime of an unredeemed authorization code.
	pub code: Duration,
	/// Upstream token lifetime assumed when the provider omits `expires_in`.
	pub upstream_default_expires_in: Duration,
}
impl Default for TtlPolicy {
	fn default() -> Self {
		Self {
			client_secret: Duration::days(7),
			challenge: Duration::minutes(10),
			session: Duration::days(7),
			code: Duration::minutes(10),
			upstream_default_expires_in: Duration::seconds(3600),
		}
	}
}

/// The relay's own client registration at the upstream provider.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
	/// Upstream provider endpoints and quirks.
	pub descriptor: ProviderDescriptor,
	/// Relay's client id at the upstream provider.
	pub client_id: String,
	/// Relay's client secret at the upstream provider.
	pub client_secret: TokenSecret,
	/// Scopes requested upstream, and granted to relying parties by default.
	pub scopes: ScopeSet,
}
impl UpstreamConfig {
	/// Creates an upstream configuration without scopes.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Self {
		Self {
			descriptor,
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			scopes: ScopeSet::default(),
		}
	}

	/// Sets the scopes requested upstream.
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}
}

/// Validated relay configuration.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
	/// Externally visible base URL; also the issuer identifier.
	pub base_url: Url,
	/// Protected resource identifier relying parties may name in `resource`.
	pub resource: Url,
	/// Relay callback registered at the upstream provider.
	pub callback_url: Url,
	/// Upstream provider and client credentials.
	pub upstream: UpstreamConfig,
	/// Store lifetimes.
	pub ttl: TtlPolicy,
	/// Interval between background sweeps.
	pub sweep_interval: Duration,
	/// Timeout applied to upstream HTTP requests.
	pub upstream_timeout: Duration,
}
impl BrokerConfig {
	/// Starts a builder with defaults for everything but the base URL and upstream.
	pub fn builder(base_url: Url, upstream: UpstreamConfig) -> BrokerConfigBuilder {
		BrokerConfigBuilder {
			base_url,
			resource: None,
			upstream,
			ttl: TtlPolicy::default(),
			sweep_interval: Duration::seconds(60),
			upstream_timeout: Duration::seconds(30),
		}
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Loads the configuration through `lookup`, treating blank values as unset.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let vars = Lookup(lookup);
		let base_url = vars.url("RELAY_BASE_URL")?;
		let provider_id = vars
			.optional("UPSTREAM_PROVIDER_ID")
			.unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_owned());
		let provider_id = ProviderId::new(provider_id).map_err(|e| {
			ConfigError::InvalidVariable { name: "UPSTREAM_PROVIDER_ID", reason: e.to_string() }
		})?;
		let descriptor = ProviderDescriptor::builder(provider_id)
			.authorization_endpoint(vars.url("UPSTREAM_AUTHORIZE_URL")?)
			.token_endpoint(vars.url("UPSTREAM_TOKEN_URL")?)
			.preferred_client_auth_method(
				vars.optional("UPSTREAM_CLIENT_AUTH")
					.map(|raw| {
						raw.parse::<ClientAuthMethod>().map_err(|e| ConfigError::InvalidVariable {
							name: "UPSTREAM_CLIENT_AUTH",
							reason: e.to_string(),
						})
					})
					.transpose()?
					.unwrap_or_default(),
			);
		let descriptor = match vars.optional("UPSTREAM_AUTHORIZATION_PARAMS") {
			Some(raw) => form_urlencoded::parse(raw.as_bytes())
				.fold(descriptor, |d, (k, v)| d.authorization_param(k, v)),
			None => descriptor,
		};
		let descriptor = descriptor.build().map_err(ConfigError::from)?;
		let scopes = match vars.optional("UPSTREAM_SCOPES") {
			Some(raw) => raw.parse::<ScopeSet>().map_err(|e| ConfigError::InvalidVariable {
				name: "UPSTREAM_SCOPES",
				reason: e.to_string(),
			})?,
			None => ScopeSet::default(),
		};
		let upstream = UpstreamConfig::new(
			descriptor,
			vars.required("UPSTREAM_CLIENT_ID")?,
			vars.required("UPSTREAM_CLIENT_SECRET")?,
		)
		.with_scopes(scopes);
		let mut builder = Self::builder(base_url, upstream);

		if vars.optional("RELAY_RESOURCE_URL").is_some() {
			builder = builder.resource(vars.url("RELAY_RESOURCE_URL")?);
		}
		if let Some(secs) = vars.positive_secs("RELAY_SWEEP_INTERVAL_SECS")? {
			builder = builder.sweep_interval(secs);
		}
		if let Some(secs) = vars.positive_secs("UPSTREAM_TIMEOUT_SECS")? {
			builder = builder.upstream_timeout(secs);
		}

		builder.build()
	}

	/// Absolute URL of a relay endpoint, preserving any path prefix of the base URL.
	pub fn endpoint(&self, path: &str) -> Url {
		join_path(&self.base_url, path)
	}

	/// Issuer identifier advertised in discovery metadata.
	pub fn issuer(&self) -> String {
		self.base_url.as_str().trim_end_matches('/').to_owned()
	}

	/// Returns `true` if `candidate` names this relay's protected resource.
	///
	/// A trailing slash is not significant.
	pub fn matches_resource(&self, candidate: &str) -> bool {
		match Url::parse(candidate) {
			Ok(url) =>
				url.as_str().trim_end_matches('/') == self.resource.as_str().trim_end_matches('/'),
			Err(_) => false,
		}
	}
}

/// Builder for [`BrokerConfig`].
#[derive(Clone, Debug)]
pub struct BrokerConfigBuilder {
	base_url: Url,
	resource: Option<Url>,
	upstream: UpstreamConfig,
	ttl: TtlPolicy,
	sweep_interval: Duration,
	upstream_timeout: Duration,
}
impl BrokerConfigBuilder {
	/// Overrides the protected resource identifier.
	pub fn resource(mut self, resource: Url) -> Self {
		self.resource = Some(resource);

		self
	}

	/// Overrides the store lifetimes.
	pub fn ttl(mut self, ttl: TtlPolicy) -> Self {
		self.ttl = ttl;

		self
	}

	/// Overrides the sweep interval.
	pub fn sweep_interval(mut self, interval: Duration) -> Self {
		self.sweep_interval = interval;

		self
	}

	/// Overrides the upstream request timeout.
	pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
		self.upstream_timeout = timeout;

		self
	}

	/// Validates and produces the configuration.
	pub fn build(self) -> Result<BrokerConfig> {
		let mut base_url = self.base_url;

		if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidBaseUrl { url: base_url.to_string() }.into());
		}

		base_url.set_query(None);
		base_url.set_fragment(None);

		let resource = self.resource.unwrap_or_else(|| base_url.clone());
		let callback_url = join_path(&base_url, CALLBACK_PATH);

		Ok(BrokerConfig {
			base_url,
			resource,
			callback_url,
			upstream: self.upstream,
			ttl: self.ttl,
			sweep_interval: self.sweep_interval,
			upstream_timeout: self.upstream_timeout,
		})
	}
}

fn join_path(base: &Url, path: &str) -> Url {
	let mut url = base.clone();
	let joined = format!("{}/{}", base.path().trim_end_matches('/'), path.trim_start_matches('/'));

	url.set_path(&joined);

	url
}

struct Lookup<F>(F);
impl<F> Lookup<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &'static str) -> Option<String> {
		(self.0)(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, ConfigError> {
		self.optional(name).ok_or(ConfigError::MissingVariable { name })
	}

	fn url(&self, name: &'static str) -> Result<Url, ConfigError> {
		let raw = self.required(name)?;

		Url::parse(&raw)
			.map_err(|e| ConfigError::InvalidVariable { name, reason: e.to_string() })
	}

	fn positive_secs(&self, name: &'static str) -> Result<Option<Duration>, ConfigError> {
		let Some(raw) = self.optional(name) else {
			return Ok(None);
		};
		let secs = raw.parse::<u32>().ok().filter(|secs| *secs > 0).ok_or_else(|| {
			ConfigError::InvalidVariable { name, reason: "expected a positive integer".into() }
		})?;

		Ok(Some(Duration::seconds(i64::from(secs))))
	}
}
