// self
use crate::{
	_prelude::*,
	auth::CodeGrant,
	broker::{AuthorizationBroker, non_empty, observe, reject, required},
	http::UpstreamHttpClient,
	obs::FlowKind,
};

const KIND: FlowKind = FlowKind::Callback;

/// Query parameters the upstream provider sends to the relay callback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
	/// Upstream authorization code.
	pub code: Option<String>,
	/// Relay state token issued at authorize time.
	pub state: Option<String>,
	/// Upstream error code, when the user denied consent or the provider failed.
	pub error: Option<String>,
	/// Upstream error description.
	pub error_description: Option<String>,
}

/// Redirect back to the relying party carrying the relay authorization code.
#[derive(Clone, Debug)]
pub struct CallbackRedirect {
	/// Relying-party redirect URI with `code` and the original `state` appended.
	pub location: Url,
}

impl<C> AuthorizationBroker<C>
where
	C: ?Sized + UpstreamHttpClient,
{
	/// Completes the upstream handshake and issues a one-time relay authorization code.
	///
	/// The pending challenge is consumed before the upstream exchange, so a replayed callback
	/// fails even if the first one is still in flight. An upstream `error` also consumes the
	/// challenge and yields a generic `invalid_request`, since no relying-party redirect target
	/// is trusted at that point.
	pub async fn upstream_callback(&self, params: CallbackParams) -> Result<CallbackRedirect> {
		observe(KIND, "upstream_callback", async move {
			if non_empty(&params.error).is_some() {
				if let Some(state) = non_empty(&params.state) {
					self.stores.challenges.consume(state).await?;
				}

				return Err(reject(
					KIND,
					"upstream_denied",
					Error::invalid_request("The upstream authorization was denied or failed."),
				));
			}

			let code = required(&params.code, "code")?;
			let state = required(&params.state, "state")?;
			let challenge = self.stores.challenges.consume(state).await?.ok_or_else(|| {
				reject(
					KIND,
					"unknown_state",
					Error::invalid_request("The authorization state is unknown or expired."),
				)
			})?;
			let verifier =
				self.upstream.uses_pkce().then(|| challenge.request.upstream_verifier.expose());
			let grant = self
				.upstream
				.exchange_code(code, verifier)
				.await
				.map_err(|e| reject(KIND, "upstream_exchange_failed", e))?;
			let session = self
				.stores
				.sessions
				.bind_upstream_tokens(challenge.session_id(), grant)
				.await?
				.ok_or_else(|| {
					reject(
						KIND,
						"session_expired",
						Error::invalid_request("The authorization session expired."),
					)
				})?;
			let request = challenge.request;
			let code = self
				.stores
				.codes
				.issue(CodeGrant {
					client_id: request.client_id,
					session_id: session.id,
					redirect_uri: request.redirect_uri.clone(),
					code_challenge: request.code_challenge,
					code_challenge_method: request.code_challenge_method,
				})
				.await?;
			let mut location = request.redirect_uri;
			let retained = location
				.query_pairs()
				.filter(|(key, _)| key != "code" && key != "state")
				.map(|(key, value)| (key.into_owned(), value.into_owned()))
				.collect::<Vec<_>>();

			{
				let mut pairs = location.query_pairs_mut();

				pairs.clear().extend_pairs(&retained).append_pair("code", &code);

				if let Some(original_state) = &request.original_state {
					pairs.append_pair("state", original_state);
				}
			}

			Ok(CallbackRedirect { location })
		})
		.await
	}
}
