//! Axum HTTP surface of the relay.
//!
//! [`router`] mounts every endpoint at the root of the returned router. When the base URL
//! carries a path prefix, nest the router under that prefix so the advertised endpoints match.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `POST` | `/register` | dynamic client registration (201) |
//! | `GET` | `/authorize` | 302 to the upstream provider |
//! | `GET` | `/callback` | 302 back to the relying party |
//! | `POST` | `/token` | form or JSON body, optional HTTP Basic credentials |
//! | `GET` | `/.well-known/oauth-authorization-server` | RFC 8414 metadata |
//! | `GET` | `/.well-known/oauth-protected-resource` | RFC 9728 metadata |
//!
//! Resource handlers of the embedding application take the [`Authenticated`] extractor to
//! resolve a relay bearer token into the upstream credential.

mod extract;
mod handlers;

pub use extract::*;

// crates.io
use axum::{
	Json, Router,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
// self
use crate::{
	_prelude::*,
	broker::AuthorizationBroker,
	error::OAuthErrorCode,
	http::UpstreamHttpClient,
	metadata::{
		AUTHORIZATION_SERVER_PATH, AUTHORIZE_PATH, CALLBACK_PATH, PROTECTED_RESOURCE_PATH,
		REGISTER_PATH, TOKEN_PATH,
	},
};

/// Shared router state.
pub type BrokerState<C> = Arc<AuthorizationBroker<C>>;

/// OAuth error body returned by every endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// OAuth error code.
	pub error: OAuthErrorCode,
	/// Human-readable description.
	pub error_description: String,
}
impl From<&Error> for ErrorResponse {
	fn from(error: &Error) -> Self {
		Self { error: error.oauth_code(), error_description: error.description() }
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status =
			StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		(status, Json(ErrorResponse::from(&self))).into_response()
	}
}

/// Builds the relay router around a shared broker.
pub fn router<C>(broker: BrokerState<C>) -> Router
where
	C: ?Sized + UpstreamHttpClient,
{
	Router::new()
		.route(&format!("/{REGISTER_PATH}"), post(handlers::register::<C>))
		.route(&format!("/{AUTHORIZE_PATH}"), get(handlers::authorize::<C>))
		.route(&format!("/{CALLBACK_PATH}"), get(handlers::callback::<C>))
		.route(&format!("/{TOKEN_PATH}"), post(handlers::token::<C>))
		.route(
			&format!("/{AUTHORIZATION_SERVER_PATH}"),
			get(handlers::authorization_server_metadata::<C>),
		)
		.route(
			&format!("/{PROTECTED_RESOURCE_PATH}"),
			get(handlers::protected_resource_metadata::<C>),
		)
		.with_state(broker)
}
