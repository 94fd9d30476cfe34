// crates.io
use axum::{
	Json,
	body::Bytes,
	extract::{Query, State, rejection::QueryRejection},
	http::{
		StatusCode,
		header::{CACHE_CONTROL, LOCATION, PRAGMA},
	},
	response::{IntoResponse, Response},
};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::ClientRegistration,
	broker::{AuthorizeRequest, CallbackParams},
	http::UpstreamHttpClient,
	metadata::{AuthorizationServerMetadata, ProtectedResourceMetadata},
	server::{BrokerState, TokenForm},
};

pub(super) async fn register<C>(State(broker): State<BrokerState<C>>, body: Bytes) -> Response
where
	C: ?Sized + UpstreamHttpClient,
{
	let payload = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

	match broker.register(ClientRegistration::from_json_lenient(&payload)).await {
		Ok(issued) => (
			StatusCode::CREATED,
			[(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
			Json(issued.to_response()),
		)
			.into_response(),
		Err(e) => e.into_response(),
	}
}

pub(super) async fn authorize<C>(
	State(broker): State<BrokerState<C>>,
	query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Response
where
	C: ?Sized + UpstreamHttpClient,
{
	let Query(request) = match query {
		Ok(query) => query,
		Err(e) => return Error::invalid_request(e.body_text()).into_response(),
	};

	match broker.authorize(request).await {
		Ok(redirect) => found(&redirect.location),
		Err(e) => e.into_response(),
	}
}

pub(super) async fn callback<C>(
	State(broker): State<BrokerState<C>>,
	query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response
where
	C: ?Sized + UpstreamHttpClient,
{
	let Query(params) = match query {
		Ok(query) => query,
		Err(e) => return Error::invalid_request(e.body_text()).into_response(),
	};

	match broker.upstream_callback(params).await {
		Ok(redirect) => found(&redirect.location),
		Err(e) => e.into_response(),
	}
}

pub(super) async fn token<C>(
	State(broker): State<BrokerState<C>>,
	TokenForm(request): TokenForm,
) -> Response
where
	C: ?Sized + UpstreamHttpClient,
{
	match broker.token(request).await {
		Ok(response) =>
			([(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")], Json(response)).into_response(),
		Err(e) => ([(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")], e).into_response(),
	}
}

pub(super) async fn authorization_server_metadata<C>(
	State(broker): State<BrokerState<C>>,
) -> Json<AuthorizationServerMetadata>
where
	C: ?Sized + UpstreamHttpClient,
{
	Json(AuthorizationServerMetadata::from_config(broker.config()))
}

pub(super) async fn protected_resource_metadata<C>(
	State(broker): State<BrokerState<C>>,
) -> Json<ProtectedResourceMetadata>
where
	C: ?Sized + UpstreamHttpClient,
{
	Json(ProtectedResourceMetadata::from_config(broker.config()))
}

fn found(location: &Url) -> Response {
	(StatusCode::FOUND, [(LOCATION, location.as_str())]).into_response()
}
