// crates.io
use axum::{
	Form, Json,
	extract::{FromRequest, FromRequestParts, Request},
	http::{
		HeaderMap, HeaderValue, StatusCode,
		header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
		request::Parts,
	},
	response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::UpstreamCredential,
	broker::TokenRequest,
	http::UpstreamHttpClient,
	metadata::PROTECTED_RESOURCE_PATH,
	server::{BrokerState, ErrorResponse},
};

/// Token request extracted from a form or JSON body, merged with HTTP Basic credentials.
#[derive(Clone, Debug)]
pub struct TokenForm(pub TokenRequest);
impl<S> FromRequest<S> for TokenForm
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let basic = basic_credentials(req.headers())?;
		let is_json = req
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.starts_with("application/json"));
		let mut request = if is_json {
			Json::<TokenRequest>::from_request(req, state)
				.await
				.map_err(|e| Error::invalid_request(e.body_text()))?
				.0
		} else {
			Form::<TokenRequest>::from_request(req, state)
				.await
				.map_err(|e| Error::invalid_request(e.body_text()))?
				.0
		};

		if let Some((client_id, client_secret)) = basic {
			if request.client_secret.is_some() {
				return Err(Error::invalid_request(
					"Use exactly one client authentication method.",
				));
			}
			if request.client_id.as_deref().is_some_and(|id| id != client_id) {
				return Err(Error::invalid_client("Client identifiers in header and body differ."));
			}

			request.client_id = Some(client_id);
			request.client_secret = Some(client_secret);
		}

		Ok(Self(request))
	}
}

/// Upstream credential resolved from the request's relay bearer token.
#[derive(Clone, Debug)]
pub struct Authenticated(pub UpstreamCredential);
impl<C> FromRequestParts<BrokerState<C>> for Authenticated
where
	C: ?Sized + UpstreamHttpClient,
{
	type Rejection = BearerRejection;

	async fn from_request_parts(
		parts: &mut Parts,
		broker: &BrokerState<C>,
	) -> Result<Self, Self::Rejection> {
		let resource_metadata = broker.config().endpoint(PROTECTED_RESOURCE_PATH);
		let Some(token) = bearer_token(&parts.headers) else {
			return Err(BearerRejection { resource_metadata, error: Error::Unauthorized });
		};

		broker
			.resolve_credential(token)
			.await
			.map(Self)
			.map_err(|error| BearerRejection { resource_metadata, error })
	}
}

/// Rejection of [`Authenticated`]; carries the RFC 9728 `WWW-Authenticate` challenge.
#[derive(Debug)]
pub struct BearerRejection {
	/// Protected resource metadata URL advertised in the challenge.
	pub resource_metadata: Url,
	/// Underlying failure.
	pub error: Error,
}
impl IntoResponse for BearerRejection {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.error.http_status())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let mut response = (status, Json(ErrorResponse::from(&self.error))).into_response();

		if status == StatusCode::UNAUTHORIZED {
			let challenge = format!(
				"Bearer error=\"invalid_token\", resource_metadata=\"{}\"",
				self.resource_metadata
			);

			if let Ok(value) = HeaderValue::from_str(&challenge) {
				response.headers_mut().insert(WWW_AUTHENTICATE, value);
			}
		}

		response
	}
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>> {
	let Some((scheme, encoded)) = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split_once(' '))
	else {
		return Ok(None);
	};

	if !scheme.eq_ignore_ascii_case("basic") {
		return Ok(None);
	}

	let decoded = STANDARD
		.decode(encoded.trim())
		.ok()
		.and_then(|bytes| String::from_utf8(bytes).ok())
		.ok_or_else(|| Error::invalid_client("Malformed HTTP Basic credentials."))?;
	let (client_id, client_secret) = decoded
		.split_once(':')
		.ok_or_else(|| Error::invalid_client("Malformed HTTP Basic credentials."))?;

	Ok(Some((client_id.to_owned(), client_secret.to_owned())))
}
