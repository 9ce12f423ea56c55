//! Client-assertion exchange at the OAuth token endpoint.
//!
//! Each call signs a fresh assertion, posts it once as a `client_credentials` grant, and
//! turns the JSON answer into a bearer [`Credential`]. The token endpoint's answer is parsed
//! leniently: `expires_in` may arrive as a number or a string.

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{AssertionSigner, CLIENT_ASSERTION_TYPE, ClientId, Credential, TokenSecret},
	error::{AuthError, ConfigError},
	flows::{IssueFuture, TokenIssuer},
	http::ApiHttpClient,
	obs::{self, CallKind},
	transport::{self, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Assertion flow specialized for the crate's default reqwest transport stack.
pub type ReqwestAssertionFlow = AssertionFlow<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Exchanges signed client assertions for bearer credentials.
pub struct AssertionFlow<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client used for the token exchange.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors.
	pub transport_mapper: Arc<M>,
	/// Descriptor naming the token endpoint.
	pub descriptor: ApiDescriptor,
	/// API key sent as `iss` and `sub`.
	pub client_id: ClientId,
	signer: AssertionSigner,
}
impl<C, M> AssertionFlow<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a flow over the caller-provided transport + mapper pair.
	///
	/// Fails when the descriptor carries no token endpoint.
	pub fn with_http_client(
		descriptor: ApiDescriptor,
		client_id: ClientId,
		signer: AssertionSigner,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		descriptor.require_token_endpoint()?;

		Ok(Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			client_id,
			signer,
		})
	}

	async fn exchange(&self) -> Result<Credential> {
		let token_endpoint = self.descriptor.require_token_endpoint()?;
		let issued_at = OffsetDateTime::now_utc();
		let assertion = self.signer.sign_at(&self.client_id, token_endpoint, issued_at)?;
		let request = token_request(token_endpoint, assertion.token.expose())?;
		let response = transport::execute(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			CallKind::TokenExchange,
			request,
		)
		.await?;
		let status = response.status().as_u16();

		if !response.status().is_success() {
			return Err(AuthError::TokenEndpoint { status, message: error_message(&response) }.into());
		}

		let body = transport::decode_json::<TokenEndpointResponse>(&response)?;
		let token = body
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(AuthError::MissingAccessToken)?;
		let expires_at = body
			.expires_in
			.and_then(ExpiresIn::seconds)
			.map(|seconds| issued_at + Duration::seconds(seconds));

		Ok(Credential::Bearer { token: TokenSecret::new(token), expires_at })
	}
}
#[cfg(feature = "reqwest")]
impl AssertionFlow<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a flow that provisions its own reqwest transport bounded by `timeout`.
	pub fn new(
		descriptor: ApiDescriptor,
		client_id: ClientId,
		signer: AssertionSigner,
		timeout: Duration,
	) -> Result<Self, ConfigError> {
		Self::with_http_client(
			descriptor,
			client_id,
			signer,
			ReqwestHttpClient::with_timeout(timeout)?,
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> TokenIssuer for AssertionFlow<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn issue(&self) -> IssueFuture<'_> {
		Box::pin(obs::observe(CallKind::TokenExchange, "assertion_flow", self.exchange()))
	}
}
impl<C, M> Debug for AssertionFlow<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionFlow")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("signer", &self.signer)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
	access_token: Option<String>,
	expires_in: Option<ExpiresIn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
	Number(i64),
	Text(String),
}
impl ExpiresIn {
	fn seconds(self) -> Option<i64> {
		match self {
			Self::Number(seconds) => Some(seconds),
			Self::Text(raw) => raw.trim().parse().ok(),
		}
		.filter(|seconds| *seconds > 0)
	}
}

#[derive(Deserialize)]
struct TokenErrorResponse {
	error: Option<String>,
	error_description: Option<String>,
}

fn token_request(token_endpoint: &Url, assertion: &str) -> Result<HttpRequest, ConfigError> {
	let body = form_urlencoded::Serializer::new(String::new())
		.append_pair("grant_type", "client_credentials")
		.append_pair("client_assertion_type", CLIENT_ASSERTION_TYPE)
		.append_pair("client_assertion", assertion)
		.finish();

	Ok(Request::builder()
		.method(Method::POST)
		.uri(token_endpoint.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())?)
}

fn error_message(response: &HttpResponse) -> String {
	if let Ok(body) = serde_json::from_slice::<TokenErrorResponse>(response.body()) {
		match (body.error, body.error_description) {
			(Some(error), Some(description)) => return format!("{error}: {description}"),
			(Some(message), None) | (None, Some(message)) => return message,
			(None, None) => {},
		}
	}

	let preview = String::from_utf8_lossy(response.body());
	let preview = preview.trim();

	if preview.is_empty() {
		"empty response body".into()
	} else {
		preview.chars().take(256).collect()
	}
}
