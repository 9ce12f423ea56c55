//! Client for the adaptor's `suspended-patient-status` endpoint.

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, DefaultResponseStrategy, ResponseErrorContext, ResponseStrategy},
	auth::{Credential, ResourceId},
	error::ConfigError,
	ext::{CorrelatedSigner, RequestSignerExt},
	http::ApiHttpClient,
	obs::{self, CallKind},
	resource::{PatientTraceInformation, StatusUpdate, SuspendedPatientStatus},
	transport::{self, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

const STATUS_PATH: &str = "suspended-patient-status";
const TRACE_PATH: &str = "patient-trace-information";

#[cfg(feature = "reqwest")]
/// Status client specialized for the crate's default reqwest transport stack.
pub type ReqwestStatusClient =
	SuspendedStatusClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Credential plus trace-id generator owned by one session.
#[derive(Clone, Debug)]
pub struct SessionAuth {
	credential: Credential,
	signer: CorrelatedSigner,
}
impl SessionAuth {
	/// Pairs `credential` with trace ids of the form `{trace_prefix}-{uuid}`.
	pub fn new(credential: Credential, trace_prefix: impl Into<String>) -> Self {
		Self { credential, signer: CorrelatedSigner::trace_id(trace_prefix) }
	}

	fn sign(&self, request: HttpRequest) -> Result<HttpRequest, ConfigError> {
		self.signer.attach_credential(request, &self.credential)
	}
}

/// Stateless client shared by every session; each call carries the caller's [`SessionAuth`].
pub struct SuspendedStatusClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors.
	pub transport_mapper: Arc<M>,
	/// Descriptor naming the adaptor base URL.
	pub descriptor: ApiDescriptor,
	/// Strategy classifying non-success responses.
	pub strategy: Arc<dyn ResponseStrategy>,
}
impl<C, M> SuspendedStatusClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client over the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ApiDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy: Arc::new(DefaultResponseStrategy),
		}
	}

	/// Replaces the response strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ResponseStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// GET `/suspended-patient-status/{id}`.
	pub async fn status(
		&self,
		auth: &SessionAuth,
		id: &ResourceId,
	) -> Result<SuspendedPatientStatus> {
		obs::observe(CallKind::StatusRead, "status_client.status", async move {
			let request = auth.sign(
				Request::builder()
					.method(Method::GET)
					.uri(self.url(STATUS_PATH, id)?.as_str())
					.header(ACCEPT, "application/json")
					.body(Vec::new())
					.map_err(ConfigError::from)?,
			)?;

			self.dispatch(CallKind::StatusRead, request, STATUS_PATH, id, None).await
		})
		.await
	}

	/// PUT `/suspended-patient-status/{id}` with `{previousGp, recordETag}`.
	pub async fn update(
		&self,
		auth: &SessionAuth,
		id: &ResourceId,
		update: &StatusUpdate,
	) -> Result<SuspendedPatientStatus> {
		obs::observe(CallKind::StatusUpdate, "status_client.update", async move {
			let request = auth.sign(
				Request::builder()
					.method(Method::PUT)
					.uri(self.url(STATUS_PATH, id)?.as_str())
					.header(ACCEPT, "application/json")
					.header(CONTENT_TYPE, "application/json")
					.body(serde_json::to_vec(update).map_err(ConfigError::from)?)
					.map_err(ConfigError::from)?,
			)?;

			self.dispatch(CallKind::StatusUpdate, request, STATUS_PATH, id, Some(&update.record_etag))
				.await
		})
		.await
	}

	/// GET `/patient-trace-information/{id}`.
	pub async fn trace_information(
		&self,
		auth: &SessionAuth,
		id: &ResourceId,
	) -> Result<PatientTraceInformation> {
		obs::observe(CallKind::TraceRead, "status_client.trace_information", async move {
			let request = auth.sign(
				Request::builder()
					.method(Method::GET)
					.uri(self.url(TRACE_PATH, id)?.as_str())
					.header(ACCEPT, "application/json")
					.body(Vec::new())
					.map_err(ConfigError::from)?,
			)?;

			self.dispatch(CallKind::TraceRead, request, TRACE_PATH, id, None).await
		})
		.await
	}

	async fn dispatch<T>(
		&self,
		call: CallKind,
		request: HttpRequest,
		path: &str,
		id: &ResourceId,
		etag: Option<&str>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = transport::execute(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			call,
			request,
		)
		.await?;

		if !response.status().is_success() {
			let ctx = ResponseErrorContext::from_response(call, &response);
			let kind = self.strategy.classify(&ctx);

			return Err(ctx.into_error(kind, &format!("{path}/{id}"), etag));
		}

		Ok(transport::decode_json(&response)?)
	}

	fn url(&self, path: &str, id: &ResourceId) -> Result<Url, ConfigError> {
		self.descriptor.endpoint(&format!("{path}/{id}"))
	}
}
#[cfg(feature = "reqwest")]
impl SuspendedStatusClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client that provisions its own reqwest transport bounded by `timeout`.
	pub fn new(descriptor: ApiDescriptor, timeout: Duration) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			descriptor,
			ReqwestHttpClient::with_timeout(timeout)?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for SuspendedStatusClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SuspendedStatusClient").field("descriptor", &self.descriptor).finish()
	}
}
