//! Authenticated reads and ETag-guarded conditional writes against a FHIR API.
//!
//! [`ResourceClient::read`] returns the resource body together with the [`ConcurrencyToken`]
//! observed on it; [`ResourceClient::write`] sends that token back as `If-Match` so a stale
//! version fails with [`Error::Conflict`] instead of overwriting a newer record. Calls are never
//! retried.

pub mod patch;
pub mod patient;
pub mod token;

pub use patch::*;
pub use patient::*;
pub use token::*;

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE, ETAG, IF_MATCH},
	},
};
// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, DefaultResponseStrategy, ResponseErrorContext, ResponseStrategy},
	auth::{Credential, ResourceId, ResourceType},
	error::{ConfigError, ProtocolError},
	ext::{CorrelatedSigner, RequestSignerExt},
	http::ApiHttpClient,
	obs::{self, CallKind},
	transport::{self, TransportErrorMapper},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

/// Media type of FHIR JSON resources.
pub const FHIR_JSON: &str = "application/fhir+json";
/// Media type of JSON Patch documents.
pub const JSON_PATCH: &str = "application/json-patch+json";

#[cfg(feature = "reqwest")]
/// Resource client specialized for the crate's default reqwest transport stack.
pub type ReqwestResourceClient = ResourceClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Successful read.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOutcome {
	/// HTTP status code.
	pub status: u16,
	/// Decoded resource body.
	pub body: serde_json::Value,
	/// Version token observed on the resource.
	pub concurrency_token: ConcurrencyToken,
}

/// Successful conditional write.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOutcome {
	/// HTTP status code.
	pub status: u16,
	/// Response body: `Null` when empty, a JSON string holding the raw text when not JSON.
	pub body: serde_json::Value,
	/// New version token, when the server returned one.
	pub concurrency_token: Option<ConcurrencyToken>,
}

/// Patient read decoded into the fields the status view needs.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientRecord {
	/// Decoded patient.
	pub patient: Patient,
	/// Full response body.
	pub body: serde_json::Value,
	/// Version token observed on the record.
	pub concurrency_token: ConcurrencyToken,
}
impl PatientRecord {
	/// Suspension status derived from the record.
	pub fn status(&self) -> SuspendedPatientStatus {
		self.patient.suspended_status(self.concurrency_token.value())
	}

	/// Trace demographics derived from the record as of today.
	pub fn trace_information(&self) -> PatientTraceInformation {
		self.patient.trace_information()
	}
}

/// Client for one resource type on one API, authenticated with one credential.
pub struct ResourceClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Descriptor naming the API base URL.
	pub descriptor: ApiDescriptor,
	/// Strategy classifying non-success responses.
	pub strategy: Arc<dyn ResponseStrategy>,
	/// Resource type addressed by this client.
	pub resource_type: ResourceType,
	credential: Credential,
	signer: CorrelatedSigner,
}
impl<C, M> ResourceClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client over the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ApiDescriptor,
		resource_type: ResourceType,
		credential: Credential,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy: Arc::new(DefaultResponseStrategy),
			resource_type,
			credential,
			signer: CorrelatedSigner::request_id(),
		}
	}

	/// Replaces the response strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ResponseStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Authenticated GET of `{base}/{type}/{id}`.
	pub async fn read(&self, id: &ResourceId) -> Result<ReadOutcome> {
		obs::observe(CallKind::Read, "resource_client.read", async move {
			let url = self.descriptor.resource_url(&self.resource_type, id)?;
			let request = self.signed(
				Request::builder()
					.method(Method::GET)
					.uri(url.as_str())
					.header(ACCEPT, FHIR_JSON)
					.body(Vec::new())
					.map_err(ConfigError::from)?,
			)?;
			let response = self.send(CallKind::Read, request).await?;

			if !response.status().is_success() {
				return Err(self.failure(CallKind::Read, &response, id, None));
			}

			let raw = etag(&response)?.ok_or_else(|| ProtocolError::MissingEtag {
				resource: self.resource_path(id),
			})?;
			let concurrency_token =
				ConcurrencyToken::new(self.resource_type.clone(), id.clone(), &raw);
			let body = transport::decode_json(&response)?;

			Ok(ReadOutcome { status: response.status().as_u16(), body, concurrency_token })
		})
		.await
	}

	/// Authenticated conditional PATCH guarded by `token`.
	///
	/// The token must have been observed on the same resource; otherwise the call fails
	/// locally with [`ConfigError::TokenResourceMismatch`].
	pub async fn write(
		&self,
		id: &ResourceId,
		token: &ConcurrencyToken,
		batch: &PatchBatch,
	) -> Result<WriteOutcome> {
		self.write_capturing_body(id, token, batch).await.1
	}

	/// Same as [`ResourceClient::write`], also handing back the response body for any HTTP
	/// status.
	///
	/// The body is `None` only when no response arrived (local validation or transport failure).
	pub async fn write_capturing_body(
		&self,
		id: &ResourceId,
		token: &ConcurrencyToken,
		batch: &PatchBatch,
	) -> (Option<serde_json::Value>, Result<WriteOutcome>) {
		let mut captured = None;
		let outcome = obs::observe(CallKind::Write, "resource_client.write", async {
			token.ensure_bound_to(&self.resource_type, id)?;

			let url = self.descriptor.resource_url(&self.resource_type, id)?;
			let request = self.signed(
				Request::builder()
					.method(Method::PATCH)
					.uri(url.as_str())
					.header(ACCEPT, FHIR_JSON)
					.header(CONTENT_TYPE, JSON_PATCH)
					.header(IF_MATCH, token.value())
					.body(batch.to_body()?)
					.map_err(ConfigError::from)?,
			)?;
			let response = self.send(CallKind::Write, request).await?;
			let body = response_body(&response);

			captured = Some(body.clone());

			if !response.status().is_success() {
				return Err(self.failure(CallKind::Write, &response, id, Some(token.value())));
			}

			let concurrency_token = etag(&response)?
				.map(|raw| ConcurrencyToken::new(self.resource_type.clone(), id.clone(), &raw));

			Ok(WriteOutcome { status: response.status().as_u16(), body, concurrency_token })
		})
		.await;

		(captured, outcome)
	}

	/// Reads a record and decodes it as a [`Patient`].
	pub async fn read_patient(&self, id: &ResourceId) -> Result<PatientRecord> {
		let outcome = self.read(id).await?;
		let patient = serde_path_to_error::deserialize(&outcome.body)
			.map_err(|source| ProtocolError::MalformedBody { source, status: outcome.status })?;

		Ok(PatientRecord {
			patient,
			body: outcome.body,
			concurrency_token: outcome.concurrency_token,
		})
	}

	fn signed(&self, request: HttpRequest) -> Result<HttpRequest, ConfigError> {
		self.signer.attach_credential(request, &self.credential)
	}

	async fn send(&self, call: CallKind, request: HttpRequest) -> Result<HttpResponse> {
		transport::execute(self.http_client.as_ref(), self.transport_mapper.as_ref(), call, request)
			.await
	}

	fn failure(
		&self,
		call: CallKind,
		response: &HttpResponse,
		id: &ResourceId,
		etag: Option<&str>,
	) -> Error {
		let ctx = ResponseErrorContext::from_response(call, response);
		let kind = self.strategy.classify(&ctx);

		ctx.into_error(kind, &self.resource_path(id), etag)
	}

	fn resource_path(&self, id: &ResourceId) -> String {
		format!("{}/{id}", self.resource_type)
	}
}
#[cfg(feature = "reqwest")]
impl ResourceClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client that provisions its own reqwest transport bounded by `timeout`.
	pub fn new(
		descriptor: ApiDescriptor,
		resource_type: ResourceType,
		credential: Credential,
		timeout: Duration,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			descriptor,
			resource_type,
			credential,
			ReqwestHttpClient::with_timeout(timeout)?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for ResourceClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceClient")
			.field("descriptor", &self.descriptor)
			.field("resource_type", &self.resource_type)
			.field("credential", &self.credential)
			.finish()
	}
}

fn response_body(response: &HttpResponse) -> serde_json::Value {
	let raw = response.body();

	if raw.iter().all(u8::is_ascii_whitespace) {
		return serde_json::Value::Null;
	}

	serde_json::from_slice(raw).unwrap_or_else(|_| {
		serde_json::Value::String(String::from_utf8_lossy(raw).into_owned())
	})
}

pub(crate) fn etag(response: &HttpResponse) -> Result<Option<String>, ProtocolError> {
	response
		.headers()
		.get(ETAG)
		.map(|value| {
			value
				.to_str()
				.map(str::to_owned)
				.map_err(|_| ProtocolError::InvalidHeader { name: "ETag" })
		})
		.transpose()
}
