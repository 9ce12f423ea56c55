// std
use std::net::TcpListener;
// crates.io
use httpmock::prelude::*;
// self
use pds_spike::{
	_preludet::*,
	api::ApiDescriptor,
	auth::{Credential, ResourceId, ResourceType},
	error::TransportError,
	http::{ApiHttpClient, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse},
	obs::CallKind,
	resource::{ReqwestResourceClient, ResourceClient},
	transport::{ReqwestTransportErrorMapper, TransportErrorMapper, map_common_transport_error},
};

#[derive(Debug)]
struct SocketReset;
impl Display for SocketReset {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("socket reset")
	}
}
impl StdError for SocketReset {}

#[derive(Clone, Copy)]
enum Failure {
	Typed,
	Untyped,
}

struct FailingHttpClient {
	status: Option<u16>,
	failure: Failure,
}
impl ApiHttpClient for FailingHttpClient {
	type Handle = FailingHandle;
	type TransportError = SocketReset;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FailingHandle { slot, status: self.status, failure: self.failure }
	}
}

struct FailingHandle {
	slot: ResponseMetadataSlot,
	status: Option<u16>,
	failure: Failure,
}
impl<'c> AsyncHttpClient<'c> for FailingHandle {
	type Error = HttpClientError<SocketReset>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, _request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();
			self.slot.store(ResponseMetadata { status: self.status, retry_after: None });

			match self.failure {
				Failure::Typed => Err(HttpClientError::Reqwest(Box::new(SocketReset))),
				Failure::Untyped => Err(HttpClientError::Other("connection pool closed".into())),
			}
		})
	}
}

/// Treats every typed transport failure as a timeout.
struct TimeoutMapper;
impl TransportErrorMapper<SocketReset> for TimeoutMapper {
	fn map_transport_error(
		&self,
		call: CallKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<SocketReset>,
	) -> Error {
		match error {
			HttpClientError::Reqwest(inner) =>
				TransportError::timeout(call.as_str(), metadata.and_then(|meta| meta.status), *inner)
					.into(),
			other => map_common_transport_error(call, metadata, other),
		}
	}
}

fn descriptor(base: &str) -> ApiDescriptor {
	ApiDescriptor::builder()
		.base_url(Url::parse(base).expect("Base URL fixture should parse."))
		.build()
		.expect("Descriptor should build for loopback endpoints.")
}

fn patient() -> ResourceType {
	ResourceType::new("Patient").expect("Resource type fixture should be valid.")
}

fn nhs_number() -> ResourceId {
	ResourceId::new("9693632109").expect("NHS number fixture should be valid.")
}

#[tokio::test]
async fn custom_mapper_sees_metadata_stored_by_the_handle() {
	let client = ResourceClient::<FailingHttpClient, TimeoutMapper>::with_http_client(
		descriptor("http://127.0.0.1:9/FHIR/R4"),
		patient(),
		Credential::bearer("pds-token"),
		FailingHttpClient { status: Some(200), failure: Failure::Typed },
		TimeoutMapper,
	);
	let err = client.read(&nhs_number()).await.expect_err("Failing transport should error.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Timeout { call: "read", status: Some(200), .. })
	));
}

#[tokio::test]
async fn untyped_failures_fall_back_to_the_common_mapping() {
	let client = ResourceClient::<FailingHttpClient, TimeoutMapper>::with_http_client(
		descriptor("http://127.0.0.1:9/FHIR/R4"),
		patient(),
		Credential::bearer("pds-token"),
		FailingHttpClient { status: None, failure: Failure::Untyped },
		TimeoutMapper,
	);
	let err = client.read(&nhs_number()).await.expect_err("Failing transport should error.");

	match err {
		Error::Transport(TransportError::Other { call, message }) => {
			assert_eq!(call, "read");
			assert_eq!(message, "connection pool closed");
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn slow_upstream_surfaces_as_a_timeout() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/FHIR/R4/Patient/9693632109");
			then.status(200).header("etag", "W/\"1\"").delay(std::time::Duration::from_millis(800));
		})
		.await;
	let client = ReqwestResourceClient::with_http_client(
		descriptor(&format!("http://{}/FHIR/R4", server.address())),
		patient(),
		Credential::bearer("pds-token"),
		ReqwestHttpClient::with_timeout(Duration::milliseconds(200))
			.expect("Reqwest client should build."),
		ReqwestTransportErrorMapper,
	);
	let err = client.read(&nhs_number()).await.expect_err("Slow upstream should time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { call: "read", .. })));
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
	let port = TcpListener::bind("127.0.0.1:0")
		.expect("Ephemeral port should bind.")
		.local_addr()
		.expect("Bound listener should report its address.")
		.port();
	let client = ReqwestResourceClient::with_http_client(
		descriptor(&format!("http://127.0.0.1:{port}/FHIR/R4")),
		patient(),
		Credential::bearer("pds-token"),
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	);
	let err = client.read(&nhs_number()).await.expect_err("Closed port should refuse.");

	assert!(matches!(
		err,
		Error::Transport(TransportError::Network { call: "read", status: None, .. })
	));
}
