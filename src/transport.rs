//! Dispatches requests through an [`ApiHttpClient`] and maps transport failures into crate
//! errors.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ProtocolError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
	obs::CallKind,
};

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		call: CallKind,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		call: CallKind,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(call, meta, *inner),
			other => map_common_transport_error(call, meta, other),
		}
	}
}

/// Maps the transport-agnostic [`HttpClientError`] variants.
///
/// Custom mappers can delegate here after handling their own transport-specific variant.
pub fn map_common_transport_error<E>(
	call: CallKind,
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<E>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) =>
			TransportError::network(call.as_str(), meta_status(meta), *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) =>
			TransportError::Other { call: call.as_str(), message }.into(),
		_ => TransportError::Other {
			call: call.as_str(),
			message: "unknown transport failure".into(),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(call: CallKind, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	let status = meta_status(meta).or_else(|| err.status().map(|code| code.as_u16()));

	if err.is_timeout() {
		return TransportError::timeout(call.as_str(), status, err).into();
	}

	TransportError::network(call.as_str(), status, err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

/// Sends `request` through a fresh metadata-tracking handle.
///
/// Returns the raw response for any HTTP status; only transport failures become errors here.
pub(crate) async fn execute<C, M>(
	http_client: &C,
	mapper: &M,
	call: CallKind,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());

	match handle.call(request).await {
		Ok(response) => Ok(response),
		Err(err) => {
			let meta = slot.take();

			Err(mapper.map_transport_error(call, meta.as_ref(), err))
		},
	}
}

/// Decodes a JSON response body, reporting the failing field path on error.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T, ProtocolError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut de).map_err(|source| ProtocolError::MalformedBody {
		source,
		status: response.status().as_u16(),
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	#[derive(Debug, Deserialize)]
	struct Body {
		#[allow(dead_code)]
		id: String,
	}

	#[test]
	fn decode_json_reports_field_path() {
		let mut response = HttpResponse::new(br#"{"id": 7}"#.to_vec());

		*response.status_mut() = StatusCode::OK;

		let err = decode_json::<Body>(&response).expect_err("Numeric id should not decode.");

		match err {
			ProtocolError::MalformedBody { source, status } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "id");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn other_transport_failures_keep_the_call_label() {
		let err = map_common_transport_error::<std::io::Error>(
			CallKind::Write,
			None,
			HttpClientError::Other("socket closed".into()),
		);

		assert!(matches!(
			err,
			Error::Transport(TransportError::Other { call: "write", ref message }) if message == "socket closed"
		));
	}
}
