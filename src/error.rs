//! Crate-level error types shared across issuers, clients, stores, and the load driver.

// self
use crate::{_prelude::*, api::ApiDescriptorError, auth::IdentifierError, store::StoreError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or unusable configuration and secret material.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential rejected or token exchange failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response was missing a required field or could not be decoded.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Secret store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),

	/// The server reported the resource as absent.
	#[error("Resource {resource} was not found.")]
	NotFound {
		/// Resource path that was requested.
		resource: String,
	},
	/// The server rejected a conditional write because the version token is stale.
	#[error("Precondition failed for {resource}; version {etag} is stale.")]
	Conflict {
		/// Resource path that was written.
		resource: String,
		/// Version token sent with the write.
		etag: String,
	},
	/// The server rejected a patch because it would not change the resource.
	#[error("Patch for {resource} made no changes to the resource.")]
	NoChanges {
		/// Resource path that was written.
		resource: String,
	},
	/// The server throttled the call.
	#[error("Request was rate limited.")]
	RateLimited {
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The server reported itself unavailable.
	#[error("Service is unavailable (HTTP {status}).")]
	Unavailable {
		/// HTTP status code.
		status: u16,
	},
	/// Any other non-success response.
	#[error("Request was rejected with HTTP {status}: {body_preview}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
}

/// Configuration and secret-material failures; fatal at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required configuration variable is not set.
	#[error("Configuration variable `{name}` is not set.")]
	MissingVariable {
		/// Variable name.
		name: &'static str,
	},
	/// A configuration variable could not be parsed.
	#[error("Configuration variable `{name}` is invalid: {reason}.")]
	InvalidVariable {
		/// Variable name.
		name: &'static str,
		/// Parser-supplied reason.
		reason: String,
	},
	/// The signing key file could not be read.
	#[error("Private key file {path} could not be read.")]
	MissingKeyFile {
		/// Path that was read.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The signing key is not a usable RSA private key.
	#[error("Private key is not a usable RSA key.")]
	InvalidKey {
		/// Underlying parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The secret store has no value at the requested path.
	#[error("Secret `{path}` is not present in the secret store.")]
	MissingSecret {
		/// Secret path that was looked up.
		path: String,
	},
	/// An endpoint URL cannot be parsed or joined.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint metadata failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] ApiDescriptorError),
	/// An identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// A header value contains characters HTTP does not allow.
	#[error("Header `{name}` contains an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// A version token was used against a different resource than the one it was read from.
	#[error("Version token for {actual} cannot be used to write {expected}.")]
	TokenResourceMismatch {
		/// Resource path being written.
		expected: String,
		/// Resource path the token was observed on.
		actual: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Credential failures; fatal for the call and never retried.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint returned HTTP {status}: {message}.")]
	TokenEndpoint {
		/// HTTP status code.
		status: u16,
		/// Provider-supplied error description or body preview.
		message: String,
	},
	/// Token endpoint answered successfully but without an access token.
	#[error("Token endpoint response is missing access_token.")]
	MissingAccessToken,
	/// The client assertion could not be signed.
	#[error("Client assertion could not be signed.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The resource API rejected the credential.
	#[error("Credential was rejected with HTTP {status}.")]
	Rejected {
		/// HTTP status code (401 or 403).
		status: u16,
	},
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {call}.")]
	Network {
		/// Call label.
		call: &'static str,
		/// HTTP status, when the failure happened after response headers arrived.
		status: Option<u16>,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call did not complete within the configured timeout.
	#[error("Request timed out while calling {call}.")]
	Timeout {
		/// Call label.
		call: &'static str,
		/// HTTP status, when the timeout hit while reading the body.
		status: Option<u16>,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// The transport failed without a typed error.
	#[error("HTTP client error occurred while calling {call}: {message}.")]
	Other {
		/// Call label.
		call: &'static str,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		call: &'static str,
		status: Option<u16>,
		src: impl 'static + Send + Sync + StdError,
	) -> Self {
		Self::Network { call, status, source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(
		call: &'static str,
		status: Option<u16>,
		src: impl 'static + Send + Sync + StdError,
	) -> Self {
		Self::Timeout { call, status, source: Box::new(src) }
	}
}

/// Malformed or incomplete responses; fatal for the call.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// A successful read did not carry the version header.
	#[error("Response for {resource} is missing the ETag header.")]
	MissingEtag {
		/// Resource path that was read.
		resource: String,
	},
	/// A response header is not valid UTF-8 text.
	#[error("Response header `{name}` is not valid text.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
	},
	/// Response body is not the expected JSON document.
	#[error("Response body is malformed (HTTP {status}).")]
	MalformedBody {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "parameter service unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("parameter service unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn conflict_message_names_the_stale_version() {
		let error = Error::Conflict { resource: "Patient/9692295966".into(), etag: "W/123".into() };

		assert_eq!(error.to_string(), "Precondition failed for Patient/9692295966; version W/123 is stale.");
	}
}
