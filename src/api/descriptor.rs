//! Validated endpoint metadata shared by issuers and clients.
//!
//! A descriptor names one API base URL plus the optional OAuth token endpoint that mints
//! credentials for it. Paths are joined onto the base, so the base always ends with `/`.

/// Builder API for assembling API descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{ResourceId, ResourceType},
	error::ConfigError,
};

/// Immutable API descriptor consumed by clients and issuers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Base URL every resource path is joined onto.
	pub base_url: Url,
	/// Token endpoint used by the client-assertion exchange.
	pub token_endpoint: Option<Url>,
}
impl ApiDescriptor {
	/// Creates a new builder.
	pub fn builder() -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new()
	}

	/// Joins a relative path onto the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { source })
	}

	/// URL of a single resource instance, `{base}/{type}/{id}`.
	pub fn resource_url(&self, kind: &ResourceType, id: &ResourceId) -> Result<Url, ConfigError> {
		self.endpoint(&format!("{kind}/{id}"))
	}

	/// Token endpoint, failing when the descriptor was built without one.
	pub fn require_token_endpoint(&self) -> Result<&Url, ConfigError> {
		self.token_endpoint
			.as_ref()
			.ok_or(ConfigError::InvalidDescriptor(ApiDescriptorError::MissingTokenEndpoint))
	}
}
