//! Version tokens observed on reads and sent back on conditional writes.

// self
use crate::{
	_prelude::*,
	auth::{ResourceId, ResourceType},
	error::ConfigError,
};

const PROXY_ENCODING_SUFFIX: &str = "--gzip";

/// Opaque version marker (`ETag`) bound to the resource it was observed on.
///
/// Intermediaries that gzip responses append `--gzip` to the tag; the suffix is removed on
/// construction so the value can be sent back in `If-Match` unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcurrencyToken {
	resource_type: ResourceType,
	resource_id: ResourceId,
	value: String,
}
impl ConcurrencyToken {
	/// Binds a raw `ETag` value to `(resource_type, resource_id)`.
	pub fn new(resource_type: ResourceType, resource_id: ResourceId, raw: &str) -> Self {
		let value = raw.trim().replace(PROXY_ENCODING_SUFFIX, "");

		Self { resource_type, resource_id, value }
	}

	/// Header value to send as `If-Match`.
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Resource type the token was observed on.
	pub fn resource_type(&self) -> &ResourceType {
		&self.resource_type
	}

	/// Resource identifier the token was observed on.
	pub fn resource_id(&self) -> &ResourceId {
		&self.resource_id
	}

	/// `{type}/{id}` path of the bound resource.
	pub fn resource_path(&self) -> String {
		format!("{}/{}", self.resource_type, self.resource_id)
	}

	/// Fails unless the token was observed on `(resource_type, resource_id)`.
	pub fn ensure_bound_to(
		&self,
		resource_type: &ResourceType,
		resource_id: &ResourceId,
	) -> Result<(), ConfigError> {
		if &self.resource_type == resource_type && &self.resource_id == resource_id {
			Ok(())
		} else {
			Err(ConfigError::TokenResourceMismatch {
				expected: format!("{resource_type}/{resource_id}"),
				actual: self.resource_path(),
			})
		}
	}
}
impl Display for ConcurrencyToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.value)
	}
}
