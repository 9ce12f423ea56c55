//! JSON Patch documents sent with conditional writes.

// self
use crate::{_prelude::*, error::ConfigError};

/// Identifier system for ODS organisation codes.
pub const ODS_ORGANIZATION_SYSTEM: &str = "https://fhir.nhs.uk/Id/ods-organization-code";

/// A single JSON Patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
	/// Operation name, e.g. `add` or `replace`.
	pub op: String,
	/// JSON Pointer into the resource.
	pub path: String,
	/// Value applied at `path`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<serde_json::Value>,
}
impl PatchOperation {
	/// Builds an `add` operation.
	pub fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
		Self { op: "add".into(), path: path.into(), value: Some(value) }
	}
}

/// Ordered, non-empty list of patch operations, serialized as a JSON array.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PatchBatch(Vec<PatchOperation>);
impl PatchBatch {
	/// Wraps `operations`, refusing an empty batch.
	pub fn new(operations: Vec<PatchOperation>) -> Result<Self, ConfigError> {
		if operations.is_empty() {
			return Err(ConfigError::InvalidVariable {
				name: "patch",
				reason: "a patch must contain at least one operation".into(),
			});
		}

		Ok(Self(operations))
	}

	/// Patch that sets the managing organisation to `ods_code`.
	pub fn managing_organization(ods_code: &str) -> Self {
		Self(vec![PatchOperation::add(
			"/managingOrganization",
			serde_json::json!({
				"type": "Organization",
				"identifier": {
					"system": ODS_ORGANIZATION_SYSTEM,
					"value": ods_code,
				},
			}),
		)])
	}

	/// Serializes the batch into a request body.
	pub fn to_body(&self) -> Result<Vec<u8>, ConfigError> {
		Ok(serde_json::to_vec(self)?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn managing_organization_patch_shape() {
		let body =
			PatchBatch::managing_organization("A20047").to_body().expect("Patch should serialize.");
		let value: serde_json::Value = serde_json::from_slice(&body).expect("Body should be JSON.");

		assert_eq!(
			value,
			serde_json::json!([{
				"op": "add",
				"path": "/managingOrganization",
				"value": {
					"type": "Organization",
					"identifier": {
						"system": "https://fhir.nhs.uk/Id/ods-organization-code",
						"value": "A20047",
					},
				},
			}])
		);
	}

	#[test]
	fn empty_batches_are_refused() {
		assert!(matches!(
			PatchBatch::new(Vec::new()),
			Err(ConfigError::InvalidVariable { name: "patch", .. })
		));
	}
}
