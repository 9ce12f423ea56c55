//! Strongly typed identifiers enforced across client and resource calls.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $segment:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $segment)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $segment)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (client, key, resource).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (client, key, resource).
		kind: &'static str,
	},
	/// The identifier would escape its URL path segment.
	#[error("{kind} identifier contains the reserved character `{ch}`.")]
	ReservedCharacter {
		/// Kind of identifier (client, key, resource).
		kind: &'static str,
		/// Offending character.
		ch: char,
	},
	/// The identifier is a relative path segment (`.` or `..`).
	#[error("{kind} identifier cannot be a dot segment.")]
	DotSegment {
		/// Kind of identifier (client, key, resource).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (client, key, resource).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { ClientId, "API key identifying the client application to the token endpoint.", "Client", false }
def_id! { KeyId, "Key identifier published alongside the client's public key.", "Key", false }
def_id! { ResourceType, "FHIR resource type such as `Patient`.", "ResourceType", true }
def_id! { ResourceId, "Stable external identifier (e.g. NHS number) naming a resource.", "Resource", true }

fn validate_view(kind: &'static str, view: &str, segment: bool) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if segment {
		if let Some(ch) = view.chars().find(|ch| matches!(ch, '/' | '?' | '#' | '%')) {
			return Err(IdentifierError::ReservedCharacter { kind, ch });
		}
		if matches!(view, "." | "..") {
			return Err(IdentifierError::DotSegment { kind });
		}
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(ClientId::new(" api-key").is_err(), "Leading whitespace must be rejected.");
		assert!(ClientId::new("api-key ").is_err(), "Trailing whitespace must be rejected.");

		let client = ClientId::new("api-key-123").expect("Client fixture should be considered valid.");

		assert_eq!(client.as_ref(), "api-key-123");
		assert!(KeyId::new("").is_err());
		assert!(ResourceId::new("969 229 5966").is_err());
	}

	#[test]
	fn resource_identifiers_stay_inside_their_path_segment() {
		assert_eq!(
			ResourceId::new("9692295966/../admin"),
			Err(IdentifierError::ReservedCharacter { kind: "Resource", ch: '/' })
		);
		assert!(ResourceType::new("Patient?x=1").is_err());
		assert_eq!(ResourceId::new(".."), Err(IdentifierError::DotSegment { kind: "Resource" }));
		assert_eq!(ResourceType::new("."), Err(IdentifierError::DotSegment { kind: "ResourceType" }));
		assert!(ResourceId::new("..9692295966").is_ok());
		// Client identifiers never land in a URL path, so slashes are allowed there.
		assert!(ClientId::new("team/app").is_ok());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: ResourceId =
			serde_json::from_str("\"9692295966\"").expect("Resource id should deserialize.");

		assert_eq!(id.as_ref(), "9692295966");
		assert!(serde_json::from_str::<ResourceId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limits_apply() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		ResourceId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(ResourceId::new(&too_long).is_err());
	}
}
