//! Signed client assertions for the JWT-bearer client-credentials grant.
//!
//! An assertion proves the client's identity to the token endpoint and is never sent to the
//! resource API. Each one carries a fresh `jti` and expires [`ASSERTION_LIFETIME`] after
//! issuance.

// std
use std::{fs, path::Path};
// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, KeyId, TokenSecret},
	error::{AuthError, ConfigError},
};

/// How long a signed assertion stays valid after issuance.
pub const ASSERTION_LIFETIME: Duration = Duration::seconds(300);
/// `client_assertion_type` value for JWT-bearer client authentication.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Claims carried by a client assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer; the client identifier.
	pub iss: String,
	/// Subject; the client identifier.
	pub sub: String,
	/// Audience; the token endpoint URL.
	pub aud: String,
	/// Unique assertion identifier.
	pub jti: String,
	/// Expiry as a Unix timestamp.
	pub exp: i64,
}

/// Compact-serialized assertion plus the claims it was built from.
#[derive(Clone, Debug)]
pub struct SignedAssertion {
	/// Claims embedded in the token.
	pub claims: AssertionClaims,
	/// Compact JWS; callers must avoid logging it.
	pub token: TokenSecret,
}

/// RS512 signer bound to a private key and its published key id.
#[derive(Clone)]
pub struct AssertionSigner {
	key: EncodingKey,
	key_id: KeyId,
}
impl AssertionSigner {
	/// Builds a signer from PEM-encoded RSA private key material (PKCS#1 or PKCS#8).
	pub fn from_pem(pem: &[u8], key_id: KeyId) -> Result<Self, ConfigError> {
		let key =
			EncodingKey::from_rsa_pem(pem).map_err(|source| ConfigError::InvalidKey { source })?;

		Ok(Self { key, key_id })
	}

	/// Loads the private key from a local file.
	pub fn from_key_file(path: impl AsRef<Path>, key_id: KeyId) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let pem = fs::read(path).map_err(|source| ConfigError::MissingKeyFile {
			path: path.display().to_string(),
			source,
		})?;

		Self::from_pem(&pem, key_id)
	}

	/// Key identifier placed in the JWS header.
	pub fn key_id(&self) -> &KeyId {
		&self.key_id
	}

	/// Signs a fresh assertion issued now.
	pub fn sign(&self, client_id: &ClientId, audience: &Url) -> Result<SignedAssertion, AuthError> {
		self.sign_at(client_id, audience, OffsetDateTime::now_utc())
	}

	/// Signs a fresh assertion as if issued at `issued_at`.
	pub fn sign_at(
		&self,
		client_id: &ClientId,
		audience: &Url,
		issued_at: OffsetDateTime,
	) -> Result<SignedAssertion, AuthError> {
		let claims = AssertionClaims {
			iss: client_id.to_string(),
			sub: client_id.to_string(),
			aud: audience.to_string(),
			jti: uuid::Uuid::new_v4().to_string(),
			exp: (issued_at + ASSERTION_LIFETIME).unix_timestamp(),
		};
		let mut header = Header::new(Algorithm::RS512);

		header.kid = Some(self.key_id.to_string());
		header.typ = Some("JWT".into());

		let token = jsonwebtoken::encode(&header, &claims, &self.key)
			.map_err(|source| AuthError::Signing { source })?;

		Ok(SignedAssertion { claims, token: TokenSecret::new(token) })
	}
}
impl Debug for AssertionSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionSigner")
			.field("algorithm", &"RS512")
			.field("key_id", &self.key_id)
			.finish()
	}
}
