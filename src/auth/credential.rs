//! Credentials attached to outbound API calls.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Credential produced by a [`TokenIssuer`](crate::flows::TokenIssuer).
///
/// Values are immutable once issued and are never persisted. Both variants render into a single
/// `Authorization` header value via [`Credential::authorization`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
	/// OAuth access token obtained from the token endpoint.
	Bearer {
		/// Access token; callers must avoid logging it.
		token: TokenSecret,
		/// Expiry hint derived from `expires_in`, when the endpoint supplied one.
		expires_at: Option<OffsetDateTime>,
	},
	/// Basic-auth pair backed by a shared secret.
	Basic {
		/// Fixed username paired with the secret.
		username: String,
		/// Shared secret fetched from the secret store.
		secret: TokenSecret,
	},
}
impl Credential {
	/// Creates a bearer credential without an expiry hint.
	pub fn bearer(token: impl Into<String>) -> Self {
		Self::Bearer { token: TokenSecret::new(token), expires_at: None }
	}

	/// Creates a basic-auth credential.
	pub fn basic(username: impl Into<String>, secret: TokenSecret) -> Self {
		Self::Basic { username: username.into(), secret }
	}

	/// Renders the full `Authorization` header value.
	pub fn authorization(&self) -> TokenSecret {
		match self {
			Self::Bearer { token, .. } => TokenSecret::new(format!("Bearer {}", token.expose())),
			Self::Basic { username, secret } => TokenSecret::new(format!(
				"Basic {}",
				STANDARD.encode(format!("{username}:{}", secret.expose()))
			)),
		}
	}

	/// Returns `true` when the bearer expiry hint has passed at `instant`.
	///
	/// Basic credentials stay valid until the backing secret is rotated, so they never expire
	/// locally.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		match self {
			Self::Bearer { expires_at: Some(expires_at), .. } => instant >= *expires_at,
			_ => false,
		}
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Bearer { token, expires_at } => f
				.debug_struct("Credential::Bearer")
				.field("token", token)
				.field("expires_at", expires_at)
				.finish(),
			Self::Basic { username, secret } => f
				.debug_struct("Credential::Basic")
				.field("username", username)
				.field("secret", secret)
				.finish(),
		}
	}
}
