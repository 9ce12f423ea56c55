//! Basic-auth credentials backed by a shared secret in a [`SecretStore`].

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ConfigError,
	flows::{IssueFuture, TokenIssuer},
	obs::{self, CallKind},
	store::{SecretPath, SecretStore},
};

/// Username the adaptor's end-to-end API key is issued to.
pub const DEFAULT_ADAPTOR_USERNAME: &str = "e2e-test";

/// Fetches the adaptor API key for a fixed username on every call.
///
/// Wrap the flow in [`CachedIssuer`](crate::flows::CachedIssuer) to fetch only once.
#[derive(Clone)]
pub struct SharedSecretFlow<S>
where
	S: ?Sized + SecretStore,
{
	store: Arc<S>,
	path: SecretPath,
	username: String,
}
impl<S> SharedSecretFlow<S>
where
	S: ?Sized + SecretStore,
{
	/// Looks up `/repo/{environment}/user-input/api-keys/pds-adaptor/{username}`.
	pub fn new(store: impl Into<Arc<S>>, environment: &str, username: impl Into<String>) -> Self {
		let username = username.into();
		let path = SecretPath::adaptor_api_key(environment, &username);

		Self { store: store.into(), path, username }
	}

	/// Parameter path the secret is read from.
	pub fn path(&self) -> &SecretPath {
		&self.path
	}

	/// Username paired with the secret.
	pub fn username(&self) -> &str {
		&self.username
	}

	async fn fetch(&self) -> Result<Credential> {
		let secret = self
			.store
			.fetch(&self.path)
			.await?
			.filter(|secret| !secret.is_empty())
			.ok_or_else(|| ConfigError::MissingSecret { path: self.path.to_string() })?;

		Ok(Credential::basic(self.username.clone(), secret))
	}
}
impl<S> TokenIssuer for SharedSecretFlow<S>
where
	S: ?Sized + SecretStore,
{
	fn issue(&self) -> IssueFuture<'_> {
		Box::pin(obs::observe(CallKind::SecretFetch, "shared_secret_flow", self.fetch()))
	}
}
impl<S> Debug for SharedSecretFlow<S>
where
	S: ?Sized + SecretStore,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SharedSecretFlow")
			.field("path", &self.path)
			.field("username", &self.username)
			.finish()
	}
}
