//! Secret-store contracts and built-in store implementations.
//!
//! The load driver authenticates with a shared secret kept in an external parameter store.
//! [`SecretStore`] is the only seam the crate depends on; [`MemoryStore`] and [`FileStore`]
//! cover tests and local runs.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`SecretStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Lookup-by-path contract returning decrypted secret values.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Fetches the decrypted value stored at `path`, if present.
	fn fetch<'a>(&'a self, path: &'a SecretPath) -> StoreFuture<'a, Option<TokenSecret>>;
}

/// Error type produced by [`SecretStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Environment-qualified parameter path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecretPath(String);
impl SecretPath {
	/// Wraps a raw parameter path.
	pub fn new(path: impl Into<String>) -> Self {
		Self(path.into())
	}

	/// Path of the adaptor API key issued to `username` in `environment`.
	pub fn adaptor_api_key(environment: &str, username: &str) -> Self {
		Self(format!("/repo/{environment}/user-input/api-keys/pds-adaptor/{username}"))
	}

	/// Returns the raw path.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for SecretPath {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
