//! Thread-safe in-memory [`SecretStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{SecretPath, SecretStore, StoreFuture},
};

type SecretMap = Arc<RwLock<HashMap<SecretPath, TokenSecret>>>;

/// Secret store that keeps values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	secrets: SecretMap,
	fetches: Arc<Mutex<usize>>,
}
impl MemoryStore {
	/// Inserts or replaces the value at `path`.
	pub fn insert(&self, path: SecretPath, value: impl Into<String>) {
		self.secrets.write().insert(path, TokenSecret::new(value));
	}

	/// Builder-style variant of [`MemoryStore::insert`].
	pub fn with_secret(self, path: SecretPath, value: impl Into<String>) -> Self {
		self.insert(path, value);

		self
	}

	/// Number of fetches served so far, hits and misses alike.
	pub fn fetch_count(&self) -> usize {
		*self.fetches.lock()
	}
}
impl SecretStore for MemoryStore {
	fn fetch<'a>(&'a self, path: &'a SecretPath) -> StoreFuture<'a, Option<TokenSecret>> {
		let secrets = self.secrets.clone();

		*self.fetches.lock() += 1;

		Box::pin(async move { Ok(secrets.read().get(path).cloned()) })
	}
}
