//! File-backed [`SecretStore`] reading a JSON object of `path -> value` pairs.

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{SecretPath, SecretStore, StoreError, StoreFuture},
};

/// Serves secrets from a JSON snapshot loaded at open time.
///
/// The file holds a single object, e.g.
/// `{"/repo/dev/user-input/api-keys/pds-adaptor/e2e-test": "..."}`. Call
/// [`FileStore::reload`] to pick up rotated values.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<SecretPath, TokenSecret>>>,
}
impl FileStore {
	/// Opens the store at `path`, eagerly loading its contents.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Re-reads the backing file, replacing the in-memory snapshot.
	pub fn reload(&self) -> Result<(), StoreError> {
		let snapshot = Self::load_snapshot(&self.path)?;

		*self.inner.write() = snapshot;

		Ok(())
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<SecretPath, TokenSecret>, StoreError> {
		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(HashMap::new());
		}

		let entries: BTreeMap<String, String> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries
			.into_iter()
			.map(|(key, value)| (SecretPath::new(key), TokenSecret::new(value)))
			.collect())
	}
}
impl SecretStore for FileStore {
	fn fetch<'a>(&'a self, path: &'a SecretPath) -> StoreFuture<'a, Option<TokenSecret>> {
		Box::pin(async move { Ok(self.inner.read().get(path).cloned()) })
	}
}
