//! Memoising issuer wrapper.

// crates.io
use async_lock::Mutex as AsyncMutex;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	flows::{IssueFuture, TokenIssuer},
};

/// Wraps an issuer and reuses its last successful credential until that credential expires.
///
/// Concurrent callers wait on the same in-flight issue. Failures are not cached, so the next
/// call tries again. Credentials without an expiry hint are kept for the wrapper's lifetime.
pub struct CachedIssuer<I>
where
	I: ?Sized + TokenIssuer,
{
	slot: AsyncMutex<Option<Credential>>,
	inner: Arc<I>,
}
impl<I> CachedIssuer<I>
where
	I: ?Sized + TokenIssuer,
{
	/// Wraps `inner`.
	pub fn new(inner: impl Into<Arc<I>>) -> Self {
		Self { slot: AsyncMutex::new(None), inner: inner.into() }
	}

	/// Returns the cached credential, if one has been issued and is still held.
	pub async fn cached(&self) -> Option<Credential> {
		self.slot.lock().await.clone()
	}
}
impl<I> TokenIssuer for CachedIssuer<I>
where
	I: ?Sized + TokenIssuer,
{
	fn issue(&self) -> IssueFuture<'_> {
		Box::pin(async move {
			let mut slot = self.slot.lock().await;

			if let Some(credential) = slot.as_ref() {
				if !credential.is_expired_at(OffsetDateTime::now_utc()) {
					return Ok(credential.clone());
				}
			}

			let credential = self.inner.issue().await?;

			*slot = Some(credential.clone());

			Ok(credential)
		})
	}
}
impl<I> Debug for CachedIssuer<I>
where
	I: ?Sized + TokenIssuer,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let cached = self.slot.try_lock().map(|slot| slot.is_some());

		f.debug_struct("CachedIssuer").field("cached", &cached).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::TokenSecret,
		flows::SharedSecretFlow,
		store::{MemoryStore, SecretPath},
	};

	/// Hands out bearer tokens expiring `lifetime` after issuance and counts calls.
	struct CountingIssuer {
		lifetime: Duration,
		issued: Mutex<usize>,
	}
	impl TokenIssuer for CountingIssuer {
		fn issue(&self) -> IssueFuture<'_> {
			Box::pin(async move {
				let issued = {
					let mut issued = self.issued.lock();

					*issued += 1;

					*issued
				};

				Ok(Credential::Bearer {
					token: TokenSecret::new(format!("token-{issued}")),
					expires_at: Some(OffsetDateTime::now_utc() + self.lifetime),
				})
			})
		}
	}

	#[tokio::test]
	async fn first_success_is_reused() {
		let store = MemoryStore::default()
			.with_secret(SecretPath::adaptor_api_key("dev", "e2e-test"), "p4ss");
		let flow = SharedSecretFlow::<MemoryStore>::new(store.clone(), "dev", "e2e-test");
		let issuer = CachedIssuer::<SharedSecretFlow<MemoryStore>>::new(flow);

		assert!(issuer.cached().await.is_none());

		let first = issuer.issue().await.expect("First issue should succeed.");
		let second = issuer.issue().await.expect("Second issue should succeed.");

		assert_eq!(first, second);
		assert_eq!(store.fetch_count(), 1);
	}

	#[tokio::test]
	async fn failures_are_not_cached() {
		let store = MemoryStore::default();
		let flow = SharedSecretFlow::<MemoryStore>::new(store.clone(), "dev", "e2e-test");
		let issuer = CachedIssuer::<SharedSecretFlow<MemoryStore>>::new(flow);

		assert!(issuer.issue().await.is_err());

		store.insert(SecretPath::adaptor_api_key("dev", "e2e-test"), "p4ss");

		assert!(issuer.issue().await.is_ok());
		assert_eq!(store.fetch_count(), 2);
	}

	#[tokio::test]
	async fn expired_bearer_is_reissued() {
		let inner =
			Arc::new(CountingIssuer { lifetime: Duration::seconds(-1), issued: Mutex::new(0) });
		let issuer = CachedIssuer::<CountingIssuer>::new(inner.clone());
		let first = issuer.issue().await.expect("First issue should succeed.");
		let second = issuer.issue().await.expect("Second issue should succeed.");

		assert_eq!(*inner.issued.lock(), 2);
		assert_ne!(first, second);
		assert_eq!(issuer.cached().await, Some(second));
	}

	#[tokio::test]
	async fn live_bearer_is_reused() {
		let inner =
			Arc::new(CountingIssuer { lifetime: Duration::seconds(599), issued: Mutex::new(0) });
		let issuer = CachedIssuer::<CountingIssuer>::new(inner.clone());
		let first = issuer.issue().await.expect("First issue should succeed.");
		let second = issuer.issue().await.expect("Second issue should succeed.");

		assert_eq!(*inner.issued.lock(), 1);
		assert_eq!(first, second);
		assert_eq!(issuer.cached().await, Some(first));
	}
}
