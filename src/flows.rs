//! Credential issuers: client-assertion exchange, shared-secret lookup, and memoisation.

mod assertion;
mod cached;
mod shared_secret;

pub use assertion::*;
pub use cached::*;
pub use shared_secret::*;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`TokenIssuer::issue`].
pub type IssueFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential>> + 'a + Send>>;

/// Produces a [`Credential`] usable against a resource API.
///
/// Issuers surface [`AuthError`](crate::error::AuthError) when the credential authority refuses
/// them and [`ConfigError`](crate::error::ConfigError) when their secret material is absent.
/// They never retry.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Issues a credential.
	fn issue(&self) -> IssueFuture<'_>;
}
impl<T> TokenIssuer for Arc<T>
where
	T: ?Sized + TokenIssuer,
{
	fn issue(&self) -> IssueFuture<'_> {
		T::issue(self)
	}
}
