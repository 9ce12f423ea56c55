//! Finite pool of identifiers handed out to load sessions.

// self
use crate::{_prelude::*, auth::ResourceId};

/// Returned when every identifier has already been handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Identifier pool is exhausted.")]
pub struct PoolExhausted;

/// Hands each identifier to at most one caller.
#[derive(Debug, Default)]
pub struct IdentifierPool {
	ids: Mutex<VecDeque<ResourceId>>,
}
impl IdentifierPool {
	/// Creates a pool seeded with `ids`, handed out in order.
	pub fn new(ids: impl IntoIterator<Item = ResourceId>) -> Self {
		Self { ids: Mutex::new(ids.into_iter().collect()) }
	}

	/// Takes the next identifier, or fails once the pool is empty.
	pub fn acquire(&self) -> Result<ResourceId, PoolExhausted> {
		self.ids.lock().pop_front().ok_or(PoolExhausted)
	}

	/// Identifiers not yet handed out.
	pub fn remaining(&self) -> usize {
		self.ids.lock().len()
	}
}
