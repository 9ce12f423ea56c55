//! Optional observability helpers for issuer and client calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `pds_spike.call` with the `call` (operation)
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `pds_spike_call_total` counter for every
//!   attempt/success/failure, labeled by `call` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outbound operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Client-assertion exchange at the token endpoint.
	TokenExchange,
	/// Shared-secret lookup in the secret store.
	SecretFetch,
	/// Resource read (GET).
	Read,
	/// Conditional resource write (PATCH).
	Write,
	/// Adaptor status read.
	StatusRead,
	/// Adaptor status update.
	StatusUpdate,
	/// Adaptor trace-information read.
	TraceRead,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::TokenExchange => "token_exchange",
			CallKind::SecretFetch => "secret_fetch",
			CallKind::Read => "read",
			CallKind::Write => "write",
			CallKind::StatusRead => "status_read",
			CallKind::StatusUpdate => "status_update",
			CallKind::TraceRead => "trace_read",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a call helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a call span, recording attempt and final outcome.
pub(crate) async fn observe<T, Fut>(kind: CallKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = CallSpan::new(kind, stage);

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_call_outcome(kind, CallOutcome::Success),
		Err(_e) => {
			#[cfg(feature = "tracing")]
			::tracing::warn!(call = kind.as_str(), stage, error = %_e, "call failed");

			record_call_outcome(kind, CallOutcome::Failure)
		},
	}

	result
}
