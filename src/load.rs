//! Concurrent load driver for the adaptor's `suspended-patient-status` endpoint.
//!
//! [`LoadTest::run`] starts one tokio task per virtual user. Each session takes an identifier
//! from the shared [`IdentifierPool`], issues its credential once, and then loops through status
//! reads and optional updates. The pool is the only state sessions share; a session that cannot
//! start is reported without affecting the others.

mod client;
mod pool;
mod session;
mod workload;

pub use client::*;
pub use pool::*;
pub use session::*;
pub use workload::*;

// crates.io
use tokio::task::JoinSet;
// self
use crate::{
	_prelude::*, flows::TokenIssuer, http::ApiHttpClient, transport::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, transport::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Load driver specialized for the crate's default reqwest transport stack.
pub type ReqwestLoadTest<I> = LoadTest<ReqwestHttpClient, ReqwestTransportErrorMapper, I>;

/// Drives many [`VirtualUser`]s against one adaptor.
pub struct LoadTest<C, M, I>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	I: ?Sized + TokenIssuer,
{
	client: Arc<SuspendedStatusClient<C, M>>,
	pool: Arc<IdentifierPool>,
	issuer: Arc<I>,
	plan: SessionPlan,
	trace_prefix: String,
}
impl<C, M, I> LoadTest<C, M, I>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	I: 'static + ?Sized + TokenIssuer,
{
	/// Creates a driver; `issuer` is called once per started session.
	pub fn new(
		client: impl Into<Arc<SuspendedStatusClient<C, M>>>,
		pool: impl Into<Arc<IdentifierPool>>,
		issuer: impl Into<Arc<I>>,
		plan: SessionPlan,
	) -> Self {
		Self {
			client: client.into(),
			pool: pool.into(),
			issuer: issuer.into(),
			plan,
			trace_prefix: "load-test".into(),
		}
	}

	/// Overrides the prefix of per-call trace ids (`{prefix}-{session}-{uuid}`).
	pub fn with_trace_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.trace_prefix = prefix.into();

		self
	}

	/// Runs `users` sessions concurrently and waits for all of them.
	pub async fn run(&self, users: usize) -> LoadReport {
		let mut tasks = JoinSet::new();
		let mut sessions = Vec::with_capacity(users);
		let mut running = HashMap::with_capacity(users);

		for session in 0..users {
			let client = self.client.clone();
			let pool = self.pool.clone();
			let issuer = self.issuer.clone();
			let plan = self.plan.clone();
			let trace_prefix = format!("{}-{session}", self.trace_prefix);
			let handle = tasks.spawn(async move {
				let outcome = run_session(client, pool, issuer, plan, trace_prefix).await;

				SessionReport { session, outcome }
			});

			running.insert(handle.id(), session);
		}

		while let Some(joined) = tasks.join_next_with_id().await {
			match joined {
				Ok((_, report)) => sessions.push(report),
				Err(e) => sessions.push(SessionReport {
					session: running.get(&e.id()).copied().unwrap_or(usize::MAX),
					outcome: SessionOutcome::Aborted { message: e.to_string() },
				}),
			}
		}

		sessions.sort_by_key(|report| report.session);

		LoadReport { sessions }
	}
}
impl<C, M, I> Debug for LoadTest<C, M, I>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	I: ?Sized + TokenIssuer,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoadTest")
			.field("client", &self.client)
			.field("pool_remaining", &self.pool.remaining())
			.field("plan", &self.plan)
			.finish()
	}
}

async fn run_session<C, M, I>(
	client: Arc<SuspendedStatusClient<C, M>>,
	pool: Arc<IdentifierPool>,
	issuer: Arc<I>,
	plan: SessionPlan,
	trace_prefix: String,
) -> SessionOutcome
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
	I: ?Sized + TokenIssuer,
{
	let id = match pool.acquire() {
		Ok(id) => id,
		Err(e) => return SessionOutcome::StartFailed(e.into()),
	};
	let credential = match issuer.issue().await {
		Ok(credential) => credential,
		Err(e) => return SessionOutcome::StartFailed(StartError::Credential(e)),
	};

	#[cfg(feature = "tracing")]
	tracing::debug!(session = %trace_prefix, id = %id, "session started");

	let user = VirtualUser::new(id, SessionAuth::new(credential, trace_prefix), client, plan);
	let stats = user.run().await;

	SessionOutcome::Completed { id: user.id().clone(), stats }
}

/// Aggregated outcome of a load run, ordered by session index.
#[derive(Debug, Default)]
pub struct LoadReport {
	/// One report per requested session.
	pub sessions: Vec<SessionReport>,
}
impl LoadReport {
	/// Sessions that acquired an identifier and a credential.
	pub fn started(&self) -> usize {
		self.sessions.iter().filter(|report| report.stats().is_some()).count()
	}

	/// Sessions that failed to start.
	pub fn start_failures(&self) -> usize {
		self.sessions
			.iter()
			.filter(|report| matches!(report.outcome, SessionOutcome::StartFailed(_)))
			.count()
	}

	/// Successful status reads across sessions.
	pub fn reads(&self) -> usize {
		self.sessions.iter().filter_map(SessionReport::stats).map(|stats| stats.reads).sum()
	}

	/// Successful status updates across sessions.
	pub fn writes(&self) -> usize {
		self.sessions.iter().filter_map(SessionReport::stats).map(|stats| stats.writes).sum()
	}

	/// Failed calls across sessions.
	pub fn call_failures(&self) -> usize {
		self.sessions
			.iter()
			.filter_map(SessionReport::stats)
			.map(|stats| stats.failures.len())
			.sum()
	}
}
