//! Virtual users: one identifier, one credential, a bounded loop of status calls.

// self
use crate::{
	_prelude::*,
	auth::ResourceId,
	http::ApiHttpClient,
	load::{PoolExhausted, SessionAuth, SuspendedStatusClient, ThinkTime, WorkloadMix},
	obs::CallKind,
	resource::StatusUpdate,
	transport::TransportErrorMapper,
};

/// Per-session workload shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPlan {
	/// Loop iterations per session.
	pub iterations: usize,
	/// Pause between a read and the optional update.
	pub think_time: ThinkTime,
	/// Probability that an iteration updates after reading.
	pub mix: WorkloadMix,
	/// `previousGp` sent with updates; falls back to the ODS code seen on the read.
	pub previous_gp: Option<String>,
}
impl Default for SessionPlan {
	fn default() -> Self {
		Self {
			iterations: 1,
			think_time: ThinkTime::default(),
			mix: WorkloadMix::default(),
			previous_gp: None,
		}
	}
}

/// A failed call recorded without ending the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFailure {
	/// Operation that failed.
	pub call: CallKind,
	/// Rendered error.
	pub message: String,
}

/// Counters collected by a session that started.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
	/// Successful status reads.
	pub reads: usize,
	/// Successful status updates.
	pub writes: usize,
	/// Updates skipped because the read gave nothing to write with.
	pub skipped_writes: usize,
	/// Failed calls, in order.
	pub failures: Vec<CallFailure>,
}

/// Why a session never started.
#[derive(Debug, ThisError)]
pub enum StartError {
	/// No identifier was left for the session.
	#[error(transparent)]
	PoolExhausted(#[from] PoolExhausted),
	/// The session credential could not be issued.
	#[error("Session credential could not be issued: {0}")]
	Credential(#[source] Error),
}

/// Final state of one session.
#[derive(Debug)]
pub enum SessionOutcome {
	/// The loop ran to completion.
	Completed {
		/// Identifier the session owned.
		id: ResourceId,
		/// Collected counters.
		stats: SessionStats,
	},
	/// The session failed before its first call.
	StartFailed(StartError),
	/// The session task panicked or was cancelled.
	Aborted {
		/// Join failure description.
		message: String,
	},
}

/// Outcome of one session, tagged with its index.
#[derive(Debug)]
pub struct SessionReport {
	/// Zero-based session index.
	pub session: usize,
	/// How the session ended.
	pub outcome: SessionOutcome,
}
impl SessionReport {
	/// Counters, when the session started.
	pub fn stats(&self) -> Option<&SessionStats> {
		match &self.outcome {
			SessionOutcome::Completed { stats, .. } => Some(stats),
			_ => None,
		}
	}
}

/// A single simulated user holding its own identifier and credential.
pub struct VirtualUser<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	id: ResourceId,
	auth: SessionAuth,
	client: Arc<SuspendedStatusClient<C, M>>,
	plan: SessionPlan,
}
impl<C, M> VirtualUser<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a user owning `id` and `auth`.
	pub fn new(
		id: ResourceId,
		auth: SessionAuth,
		client: Arc<SuspendedStatusClient<C, M>>,
		plan: SessionPlan,
	) -> Self {
		Self { id, auth, client, plan }
	}

	/// Identifier owned by this user.
	pub fn id(&self) -> &ResourceId {
		&self.id
	}

	/// Runs the bounded loop; call failures are recorded and the loop continues.
	pub async fn run(&self) -> SessionStats {
		let mut stats = SessionStats::default();

		for _ in 0..self.plan.iterations {
			let status = match self.client.status(&self.auth, &self.id).await {
				Ok(status) => {
					stats.reads += 1;

					status
				},
				Err(e) => {
					stats
						.failures
						.push(CallFailure { call: CallKind::StatusRead, message: e.to_string() });

					continue;
				},
			};

			self.plan.think_time.pause().await;

			if !self.plan.mix.should_write() {
				continue;
			}

			let previous_gp = self
				.plan
				.previous_gp
				.clone()
				.or_else(|| status.current_ods_code.clone())
				.or_else(|| status.managing_organisation.clone());
			let (Some(previous_gp), Some(record_etag)) = (previous_gp, status.record_etag) else {
				stats.skipped_writes += 1;

				continue;
			};
			let update = StatusUpdate { previous_gp, record_etag };

			match self.client.update(&self.auth, &self.id, &update).await {
				Ok(_) => stats.writes += 1,
				Err(e) => stats
					.failures
					.push(CallFailure { call: CallKind::StatusUpdate, message: e.to_string() }),
			}
		}

		stats
	}
}
impl<C, M> Debug for VirtualUser<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VirtualUser")
			.field("id", &self.id)
			.field("auth", &self.auth)
			.field("plan", &self.plan)
			.finish()
	}
}
