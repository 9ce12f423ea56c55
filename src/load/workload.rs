//! Pacing and operation mix for virtual users.

// std
use std::time::Duration as StdDuration;
// crates.io
use rand::Rng;
// self
use crate::{_prelude::*, error::ConfigError};

/// Uniform random pause between a session's calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThinkTime {
	min: Duration,
	max: Duration,
}
impl ThinkTime {
	/// Pause drawn uniformly from `min..=max`.
	pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
		if min.is_negative() {
			return Err(ConfigError::InvalidVariable {
				name: "THINK_TIME_MIN_MS",
				reason: "think time cannot be negative".into(),
			});
		}
		if min > max {
			return Err(ConfigError::InvalidVariable {
				name: "THINK_TIME_MAX_MS",
				reason: format!(
					"maximum {}ms is below minimum {}ms",
					max.whole_milliseconds(),
					min.whole_milliseconds()
				),
			});
		}

		Ok(Self { min, max })
	}

	/// No pause at all.
	pub const fn none() -> Self {
		Self { min: Duration::ZERO, max: Duration::ZERO }
	}

	/// Lower bound.
	pub fn min(&self) -> Duration {
		self.min
	}

	/// Upper bound.
	pub fn max(&self) -> Duration {
		self.max
	}

	/// Draws the next pause.
	pub fn sample(&self) -> Duration {
		let min = self.min.whole_milliseconds();
		let max = self.max.whole_milliseconds();

		if min >= max {
			return self.min;
		}

		let millis = rand::rng().random_range(min..=max);

		Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
	}

	/// Sleeps for a freshly drawn pause.
	pub async fn pause(&self) {
		let pause = self.sample();

		if pause.is_positive() {
			tokio::time::sleep(StdDuration::try_from(pause).unwrap_or(StdDuration::ZERO)).await;
		}
	}
}
impl Default for ThinkTime {
	fn default() -> Self {
		Self { min: Duration::milliseconds(500), max: Duration::milliseconds(1_000) }
	}
}

/// Share of iterations that follow their read with an update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkloadMix {
	write_ratio: f64,
}
impl WorkloadMix {
	/// Fails unless `write_ratio` lies within `0.0..=1.0`.
	pub fn new(write_ratio: f64) -> Result<Self, ConfigError> {
		if !(0.0..=1.0).contains(&write_ratio) {
			return Err(ConfigError::InvalidVariable {
				name: "LOAD_TEST_WRITE_RATIO",
				reason: format!("{write_ratio} is outside 0.0..=1.0"),
			});
		}

		Ok(Self { write_ratio })
	}

	/// Configured ratio.
	pub fn write_ratio(&self) -> f64 {
		self.write_ratio
	}

	/// Decides whether the current iteration writes.
	pub fn should_write(&self) -> bool {
		rand::rng().random_bool(self.write_ratio)
	}
}
impl Default for WorkloadMix {
	fn default() -> Self {
		Self { write_ratio: 0.5 }
	}
}
