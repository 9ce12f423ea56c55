//! Startup configuration read once from environment-style lookups.
//!
//! Components never read the environment themselves; the binary builds a [`SpikeConfig`] or
//! [`LoadTestConfig`] and passes typed values down.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::{ClientId, KeyId, ResourceId},
	error::ConfigError,
	flows::DEFAULT_ADAPTOR_USERNAME,
	http::DEFAULT_REQUEST_TIMEOUT,
	load::{SessionPlan, ThinkTime, WorkloadMix},
};

/// Default FHIR base URL (integration environment).
pub const DEFAULT_FHIR_URL: &str =
	"https://int.api.service.nhs.uk/personal-demographics/FHIR/R4/";
/// Default OAuth token endpoint (integration environment).
pub const DEFAULT_TOKEN_URL: &str = "https://int.api.service.nhs.uk/oauth2/token";
/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "int";
/// Default location of the signing key.
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./certs/int/client-key";
/// Default published key id.
pub const DEFAULT_KEY_ID: &str = "test-1";

/// Settings for the get/patch spike workflow.
#[derive(Clone, Debug)]
pub struct SpikeConfig {
	/// API key used as the assertion's `iss` and `sub`.
	pub client_id: ClientId,
	/// Patient the workflow reads and patches.
	pub nhs_number: ResourceId,
	/// FHIR base URL plus token endpoint.
	pub descriptor: ApiDescriptor,
	/// Environment name.
	pub environment: String,
	/// PEM file holding the RSA signing key.
	pub private_key_path: PathBuf,
	/// Key id placed in the assertion header.
	pub key_id: KeyId,
	/// Bound on connect and total request time.
	pub request_timeout: Duration,
}
impl SpikeConfig {
	/// Reads settings through `lookup`, which returns a variable's value when set.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let vars = Vars(&lookup);
		let client_id = ClientId::new(vars.required("PDS_API_KEY")?)?;
		let nhs_number = ResourceId::new(vars.required("NHS_NUMBER")?)?;
		let descriptor = ApiDescriptor::builder()
			.base_url(vars.url("PDS_FHIR_URL", DEFAULT_FHIR_URL)?)
			.token_endpoint(vars.url("PDS_TOKEN_URL", DEFAULT_TOKEN_URL)?)
			.build()?;
		let environment = vars.or("NHS_ENVIRONMENT", DEFAULT_ENVIRONMENT);
		let private_key_path =
			PathBuf::from(vars.or("PDS_PRIVATE_KEY_PATH", DEFAULT_PRIVATE_KEY_PATH));
		let key_id = KeyId::new(vars.or("PDS_KEY_ID", DEFAULT_KEY_ID))?;
		let request_timeout = vars.timeout()?;

		Ok(Self {
			client_id,
			nhs_number,
			descriptor,
			environment,
			private_key_path,
			key_id,
			request_timeout,
		})
	}

	/// Reads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}
}

/// Settings for the load driver.
#[derive(Clone, Debug)]
pub struct LoadTestConfig {
	/// Adaptor base URL.
	pub descriptor: ApiDescriptor,
	/// Environment name used in the secret path.
	pub environment: String,
	/// Identifiers handed to sessions.
	pub nhs_numbers: Vec<ResourceId>,
	/// Username the shared secret belongs to.
	pub username: String,
	/// Session workload shape (iterations are set by the caller).
	pub plan: SessionPlan,
	/// JSON secrets file used instead of the remote parameter store.
	pub secrets_file: Option<PathBuf>,
	/// Bound on connect and total request time.
	pub request_timeout: Duration,
}
impl LoadTestConfig {
	/// Reads settings through `lookup`, which returns a variable's value when set.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let vars = Vars(&lookup);
		let descriptor = ApiDescriptor::builder()
			.base_url(parse_url("PDS_ADAPTOR_URL", &vars.required("PDS_ADAPTOR_URL")?)?)
			.build()?;
		let environment = vars.required("NHS_ENVIRONMENT")?;
		let nhs_numbers = vars
			.required("LOAD_TEST_NHS_NUMBERS")?
			.split(',')
			.map(str::trim)
			.filter(|raw| !raw.is_empty())
			.map(ResourceId::new)
			.collect::<Result<Vec<_>, _>>()?;

		if nhs_numbers.is_empty() {
			return Err(ConfigError::InvalidVariable {
				name: "LOAD_TEST_NHS_NUMBERS",
				reason: "at least one identifier is required".into(),
			});
		}

		let think_time = ThinkTime::new(
			Duration::milliseconds(vars.parsed("THINK_TIME_MIN_MS", 500_i64)?),
			Duration::milliseconds(vars.parsed("THINK_TIME_MAX_MS", 1_000_i64)?),
		)?;
		let mix = WorkloadMix::new(vars.parsed("LOAD_TEST_WRITE_RATIO", 0.5_f64)?)?;
		let plan = SessionPlan {
			think_time,
			mix,
			previous_gp: vars.optional("LOAD_TEST_PREVIOUS_GP"),
			..SessionPlan::default()
		};

		Ok(Self {
			descriptor,
			environment,
			nhs_numbers,
			username: vars.or("LOAD_TEST_USERNAME", DEFAULT_ADAPTOR_USERNAME),
			plan,
			secrets_file: vars.optional("SECRETS_FILE").map(PathBuf::from),
			request_timeout: vars.timeout()?,
		})
	}

	/// Reads settings from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}
}

struct Vars<'a, F>(&'a F);
impl<F> Vars<'_, F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &str) -> Option<String> {
		(self.0)(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, ConfigError> {
		self.optional(name).ok_or(ConfigError::MissingVariable { name })
	}

	fn or(&self, name: &str, default: &str) -> String {
		self.optional(name).unwrap_or_else(|| default.to_owned())
	}

	fn url(&self, name: &'static str, default: &str) -> Result<Url, ConfigError> {
		parse_url(name, &self.or(name, default))
	}

	fn parsed<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
	where
		T: FromStr,
		T::Err: Display,
	{
		match self.optional(name) {
			Some(raw) => raw
				.parse()
				.map_err(|e: T::Err| ConfigError::InvalidVariable { name, reason: e.to_string() }),
			None => Ok(default),
		}
	}

	fn timeout(&self) -> Result<Duration, ConfigError> {
		let default = DEFAULT_REQUEST_TIMEOUT.whole_seconds();
		let seconds = self.parsed("REQUEST_TIMEOUT_SECS", default)?;

		if seconds <= 0 {
			return Err(ConfigError::InvalidVariable {
				name: "REQUEST_TIMEOUT_SECS",
				reason: "timeout must be positive".into(),
			});
		}

		Ok(Duration::seconds(seconds))
	}
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|e| ConfigError::InvalidVariable { name, reason: e.to_string() })
}
